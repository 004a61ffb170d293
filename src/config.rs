//! Run configuration: flags, environment and an optional JSON file.
//!
//! Each setting is resolved with the priority:
//! 1. command-line flag
//! 2. environment variable (handled by clap's `env`)
//! 3. config file (`--config`, or `<config_dir>/avd-hostctl/config.json`)
//! 4. built-in default, where one exists
//!
//! The result is validated before any network call is made.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::arm::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::models::PowerAction;

const APP_NAME: &str = "avd-hostctl";
const CONFIG_FILE: &str = "config.json";

/// What to do with the session hosts of the configured pool.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Only list host pools and session hosts
    List,
    /// Begin-start every session host VM
    Start,
    /// Begin-deallocate every session host VM
    #[value(alias = "deallocate")]
    #[serde(alias = "deallocate")]
    Stop,
}

impl Action {
    /// The VM power action, or `None` for list-only runs.
    pub fn power_action(&self) -> Option<PowerAction> {
        match self {
            Action::List => None,
            Action::Start => Some(PowerAction::Start),
            Action::Stop => Some(PowerAction::Deallocate),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0}: pass the flag, set the environment variable, or add it to the config file")]
    Missing(&'static str),

    #[error("Invalid subscription id '{0}': expected a GUID")]
    InvalidSubscription(String),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidName {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid ARM endpoint '{0}': expected an http(s) URL")]
    InvalidEndpoint(String),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Flags shared by every run.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Subscription id (env: AZURE_SUBSCRIPTION_ID)
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: Option<String>,

    /// Resource group of the host pool (env: AVD_RESOURCE_GROUP)
    #[arg(long, env = "AVD_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Host pool name (env: AVD_HOST_POOL)
    #[arg(long, env = "AVD_HOST_POOL")]
    pub host_pool: Option<String>,

    /// What to do with the session hosts (env: AVD_ACTION, default: list)
    #[arg(long, value_enum, env = "AVD_ACTION")]
    pub action: Option<Action>,

    /// Resource Manager endpoint (env: AVD_ARM_ENDPOINT)
    #[arg(long, env = "AVD_ARM_ENDPOINT")]
    pub arm_endpoint: Option<String>,

    /// Per-request timeout in seconds (env: AVD_TIMEOUT_SECS, default: 60)
    #[arg(long, env = "AVD_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Config file (env: AVD_HOSTCTL_CONFIG)
    #[arg(long, env = "AVD_HOSTCTL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Contents of the optional JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub host_pool: Option<String>,
    pub action: Option<Action>,
    pub arm_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load a config file. A missing file is an error here; see [`Settings::resolve`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config_dir>/avd-hostctl/config.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        let mut path = config_dir()?;
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        Some(path)
    }
}

/// Fully resolved and validated run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub subscription_id: String,
    pub resource_group: String,
    pub host_pool: String,
    pub action: Action,
    pub arm_endpoint: String,
    pub timeout: Duration,
}

impl Settings {
    /// Resolve settings from flags/env and the config file.
    ///
    /// An explicit `--config` must exist; the default location is optional.
    pub fn resolve(args: &RunArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => match FileConfig::default_path() {
                Some(path) if path.exists() => {
                    tracing::debug!(path = %path.display(), "loading config file");
                    FileConfig::load(&path)?
                }
                _ => FileConfig::default(),
            },
        };
        Self::merge(args, file)
    }

    /// Layer `args` over `file` and validate the result.
    pub fn merge(args: &RunArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let settings = Self {
            subscription_id: args
                .subscription
                .clone()
                .or(file.subscription_id)
                .ok_or(ConfigError::Missing("subscription"))?,
            resource_group: args
                .resource_group
                .clone()
                .or(file.resource_group)
                .ok_or(ConfigError::Missing("resource group"))?,
            host_pool: args
                .host_pool
                .clone()
                .or(file.host_pool)
                .ok_or(ConfigError::Missing("host pool"))?,
            action: args.action.or(file.action).unwrap_or(Action::List),
            arm_endpoint: args
                .arm_endpoint
                .clone()
                .or(file.arm_endpoint)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: args
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Uuid::parse_str(&self.subscription_id)
            .map_err(|_| ConfigError::InvalidSubscription(self.subscription_id.clone()))?;

        validate_name(
            "resource group",
            &self.resource_group,
            90,
            |c| c.is_ascii_alphanumeric() || "_-.()".contains(c),
        )?;
        if self.resource_group.ends_with('.') {
            return Err(ConfigError::InvalidName {
                field: "resource group",
                value: self.resource_group.clone(),
                reason: "must not end with a period",
            });
        }

        validate_name("host pool", &self.host_pool, 64, |c| {
            c.is_ascii_alphanumeric() || "_-.".contains(c)
        })?;

        if !(self.arm_endpoint.starts_with("https://") || self.arm_endpoint.starts_with("http://"))
        {
            return Err(ConfigError::InvalidEndpoint(self.arm_endpoint.clone()));
        }
        Ok(())
    }

    /// Token audience for the configured endpoint.
    pub fn token_resource(&self) -> &str {
        self.arm_endpoint.trim_end_matches('/')
    }
}

fn validate_name(
    field: &'static str,
    value: &str,
    max_len: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidName {
        field,
        value: value.to_string(),
        reason,
    };
    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > max_len {
        return Err(invalid("too long"));
    }
    if !value.chars().all(allowed) {
        return Err(invalid("contains characters Azure does not allow"));
    }
    Ok(())
}
