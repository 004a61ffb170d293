use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;

use super::{AccessToken, CredentialError};

const NAME: &str = "AzureCli";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// POSIX timestamp; only emitted by CLI 2.54 and later.
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

fn az_command() -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "az"]);
        cmd
    } else {
        Command::new("az")
    }
}

/// Token from the Azure CLI login cache via `az account get-access-token`.
pub(super) async fn get_token(resource: &str) -> Result<AccessToken, CredentialError> {
    let output = az_command()
        .args(["account", "get-access-token", "--output", "json", "--resource"])
        .arg(resource)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CredentialError::from_source(NAME, format!("failed to run az: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CredentialError::from_source(
            NAME,
            format!("az exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    parse_cli_token(&output.stdout).map_err(|e| CredentialError::from_source(NAME, e))
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, serde_json::Error> {
    let parsed: CliToken = serde_json::from_slice(stdout)?;
    Ok(AccessToken {
        token: parsed.access_token,
        expires_on: parsed
            .expires_on
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
    })
}
