//! The end-to-end run: list pools, list the target pool's hosts, act on each.
//!
//! Listing failures abort the run. Per-host failures are recorded in the
//! [`RunReport`] and the remaining hosts are still processed; the report
//! decides the exit status at the end.

use std::fmt::Write as _;

use crate::arm::{ArmClient, ClientError};
use crate::config::Action;
use crate::lifecycle::{LifecycleError, VmController};
use crate::models::{ActionAccepted, HostPool, SessionHost};

/// Result of acting on one session host.
#[derive(Debug)]
pub struct HostOutcome {
    pub session_host: String,
    pub vm_resource_id: String,
    pub result: Result<ActionAccepted, LifecycleError>,
}

/// Everything one run saw and did.
#[derive(Debug)]
pub struct RunReport {
    pub action: Action,
    pub resource_group: String,
    pub host_pool: String,
    /// Whether the target pool appeared in the subscription listing.
    pub target_listed: bool,
    pub host_pools: Vec<HostPool>,
    pub session_hosts: Vec<SessionHost>,
    pub outcomes: Vec<HostOutcome>,
}

impl RunReport {
    pub fn accepted(&self) -> impl Iterator<Item = &ActionAccepted> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&HostOutcome, &LifecycleError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// `0` when every host succeeded, `1` otherwise.
    pub fn exit_status(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Plain-text summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Host pools ({}):", self.host_pools.len());
        for pool in &self.host_pools {
            let _ = writeln!(out, "  {}", pool.id);
        }
        let _ = writeln!(
            out,
            "Session hosts in '{}' ({}):",
            self.host_pool,
            self.session_hosts.len()
        );
        for host in &self.session_hosts {
            let status = host.properties.status.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "  {:<40} {:<12} {}",
                host.host_name(),
                status,
                host.vm_resource_id()
            );
        }
        if self.action != Action::List {
            let failed = self.failures().count();
            let _ = writeln!(
                out,
                "{}: {} accepted, {} failed",
                self.action.as_str(),
                self.outcomes.len() - failed,
                failed
            );
            for (outcome, error) in self.failures() {
                let _ = writeln!(out, "  {}: {}", outcome.session_host, error);
            }
        }
        out
    }
}

/// Run `action` against every session host of `host_pool`.
pub async fn run(
    client: &ArmClient,
    resource_group: &str,
    host_pool: &str,
    action: Action,
) -> Result<RunReport, ClientError> {
    let host_pools = client.list_host_pools().collect_all().await?;
    for pool in &host_pools {
        tracing::info!(id = %pool.id, "HostPool");
    }
    let target_listed = host_pools
        .iter()
        .any(|p| p.matches(resource_group, host_pool));
    if !target_listed {
        tracing::warn!(
            host_pool,
            resource_group,
            "host pool not among the {} pools listed for the subscription",
            host_pools.len()
        );
    }

    let session_hosts = client
        .list_session_hosts(resource_group, host_pool)
        .collect_all()
        .await?;
    for host in &session_hosts {
        tracing::info!(
            name = %host.name,
            vm = host.vm_resource_id(),
            status = host.properties.status.as_deref().unwrap_or("unknown"),
            "SessionHost"
        );
    }

    if session_hosts.is_empty() {
        tracing::info!(host_pool, resource_group, "host pool has no session hosts");
    }

    let mut outcomes = Vec::new();
    if let Some(power_action) = action.power_action() {
        let controller = VmController::new(client);
        for host in &session_hosts {
            let result = controller.request(power_action, host.vm_resource_id()).await;
            match &result {
                Ok(accepted) => tracing::info!(
                    session_host = %host.name,
                    vm = %accepted.vm,
                    status = %accepted.status,
                    "{} accepted",
                    power_action
                ),
                Err(e) => tracing::error!(
                    session_host = %host.name,
                    error = %e,
                    "{} failed, continuing with remaining hosts",
                    power_action
                ),
            }
            outcomes.push(HostOutcome {
                session_host: host.name.clone(),
                vm_resource_id: host.vm_resource_id().to_string(),
                result,
            });
        }
    }

    Ok(RunReport {
        action,
        resource_group: resource_group.to_string(),
        host_pool: host_pool.to_string(),
        target_listed,
        host_pools,
        session_hosts,
        outcomes,
    })
}
