use std::fmt;

use reqwest::StatusCode;

use crate::resource_id::VmIdentifier;

/// Power operations posted to `Microsoft.Compute/virtualMachines/{vm}/{op}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Deallocate,
}

impl PowerAction {
    /// Path segment of the compute operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Start => "start",
            PowerAction::Deallocate => "deallocate",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider accepted a begin-start or begin-deallocate request.
///
/// Acceptance is not completion; the VM keeps changing state in the
/// background and this tool never polls for it.
#[derive(Debug, Clone)]
pub struct ActionAccepted {
    pub vm: VmIdentifier,
    pub action: PowerAction,
    pub status: StatusCode,
    /// `Azure-AsyncOperation` (or `Location`) URL for tracking the operation.
    pub operation_url: Option<String>,
}
