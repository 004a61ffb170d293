//! Start and deallocate session host VMs.

use thiserror::Error;

use crate::arm::{ArmClient, ClientError};
use crate::models::{ActionAccepted, PowerAction};
use crate::resource_id::VmIdentifier;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The VM resource ID did not yield both a resource group and a VM name.
    #[error("Unresolvable VM resource ID '{resource_id}'")]
    UnresolvableIdentifier { resource_id: String },

    #[error("{action} request for VM '{vm_name}' failed: {source}")]
    Provider {
        vm_name: String,
        action: PowerAction,
        #[source]
        source: ClientError,
    },
}

impl LifecycleError {
    /// VM the failure is about, when the ID resolved far enough to name one.
    pub fn vm_name(&self) -> Option<&str> {
        match self {
            LifecycleError::UnresolvableIdentifier { .. } => None,
            LifecycleError::Provider { vm_name, .. } => Some(vm_name),
        }
    }
}

/// Issues begin-start and begin-deallocate requests for session host VMs.
pub struct VmController<'a> {
    client: &'a ArmClient,
}

impl<'a> VmController<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    pub async fn request_start(
        &self,
        vm_resource_id: &str,
    ) -> Result<ActionAccepted, LifecycleError> {
        self.request(PowerAction::Start, vm_resource_id).await
    }

    pub async fn request_deallocate(
        &self,
        vm_resource_id: &str,
    ) -> Result<ActionAccepted, LifecycleError> {
        self.request(PowerAction::Deallocate, vm_resource_id).await
    }

    /// Resolve `vm_resource_id` and post `action` for it.
    ///
    /// An unresolvable ID never reaches the provider. Whatever the provider
    /// answers for an already-running (or already-deallocated) VM is passed
    /// through unchanged.
    pub async fn request(
        &self,
        action: PowerAction,
        vm_resource_id: &str,
    ) -> Result<ActionAccepted, LifecycleError> {
        let vm = VmIdentifier::from_resource_id(vm_resource_id);
        if !vm.is_resolvable() {
            return Err(LifecycleError::UnresolvableIdentifier {
                resource_id: vm_resource_id.to_string(),
            });
        }

        tracing::debug!(%vm, %action, "requesting power action");
        self.client
            .begin_power_action(&vm, action)
            .await
            .map_err(|source| LifecycleError::Provider {
                vm_name: vm.vm_name.clone(),
                action,
                source,
            })
    }
}
