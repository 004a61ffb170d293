//! Wire models for the Azure Resource Manager resources this tool reads.
//!
//! # Resources
//!
//! - [`HostPool`]: a named group of session hosts sharing a session configuration.
//! - [`SessionHost`]: one VM registered to a host pool. Its
//!   [`SessionHost::vm_resource_id`] points at the backing compute resource.
//! - [`PowerAction`] and [`ActionAccepted`]: a VM power request and its acceptance.
//!
//! Every value is a read-only view built fresh from an API response; nothing
//! is cached between runs.

mod host_pool;
mod page;
mod session_host;
mod vm;

pub use host_pool::*;
pub use page::*;
pub use session_host::*;
pub use vm::*;
