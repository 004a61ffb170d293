//! Extraction of the resource group and VM name from an ARM resource ID.
//!
//! Both parsers are lenient: an ID that does not match yields an empty string
//! and the caller decides what an unresolvable ID means. [`VmIdentifier`]
//! bundles the two results and exposes that decision as
//! [`VmIdentifier::is_resolvable`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static RESOURCE_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"resourceGroups/([A-Za-z0-9_-]+)/providers").expect("resource group pattern")
});

static VM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/virtualMachines/([A-Za-z0-9_-]+)$").expect("vm name pattern")
});

/// Resource group from the first `resourceGroups/<name>/providers` segment,
/// or `""` when there is none.
pub fn parse_resource_group(resource_id: &str) -> String {
    capture(&RESOURCE_GROUP, resource_id)
}

/// VM name from a trailing `/virtualMachines/<name>`, or `""` when the ID
/// does not end that way.
pub fn parse_vm_name(resource_id: &str) -> String {
    capture(&VM_NAME, resource_id)
}

fn capture(pattern: &Regex, haystack: &str) -> String {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// The compute coordinates of a session host's VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmIdentifier {
    pub resource_group: String,
    pub vm_name: String,
}

impl VmIdentifier {
    pub fn from_resource_id(resource_id: &str) -> Self {
        Self {
            resource_group: parse_resource_group(resource_id),
            vm_name: parse_vm_name(resource_id),
        }
    }

    /// Both fields were found.
    pub fn is_resolvable(&self) -> bool {
        !self.resource_group.is_empty() && !self.vm_name.is_empty()
    }
}

impl fmt::Display for VmIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.vm_name)
    }
}
