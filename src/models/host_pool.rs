use serde::{Deserialize, Serialize};

/// An AVD host pool as returned by `Microsoft.DesktopVirtualization/hostPools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: HostPoolProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPoolProperties {
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// `Pooled`, `Personal` or `BYODesktop`.
    #[serde(default)]
    pub host_pool_type: Option<String>,
    #[serde(default)]
    pub load_balancer_type: Option<String>,
}

impl HostPool {
    /// Whether the pool's resource ID sits under `resource_group`.
    ///
    /// Resource Manager does not preserve casing in IDs (`resourcegroups`
    /// is common), so the comparison ignores ASCII case.
    pub fn in_resource_group(&self, resource_group: &str) -> bool {
        let segment = format!("/resourcegroups/{}/", resource_group.to_ascii_lowercase());
        self.id.to_ascii_lowercase().contains(&segment)
    }

    /// Whether this is `name` in `resource_group`, ignoring ASCII case.
    pub fn matches(&self, resource_group: &str, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.in_resource_group(resource_group)
    }
}
