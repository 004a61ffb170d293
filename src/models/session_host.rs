use serde::{Deserialize, Serialize};

/// A session host registered to a host pool.
///
/// The host is linked to its pool only through the request path and the
/// `<hostPool>/<hostName>` shape of `name`; the response carries no explicit
/// pool reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHost {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: SessionHostProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHostProperties {
    /// Resource ID of the backing virtual machine.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Agent status, e.g. `Available`, `Unavailable`, `Shutdown`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub allow_new_session: Option<bool>,
    #[serde(default)]
    pub sessions: Option<u32>,
}

impl SessionHost {
    /// The backing VM resource ID, or `""` when the provider omitted it.
    ///
    /// An empty ID never resolves, so it surfaces later as an unresolvable
    /// identifier instead of being dropped here.
    pub fn vm_resource_id(&self) -> &str {
        self.properties.resource_id.as_deref().unwrap_or_default()
    }

    /// Host name without the `<hostPool>/` prefix.
    pub fn host_name(&self) -> &str {
        self.name
            .split_once('/')
            .map(|(_, host)| host)
            .unwrap_or(&self.name)
    }
}
