//! In-process mock of the Resource Manager endpoints the client talks to.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use avd_hostctl::arm::ArmClient;
use avd_hostctl::credential::AccessToken;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-0000000000aa";
pub const TOKEN: &str = "test-token";

pub fn vm_id(resource_group: &str, vm: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
        SUBSCRIPTION, resource_group, vm
    )
}

pub fn token() -> AccessToken {
    AccessToken {
        token: TOKEN.to_string(),
        expires_on: None,
    }
}

#[derive(Default)]
struct MockState {
    base_url: String,
    page_size: usize,
    host_pools: Vec<Value>,
    session_hosts: HashMap<(String, String), Vec<Value>>,
    failing_vms: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockState {
    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn page(&self, path: &str, items: &[Value], skip: usize) -> Value {
        let end = (skip + self.page_size).min(items.len());
        let next_link = if end < items.len() {
            json!(format!(
                "{}{}?api-version=2024-04-03&$skipToken={}",
                self.base_url, path, end
            ))
        } else {
            Value::Null
        };
        json!({ "value": items[skip.min(end)..end].to_vec(), "nextLink": next_link })
    }
}

fn arm_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(rename = "$skipToken")]
    skip_token: Option<usize>,
}

async fn list_host_pools(
    State(state): State<Arc<MockState>>,
    Path(sub): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return arm_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken", "bad token");
    }
    let skip = query.skip_token.unwrap_or(0);
    state.record(format!("GET hostPools skip={}", skip));
    let path = format!(
        "/subscriptions/{}/providers/Microsoft.DesktopVirtualization/hostPools",
        sub
    );
    Json(state.page(&path, &state.host_pools, skip)).into_response()
}

async fn list_host_pools_in_group(
    State(state): State<Arc<MockState>>,
    Path((sub, rg)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return arm_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken", "bad token");
    }
    let skip = query.skip_token.unwrap_or(0);
    state.record(format!("GET hostPools {} skip={}", rg, skip));
    let marker = format!("/resourcegroups/{}/", rg.to_ascii_lowercase());
    let pools: Vec<Value> = state
        .host_pools
        .iter()
        .filter(|p| {
            p["id"]
                .as_str()
                .is_some_and(|id| id.to_ascii_lowercase().contains(&marker))
        })
        .cloned()
        .collect();
    let path = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostPools",
        sub, rg
    );
    Json(state.page(&path, &pools, skip)).into_response()
}

async fn list_session_hosts(
    State(state): State<Arc<MockState>>,
    Path((sub, rg, hp)): Path<(String, String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return arm_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken", "bad token");
    }
    let skip = query.skip_token.unwrap_or(0);
    state.record(format!("GET sessionHosts {}/{} skip={}", rg, hp, skip));
    let Some(hosts) = state.session_hosts.get(&(rg.clone(), hp.clone())) else {
        return arm_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFound",
            &format!("The Resource 'Microsoft.DesktopVirtualization/hostpools/{}' under resource group '{}' was not found.", hp, rg),
        );
    };
    let path = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostPools/{}/sessionHosts",
        sub, rg, hp
    );
    Json(state.page(&path, hosts, skip)).into_response()
}

async fn power_action(
    State(state): State<Arc<MockState>>,
    Path((sub, rg, vm, op)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return arm_error(StatusCode::UNAUTHORIZED, "InvalidAuthenticationToken", "bad token");
    }
    state.record(format!("POST {} {}/{}", op, rg, vm));
    if state.failing_vms.contains(&vm) {
        return arm_error(
            StatusCode::CONFLICT,
            "OperationNotAllowed",
            "Operation 'start' is not allowed on VM since the VM is marked for deletion.",
        );
    }
    let operation = format!(
        "{}/subscriptions/{}/providers/Microsoft.Compute/locations/westeurope/operations/{}-{}",
        state.base_url, sub, op, vm
    );
    (StatusCode::ACCEPTED, [("azure-asyncoperation", operation)]).into_response()
}

/// Builder for a running mock server.
#[derive(Default)]
pub struct MockArmBuilder {
    state: MockState,
}

impl MockArmBuilder {
    pub fn page_size(mut self, size: usize) -> Self {
        self.state.page_size = size;
        self
    }

    pub fn host_pool(self, resource_group: &str, name: &str) -> Self {
        let id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostpools/{}",
            SUBSCRIPTION, resource_group, name
        );
        self.host_pool_with_id(resource_group, name, id)
    }

    /// Register a pool whose ID uses the all-lowercase form ARM often returns.
    pub fn host_pool_lowercase_id(self, resource_group: &str, name: &str) -> Self {
        let id = format!(
            "/subscriptions/{}/resourcegroups/{}/providers/microsoft.desktopvirtualization/hostpools/{}",
            SUBSCRIPTION,
            resource_group.to_ascii_lowercase(),
            name
        );
        self.host_pool_with_id(resource_group, name, id)
    }

    fn host_pool_with_id(mut self, resource_group: &str, name: &str, id: String) -> Self {
        self.state.host_pools.push(json!({
            "id": id,
            "name": name,
            "location": "westeurope",
            "properties": { "hostPoolType": "Pooled", "loadBalancerType": "BreadthFirst" }
        }));
        self.state
            .session_hosts
            .entry((resource_group.to_string(), name.to_string()))
            .or_default();
        self
    }

    /// Register a session host; `None` leaves `properties.resourceId` out.
    pub fn session_host(
        mut self,
        resource_group: &str,
        host_pool: &str,
        host: &str,
        vm_resource_id: Option<&str>,
    ) -> Self {
        let mut properties = json!({ "status": "Available", "allowNewSession": true, "sessions": 0 });
        if let Some(id) = vm_resource_id {
            properties["resourceId"] = json!(id);
        }
        self.state
            .session_hosts
            .entry((resource_group.to_string(), host_pool.to_string()))
            .or_default()
            .push(json!({
                "id": format!(
                    "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/hostpools/{}/sessionhosts/{}",
                    SUBSCRIPTION, resource_group, host_pool, host
                ),
                "name": format!("{}/{}", host_pool, host),
                "properties": properties
            }));
        self
    }

    pub fn failing_vm(mut self, vm: &str) -> Self {
        self.state.failing_vms.insert(vm.to_string());
        self
    }

    pub async fn start(mut self) -> MockArm {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        self.state.base_url = base_url.clone();
        if self.state.page_size == 0 {
            self.state.page_size = 100;
        }

        let state = Arc::new(self.state);
        let app = Router::new()
            .route(
                "/subscriptions/{sub}/providers/Microsoft.DesktopVirtualization/hostPools",
                get(list_host_pools),
            )
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.DesktopVirtualization/hostPools",
                get(list_host_pools_in_group),
            )
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.DesktopVirtualization/hostPools/{hp}/sessionHosts",
                get(list_session_hosts),
            )
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{vm}/{op}",
                post(power_action),
            )
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        MockArm { base_url, state }
    }
}

pub struct MockArm {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockArm {
    pub fn builder() -> MockArmBuilder {
        MockArmBuilder::default()
    }

    pub fn client(&self) -> ArmClient {
        self.client_with_token(&token())
    }

    pub fn client_with_token(&self, token: &AccessToken) -> ArmClient {
        ArmClient::new(&self.base_url, SUBSCRIPTION, token, Duration::from_secs(5))
            .expect("Failed to build client")
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().expect("calls lock").clone()
    }

    /// Power action calls only, as `"<op> <rg>/<vm>"`.
    pub fn power_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("POST ").map(str::to_string))
            .collect()
    }
}
