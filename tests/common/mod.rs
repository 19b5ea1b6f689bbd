//! Shared wiremock fixtures for the integration suite
//!
//! The mock cluster serves JSON for every endpoint; the YAML-accepting
//! fetch paths decode it fine since YAML is a JSON superset, which keeps
//! the fixtures readable.

#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spacedock::metrics::HawkularMetrics;
use spacedock::provider::{BaseUrlProvider, ClusterUrlProvider};
use spacedock::KubeClient;

pub const USER_NS: &str = "dock-user";
pub const SPACE: &str = "my-space";

/// Mount the labeled environments config map. Entries are
/// (environment, namespace) pairs.
pub async fn mount_environments(server: &MockServer, entries: &[(&str, &str)]) {
    let data: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(env, ns)| {
            (
                env.to_string(),
                serde_json::Value::String(format!("name: {env}\nnamespace: {ns}\norder: 1")),
            )
        })
        .collect();

    let cm = serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "fabric8-environments",
            "namespace": USER_NS,
            "labels": {"provider": "fabric8"},
        },
        "data": data,
    });

    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v1/namespaces/{USER_NS}/configmaps/fabric8-environments"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(cm))
        .mount(server)
        .await;
}

/// Construct a client against the mock cluster. The metrics handle points
/// at the same server; tests that exercise metrics mount their own stats
/// endpoint.
pub async fn connect(server: &MockServer) -> KubeClient {
    let provider =
        Box::new(ClusterUrlProvider::new(&server.uri(), "itest-token").expect("provider"));
    let metrics = Box::new(
        HawkularMetrics::new(provider.metrics_url(), provider.metrics_token()).expect("metrics"),
    );
    KubeClient::with_collaborators(provider, metrics, USER_NS.to_string())
        .await
        .expect("client construction")
}

/// A kubernetes-style 404 Status document.
pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404,
    }))
}

/// Owner reference list pointing at `uid` with the controller flag set.
pub fn controller_owner(kind: &str, uid: &str) -> serde_json::Value {
    serde_json::json!([{
        "apiVersion": "v1",
        "kind": kind,
        "name": "owner",
        "uid": uid,
        "controller": true,
    }])
}

/// A list response in the shape kube's typed clients expect.
pub fn list_of(kind: &str, items: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": kind,
        "metadata": {"resourceVersion": "1"},
        "items": items,
    })
}
