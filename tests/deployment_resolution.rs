//! End-to-end deployment resolution against a mock cluster

mod common;

use common::{connect, controller_owner, list_of, mount_environments, not_found, SPACE, USER_NS};
use spacedock::Error;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn deployment_config(space: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "DeploymentConfig",
        "metadata": {
            "name": "foo",
            "namespace": "my-run",
            "uid": "dc-uid-1",
            "labels": {"space": space},
            "annotations": {"version": "1.0.2"},
        },
    })
}

async fn mount_deployment_config(server: &MockServer, space: &str) {
    Mock::given(method("GET"))
        .and(path("/oapi/v1/namespaces/my-run/deploymentconfigs/foo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(deployment_config(space)))
        .mount(server)
        .await;
}

async fn mount_controllers(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/my-run/replicationcontrollers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_of("ReplicationControllerList", items)),
        )
        .mount(server)
        .await;
}

async fn mount_pods(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/my-run/pods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_of("PodList", items)))
        .mount(server)
        .await;
}

async fn mount_services(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/my-run/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_of("ServiceList", items)))
        .mount(server)
        .await;
}

async fn mount_routes(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/oapi/v1/namespaces/my-run/routes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": items})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolves_newest_controller_and_classifies_only_its_pods() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    mount_deployment_config(&server, SPACE).await;

    mount_controllers(
        &server,
        serde_json::json!([
            {
                "metadata": {
                    "name": "foo-1",
                    "uid": "rc-uid-1",
                    "creationTimestamp": "2023-01-01T00:00:00Z",
                    "ownerReferences": controller_owner("DeploymentConfig", "dc-uid-1"),
                },
            },
            {
                "metadata": {
                    "name": "foo-2",
                    "uid": "rc-uid-2",
                    "creationTimestamp": "2023-06-01T00:00:00Z",
                    "ownerReferences": controller_owner("DeploymentConfig", "dc-uid-1"),
                },
                "spec": {
                    "template": {
                        "metadata": {"labels": {"app": "foo"}},
                    },
                },
                "status": {"replicas": 2},
            },
        ]),
    )
    .await;

    mount_pods(
        &server,
        serde_json::json!([
            {
                "metadata": {
                    "name": "foo-2-a",
                    "uid": "pod-a",
                    "ownerReferences": controller_owner("ReplicationController", "rc-uid-2"),
                },
                "status": {"phase": "Running"},
            },
            {
                "metadata": {
                    "name": "foo-2-b",
                    "uid": "pod-b",
                    "ownerReferences": controller_owner("ReplicationController", "rc-uid-2"),
                },
                "status": {"phase": "Running"},
            },
            {
                "metadata": {
                    "name": "foo-1-stale",
                    "uid": "pod-stale",
                    "ownerReferences": controller_owner("ReplicationController", "rc-uid-1"),
                },
                "status": {"phase": "Running"},
            },
        ]),
    )
    .await;

    mount_services(
        &server,
        serde_json::json!([{
            "metadata": {"name": "foo-svc"},
            "spec": {"selector": {"app": "foo"}},
        }]),
    )
    .await;

    mount_routes(
        &server,
        serde_json::json!([{
            "metadata": {"name": "foo-route"},
            "spec": {
                "host": "foo.example.com",
                "to": {"name": "foo-svc"},
                "tls": {"termination": "edge"},
            },
            "status": {
                "ingress": [{
                    "host": "foo.example.com",
                    "conditions": [{
                        "type": "Admitted",
                        "status": "True",
                        "lastTransitionTime": "2023-06-01T00:00:00Z",
                    }],
                }],
            },
        }]),
    )
    .await;

    let client = connect(&server).await;
    let deployment = client
        .get_deployment(SPACE, "foo", "run")
        .await
        .unwrap()
        .expect("deployment resolves");

    assert_eq!(deployment.name, "run");
    assert_eq!(deployment.version, "1.0.2");
    // the stale controller's pod is not counted
    assert_eq!(deployment.pod_total, 2);
    let running = deployment
        .pods
        .iter()
        .find(|p| p.status == "Running")
        .unwrap();
    assert_eq!(running.count, 2);
    assert_eq!(deployment.url.as_deref(), Some("https://foo.example.com/"));
    assert!(deployment.console_url.contains("/project/my-run/browse/dc/foo"));
    assert!(deployment
        .logs_url
        .as_deref()
        .unwrap_or_default()
        .contains("/browse/rc/foo-2"));
}

#[tokio::test]
async fn missing_deployment_config_is_not_found_not_error() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    Mock::given(method("GET"))
        .and(path("/oapi/v1/namespaces/my-run/deploymentconfigs/foo"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let deployment = client.get_deployment(SPACE, "foo", "run").await.unwrap();
    assert!(deployment.is_none());
}

#[tokio::test]
async fn space_label_mismatch_is_a_hard_error() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    mount_deployment_config(&server, "someone-elses-space").await;

    let client = connect(&server).await;
    let result = client.get_deployment(SPACE, "foo", "run").await;
    assert!(matches!(result, Err(Error::SpaceMismatch { .. })));
}

#[tokio::test]
async fn config_without_rollout_yields_empty_deployment() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    mount_deployment_config(&server, SPACE).await;
    mount_controllers(&server, serde_json::json!([])).await;

    let client = connect(&server).await;
    let deployment = client
        .get_deployment(SPACE, "foo", "run")
        .await
        .unwrap()
        .expect("not yet rolled out is still a deployment");

    assert_eq!(deployment.pod_total, 0);
    // consumers always get at least one category to render
    assert_eq!(deployment.pods.len(), 1);
    assert_eq!(deployment.pods[0].status, "Running");
    assert_eq!(deployment.pods[0].count, 0);
    assert!(deployment.url.is_none());
}

#[tokio::test]
async fn get_space_builds_one_application_per_build_config() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;

    Mock::given(method("GET"))
        .and(path(format!("/oapi/v1/namespaces/{USER_NS}/buildconfigs")))
        .and(query_param("labelSelector", format!("space={SPACE}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {"metadata": {"name": "frontend"}},
                {"metadata": {"name": "backend"}},
            ],
        })))
        .mount(&server)
        .await;

    // neither app is deployed anywhere
    for app in ["frontend", "backend"] {
        Mock::given(method("GET"))
            .and(path(format!(
                "/oapi/v1/namespaces/my-run/deploymentconfigs/{app}"
            )))
            .respond_with(not_found())
            .mount(&server)
            .await;
    }

    let client = connect(&server).await;
    let space = client.get_space(SPACE).await.unwrap();

    assert_eq!(space.name, SPACE);
    let mut names: Vec<_> = space.applications.iter().map(|a| a.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["backend", "frontend"]);
    assert!(space.applications.iter().all(|a| a.deployments.is_empty()));
}

#[tokio::test]
async fn scale_round_trips_and_returns_previous_count() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    mount_deployment_config(&server, SPACE).await;
    mount_controllers(&server, serde_json::json!([])).await;

    Mock::given(method("GET"))
        .and(path("/oapi/v1/namespaces/my-run/deploymentconfigs/foo/scale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "Scale",
            "apiVersion": "extensions/v1beta1",
            "metadata": {"name": "foo", "namespace": "my-run", "resourceVersion": "42"},
            "spec": {"replicas": 2},
            "status": {"replicas": 2},
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/oapi/v1/namespaces/my-run/deploymentconfigs/foo/scale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "Scale",
            "spec": {"replicas": 3},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let previous = client.scale_deployment(SPACE, "foo", "run", 3).await.unwrap();
    assert_eq!(previous, 2);
}

#[tokio::test]
async fn scaling_an_undeployed_application_fails() {
    let server = MockServer::start().await;
    mount_environments(&server, &[("run", "my-run")]).await;
    Mock::given(method("GET"))
        .and(path("/oapi/v1/namespaces/my-run/deploymentconfigs/foo"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let result = client.scale_deployment(SPACE, "foo", "run", 3).await;
    assert!(matches!(result, Err(Error::NotDeployed { .. })));
}
