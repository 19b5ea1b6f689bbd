//! Deployment resolution
//!
//! Locates the DeploymentConfig for an application and the single
//! ReplicationController considered "current", mirroring how the cluster
//! console identifies the active rollout. Owner matching is plain data
//! transformation so it stays unit-testable without cluster fixtures.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ReplicationController;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::Api;

use crate::error::{Error, Result};
use crate::kube::fetch;
use crate::models::openshift::DeploymentConfig;

pub mod pods;
pub mod route;

/// Label tying a deployment config (and build config) to its space.
pub const SPACE_LABEL: &str = "space";
/// Annotation recording the application version on a deployment config.
pub const VERSION_ANNOTATION: &str = "version";

/// The current deployment of one application in one environment.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    /// UID of the deployment config.
    pub config_uid: String,
    /// Application version recorded on the deployment config.
    pub version: String,
    /// Controller of the latest rollout. `None` when the config has not
    /// been rolled out yet - a valid state, not an error.
    pub controller: Option<ReplicationController>,
}

/// Resolve the current deployment of `app` in `namespace`.
///
/// A missing DeploymentConfig is `Ok(None)`. A config labeled with a
/// different space is a hard error, never silently served.
pub async fn resolve_deployment(
    client: &kube::Client,
    space: &str,
    app: &str,
    namespace: &str,
) -> Result<Option<ResolvedDeployment>> {
    let path = format!("{}/{app}", fetch::oapi_path(namespace, "deploymentconfigs"));
    let Some(config) = fetch::get_yaml_opt::<DeploymentConfig>(client, &path).await? else {
        return Ok(None);
    };

    let (config_uid, version) = validate_config(&config, space, app, namespace)?;

    let api: Api<ReplicationController> = Api::namespaced(client.clone(), namespace);
    let controllers = api
        .list(&ListParams::default())
        .await
        .map_err(|e| Error::Request {
            method: "LIST",
            path: format!("{namespace}/replicationcontrollers"),
            source: e,
        })?;

    let controller = newest_owned_controller(controllers.items, &config_uid);
    tracing::debug!(
        app,
        namespace,
        current = controller
            .as_ref()
            .and_then(|rc| rc.metadata.name.as_deref())
            .unwrap_or("<none>"),
        "resolved deployment"
    );
    if let Some(rc) = &controller {
        if rc.metadata.uid.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Malformed {
                kind: "replication controller",
                name: rc.metadata.name.clone().unwrap_or_default(),
                namespace: namespace.to_string(),
                reason: "missing metadata.uid".to_string(),
            });
        }
    }

    Ok(Some(ResolvedDeployment {
        config_uid,
        version,
        controller,
    }))
}

fn validate_config(
    config: &DeploymentConfig,
    space: &str,
    app: &str,
    namespace: &str,
) -> Result<(String, String)> {
    let malformed = |reason: &str| Error::Malformed {
        kind: "deployment config",
        name: app.to_string(),
        namespace: namespace.to_string(),
        reason: reason.to_string(),
    };

    let uid = config
        .metadata
        .uid
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| malformed("missing metadata.uid"))?;

    let config_space = config
        .metadata
        .labels
        .get(SPACE_LABEL)
        .ok_or_else(|| malformed("missing 'space' label"))?;
    if config_space != space {
        return Err(Error::SpaceMismatch {
            name: app.to_string(),
            space: space.to_string(),
        });
    }

    let version = config
        .metadata
        .annotations
        .get(VERSION_ANNOTATION)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| malformed("missing 'version' annotation"))?;

    Ok((uid.to_string(), version.clone()))
}

/// True when `meta` has an owner reference pointing at `owner_uid` with
/// the owning-controller flag set.
pub fn owned_by(meta: &ObjectMeta, owner_uid: &str) -> bool {
    meta.owner_references
        .iter()
        .flatten()
        .any(|or| or.controller == Some(true) && or.uid == owner_uid)
}

/// Pick the owned controller with the greatest creation timestamp. Ties go
/// to the last one encountered in enumeration order.
pub fn newest_owned_controller(
    controllers: Vec<ReplicationController>,
    owner_uid: &str,
) -> Option<ReplicationController> {
    let mut newest: Option<(DateTime<Utc>, ReplicationController)> = None;
    for rc in controllers {
        if !owned_by(&rc.metadata, owner_uid) {
            continue;
        }
        let created = rc
            .metadata
            .creation_timestamp
            .as_ref()
            .map(|t| t.0)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        match &newest {
            Some((best, _)) if created < *best => {}
            _ => newest = Some((created, rc)),
        }
    }
    newest.map(|(_, rc)| rc)
}
