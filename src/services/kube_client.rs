//! Cluster client facade
//!
//! `KubeClient` composes the URL provider, resource fetcher, deployment
//! and route resolvers, metrics backend and access evaluator into the
//! space/application/deployment/environment views consumed by the API
//! layer. One instance serves many concurrent callers; the only shared
//! mutable state is the authorization-rule cache.

use chrono::{DateTime, Utc};
use futures::future;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, ReplicationController, ResourceQuota, Service};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::Api;
use std::collections::BTreeMap;
use url::Url;

use crate::auth::{AccessEvaluator, RequiredAction};
use crate::deploy::{self, pods as pod_health, route, ResolvedDeployment};
use crate::environments::{EnvironmentMap, ENVIRONMENTS_CONFIG_MAP};
use crate::error::{Error, Result};
use crate::kube::fetch;
use crate::metrics::{HawkularMetrics, MetricsProvider, Signal};
use crate::models::openshift::{BuildConfig, ResourceList, Route};
use crate::models::parse_quantity;
use crate::models::view::{
    Application, Deployment, DeploymentStatSeries, DeploymentStats, Environment,
    EnvironmentQuota, ResourceUsage, Space,
};
use crate::provider::{BaseUrlProvider, ClusterUrlProvider};

/// Name of the per-namespace compute resource quota.
const COMPUTE_RESOURCES_QUOTA: &str = "compute-resources";
/// Label tying pods to their application.
const APP_LABEL: &str = "app";

/// Everything needed to construct a production client.
pub struct KubeClientConfig {
    /// Cluster API base URL.
    pub cluster_url: String,
    /// Bearer token presented on every outbound call.
    pub token: String,
    /// Namespace holding the caller's build configs and the environments
    /// config map.
    pub user_namespace: String,
}

pub struct KubeClient {
    kube: kube::Client,
    provider: Box<dyn BaseUrlProvider>,
    environments: EnvironmentMap,
    metrics: Box<dyn MetricsProvider>,
    access: AccessEvaluator,
    user_namespace: String,
}

impl KubeClient {
    /// Connect to the cluster and build the environment map.
    ///
    /// Fails outright on a bad URL or a missing/mislabeled environments
    /// config map - a client with a partial environment map is never
    /// produced.
    pub async fn new(config: KubeClientConfig) -> Result<Self> {
        let provider = Box::new(ClusterUrlProvider::new(&config.cluster_url, config.token)?);
        let metrics = Box::new(HawkularMetrics::new(
            provider.metrics_url(),
            provider.metrics_token(),
        )?);
        Self::with_collaborators(provider, metrics, config.user_namespace).await
    }

    /// Constructor-injected collaborators, for alternate providers and
    /// test substitutes.
    pub async fn with_collaborators(
        provider: Box<dyn BaseUrlProvider>,
        metrics: Box<dyn MetricsProvider>,
        user_namespace: String,
    ) -> Result<Self> {
        let kube =
            crate::kube::create_client(provider.api_url(), provider.api_token(), &user_namespace)?;
        let environments = Self::load_environments(&kube, &user_namespace).await?;
        tracing::debug!(
            environments = environments.len(),
            user_namespace,
            "connected to cluster"
        );

        Ok(Self {
            kube,
            provider,
            environments,
            metrics,
            access: AccessEvaluator::new(),
            user_namespace,
        })
    }

    async fn load_environments(client: &kube::Client, user_namespace: &str) -> Result<EnvironmentMap> {
        let api: Api<ConfigMap> = Api::namespaced(client.clone(), user_namespace);
        let cm = api.get(ENVIRONMENTS_CONFIG_MAP).await.map_err(|e| match e {
            kube::Error::Api(ae) if ae.code == 404 => Error::Config(format!(
                "config map '{ENVIRONMENTS_CONFIG_MAP}' not found in namespace '{user_namespace}'"
            )),
            e => Error::Request {
                method: "GET",
                path: format!("{user_namespace}/configmaps/{ENVIRONMENTS_CONFIG_MAP}"),
                source: e,
            },
        })?;
        EnvironmentMap::from_config_map(&cm)
    }

    /// One application view per build config labeled with the space.
    pub async fn get_space(&self, name: &str) -> Result<Space> {
        let path = fetch::oapi_path_selected(
            &self.user_namespace,
            "buildconfigs",
            &format!("{}={name}", deploy::SPACE_LABEL),
        );
        let list: ResourceList<BuildConfig> = fetch::get_yaml(&self.kube, &path).await?;

        let mut app_names = Vec::new();
        for bc in list.items {
            let app = bc.metadata.name.filter(|n| !n.is_empty()).ok_or_else(|| {
                Error::Malformed {
                    kind: "build config",
                    name: String::new(),
                    namespace: self.user_namespace.clone(),
                    reason: "missing metadata.name".to_string(),
                }
            })?;
            app_names.push(app);
        }

        let applications = future::join_all(
            app_names
                .iter()
                .map(|app| self.get_application(name, app)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        Ok(Space {
            name: name.to_string(),
            applications,
        })
    }

    /// One deployment per environment; environments without a deployment
    /// are skipped, not errors. The fan-out is concurrent and no ordering
    /// is guaranteed across environments.
    pub async fn get_application(&self, space: &str, app: &str) -> Result<Application> {
        let envs: Vec<String> = self.environments.names().map(String::from).collect();
        let results = future::join_all(
            envs.iter()
                .map(|env| self.get_deployment(space, app, env)),
        )
        .await;

        let mut deployments = Vec::new();
        for result in results {
            if let Some(deployment) = result? {
                deployments.push(deployment);
            }
        }

        Ok(Application {
            name: app.to_string(),
            deployments,
        })
    }

    /// The current deployment of `app` in `env`, or `None` when the
    /// application has never been deployed there.
    pub async fn get_deployment(
        &self,
        space: &str,
        app: &str,
        env: &str,
    ) -> Result<Option<Deployment>> {
        let namespace = self.environments.namespace(env)?;
        let Some(resolved) = deploy::resolve_deployment(&self.kube, space, app, namespace).await?
        else {
            return Ok(None);
        };
        self.deployment_view(app, env, namespace, resolved)
            .await
            .map(Some)
    }

    async fn deployment_view(
        &self,
        app: &str,
        env: &str,
        namespace: &str,
        resolved: ResolvedDeployment,
    ) -> Result<Deployment> {
        let (pods, pod_total, url, logs_url) = match &resolved.controller {
            Some(rc) => {
                let rc_uid = rc.metadata.uid.as_deref().unwrap_or_default();
                let owned = self.pods_owned_by(namespace, rc_uid).await?;
                let (pods, total) = pod_health::classify_pods(&owned, Utc::now());

                let url = self.application_url(namespace, rc).await?;
                let logs_url = rc.metadata.name.as_deref().map(|rc_name| {
                    format!(
                        "{}/project/{namespace}/browse/rc/{rc_name}?tab=logs",
                        self.provider.logging_url()
                    )
                });
                (pods, total, url, logs_url)
            }
            None => {
                let (pods, total) = pod_health::classify_pods(&[], Utc::now());
                (pods, total, None, None)
            }
        };

        let console_url = format!(
            "{}/project/{namespace}/browse/dc/{app}?tab=history",
            self.provider.console_url()
        );

        Ok(Deployment {
            name: env.to_string(),
            version: resolved.version,
            pods,
            pod_total,
            url: url.map(|u| u.to_string()),
            console_url,
            logs_url,
        })
    }

    async fn application_url(
        &self,
        namespace: &str,
        rc: &ReplicationController,
    ) -> Result<Option<Url>> {
        let template_labels: BTreeMap<String, String> = rc
            .spec
            .as_ref()
            .and_then(|s| s.template.as_ref())
            .and_then(|t| t.metadata.as_ref())
            .and_then(|m| m.labels.clone())
            .unwrap_or_default();

        let services = Api::<Service>::namespaced(self.kube.clone(), namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::Request {
                method: "LIST",
                path: format!("{namespace}/services"),
                source: e,
            })?;

        let routes: ResourceList<Route> =
            fetch::get_yaml(&self.kube, &fetch::oapi_path(namespace, "routes")).await?;

        Ok(route::resolve_application_url(
            &services.items,
            &routes.items,
            &template_labels,
        ))
    }

    /// Set the replica count, returning the previous one.
    pub async fn scale_deployment(
        &self,
        space: &str,
        app: &str,
        env: &str,
        replicas: i32,
    ) -> Result<i32> {
        let namespace = self.environments.namespace(env)?;
        // Confirm space ownership before touching the scale subresource.
        if deploy::resolve_deployment(&self.kube, space, app, namespace)
            .await?
            .is_none()
        {
            return Err(Error::NotDeployed {
                app: app.to_string(),
                env: env.to_string(),
            });
        }

        let path = format!(
            "{}/{app}/scale",
            fetch::oapi_path(namespace, "deploymentconfigs")
        );
        let mut scale: serde_json::Value = fetch::get_yaml(&self.kube, &path).await?;
        if !scale.is_object() {
            return Err(Error::Malformed {
                kind: "scale",
                name: app.to_string(),
                namespace: namespace.to_string(),
                reason: "scale subresource is not an object".to_string(),
            });
        }

        let previous = scale
            .pointer("/spec/replicas")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0) as i32;

        // PUT must echo fields we do not model (resourceVersion and
        // friends), so the document stays untyped and only the replica
        // count is touched.
        scale["spec"]["replicas"] = serde_json::json!(replicas);
        let _echo: serde_json::Value = fetch::put_yaml(&self.kube, &path, &scale).await?;

        Ok(previous)
    }

    /// Latest one-minute usage of the deployment's pods across the four
    /// signals. `None` when the application is not deployed in `env`.
    pub async fn get_deployment_stats(
        &self,
        space: &str,
        app: &str,
        env: &str,
        start: DateTime<Utc>,
    ) -> Result<Option<DeploymentStats>> {
        let namespace = self.environments.namespace(env)?;
        let Some(resolved) = deploy::resolve_deployment(&self.kube, space, app, namespace).await?
        else {
            return Ok(None);
        };
        let uids = self.current_pod_uids(namespace, &resolved).await?;

        let (cores, memory, net_tx, net_rx) = tokio::try_join!(
            self.metrics.latest(Signal::Cpu, namespace, &uids, start),
            self.metrics.latest(Signal::Memory, namespace, &uids, start),
            self.metrics.latest(Signal::NetworkSent, namespace, &uids, start),
            self.metrics.latest(Signal::NetworkReceived, namespace, &uids, start),
        )?;

        Ok(Some(DeploymentStats {
            cores,
            memory,
            net_tx,
            net_rx,
        }))
    }

    /// Bucketed usage series between `start` and `end`, newest `limit`
    /// buckets when a limit is given.
    pub async fn get_deployment_stat_series(
        &self,
        space: &str,
        app: &str,
        env: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Option<DeploymentStatSeries>> {
        let namespace = self.environments.namespace(env)?;
        let Some(resolved) = deploy::resolve_deployment(&self.kube, space, app, namespace).await?
        else {
            return Ok(None);
        };
        let uids = self.current_pod_uids(namespace, &resolved).await?;

        let (cores, memory, net_tx, net_rx) = tokio::try_join!(
            self.metrics
                .range(Signal::Cpu, namespace, &uids, start, end, limit),
            self.metrics
                .range(Signal::Memory, namespace, &uids, start, end, limit),
            self.metrics
                .range(Signal::NetworkSent, namespace, &uids, start, end, limit),
            self.metrics
                .range(Signal::NetworkReceived, namespace, &uids, start, end, limit),
        )?;

        Ok(Some(DeploymentStatSeries {
            start: start.timestamp_millis(),
            end: end.timestamp_millis(),
            cores,
            memory,
            net_tx,
            net_rx,
        }))
    }

    async fn current_pod_uids(
        &self,
        namespace: &str,
        resolved: &ResolvedDeployment,
    ) -> Result<Vec<String>> {
        let Some(rc) = &resolved.controller else {
            return Ok(Vec::new());
        };
        let rc_uid = rc.metadata.uid.as_deref().unwrap_or_default();
        let owned = self.pods_owned_by(namespace, rc_uid).await?;
        Ok(owned
            .into_iter()
            .filter_map(|pod| pod.metadata.uid)
            .collect())
    }

    async fn pods_owned_by(&self, namespace: &str, rc_uid: &str) -> Result<Vec<Pod>> {
        let pods = Api::<Pod>::namespaced(self.kube.clone(), namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::Request {
                method: "LIST",
                path: format!("{namespace}/pods"),
                source: e,
            })?;
        Ok(pods
            .items
            .into_iter()
            .filter(|pod| deploy::owned_by(&pod.metadata, rc_uid))
            .collect())
    }

    /// All known environments with their quota snapshots.
    pub async fn get_environments(&self) -> Result<Vec<Environment>> {
        let names: Vec<String> = self.environments.names().map(String::from).collect();
        future::join_all(names.iter().map(|name| self.get_environment(name)))
            .await
            .into_iter()
            .collect()
    }

    /// One environment with its current compute quota usage.
    pub async fn get_environment(&self, env: &str) -> Result<Environment> {
        let namespace = self.environments.namespace(env)?;
        let quota = Api::<ResourceQuota>::namespaced(self.kube.clone(), namespace)
            .get(COMPUTE_RESOURCES_QUOTA)
            .await
            .map_err(|e| Error::Request {
                method: "GET",
                path: format!("{namespace}/resourcequotas/{COMPUTE_RESOURCES_QUOTA}"),
                source: e,
            })?;

        let status = quota.status.ok_or_else(|| Error::Malformed {
            kind: "resource quota",
            name: COMPUTE_RESOURCES_QUOTA.to_string(),
            namespace: namespace.to_string(),
            reason: "missing status".to_string(),
        })?;
        let hard = status.hard.unwrap_or_default();
        let used = status.used.unwrap_or_default();

        Ok(Environment {
            name: env.to_string(),
            quota: EnvironmentQuota {
                cpucores: ResourceUsage {
                    quota: quota_amount(&hard, &["limits.cpu", "cpu"], namespace)?,
                    used: quota_amount(&used, &["limits.cpu", "cpu"], namespace)?,
                    units: "cores",
                },
                memory: ResourceUsage {
                    quota: quota_amount(&hard, &["limits.memory", "memory"], namespace)?,
                    used: quota_amount(&used, &["limits.memory", "memory"], namespace)?,
                    units: "bytes",
                },
            },
        })
    }

    /// Pods of one application in a namespace, by the `app` label.
    pub async fn get_pods_in_namespace(&self, namespace: &str, app: &str) -> Result<Vec<Pod>> {
        let pods = Api::<Pod>::namespaced(self.kube.clone(), namespace)
            .list(&ListParams::default().labels(&format!("{APP_LABEL}={app}")))
            .await
            .map_err(|e| Error::Request {
                method: "LIST",
                path: format!("{namespace}/pods"),
                source: e,
            })?;
        Ok(pods.items)
    }

    /// Evaluate an arbitrary requirement list against `env`.
    pub async fn can_perform(&self, env: &str, required: &[RequiredAction]) -> Result<bool> {
        let namespace = self.environments.namespace(env)?;
        self.access.can_perform(&self.kube, namespace, required).await
    }

    pub async fn can_get_deployment(&self, env: &str) -> Result<bool> {
        self.can_perform(env, actions::GET_DEPLOYMENT).await
    }

    pub async fn can_scale_deployment(&self, env: &str) -> Result<bool> {
        self.can_perform(env, actions::SCALE_DEPLOYMENT).await
    }

    pub async fn can_delete_deployment(&self, env: &str) -> Result<bool> {
        self.can_perform(env, actions::DELETE_DEPLOYMENT).await
    }

    /// Release the metrics backend handle. Per-call cluster responses are
    /// already closed on every exit path; consuming the client here is
    /// the explicit release point for the long-lived handle.
    pub fn close(self) {
        drop(self.metrics);
    }
}

/// Requirement sets matching what each facade operation touches.
mod actions {
    use crate::auth::RequiredAction;

    pub const GET_DEPLOYMENT: &[RequiredAction] = &[
        RequiredAction {
            group: "",
            resource: "deploymentconfigs",
            verbs: &["get"],
        },
        RequiredAction {
            group: "",
            resource: "replicationcontrollers",
            verbs: &["get", "list"],
        },
        RequiredAction {
            group: "",
            resource: "pods",
            verbs: &["get", "list"],
        },
        RequiredAction {
            group: "",
            resource: "services",
            verbs: &["get", "list"],
        },
        RequiredAction {
            group: "",
            resource: "routes",
            verbs: &["get", "list"],
        },
    ];

    pub const SCALE_DEPLOYMENT: &[RequiredAction] = &[RequiredAction {
        group: "",
        resource: "deploymentconfigs",
        verbs: &["get", "update"],
    }];

    pub const DELETE_DEPLOYMENT: &[RequiredAction] = &[
        RequiredAction {
            group: "",
            resource: "deploymentconfigs",
            verbs: &["delete"],
        },
        RequiredAction {
            group: "",
            resource: "replicationcontrollers",
            verbs: &["delete"],
        },
        RequiredAction {
            group: "",
            resource: "services",
            verbs: &["delete"],
        },
        RequiredAction {
            group: "",
            resource: "routes",
            verbs: &["delete"],
        },
    ];
}

fn quota_amount(
    map: &BTreeMap<String, Quantity>,
    keys: &[&str],
    namespace: &str,
) -> Result<f64> {
    for key in keys {
        if let Some(quantity) = map.get(*key) {
            return parse_quantity(&quantity.0).map_err(|e| Error::Malformed {
                kind: "resource quota",
                name: COMPUTE_RESOURCES_QUOTA.to_string(),
                namespace: namespace.to_string(),
                reason: e.to_string(),
            });
        }
    }
    Err(Error::Malformed {
        kind: "resource quota",
        name: COMPUTE_RESOURCES_QUOTA.to_string(),
        namespace: namespace.to_string(),
        reason: format!("missing '{}' entry", keys[0]),
    })
}
