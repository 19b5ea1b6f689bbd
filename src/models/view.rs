//! Views returned to the API layer
//!
//! Plain serializable data. Nothing here holds a client handle or any
//! cluster state; every struct is rebuilt per request.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Space {
    pub name: String,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Application {
    pub name: String,
    pub deployments: Vec<Deployment>,
}

/// One application's deployment in one environment.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    /// Environment name ("run", "stage", ...).
    pub name: String,
    /// Application version recorded on the deployment config.
    pub version: String,
    pub pods: Vec<PodStatusCount>,
    pub pod_total: u32,
    /// Externally reachable URL, when a route matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Console deep link to the deployment config's history tab.
    pub console_url: String,
    /// Console deep link to the current controller's logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodStatusCount {
    pub status: String,
    pub count: u32,
}

/// One (timestamp, value) metrics sample. Time is epoch milliseconds of
/// the bucket start, the convention the cluster console renders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentStats {
    pub cores: Option<Sample>,
    pub memory: Option<Sample>,
    pub net_tx: Option<Sample>,
    pub net_rx: Option<Sample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentStatSeries {
    pub start: i64,
    pub end: i64,
    pub cores: Vec<Sample>,
    pub memory: Vec<Sample>,
    pub net_tx: Vec<Sample>,
    pub net_rx: Vec<Sample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub name: String,
    pub quota: EnvironmentQuota,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentQuota {
    pub cpucores: ResourceUsage,
    pub memory: ResourceUsage,
}

/// Hard limit and current usage for one quota'd resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    pub quota: f64,
    pub used: f64,
    pub units: &'static str,
}
