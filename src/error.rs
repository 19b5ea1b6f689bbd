//! Error taxonomy for cluster-facing operations
//!
//! Absence is not an error: operations that tolerate a missing resource
//! return `Ok(None)`, and authorization denial is `Ok(false)`. Everything
//! here is propagated to the caller, which owns the mapping to
//! transport-level responses.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad cluster URL, bad environments config map, or similar setup
    /// problems detected during client construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An environment name with no entry in the environments map.
    /// Never silently defaulted.
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    /// The cluster returned a resource missing a field we require
    /// (UID, label, annotation). Indicates an incompatible cluster.
    #[error("{kind} '{name}' in namespace '{namespace}' is malformed: {reason}")]
    Malformed {
        kind: &'static str,
        name: String,
        namespace: String,
        reason: String,
    },

    /// A deployment config labeled with a different space than the one
    /// requested. Hard error: serving it would leak cross-space data.
    #[error("deployment config '{name}' does not belong to space '{space}'")]
    SpaceMismatch { name: String, space: String },

    /// A mutation aimed at an application with no deployment in the
    /// environment. Read paths report this as `Ok(None)` instead.
    #[error("application '{app}' has no deployment in environment '{env}'")]
    NotDeployed { app: String, env: String },

    /// Non-2xx status or network failure talking to the cluster API.
    #[error("{method} {path} failed")]
    Request {
        method: &'static str,
        path: String,
        #[source]
        source: kube::Error,
    },

    /// 2xx response whose body did not decode into the expected shape.
    #[error("failed to decode response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failure talking to the metrics backend.
    #[error("metrics query for '{descriptor}' failed")]
    Metrics {
        descriptor: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The metrics backend answered with something other than buckets.
    #[error("unexpected metrics response: {0}")]
    MetricsResponse(String),

    /// Client construction failures from kube itself.
    #[error("failed to build Kubernetes client")]
    Client(#[source] kube::Error),
}
