//! Typed shapes for OpenShift-specific resources
//!
//! DeploymentConfig, Route and friends have no typed client, so they are
//! decoded from the wire into these structs. Only the fields this crate
//! reads are modeled; required-field validation happens in the resolvers
//! so a missing UID or label surfaces as a malformed-response error
//! instead of a silent default.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Annotation set by the router when it generated the route's hostname.
pub const HOST_GENERATED_ANNOTATION: &str = "openshift.io/host.generated";

/// Generic list envelope shared by all OpenShift list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: RouteSpec,
    pub status: Option<RouteStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub host: Option<String>,
    pub path: Option<String>,
    pub to: Option<RouteTarget>,
    #[serde(default)]
    pub alternate_backends: Vec<RouteTarget>,
    pub tls: Option<RouteTls>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteTarget {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteTls {
    pub termination: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteStatus {
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteIngress {
    pub host: Option<String>,
    #[serde(default)]
    pub conditions: Vec<RouteIngressCondition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngressCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub last_transition_time: Option<DateTime<Utc>>,
}

/// Response of the per-namespace self-subject rules review.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRulesReview {
    pub status: Option<SubjectRulesReviewStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectRulesReviewStatus {
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default)]
    pub api_groups: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub resource_names: Vec<String>,
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: Vec<String>,
}

impl Route {
    /// Names of every service this route can send traffic to: the primary
    /// `spec.to` target plus any alternate backends, in that order.
    pub fn backend_service_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(name) = self.spec.to.as_ref().and_then(|t| t.name.as_deref()) {
            names.push(name);
        }
        for backend in &self.spec.alternate_backends {
            if let Some(name) = backend.name.as_deref() {
                names.push(name);
            }
        }
        names
    }
}
