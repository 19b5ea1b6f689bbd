//! Data model: wire shapes and consumer-facing views
//!
//! Structure:
//! - `openshift.rs` - typed shapes for OpenShift-specific resources
//! - `quantity.rs` - Kubernetes quantity string parsing
//! - `view.rs` - plain serializable views returned to the API layer

pub mod openshift;
pub mod quantity;
pub mod view;

pub use quantity::parse_quantity;
pub use view::{
    Application, Deployment, DeploymentStatSeries, DeploymentStats, Environment,
    EnvironmentQuota, PodStatusCount, ResourceUsage, Sample, Space,
};
