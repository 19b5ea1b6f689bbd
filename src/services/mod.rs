//! Service layer
//!
//! `KubeClient` is the facade the API layer consumes. It composes the
//! resolvers, metrics backend and access evaluator behind the public
//! query and scale operations.

pub mod kube_client;

pub use kube_client::{KubeClient, KubeClientConfig};
