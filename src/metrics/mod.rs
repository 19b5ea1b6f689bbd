//! Metrics backend access
//!
//! Windowed resource-usage queries for the pods of a deployment. The
//! capability trait is constructor-injected into the facade so tests can
//! substitute their own backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Sample;

pub mod hawkular;

pub use hawkular::HawkularMetrics;

/// Width of one aggregation bucket in milliseconds.
pub const BUCKET_DURATION_MS: i64 = 60_000;

/// One of the four usage signals collected per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Cpu,
    Memory,
    NetworkSent,
    NetworkReceived,
}

impl Signal {
    /// Descriptor tag the backend indexes this signal under.
    pub fn descriptor(self) -> &'static str {
        match self {
            Signal::Cpu => "cpu/usage_rate",
            Signal::Memory => "memory/usage",
            Signal::NetworkSent => "network/tx_rate",
            Signal::NetworkReceived => "network/rx_rate",
        }
    }

    /// Raw CPU buckets are millicores and are reported in cores; memory
    /// and network values pass through unscaled.
    pub fn scale(self) -> f64 {
        match self {
            Signal::Cpu => 0.001,
            _ => 1.0,
        }
    }
}

/// Capability interface over the metrics backend.
///
/// Both operations short-circuit to an empty result when `pod_uids` is
/// empty - no network call is made for a deployment with no pods.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Average over the single one-minute bucket anchored at `start`.
    async fn latest(
        &self,
        signal: Signal,
        namespace: &str,
        pod_uids: &[String],
        start: DateTime<Utc>,
    ) -> Result<Option<Sample>>;

    /// Bucketed series between `start` and `end`. Never returns more than
    /// `limit` samples; the kept samples are the newest ones.
    async fn range(
        &self,
        signal: Signal,
        namespace: &str,
        pod_uids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Sample>>;
}
