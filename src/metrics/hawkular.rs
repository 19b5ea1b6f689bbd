//! Hawkular-style bucketed metrics queries
//!
//! The backend aggregates tag-filtered gauge series into fixed-duration
//! buckets, summed ("stacked") across the requested pods. The tenant is
//! always the pod namespace.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use url::Url;

use super::{MetricsProvider, Signal, BUCKET_DURATION_MS};
use crate::error::{Error, Result};
use crate::models::Sample;

const QUERY_PATH: &str = "hawkular/metrics/gauges/stats/query";
const TENANT_HEADER: &str = "Hawkular-Tenant";

/// Client for the cluster's Hawkular metrics endpoint.
///
/// Holds a pooled HTTP handle for the backend; dropping the client (via
/// the facade's `close`) releases it.
pub struct HawkularMetrics {
    http: reqwest::Client,
    base: Url,
    token: String,
}

/// One aggregated bucket as returned by the stats query.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Bucket {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub empty: bool,
}

impl HawkularMetrics {
    pub fn new(base: &Url, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build metrics HTTP client: {e}")))?;
        Ok(Self {
            http,
            base: base.clone(),
            token: token.to_string(),
        })
    }

    async fn query_buckets(
        &self,
        signal: Signal,
        namespace: &str,
        pod_uids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bucket>> {
        let url = self
            .base
            .join(QUERY_PATH)
            .map_err(|e| Error::Config(format!("bad metrics URL: {e}")))?;

        let tags = format!(
            "descriptor_name:{},type:pod,pod_id:{}",
            signal.descriptor(),
            pod_uids.join("|")
        );
        let body = serde_json::json!({
            "tags": tags,
            "start": start.timestamp_millis(),
            "end": end.timestamp_millis(),
            "bucketDuration": format!("{BUCKET_DURATION_MS}ms"),
            "stacked": true,
        });

        let wrap = |source| Error::Metrics {
            descriptor: signal.descriptor(),
            source,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(TENANT_HEADER, namespace)
            .json(&body)
            .send()
            .await
            .map_err(wrap)?
            .error_for_status()
            .map_err(wrap)?;

        let mut buckets: Vec<Bucket> = response
            .json()
            .await
            .map_err(|e| Error::MetricsResponse(format!("{}: {e}", signal.descriptor())))?;

        buckets.sort_by_key(|b| b.start);
        Ok(buckets)
    }
}

#[async_trait]
impl MetricsProvider for HawkularMetrics {
    async fn latest(
        &self,
        signal: Signal,
        namespace: &str,
        pod_uids: &[String],
        start: DateTime<Utc>,
    ) -> Result<Option<Sample>> {
        if pod_uids.is_empty() {
            return Ok(None);
        }

        let end = start + Duration::milliseconds(BUCKET_DURATION_MS);
        let buckets = self
            .query_buckets(signal, namespace, pod_uids, start, end)
            .await?;

        Ok(buckets
            .into_iter()
            .filter(|b| !b.empty)
            .next_back()
            .map(|b| sample(&b, signal)))
    }

    async fn range(
        &self,
        signal: Signal,
        namespace: &str,
        pod_uids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Sample>> {
        if pod_uids.is_empty() {
            return Ok(Vec::new());
        }

        let buckets = self
            .query_buckets(signal, namespace, pod_uids, start, end)
            .await?;

        Ok(trim_buckets(buckets, end.timestamp_millis(), limit)
            .iter()
            .map(|b| sample(b, signal))
            .collect())
    }
}

fn sample(bucket: &Bucket, signal: Signal) -> Sample {
    Sample {
        time: bucket.start,
        value: bucket.avg * signal.scale(),
    }
}

/// Trim a sorted bucket sequence to the requested window and length.
///
/// A trailing bucket reaching past `end` is dropped - it would average a
/// partial window and skew the newest point. When `limit` is given only
/// the newest `limit` buckets survive, as a contiguous suffix.
pub(crate) fn trim_buckets(mut buckets: Vec<Bucket>, end: i64, limit: Option<usize>) -> Vec<Bucket> {
    if buckets.last().is_some_and(|b| b.end > end) {
        buckets.pop();
    }

    buckets.retain(|b| !b.empty);

    if let Some(limit) = limit {
        if buckets.len() > limit {
            buckets.drain(..buckets.len() - limit);
        }
    }
    buckets
}
