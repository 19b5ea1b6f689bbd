//! Pod health classification
//!
//! Buckets pods into the status categories the cluster console renders.
//! The heuristics mirror the console's own warning logic and are a pure
//! function over pod data; `now` is passed in so the time thresholds are
//! testable.

use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

use crate::models::view::PodStatusCount;
use std::collections::BTreeMap;

pub const STATUS_RUNNING: &str = "Running";
pub const STATUS_NOT_READY: &str = "Not Ready";
pub const STATUS_WARNING: &str = "Warning";
pub const STATUS_ERROR: &str = "Error";
pub const STATUS_PULLING: &str = "Pulling";
pub const STATUS_TERMINATING: &str = "Terminating";

const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";
const IMAGE_PULL_REASON: &str = "ContainerCreating";

/// Grace period before a pending or not-ready pod counts as a warning.
fn warning_threshold() -> Duration {
    Duration::minutes(5)
}

/// Tally pods per status category.
///
/// Failed pods are excluded from the tally and the total. An empty tally
/// gets a zero-count Running entry so consumers always have a category to
/// render.
pub fn classify_pods(pods: &[Pod], now: DateTime<Utc>) -> (Vec<PodStatusCount>, u32) {
    let mut tally: BTreeMap<String, u32> = BTreeMap::new();
    let mut total = 0u32;

    for pod in pods {
        let Some(status) = pod_status(pod, now) else {
            continue;
        };
        *tally.entry(status).or_default() += 1;
        total += 1;
    }

    if tally.is_empty() {
        tally.insert(STATUS_RUNNING.to_string(), 0);
    }

    let tally = tally
        .into_iter()
        .map(|(status, count)| PodStatusCount { status, count })
        .collect();
    (tally, total)
}

/// Status category for one pod, or `None` for Failed pods.
pub fn pod_status(pod: &Pod, now: DateTime<Utc>) -> Option<String> {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown");
    if phase == "Failed" {
        return None;
    }

    if pod.metadata.deletion_timestamp.is_some() {
        return Some(STATUS_TERMINATING.to_string());
    }

    if let Some(status) = container_failure(pod) {
        return Some(status.to_string());
    }

    if phase == "Unknown"
        || (phase == "Pending" && pending_too_long(pod, now))
        || (phase == "Running" && not_ready_too_long(pod, now))
    {
        return Some(STATUS_WARNING.to_string());
    }

    if phase == "Pending" && waiting_on_image(pod) {
        return Some(STATUS_PULLING.to_string());
    }

    if phase == "Running" && !all_containers_ready(pod) {
        return Some(STATUS_NOT_READY.to_string());
    }

    Some(phase.to_string())
}

fn container_statuses(pod: &Pod) -> impl Iterator<Item = &ContainerStatus> {
    pod.status
        .iter()
        .flat_map(|s| s.container_statuses.iter().flatten())
}

/// Error for crash-looping or failed containers; downgraded to Warning
/// when the pod is itself on the way out.
fn container_failure(pod: &Pod) -> Option<&'static str> {
    let mut failed = false;
    for cs in container_statuses(pod) {
        let waiting_reason = cs
            .state
            .as_ref()
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_deref());
        if waiting_reason == Some(CRASH_LOOP_REASON) {
            failed = true;
        }

        let exit_code = cs
            .state
            .as_ref()
            .and_then(|s| s.terminated.as_ref())
            .map(|t| t.exit_code);
        if matches!(exit_code, Some(code) if code != 0) {
            failed = true;
        }
    }

    if !failed {
        None
    } else if pod.metadata.deletion_timestamp.is_some() {
        Some(STATUS_WARNING)
    } else {
        Some(STATUS_ERROR)
    }
}

fn pending_too_long(pod: &Pod, now: DateTime<Utc>) -> bool {
    pod.metadata
        .creation_timestamp
        .as_ref()
        .is_some_and(|t| now - t.0 > warning_threshold())
}

fn not_ready_too_long(pod: &Pod, now: DateTime<Utc>) -> bool {
    container_statuses(pod).any(|cs| {
        if cs.ready {
            return false;
        }
        cs.state
            .as_ref()
            .and_then(|s| s.running.as_ref())
            .and_then(|r| r.started_at.as_ref())
            .is_some_and(|t| now - t.0 > warning_threshold())
    })
}

fn waiting_on_image(pod: &Pod) -> bool {
    container_statuses(pod).any(|cs| {
        cs.state
            .as_ref()
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_deref())
            == Some(IMAGE_PULL_REASON)
    })
}

fn all_containers_ready(pod: &Pod) -> bool {
    container_statuses(pod).all(|cs| cs.ready)
}
