//! Route matching and scoring
//!
//! Picks the externally reachable URL for a deployment the same way the
//! cluster console does: services matching the controller's pod template
//! labels, routes targeting those services, and a weighted score over the
//! candidates. The weights (admission > alternate backends > custom host >
//! TLS) are console parity and must not be reordered.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Service;
use std::collections::BTreeMap;
use url::Url;

use crate::models::openshift::{Route, RouteIngress, HOST_GENERATED_ANNOTATION};

/// A scoreable (route, service) association. Ephemeral - built per
/// request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub host: String,
    pub path: Option<String>,
    pub tls: bool,
    pub admitted: bool,
    pub has_alternate_backends: bool,
    pub custom_host: bool,
}

impl RouteCandidate {
    /// Weighted importance; each factor contributes independently.
    pub fn score(&self) -> u32 {
        let mut score = 0;
        if self.admitted {
            score += 11;
        }
        if self.has_alternate_backends {
            score += 5;
        }
        if self.custom_host {
            score += 3;
        }
        if self.tls {
            score += 1;
        }
        score
    }

    /// URL for this candidate; `https` exactly when TLS terminates here.
    pub fn url(&self) -> Option<Url> {
        let scheme = if self.tls { "https" } else { "http" };
        let path = match self.path.as_deref() {
            None | Some("") => String::new(),
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) => format!("/{p}"),
        };
        Url::parse(&format!("{scheme}://{}{path}", self.host)).ok()
    }
}

/// A service matches when every key in its selector equals the
/// corresponding pod template label. An empty selector never matches.
pub fn selector_matches(
    selector: Option<&BTreeMap<String, String>>,
    labels: &BTreeMap<String, String>,
) -> bool {
    match selector {
        None => false,
        Some(sel) if sel.is_empty() => false,
        Some(sel) => sel.iter().all(|(k, v)| labels.get(k) == Some(v)),
    }
}

/// Names of services whose selectors match the pod template labels.
pub fn matching_services<'a>(
    services: &'a [Service],
    template_labels: &BTreeMap<String, String>,
) -> Vec<&'a str> {
    services
        .iter()
        .filter(|svc| {
            selector_matches(
                svc.spec.as_ref().and_then(|s| s.selector.as_ref()),
                template_labels,
            )
        })
        .filter_map(|svc| svc.metadata.name.as_deref())
        .collect()
}

/// Associate each route with every matching service and build candidates.
///
/// A route naming one service both directly and as an alternate backend
/// produces the candidate twice; the source system scores it twice and so
/// do we.
pub fn route_candidates(routes: &[Route], service_names: &[&str]) -> Vec<RouteCandidate> {
    let mut candidates = Vec::new();
    for route in routes {
        for backend in route.backend_service_names() {
            if service_names.contains(&backend) {
                if let Some(candidate) = candidate_from_route(route) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

/// Build the candidate for one route, or `None` when the route exposes no
/// hostname anywhere.
pub fn candidate_from_route(route: &Route) -> Option<RouteCandidate> {
    let admitted_host = oldest_admitted_host(route);
    let admitted = admitted_host.is_some();
    let host = admitted_host
        .or_else(|| route.spec.host.clone())
        .filter(|h| !h.is_empty())?;

    let tls = route
        .spec
        .tls
        .as_ref()
        .and_then(|t| t.termination.as_deref())
        .is_some_and(|t| !t.is_empty());

    let custom_host = !route
        .metadata
        .annotations
        .contains_key(HOST_GENERATED_ANNOTATION);

    Some(RouteCandidate {
        host,
        path: route.spec.path.clone().filter(|p| !p.is_empty()),
        tls,
        admitted,
        has_alternate_backends: !route.spec.alternate_backends.is_empty(),
        custom_host,
    })
}

/// Hostname from the oldest ingress entry admitted by a router, by the
/// admission condition's transition time.
fn oldest_admitted_host(route: &Route) -> Option<String> {
    let ingresses = &route.status.as_ref()?.ingress;

    let mut oldest: Option<(DateTime<Utc>, &str)> = None;
    for ingress in ingresses {
        let Some(host) = ingress.host.as_deref().filter(|h| !h.is_empty()) else {
            continue;
        };
        let Some(admitted_at) = admission_time(ingress) else {
            continue;
        };
        match &oldest {
            Some((best, _)) if admitted_at >= *best => {}
            _ => oldest = Some((admitted_at, host)),
        }
    }
    oldest.map(|(_, host)| host.to_string())
}

fn admission_time(ingress: &RouteIngress) -> Option<DateTime<Utc>> {
    ingress
        .conditions
        .iter()
        .find(|c| c.type_ == "Admitted" && c.status == "True")
        .map(|c| c.last_transition_time.unwrap_or(DateTime::<Utc>::MAX_UTC))
}

/// Highest-scoring candidate; ties keep the first encountered.
pub fn best_candidate(candidates: Vec<RouteCandidate>) -> Option<RouteCandidate> {
    let mut best: Option<RouteCandidate> = None;
    for candidate in candidates {
        if best
            .as_ref()
            .is_none_or(|b| candidate.score() > b.score())
        {
            best = Some(candidate);
        }
    }
    best
}

/// Resolve the externally visible URL for a deployment's pod template.
pub fn resolve_application_url(
    services: &[Service],
    routes: &[Route],
    template_labels: &BTreeMap<String, String>,
) -> Option<Url> {
    let names = matching_services(services, template_labels);
    let candidates = route_candidates(routes, &names);
    best_candidate(candidates).and_then(|c| c.url())
}
