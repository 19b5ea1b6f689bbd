//! Access control evaluation
//!
//! Answers "can the current caller perform these verbs on these
//! resources" from a per-namespace rules review. Parsed rule sets are
//! cached for the lifetime of the client; a new client must be created to
//! observe permission changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::kube::fetch;
use crate::models::openshift::{PolicyRule, SubjectRulesReview};

const WILDCARD: &str = "*";

/// One authorization requirement: every verb on every resource must be
/// granted for the requirement to hold.
#[derive(Debug, Clone)]
pub struct RequiredAction {
    pub group: &'static str,
    pub resource: &'static str,
    pub verbs: &'static [&'static str],
}

/// (API group, resource type) -> permitted verbs.
pub type RuleMap = HashMap<(String, String), HashSet<String>>;

/// Per-namespace rules cache. Safe for concurrent use; the first writer
/// wins on a miss and later callers reuse the cached set.
#[derive(Default)]
pub struct AccessEvaluator {
    cache: RwLock<HashMap<String, Arc<RuleMap>>>,
}

impl AccessEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only if every requirement is fully granted in `namespace`.
    pub async fn can_perform(
        &self,
        client: &kube::Client,
        namespace: &str,
        required: &[RequiredAction],
    ) -> Result<bool> {
        let rules = self.rules_for(client, namespace).await?;
        Ok(required.iter().all(|action| satisfies(&rules, action)))
    }

    async fn rules_for(&self, client: &kube::Client, namespace: &str) -> Result<Arc<RuleMap>> {
        if let Some(rules) = self.cache.read().await.get(namespace) {
            return Ok(rules.clone());
        }

        let path = fetch::oapi_path(namespace, "selfsubjectrulesreviews");
        let body = serde_json::json!({
            "kind": "SelfSubjectRulesReview",
            "apiVersion": "v1",
        });
        let review: SubjectRulesReview = fetch::post_yaml(client, &path, &body).await?;

        let rules = Arc::new(build_rule_map(
            review
                .status
                .map(|s| s.rules)
                .unwrap_or_default()
                .as_slice(),
            namespace,
        ));

        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(namespace.to_string())
            .or_insert_with(|| rules.clone());
        Ok(entry.clone())
    }
}

/// Index the review's rules by (group, resource).
///
/// Rules scoped to specific resource names or non-resource URLs are
/// narrower or broader than anything this crate asks about and are
/// skipped; ignoring them can only under-grant. Malformed rules are
/// logged and skipped rather than failing the whole evaluation.
pub fn build_rule_map(rules: &[PolicyRule], namespace: &str) -> RuleMap {
    let mut map = RuleMap::new();
    for rule in rules {
        if !rule.resource_names.is_empty() || !rule.non_resource_urls.is_empty() {
            continue;
        }
        if rule.verbs.is_empty() || rule.resources.is_empty() {
            tracing::warn!(
                namespace,
                ?rule,
                "skipping malformed rule without verbs or resources"
            );
            continue;
        }

        // An absent group list means the core API group.
        let core_group = [String::new()];
        let groups: &[String] = if rule.api_groups.is_empty() {
            &core_group
        } else {
            &rule.api_groups
        };
        for group in groups {
            for resource in &rule.resources {
                map.entry((group.clone(), resource.clone()))
                    .or_default()
                    .extend(rule.verbs.iter().cloned());
            }
        }
    }
    map
}

fn satisfies(rules: &RuleMap, action: &RequiredAction) -> bool {
    action
        .verbs
        .iter()
        .all(|verb| verb_granted(rules, action.group, action.resource, verb))
}

/// Wildcard entries are honored on lookup: a `*` grant is one the cluster
/// itself expressed, so matching it never widens beyond cluster truth.
fn verb_granted(rules: &RuleMap, group: &str, resource: &str, verb: &str) -> bool {
    [
        (group, resource),
        (group, WILDCARD),
        (WILDCARD, resource),
        (WILDCARD, WILDCARD),
    ]
    .iter()
    .any(|(g, r)| {
        rules
            .get(&(g.to_string(), r.to_string()))
            .is_some_and(|verbs| verbs.contains(verb) || verbs.contains(WILDCARD))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
        PolicyRule {
            api_groups: groups.iter().map(|s| s.to_string()).collect(),
            resources: resources.iter().map(|s| s.to_string()).collect(),
            verbs: verbs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn requirement_needs_every_verb() {
        let rules = build_rule_map(&[rule(&[""], &["pods"], &["get", "list"])], "ns");
        let action = RequiredAction {
            group: "",
            resource: "pods",
            verbs: &["get", "list"],
        };
        assert!(satisfies(&rules, &action));

        let action = RequiredAction {
            group: "",
            resource: "pods",
            verbs: &["get", "delete"],
        };
        assert!(!satisfies(&rules, &action));
    }

    #[test]
    fn name_scoped_rules_never_grant() {
        let mut scoped = rule(&[""], &["pods"], &["get"]);
        scoped.resource_names = vec!["one-pod".to_string()];
        let rules = build_rule_map(&[scoped], "ns");
        assert!(rules.is_empty());
    }

    #[test]
    fn non_resource_url_rules_never_grant() {
        let mut scoped = rule(&[""], &["pods"], &["get"]);
        scoped.non_resource_urls = vec!["/healthz".to_string()];
        let rules = build_rule_map(&[scoped], "ns");
        assert!(rules.is_empty());
    }

    #[test]
    fn malformed_rules_are_skipped_not_fatal() {
        let rules = build_rule_map(
            &[rule(&[""], &["pods"], &[]), rule(&[""], &["services"], &["get"])],
            "ns",
        );
        assert_eq!(rules.len(), 1);
        assert!(verb_granted(&rules, "", "services", "get"));
    }

    #[test]
    fn wildcards_grant_on_lookup() {
        let rules = build_rule_map(&[rule(&["*"], &["*"], &["*"])], "ns");
        assert!(verb_granted(&rules, "", "deploymentconfigs", "update"));

        let rules = build_rule_map(&[rule(&[""], &["pods"], &["*"])], "ns");
        assert!(verb_granted(&rules, "", "pods", "delete"));
        assert!(!verb_granted(&rules, "", "services", "get"));
    }

    #[test]
    fn empty_group_list_means_core_group() {
        let rules = build_rule_map(&[rule(&[], &["pods"], &["get"])], "ns");
        assert!(verb_granted(&rules, "", "pods", "get"));
    }
}
