//! Environment-to-namespace mapping
//!
//! Environments ("run", "stage", ...) map 1:1 to cluster namespaces. The
//! mapping lives in a provider-managed config map in the caller's user
//! namespace and is read once at client construction; it is the only
//! source of truth for name-to-namespace translation afterwards.

use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Name of the config map holding the environment definitions.
pub const ENVIRONMENTS_CONFIG_MAP: &str = "fabric8-environments";
/// Label the config map must carry to be trusted.
pub const PROVIDER_LABEL: &str = "provider";
pub const PROVIDER_LABEL_VALUE: &str = "fabric8";

/// Immutable environment name -> namespace map.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    map: BTreeMap<String, String>,
}

impl EnvironmentMap {
    /// Build the map from the environments config map.
    ///
    /// Fails on a missing/mismatched provider label, absent data, or any
    /// entry without a `namespace:` line. A failure here fails client
    /// construction outright; a partial map is never produced.
    pub fn from_config_map(cm: &ConfigMap) -> Result<Self> {
        let name = cm.metadata.name.as_deref().unwrap_or(ENVIRONMENTS_CONFIG_MAP);

        let provider = cm
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(PROVIDER_LABEL))
            .map(String::as_str);
        if provider != Some(PROVIDER_LABEL_VALUE) {
            return Err(Error::Config(format!(
                "config map '{name}' is missing the {PROVIDER_LABEL}={PROVIDER_LABEL_VALUE} label"
            )));
        }

        let data = cm.data.as_ref().filter(|d| !d.is_empty()).ok_or_else(|| {
            Error::Config(format!("config map '{name}' defines no environments"))
        })?;

        let mut map = BTreeMap::new();
        for (env, value) in data {
            let namespace = namespace_line(value).ok_or_else(|| {
                Error::Config(format!(
                    "environment '{env}' in config map '{name}' has no namespace line"
                ))
            })?;
            map.insert(env.clone(), namespace);
        }

        Ok(Self { map })
    }

    /// Resolve an environment name. Unknown names are a hard error, never
    /// a silent default.
    pub fn namespace(&self, env: &str) -> Result<&str> {
        self.map
            .get(env)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownEnvironment(env.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Each config map value is a small YAML-ish document; the namespace is
/// the only line this crate reads.
fn namespace_line(value: &str) -> Option<String> {
    value
        .lines()
        .find_map(|line| line.trim().strip_prefix("namespace:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config_map(labels: &[(&str, &str)], data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(ENVIRONMENTS_CONFIG_MAP.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn parses_environment_entries() {
        let cm = config_map(
            &[("provider", "fabric8")],
            &[
                ("run", "name: Run\nnamespace: foo-run\norder: 1"),
                ("stage", "namespace: foo-stage"),
            ],
        );
        let envs = EnvironmentMap::from_config_map(&cm).unwrap();
        assert_eq!(envs.namespace("run").unwrap(), "foo-run");
        assert_eq!(envs.namespace("stage").unwrap(), "foo-stage");
        assert_eq!(envs.len(), 2);
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let cm = config_map(&[("provider", "fabric8")], &[("run", "namespace: foo-run")]);
        let envs = EnvironmentMap::from_config_map(&cm).unwrap();
        assert!(matches!(
            envs.namespace("production"),
            Err(Error::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn missing_provider_label_fails_construction() {
        let cm = config_map(&[("provider", "other")], &[("run", "namespace: foo-run")]);
        assert!(matches!(
            EnvironmentMap::from_config_map(&cm),
            Err(Error::Config(_))
        ));

        let cm = config_map(&[], &[("run", "namespace: foo-run")]);
        assert!(matches!(
            EnvironmentMap::from_config_map(&cm),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn entry_without_namespace_line_fails() {
        let cm = config_map(&[("provider", "fabric8")], &[("run", "name: Run")]);
        assert!(EnvironmentMap::from_config_map(&cm).is_err());

        // a namespace key with an empty value is just as malformed
        let cm = config_map(&[("provider", "fabric8")], &[("run", "namespace:")]);
        assert!(EnvironmentMap::from_config_map(&cm).is_err());
    }
}
