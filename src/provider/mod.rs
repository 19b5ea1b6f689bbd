//! Base URL and token provider
//!
//! All outbound calls are rooted at URLs derived from a single cluster API
//! URL. The trait exists so tests and alternate deployments can substitute
//! their own derivation without touching the client.

use url::Url;

use crate::error::{Error, Result};

/// Supplies the base URLs and bearer tokens for every outbound call.
pub trait BaseUrlProvider: Send + Sync {
    fn api_url(&self) -> &Url;
    fn api_token(&self) -> &str;
    fn console_url(&self) -> &Url;
    fn metrics_url(&self) -> &Url;
    /// The metrics backend shares the cluster bearer token today, but the
    /// two are issued separately so keep the accessor distinct.
    fn metrics_token(&self) -> &str {
        self.api_token()
    }
    /// Log links are console deep links.
    fn logging_url(&self) -> &Url {
        self.console_url()
    }
}

/// Derives console and metrics URLs from the cluster API URL.
///
/// `https://api.starter-us-east-2.openshift.com` becomes
/// `https://console.starter-us-east-2.openshift.com/console` and
/// `https://metrics.starter-us-east-2.openshift.com` - the hosting
/// convention this provider encodes is a leading `api.` label swapped for
/// the service's own prefix.
pub struct ClusterUrlProvider {
    api: Url,
    token: String,
    console: Url,
    metrics: Url,
}

impl ClusterUrlProvider {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self> {
        let api = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("bad cluster API URL '{api_url}': {e}")))?;
        let host = api
            .host_str()
            .ok_or_else(|| Error::Config(format!("cluster API URL '{api_url}' has no host")))?;

        let base = host.strip_prefix("api.").unwrap_or(host);
        let console = Self::prefixed(base, "console", Some("/console"))?;
        let metrics = Self::prefixed(base, "metrics", None)?;

        Ok(Self {
            api,
            token: token.into(),
            console,
            metrics,
        })
    }

    fn prefixed(base: &str, prefix: &str, path: Option<&str>) -> Result<Url> {
        let url = format!("https://{prefix}.{base}{}", path.unwrap_or(""));
        Url::parse(&url).map_err(|e| Error::Config(format!("derived bad URL '{url}': {e}")))
    }
}

impl BaseUrlProvider for ClusterUrlProvider {
    fn api_url(&self) -> &Url {
        &self.api
    }

    fn api_token(&self) -> &str {
        &self.token
    }

    fn console_url(&self) -> &Url {
        &self.console
    }

    fn metrics_url(&self) -> &Url {
        &self.metrics
    }
}
