//! Kubernetes client module
//!
//! Builds the client used for all cluster calls. Unlike kubeconfig-based
//! tools, this crate is handed an explicit API URL and bearer token by its
//! caller, so the config is assembled by hand and the token is injected
//! into every request by kube's auth layer.

use kube::{Client, Config};
use secrecy::SecretString;
use url::Url;

use crate::error::{Error, Result};

pub mod fetch;

/// Build a client for the given cluster, authenticating every call with
/// the bearer token.
///
/// `user_namespace` becomes the client's default namespace; all lookups in
/// this crate are explicitly namespace-scoped regardless.
pub fn create_client(api_url: &Url, token: &str, user_namespace: &str) -> Result<Client> {
    let uri: http::Uri = api_url
        .as_str()
        .parse()
        .map_err(|e| Error::Config(format!("cluster API URL '{api_url}' is not a URI: {e}")))?;

    let mut config = Config::new(uri);
    config.default_namespace = user_namespace.to_string();
    config.auth_info.token = Some(SecretString::from(token.to_string()));

    Client::try_from(config).map_err(Error::Client)
}
