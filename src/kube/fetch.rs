//! Resource fetching utilities
//!
//! Generic GET/PUT/POST against the OpenShift REST API for the resource
//! kinds that have no typed client. The wire format for these endpoints is
//! YAML; core Kubernetes resources go through typed `Api` handles and JSON
//! instead. Non-2xx statuses surface as transport errors carrying the
//! request path, except a 404 on the `*_opt` variants, which the caller
//! has opted to treat as "no resource".

use http::{header, Method, Request};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

const YAML_MIME: &str = "application/yaml";

/// Path of a namespaced OpenShift (non-core) resource collection.
pub fn oapi_path(namespace: &str, plural: &str) -> String {
    format!("/oapi/v1/namespaces/{namespace}/{plural}")
}

/// Collection path filtered by a label selector.
pub fn oapi_path_selected(namespace: &str, plural: &str, selector: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("labelSelector", selector)
        .finish();
    format!("{}?{query}", oapi_path(namespace, plural))
}

/// GET a resource that must exist. 404 is a transport error.
pub async fn get_yaml<T: DeserializeOwned>(client: &Client, path: &str) -> Result<T> {
    match request(client, Method::GET, path, None).await {
        Ok(body) => decode(path, &body),
        Err(e) => Err(wrap("GET", path, e)),
    }
}

/// GET a resource that may be absent. 404 becomes `Ok(None)`.
pub async fn get_yaml_opt<T: DeserializeOwned>(client: &Client, path: &str) -> Result<Option<T>> {
    match request(client, Method::GET, path, None).await {
        Ok(body) => decode(path, &body).map(Some),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
        Err(e) => Err(wrap("GET", path, e)),
    }
}

/// PUT a full resource document back, returning the server's echo.
pub async fn put_yaml<T, B>(client: &Client, path: &str, body: &B) -> Result<T>
where
    T: DeserializeOwned,
    B: Serialize,
{
    let payload = encode(path, body)?;
    match request(client, Method::PUT, path, Some(payload)).await {
        Ok(body) => decode(path, &body),
        Err(e) => Err(wrap("PUT", path, e)),
    }
}

/// POST a document, returning the server's response.
pub async fn post_yaml<T, B>(client: &Client, path: &str, body: &B) -> Result<T>
where
    T: DeserializeOwned,
    B: Serialize,
{
    let payload = encode(path, body)?;
    match request(client, Method::POST, path, Some(payload)).await {
        Ok(body) => decode(path, &body),
        Err(e) => Err(wrap("POST", path, e)),
    }
}

async fn request(
    client: &Client,
    method: Method,
    path: &str,
    body: Option<String>,
) -> std::result::Result<String, kube::Error> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::ACCEPT, YAML_MIME);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, YAML_MIME);
    }
    let req = builder
        .body(body.map(String::into_bytes).unwrap_or_default())
        .map_err(kube::Error::HttpError)?;

    client.request_text(req).await
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_yaml::from_str(body).map_err(|e| Error::Decode {
        path: path.to_string(),
        source: e,
    })
}

fn encode<B: Serialize>(path: &str, body: &B) -> Result<String> {
    serde_yaml::to_string(body).map_err(|e| Error::Decode {
        path: path.to_string(),
        source: e,
    })
}

fn wrap(method: &'static str, path: &str, source: kube::Error) -> Error {
    Error::Request {
        method,
        path: path.to_string(),
        source,
    }
}
