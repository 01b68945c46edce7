mod cache;
mod client;
mod envelope;
mod http;

pub use cache::TtlCache;
pub use client::{ApiClient, Catalog, ExchangeRate, GeneralLedgerFilter, MovementStatus};
pub use envelope::{decode_envelope, error_message};
pub use http::HttpTransport;

use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A request relative to the backend base URL (`path` starts with `/api/`)
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self> {
        Self::with_body(Method::Post, path.into(), body)
    }

    pub fn put<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self> {
        Self::with_body(Method::Put, path.into(), body)
    }

    fn with_body<B: Serialize>(method: Method, path: String, body: &B) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(|e| crate::error::LedgerError::Decode {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self {
            method,
            path,
            body: Some(body),
        })
    }
}

/// Status line and body, before any envelope handling
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The authenticated fetch the host provides.
///
/// Implementations inject credentials and report non-2xx statuses as a
/// normal [`RawResponse`]; only failures to talk to the server at all are
/// errors.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        (**self).send(request)
    }
}

/// Percent-encode a path segment or query value
pub fn encode_component(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Append `key=value` pairs, skipping `None`s
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, encode_component(v))))
        .collect();
    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, pairs.join("&"))
    }
}
