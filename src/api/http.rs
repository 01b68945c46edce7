use std::time::Duration;

use tracing::{debug, warn};
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use super::{ApiRequest, Method, RawResponse, Transport};
use crate::config::ServerSettings;
use crate::error::{LedgerError, Result};

/// [`Transport`] over HTTP with token authentication
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    authorization: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &ServerSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        let authorization = settings
            .credentials()
            .map(|(key, secret)| format!("token {}:{}", key, secret));
        if authorization.is_none() {
            warn!("no API credentials configured; requests are sent unauthenticated");
        }

        Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            authorization,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers sent with every request; `Authorization` only when credentials exist
    pub fn headers(&self, with_body: bool) -> Vec<(&'static str, &str)> {
        let mut headers = vec![("Accept", "application/json")];
        if let Some(auth) = self.authorization.as_deref() {
            headers.push(("Authorization", auth));
        }
        if with_body {
            headers.push(("Content-Type", "application/json"));
        }
        headers
    }

    fn with_headers<B>(&self, mut builder: RequestBuilder<B>, with_body: bool) -> RequestBuilder<B> {
        for (name, value) in self.headers(with_body) {
            builder = builder.header(name, value);
        }
        builder
    }

    fn dispatch(&self, request: &ApiRequest, url: &str) -> std::result::Result<Response<Body>, ureq::Error> {
        let body = request
            .body
            .as_ref()
            .map(serde_json::Value::to_string)
            .unwrap_or_default();

        match request.method {
            Method::Get => self.with_headers(self.agent.get(url), false).call(),
            Method::Delete => self.with_headers(self.agent.delete(url), false).call(),
            Method::Post => self
                .with_headers(self.agent.post(url), true)
                .send(body.as_str()),
            Method::Put => self
                .with_headers(self.agent.put(url), true)
                .send(body.as_str()),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = self.url(&request.path);
        debug!(method = request.method.as_str(), %url, "sending request");

        let mut response = self
            .dispatch(request, &url)
            .map_err(|e| LedgerError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| LedgerError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}
