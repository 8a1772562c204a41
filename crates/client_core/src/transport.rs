use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{error::ErrorBody, protocol::Envelope};
use tracing::debug;
use url::Url;

use crate::{config::ClientSettings, error::TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Get, segments)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Unencoded path for logs and test assertions.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, TransportError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, TransportError> {
        let base_url = settings
            .api_base_url()
            .map_err(|_| TransportError::InvalidBaseUrl(settings.api_base_url.clone()))?;
        Self::new(base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Each segment is percent-encoded on its own, so an identification
    /// value containing `/` stays a single segment.
    pub fn endpoint(&self, segments: &[String]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| TransportError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, TransportError> {
        let url = self.endpoint(&request.segments)?;
        debug!(method = ?request.method, %url, "sending api request");

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(TransportError::Network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(TransportError::Network)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: serde_json::from_slice::<ErrorBody>(&bytes).ok(),
            });
        }

        serde_json::from_slice::<Envelope<Value>>(&bytes)
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
