// Upstream client implementation
// Every proxied request makes exactly one call through here

use bytes::Bytes;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tokio::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Exactly what is sent to an upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: header::HeaderMap,
    pub json_body: Option<Value>,
}

impl UpstreamRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: header::HeaderMap::new(),
            json_body: Some(body),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: header::HeaderMap::new(),
            json_body: None,
        }
    }

    /// Add a header. The caller decides whether a bad value is its own
    /// configuration error or the client's.
    pub fn header(
        mut self,
        name: &'static str,
        value: &str,
    ) -> Result<Self, header::InvalidHeaderValue> {
        let value = header::HeaderValue::from_str(value)?;
        self.headers
            .insert(header::HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn bearer(self, token: &str) -> Result<Self, header::InvalidHeaderValue> {
        self.header("authorization", &format!("Bearer {}", token))
    }
}

/// Fully read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> GatewayResult<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| GatewayError::UpstreamBody(format!("expected JSON: {}", e)))
    }
}

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(timeout_secs: u64) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
        let http_client = builder.build().unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP client, using defaults: {}", e);
            Client::new()
        });

        Self { http_client }
    }

    /// Issue one request and read its whole body. No retries.
    pub async fn execute(&self, request: UpstreamRequest) -> GatewayResult<UpstreamReply> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), &request.url)
            .headers(request.headers);

        if let Some(body) = &request.json_body {
            // `.json()` also sets Content-Type: application/json
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", request.method, request.url, e);
            GatewayError::Network(e)
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        tracing::info!(
            "Upstream {} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }
}
