// Hosting-neutral request/response shapes
use axum::http::{HeaderMap, Method};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{GatewayError, GatewayResult};

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";

/// One inbound request, as normalized by a hosting shim.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Lookups are case-insensitive
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
}

impl InboundRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Parse the body as JSON. A missing or blank body reads as `{}`.
    pub fn json_body(&self) -> GatewayResult<Value> {
        match self.body.as_deref().map(str::trim) {
            None | Some("") => Ok(Value::Object(Default::default())),
            Some(raw) => Ok(serde_json::from_str(raw)?),
        }
    }

    /// Like [`json_body`](Self::json_body), but the top level must be an object.
    pub fn json_object(&self) -> GatewayResult<serde_json::Map<String, Value>> {
        match self.json_body()? {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::BadRequest(
                "request body must be a JSON object".to_string(),
            )),
        }
    }
}

/// Normalized response handed back to a hosting shim.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    /// Insertion-ordered; names are unique ignoring case
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// `body` holds base64 of binary content
    pub is_base64_encoded: bool,
}

impl ProxyResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    pub fn error(err: &GatewayError) -> Self {
        Self::json(err.status(), &err.to_json())
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn allowed_origin(&self) -> Option<&str> {
        self.header(ALLOW_ORIGIN)
    }

    pub fn json_body(&self) -> Option<Value> {
        if self.is_base64_encoded {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }
}
