use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0} is not a valid header value")]
    InvalidConfig(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unreadable upstream response: {0}")]
    UpstreamBody(String),
}

impl GatewayError {
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::BadRequest(_) | GatewayError::InvalidJson(_) => 400,
            GatewayError::MethodNotAllowed(_) => 405,
            GatewayError::PayloadTooLarge(_) => 413,
            GatewayError::MissingConfig(_)
            | GatewayError::InvalidConfig(_)
            | GatewayError::Network(_)
            | GatewayError::UpstreamBody(_) => 500,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingConfig(_) | GatewayError::InvalidConfig(_) => "configuration_error",
            GatewayError::BadRequest(_) | GatewayError::InvalidJson(_) => "invalid_request",
            GatewayError::MethodNotAllowed(_) => "method_not_allowed",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::Network(_) | GatewayError::UpstreamBody(_) => "internal_error",
        }
    }

    /// JSON envelope sent back to the caller.
    ///
    /// The configuration variants only ever carry the variable name, so the message
    /// cannot leak a secret value.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.code(),
            "message": self.to_string(),
        })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
