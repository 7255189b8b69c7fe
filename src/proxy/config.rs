use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_PRODUCTION_ORIGIN: &str = "https://app.example.com";
const DEFAULT_DEV_ORIGIN_PORT: u16 = 5173;
const DEFAULT_ORIGIN_SUFFIXES: &[&str] = &[".ondigitalocean.app", ".netlify.app"];
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SPEECH_API_BASE: &str = "https://apis.languageconfidence.ai/speech-assessment";
const DEFAULT_SPEECH_ACCENT: &str = "uk";
const DEFAULT_EXPECTED_TEXT_FIELD: &str = "expected_text";
const DEFAULT_PDF_USER_AGENT: &str = "Mozilla/5.0 (compatible; origin-gateway/0.1)";

/// Gateway configuration, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Directory for rolling log files (console only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    pub origins: OriginConfig,

    #[serde(default)]
    pub credentials: Credentials,

    pub endpoints: UpstreamEndpoints,
}

/// Origins the gateway is willing to echo back in CORS headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Returned for requests without an Origin header and for unknown origins
    pub production_origin: String,

    /// Exact-match origins (local development origins first)
    #[serde(default)]
    pub allowed: Vec<String>,

    /// Host suffixes such as `.netlify.app`; any matching origin is echoed verbatim
    #[serde(default)]
    pub suffixes: Vec<String>,
}

/// Upstream secrets. Absence is only an error for the proxy that needs one.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub auth_upstream_url: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub speech_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "auth_upstream_url",
                &self.auth_upstream_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "speech_api_key",
                &self.speech_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Fixed upstream locations and per-upstream knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamEndpoints {
    pub openai_api_url: String,
    pub openai_model: String,
    /// Variants live at `{speech_api_base}/{scripted|unscripted}/{speech_accent}`
    pub speech_api_base: String,
    pub speech_accent: String,
    /// Outbound name of the reference transcript in scripted mode
    pub expected_text_field: String,
    pub pdf_user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            production_origin: DEFAULT_PRODUCTION_ORIGIN.to_string(),
            allowed: dev_origins(DEFAULT_DEV_ORIGIN_PORT),
            suffixes: DEFAULT_ORIGIN_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            speech_api_base: DEFAULT_SPEECH_API_BASE.to_string(),
            speech_accent: DEFAULT_SPEECH_ACCENT.to_string(),
            expected_text_field: DEFAULT_EXPECTED_TEXT_FIELD.to_string(),
            pdf_user_agent: DEFAULT_PDF_USER_AGENT.to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            log_dir: None,
            origins: OriginConfig::default(),
            credentials: Credentials::default(),
            endpoints: UpstreamEndpoints::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_request_timeout() -> u64 {
    120
}

fn dev_origins(port: u16) -> Vec<String> {
    vec![
        format!("http://localhost:{}", port),
        format!("http://127.0.0.1:{}", port),
    ]
}

/// Non-empty, trimmed variable value.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list_var(name: &str) -> Option<Vec<String>> {
    var(name).map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl GatewayConfig {
    /// Build from process environment. Missing credentials are not fatal here,
    /// see [`missing_credentials`](Self::missing_credentials).
    pub fn from_env() -> Self {
        let defaults = UpstreamEndpoints::default();

        let dev_port = var("DEV_ORIGIN_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_DEV_ORIGIN_PORT);
        let mut allowed = dev_origins(dev_port);
        for origin in list_var("ALLOWED_ORIGINS").unwrap_or_default() {
            // Wildcards are never echoed back
            if origin != "*" && !allowed.contains(&origin) {
                allowed.push(origin);
            }
        }

        let origins = OriginConfig {
            production_origin: var("PRODUCTION_ORIGIN")
                .filter(|o| o != "*")
                .unwrap_or_else(|| DEFAULT_PRODUCTION_ORIGIN.to_string()),
            allowed,
            suffixes: list_var("ALLOWED_ORIGIN_SUFFIXES")
                .unwrap_or_else(|| OriginConfig::default().suffixes),
        };

        let credentials = Credentials {
            auth_upstream_url: var("AUTH_UPSTREAM_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            speech_api_key: var("SPEECH_API_KEY"),
        };

        let endpoints = UpstreamEndpoints {
            openai_api_url: var("OPENAI_API_URL").unwrap_or(defaults.openai_api_url),
            openai_model: var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            speech_api_base: var("SPEECH_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.speech_api_base),
            speech_accent: var("SPEECH_ACCENT").unwrap_or(defaults.speech_accent),
            expected_text_field: var("SPEECH_EXPECTED_TEXT_FIELD")
                .unwrap_or(defaults.expected_text_field),
            pdf_user_agent: var("PDF_FETCH_USER_AGENT").unwrap_or(defaults.pdf_user_agent),
        };

        Self {
            host: var("GATEWAY_HOST").unwrap_or_else(default_host),
            port: var("GATEWAY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_port),
            request_timeout: var("GATEWAY_REQUEST_TIMEOUT")
                .and_then(|t| t.parse().ok())
                .unwrap_or_else(default_request_timeout),
            log_dir: var("LOG_DIR"),
            origins,
            credentials,
            endpoints,
        }
    }

    /// Names of credentials that are not configured.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let creds = &self.credentials;
        [
            ("AUTH_UPSTREAM_URL", creds.auth_upstream_url.is_none()),
            ("OPENAI_API_KEY", creds.openai_api_key.is_none()),
            ("SPEECH_API_KEY", creds.speech_api_key.is_none()),
        ]
        .into_iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| name)
        .collect()
    }

    /// Actual listen address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origins_include_dev_ports() {
        let origins = OriginConfig::default();
        assert_eq!(origins.production_origin, DEFAULT_PRODUCTION_ORIGIN);
        assert!(origins.allowed.contains(&"http://localhost:5173".to_string()));
        assert!(origins.allowed.contains(&"http://127.0.0.1:5173".to_string()));
        assert_eq!(origins.suffixes, vec![".ondigitalocean.app", ".netlify.app"]);
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials {
            auth_upstream_url: None,
            openai_api_key: Some("sk-very-secret".to_string()),
            speech_api_key: Some("lc-secret".to_string()),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-very-secret"));
        assert!(!printed.contains("lc-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GatewayConfig = serde_json::from_value(serde_json::json!({
            "origins": { "production_origin": "https://prod.example" },
            "endpoints": UpstreamEndpoints::default(),
        }))
        .unwrap();
        assert_eq!(config.port, 8787);
        assert_eq!(config.request_timeout, 120);
        assert!(config.origins.allowed.is_empty());
        assert!(config.credentials.speech_api_key.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:8787");
        assert_eq!(
            config.missing_credentials(),
            vec!["AUTH_UPSTREAM_URL", "OPENAI_API_KEY", "SPEECH_API_KEY"]
        );
    }
}
