// Speech-assessment payload adapter
use serde_json::{Map, Value};

use crate::error::{GatewayError, GatewayResult};
use crate::proxy::common::utils::unwrap_quoted;
use crate::proxy::config::UpstreamEndpoints;
use crate::proxy::upstream::client::UpstreamRequest;

/// Routing directive; never forwarded upstream.
pub const ENDPOINT_FIELD: &str = "endpoint";
pub const AUDIO_FIELD: &str = "audio_base64";
pub const AUDIO_FORMAT_FIELD: &str = "audio_format";
pub const EXPECTED_TEXT_FIELD: &str = "expected_text";

/// The two upstream variants of the speech-assessment API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterMode {
    /// Scores against a caller-supplied reference transcript; strict field set
    Scripted,
    #[default]
    Unscripted,
}

impl AdapterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterMode::Scripted => "scripted",
            AdapterMode::Unscripted => "unscripted",
        }
    }

    /// Parse the explicit `mode` flag.
    pub fn parse(value: &str) -> GatewayResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scripted" => Ok(AdapterMode::Scripted),
            "unscripted" => Ok(AdapterMode::Unscripted),
            other => Err(GatewayError::BadRequest(format!(
                "unknown assessment mode '{}', expected 'scripted' or 'unscripted'",
                other
            ))),
        }
    }

    /// Legacy endpoint hint: scripted iff one of its path segments is exactly `scripted`.
    pub fn from_endpoint_hint(hint: &str) -> Self {
        let scripted = hint
            .split(|c: char| c == '/' || c == '?' || c == '#')
            .any(|segment| segment.eq_ignore_ascii_case("scripted"));
        if scripted {
            AdapterMode::Scripted
        } else {
            AdapterMode::Unscripted
        }
    }

    /// Resolve the mode for one request.
    ///
    /// Explicit `mode` flag first, then an `endpoint` hint from the query,
    /// then one from the body, else unscripted.
    pub fn select(
        mode_flag: Option<&str>,
        query_endpoint: Option<&str>,
        body: &Map<String, Value>,
    ) -> GatewayResult<Self> {
        if let Some(flag) = mode_flag {
            return Self::parse(flag);
        }
        let hint = query_endpoint.or_else(|| body.get(ENDPOINT_FIELD).and_then(Value::as_str));
        Ok(hint.map(Self::from_endpoint_hint).unwrap_or_default())
    }

    /// Upstream URL for this variant; the URL follows from the mode, never the reverse.
    pub fn endpoint_url(&self, endpoints: &UpstreamEndpoints) -> String {
        format!(
            "{}/{}/{}",
            endpoints.speech_api_base.trim_end_matches('/'),
            self.as_str(),
            endpoints.speech_accent
        )
    }
}

/// Build the outbound speech-assessment request for `mode`.
///
/// Unscripted forwards every field except `endpoint`. Scripted whitelists the
/// audio payload, its format and, when non-empty, the reference transcript
/// renamed to `endpoints.expected_text_field`.
pub fn adapt(
    mut body: Map<String, Value>,
    mode: AdapterMode,
    endpoints: &UpstreamEndpoints,
) -> UpstreamRequest {
    body.remove(ENDPOINT_FIELD);

    let json_body = match mode {
        AdapterMode::Unscripted => body,
        AdapterMode::Scripted => scripted_body(body, &endpoints.expected_text_field),
    };

    tracing::debug!(
        "Speech payload adapted: mode={}, fields={:?}",
        mode.as_str(),
        json_body.keys().collect::<Vec<_>>()
    );

    UpstreamRequest::post(mode.endpoint_url(endpoints), Value::Object(json_body))
}

fn scripted_body(mut body: Map<String, Value>, expected_text_field: &str) -> Map<String, Value> {
    let mut out = Map::new();

    for field in [AUDIO_FIELD, AUDIO_FORMAT_FIELD] {
        if let Some(value) = body.remove(field) {
            out.insert(field.to_string(), value);
        }
    }

    let expected = body
        .get(EXPECTED_TEXT_FIELD)
        .and_then(Value::as_str)
        .map(unwrap_quoted)
        .filter(|text| !text.is_empty());

    if let Some(text) = expected {
        out.insert(expected_text_field.to_string(), Value::String(text));
    }

    out
}
