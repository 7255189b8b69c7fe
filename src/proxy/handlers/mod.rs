// Handlers module - one per proxied upstream, sharing the gateway core below
//
// Every request resolves its CORS origin first, answers OPTIONS locally and
// otherwise makes exactly one upstream call. Whatever happens, the response
// leaves with the resolved origin attached.

pub mod auth;
pub mod pdf_fetch;
pub mod pdf_text;
pub mod speech;

use axum::http::Method;
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::proxy::common::origin::resolve_origin;
use crate::proxy::config::GatewayConfig;
use crate::proxy::envelope::{InboundRequest, ProxyResponse, ALLOW_ORIGIN};
use crate::proxy::upstream::{UpstreamClient, UpstreamReply};

const PREFLIGHT_MAX_AGE: &str = "86400";

/// The four proxied upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Auth,
    PdfText,
    PdfFetch,
    SpeechAssessment,
}

impl ProxyKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProxyKind::Auth => "auth",
            ProxyKind::PdfText => "pdf-text",
            ProxyKind::PdfFetch => "pdf-fetch",
            ProxyKind::SpeechAssessment => "speech-assessment",
        }
    }

    /// Verb the real operation needs (OPTIONS is always answered too).
    pub fn method(&self) -> Method {
        match self {
            ProxyKind::PdfFetch => Method::GET,
            ProxyKind::Auth | ProxyKind::PdfText | ProxyKind::SpeechAssessment => Method::POST,
        }
    }

    pub fn allow_methods(&self) -> String {
        format!("{}, OPTIONS", self.method())
    }

    pub fn allow_headers(&self) -> &'static str {
        match self {
            ProxyKind::SpeechAssessment => "Content-Type, lc-beta-features",
            ProxyKind::Auth | ProxyKind::PdfText | ProxyKind::PdfFetch => "Content-Type",
        }
    }
}

/// Gateway core, built once per process and shared by every hosting shim.
pub struct Gateway {
    config: Arc<GatewayConfig>,
    upstream: UpstreamClient,
}

impl Gateway {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        let upstream = UpstreamClient::new(config.request_timeout);
        Self { config, upstream }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub(crate) fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Handle one request for `kind`. Never fails: errors become responses.
    pub async fn handle(&self, kind: ProxyKind, request: InboundRequest) -> ProxyResponse {
        let origin = resolve_origin(request.header("origin"), &self.config.origins);

        if request.method == Method::OPTIONS {
            tracing::debug!("[{}] Preflight answered for {}", kind.name(), origin);
            return with_cors(preflight(kind), &origin);
        }

        let response = if request.method == kind.method() {
            self.dispatch(kind, &request).await
        } else {
            Err(GatewayError::MethodNotAllowed(request.method.to_string()))
        };

        let response = response.unwrap_or_else(|e| error_response(kind, e));
        with_cors(response, &origin)
    }

    /// Answer a request whose body the hosting shim could not read, such as
    /// an oversized upload. Same origin rules as `handle`.
    pub fn reject(&self, kind: ProxyKind, request: &InboundRequest, error: GatewayError) -> ProxyResponse {
        let origin = resolve_origin(request.header("origin"), &self.config.origins);
        with_cors(error_response(kind, error), &origin)
    }

    async fn dispatch(&self, kind: ProxyKind, request: &InboundRequest) -> GatewayResult<ProxyResponse> {
        match kind {
            ProxyKind::Auth => auth::forward(self, request).await,
            ProxyKind::PdfText => pdf_text::forward(self, request).await,
            ProxyKind::PdfFetch => pdf_fetch::forward(self, request).await,
            ProxyKind::SpeechAssessment => speech::forward(self, request).await,
        }
    }
}

fn error_response(kind: ProxyKind, e: GatewayError) -> ProxyResponse {
    if e.status() >= 500 {
        tracing::error!("[{}] {}", kind.name(), e);
    } else {
        tracing::warn!("[{}] Rejected request: {}", kind.name(), e);
    }
    let resp = ProxyResponse::error(&e);
    match e {
        GatewayError::MethodNotAllowed(_) => resp.with_header("Allow", kind.allow_methods()),
        _ => resp,
    }
}

fn preflight(kind: ProxyKind) -> ProxyResponse {
    ProxyResponse::new(200)
        .with_header("Access-Control-Allow-Headers", kind.allow_headers())
        .with_header("Access-Control-Allow-Methods", kind.allow_methods())
        .with_header("Access-Control-Max-Age", PREFLIGHT_MAX_AGE)
}

fn with_cors(response: ProxyResponse, origin: &str) -> ProxyResponse {
    response
        .with_header(ALLOW_ORIGIN, origin)
        .with_header("Vary", "Origin")
}

/// Upstream status and JSON body, both verbatim.
pub(crate) fn passthrough_json(reply: &UpstreamReply) -> GatewayResult<ProxyResponse> {
    let body = reply.json()?;
    Ok(ProxyResponse::json(reply.status, &body))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const KINDS: [ProxyKind; 4] = [
        ProxyKind::Auth,
        ProxyKind::PdfText,
        ProxyKind::PdfFetch,
        ProxyKind::SpeechAssessment,
    ];

    #[tokio::test]
    async fn test_preflight_never_calls_upstream() {
        // Every upstream points at a dead port; preflight must not notice.
        let addr = dead_address().await;
        let gw = gateway(config(&format!("http://{}", addr)));

        for kind in KINDS {
            let resp = gw
                .handle(kind, request(Method::OPTIONS, Some(DEV), None))
                .await;
            assert_eq!(resp.status, 200);
            assert!(resp.body.is_empty());
            assert_eq!(resp.allowed_origin(), Some(DEV));
            assert_eq!(
                resp.headers
                    .iter()
                    .filter(|(n, _)| n.eq_ignore_ascii_case(ALLOW_ORIGIN))
                    .count(),
                1
            );
            assert!(resp
                .header("Access-Control-Allow-Headers")
                .unwrap()
                .contains("Content-Type"));
        }
    }

    #[tokio::test]
    async fn test_preflight_methods_and_headers() {
        let gw = gateway(config("http://127.0.0.1:9"));

        let resp = gw
            .handle(ProxyKind::PdfFetch, request(Method::OPTIONS, None, None))
            .await;
        assert_eq!(resp.header("Access-Control-Allow-Methods"), Some("GET, OPTIONS"));
        assert_eq!(resp.allowed_origin(), Some(PROD));

        let resp = gw
            .handle(
                ProxyKind::SpeechAssessment,
                request(Method::OPTIONS, Some("https://evil.example"), None),
            )
            .await;
        assert_eq!(resp.header("Access-Control-Allow-Methods"), Some("POST, OPTIONS"));
        assert_eq!(
            resp.header("Access-Control-Allow-Headers"),
            Some("Content-Type, lc-beta-features")
        );
        assert_eq!(resp.allowed_origin(), Some(PROD));
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_with_origin() {
        let gw = gateway(config("http://127.0.0.1:9"));
        let resp = gw
            .handle(ProxyKind::Auth, request(Method::GET, Some(DEV), None))
            .await;
        assert_eq!(resp.status, 405);
        assert_eq!(resp.header("Allow"), Some("POST, OPTIONS"));
        assert_eq!(resp.allowed_origin(), Some(DEV));
        assert_eq!(resp.json_body().unwrap()["error"], "method_not_allowed");
    }

    #[tokio::test]
    async fn test_wildcard_origin_never_echoed() {
        let gw = gateway(config("http://127.0.0.1:9"));
        for kind in KINDS {
            let resp = gw
                .handle(kind, request(Method::OPTIONS, Some("*"), None))
                .await;
            assert_eq!(resp.allowed_origin(), Some(PROD));
        }
    }

    #[test]
    fn test_reject_keeps_resolved_origin() {
        let gw = gateway(config("http://127.0.0.1:9"));
        let resp = gw.reject(
            ProxyKind::SpeechAssessment,
            &request(Method::POST, Some(DEV), None),
            GatewayError::PayloadTooLarge(1024),
        );
        assert_eq!(resp.status, 413);
        assert_eq!(resp.allowed_origin(), Some(DEV));
        assert_eq!(resp.header("Vary"), Some("Origin"));
        assert_eq!(resp.json_body().unwrap()["error"], "payload_too_large");

        let resp = gw.reject(
            ProxyKind::Auth,
            &request(Method::POST, Some("https://evil.example"), None),
            GatewayError::PayloadTooLarge(1024),
        );
        assert_eq!(resp.allowed_origin(), Some(PROD));
    }

    #[test]
    fn test_allow_methods() {
        assert_eq!(ProxyKind::Auth.allow_methods(), "POST, OPTIONS");
        assert_eq!(ProxyKind::PdfFetch.allow_methods(), "GET, OPTIONS");
    }
}
