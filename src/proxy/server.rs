use axum::{
    body::{to_bytes, Body},
    extract::{RawQuery, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::LengthLimitError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::error::GatewayError;
use crate::proxy::config::GatewayConfig;
use crate::proxy::envelope::{InboundRequest, ProxyResponse, ALLOW_ORIGIN};
use crate::proxy::handlers::{Gateway, ProxyKind};

/// Base64 audio payloads are large
pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// All gateway routes. Every proxy route accepts any verb so OPTIONS and
/// unsupported methods reach the gateway and still get CORS headers. Proxy
/// routes only use infallible extractors and read the body themselves, so
/// axum never answers on the gateway's behalf.
pub fn build_router(gateway: Arc<Gateway>) -> Router {
    let state = AppState { gateway };

    Router::new()
        .route("/api/auth/login", any(auth_route))
        .route("/api/pdf/process", any(pdf_text_route))
        .route("/api/pdf/fetch", any(pdf_fetch_route))
        .route("/api/speech/assess", any(speech_route))
        .route("/healthz", get(health_check_handler))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::proxy::middleware::logging_middleware,
        ))
        .with_state(state)
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        config: Arc<GatewayConfig>,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let addr = config.bind_address();
        let app = build_router(Arc::new(Gateway::new(config)));

        // Bind address
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;

        tracing::info!("Gateway listening at http://{}", addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
        };

        // Start server in new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn auth_route(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Body,
) -> Response {
    proxy(&state, ProxyKind::Auth, method, headers, query, body).await
}

async fn pdf_text_route(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Body,
) -> Response {
    proxy(&state, ProxyKind::PdfText, method, headers, query, body).await
}

async fn pdf_fetch_route(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Body,
) -> Response {
    proxy(&state, ProxyKind::PdfFetch, method, headers, query, body).await
}

async fn speech_route(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Body,
) -> Response {
    proxy(&state, ProxyKind::SpeechAssessment, method, headers, query, body).await
}

async fn proxy(
    state: &AppState,
    kind: ProxyKind,
    method: Method,
    headers: HeaderMap,
    query: Option<String>,
    body: Body,
) -> Response {
    let mut request = InboundRequest {
        method,
        headers,
        query: parse_query(query.as_deref()),
        body: None,
    };

    match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            if !bytes.is_empty() {
                request.body = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        Err(e) => {
            let error = if e.into_inner().is::<LengthLimitError>() {
                GatewayError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                GatewayError::BadRequest("request body could not be read".to_string())
            };
            return into_response(state.gateway.reject(kind, &request, error));
        }
    }

    into_response(state.gateway.handle(kind, request).await)
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Turn a gateway response into an HTTP response, decoding binary bodies.
fn into_response(proxy: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(proxy.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = if proxy.is_base64_encoded {
        match STANDARD.decode(proxy.body.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Binary response body is not valid base64: {}", e);
                let failure = GatewayError::UpstreamBody(format!("invalid base64 body: {}", e));
                let mut fallback = ProxyResponse::error(&failure);
                for (name, value) in &proxy.headers {
                    if name.eq_ignore_ascii_case(ALLOW_ORIGIN) || name.eq_ignore_ascii_case("vary") {
                        fallback = fallback.with_header(name, value.clone());
                    }
                }
                return into_response(fallback);
            }
        }
    } else {
        proxy.body.into_bytes()
    };

    let mut response = (status, body).into_response();
    let out = response.headers_mut();
    for (name, value) in &proxy.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.insert(name, value);
            }
            _ => debug!("Dropping unrepresentable header {}", name),
        }
    }
    response
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
