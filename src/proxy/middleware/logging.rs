// Request logging middleware
use axum::{extract::Request, http::header, middleware::Next, response::Response};
use tokio::time::Instant;

/// Log method, path, origin, status and latency for every request.
///
/// Query strings are left out; they may carry caller-supplied URLs.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let started = Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        "{} {} origin={} -> {} in {}ms",
        method,
        path,
        origin,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    response
}
