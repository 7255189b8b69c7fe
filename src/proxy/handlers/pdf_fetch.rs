// PDF fetch handler - GET a caller-supplied URL and return its bytes base64-encoded
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::proxy::envelope::{InboundRequest, ProxyResponse};
use crate::proxy::upstream::UpstreamRequest;

use super::Gateway;

const CACHE_CONTROL: &str = "public, max-age=3600";
const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

pub async fn forward(gateway: &Gateway, request: &InboundRequest) -> GatewayResult<ProxyResponse> {
    let target = request
        .query_param("url")
        .ok_or_else(|| GatewayError::BadRequest("query parameter 'url' is required".to_string()))?;
    let target = parse_target(target)?;

    let upstream_request = UpstreamRequest::get(target.as_str())
        .header("user-agent", &gateway.config().endpoints.pdf_user_agent)
        .map_err(|_| GatewayError::InvalidConfig("PDF_FETCH_USER_AGENT"))?;
    let reply = gateway.upstream().execute(upstream_request).await?;

    if !reply.is_success() {
        tracing::warn!("PDF fetch of {} answered {}", target, reply.status);
        return Ok(ProxyResponse::json(
            reply.status,
            &json!({
                "error": "upstream_error",
                "message": format!("Failed to fetch PDF: upstream returned {}", reply.status),
            }),
        ));
    }

    let content_type = reply
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let mut response = ProxyResponse::new(200)
        .with_header("Content-Type", content_type)
        .with_header("Cache-Control", CACHE_CONTROL)
        .with_body(STANDARD.encode(&reply.body));
    response.is_base64_encoded = true;
    Ok(response)
}

fn parse_target(raw: &str) -> GatewayResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| GatewayError::BadRequest(format!("invalid url '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(GatewayError::BadRequest(format!(
            "unsupported url scheme '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ProxyKind;
    use super::*;
    use axum::{
        http::{header, HeaderMap, Method, StatusCode},
        routing::get,
        Router,
    };

    const PDF_BYTES: &[u8] = b"%PDF-1.4\n\x00\xff\xfe binary";

    async fn pdf_host() -> String {
        let app = Router::new()
            .route(
                "/doc.pdf",
                get(|headers: HeaderMap| async move {
                    let ua = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if !ua.contains("origin-gateway") {
                        return (StatusCode::FORBIDDEN, HeaderMap::new(), Vec::new());
                    }
                    let mut out = HeaderMap::new();
                    out.insert(header::CONTENT_TYPE, "application/pdf".parse().unwrap());
                    (StatusCode::OK, out, PDF_BYTES.to_vec())
                }),
            )
            .route("/gone.pdf", get(|| async { StatusCode::NOT_FOUND }));
        format!("http://{}", spawn_upstream(app).await)
    }

    fn fetch(url: Option<&str>) -> InboundRequest {
        let mut req = request(Method::GET, Some(DEV), None);
        if let Some(u) = url {
            req.query.insert("url".to_string(), u.to_string());
        }
        req
    }

    #[tokio::test]
    async fn test_fetch_encodes_binary() {
        let base = pdf_host().await;
        let resp = gateway(config(&base))
            .handle(ProxyKind::PdfFetch, fetch(Some(&format!("{}/doc.pdf", base))))
            .await;
        assert_eq!(resp.status, 200);
        assert!(resp.is_base64_encoded);
        assert_eq!(resp.header("Content-Type"), Some("application/pdf"));
        assert_eq!(resp.header("Cache-Control"), Some("public, max-age=3600"));
        assert_eq!(resp.allowed_origin(), Some(DEV));
        assert_eq!(STANDARD.decode(&resp.body).unwrap(), PDF_BYTES);
    }

    #[tokio::test]
    async fn test_upstream_404_is_forwarded() {
        let base = pdf_host().await;
        let resp = gateway(config(&base))
            .handle(ProxyKind::PdfFetch, fetch(Some(&format!("{}/gone.pdf", base))))
            .await;
        assert_eq!(resp.status, 404);
        assert!(!resp.is_base64_encoded);
        assert_eq!(resp.allowed_origin(), Some(DEV));
        assert_eq!(resp.json_body().unwrap()["error"], "upstream_error");
    }

    #[tokio::test]
    async fn test_missing_or_bad_url_is_400() {
        let gw = gateway(config("http://127.0.0.1:9"));
        for url in [None, Some(""), Some("not a url"), Some("file:///etc/passwd")] {
            let resp = gw.handle(ProxyKind::PdfFetch, fetch(url)).await;
            assert_eq!(resp.status, 400, "url {:?}", url);
            assert_eq!(resp.allowed_origin(), Some(DEV));
        }
    }

    #[tokio::test]
    async fn test_network_failure_is_500() {
        let addr = dead_address().await;
        let resp = gateway(config("http://127.0.0.1:9"))
            .handle(
                ProxyKind::PdfFetch,
                fetch(Some(&format!("http://{}/doc.pdf", addr))),
            )
            .await;
        assert_eq!(resp.status, 500);
        assert_eq!(resp.allowed_origin(), Some(DEV));
    }
}
