// PDF text post-processing handler
//
// Text-processing failures never fail the request: the caller gets the
// original extracted text back with a 200.
use serde_json::{json, Value};

use crate::error::{GatewayError, GatewayResult};
use crate::proxy::envelope::{InboundRequest, ProxyResponse};
use crate::proxy::mappers::completion;
use crate::proxy::upstream::UpstreamRequest;

use super::Gateway;

pub async fn forward(gateway: &Gateway, request: &InboundRequest) -> GatewayResult<ProxyResponse> {
    let config = gateway.config();
    let api_key = config
        .credentials
        .openai_api_key
        .as_deref()
        .ok_or(GatewayError::MissingConfig("OPENAI_API_KEY"))?;

    let body = request.json_object()?;
    let extracted_text = body
        .get("extracted_text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| GatewayError::BadRequest("extracted_text is required".to_string()))?;
    let filename = body.get("filename").and_then(Value::as_str);

    let upstream_request = UpstreamRequest::post(
        config.endpoints.openai_api_url.as_str(),
        completion::build_request(&config.endpoints.openai_model, extracted_text, filename),
    )
    .bearer(api_key)
    .map_err(|_| GatewayError::InvalidConfig("OPENAI_API_KEY"))?;

    let processed = match gateway.upstream().execute(upstream_request).await {
        Ok(reply) if reply.is_success() => match reply.json() {
            Ok(json) => completion::extract_text(&json),
            Err(e) => {
                tracing::warn!("Text processing returned unreadable body: {}", e);
                None
            }
        },
        Ok(reply) => {
            tracing::warn!("Text processing upstream answered {}", reply.status);
            None
        }
        Err(e) => {
            tracing::warn!("Text processing call failed: {}", e);
            None
        }
    };

    let response = match processed {
        Some(text) => json!({ "text": text, "processed": true }),
        None => {
            tracing::info!("Falling back to unprocessed extracted text");
            json!({ "text": extracted_text, "processed": false })
        }
    };

    Ok(ProxyResponse::json(200, &response))
}
