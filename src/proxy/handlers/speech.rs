// Speech-assessment handler
use crate::error::{GatewayError, GatewayResult};
use crate::proxy::envelope::{InboundRequest, ProxyResponse};
use crate::proxy::mappers::speech::{adapt, AdapterMode};

use super::{passthrough_json, Gateway};

const BETA_FEATURES_HEADER: &str = "lc-beta-features";

pub async fn forward(gateway: &Gateway, request: &InboundRequest) -> GatewayResult<ProxyResponse> {
    let config = gateway.config();
    let api_key = config
        .credentials
        .speech_api_key
        .as_deref()
        .ok_or(GatewayError::MissingConfig("SPEECH_API_KEY"))?;

    let body = request.json_object()?;
    let mode = AdapterMode::select(
        request.query_param("mode"),
        request.query_param("endpoint"),
        &body,
    )?;
    let beta_features = request.header(BETA_FEATURES_HEADER).unwrap_or("false");

    tracing::info!("Speech assessment request, mode={}", mode.as_str());

    let upstream_request = adapt(body, mode, &config.endpoints)
        .header("api-key", api_key)
        .map_err(|_| GatewayError::InvalidConfig("SPEECH_API_KEY"))?
        .header(BETA_FEATURES_HEADER, beta_features)
        .map_err(|_| GatewayError::BadRequest(format!("invalid {} header", BETA_FEATURES_HEADER)))?;

    let reply = gateway.upstream().execute(upstream_request).await?;
    if !reply.is_success() {
        tracing::warn!(
            "Speech assessment upstream answered {} (mode={})",
            reply.status,
            mode.as_str()
        );
    }

    passthrough_json(&reply)
}
