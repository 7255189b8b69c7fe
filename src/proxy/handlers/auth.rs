// Auth handler - login pass-through
use crate::error::{GatewayError, GatewayResult};
use crate::proxy::envelope::{InboundRequest, ProxyResponse};
use crate::proxy::upstream::UpstreamRequest;

use super::{passthrough_json, Gateway};

/// Forward the login body to the auth backend; status and body come back verbatim.
pub async fn forward(gateway: &Gateway, request: &InboundRequest) -> GatewayResult<ProxyResponse> {
    let login_url = gateway
        .config()
        .credentials
        .auth_upstream_url
        .as_deref()
        .ok_or(GatewayError::MissingConfig("AUTH_UPSTREAM_URL"))?;

    let body = request.json_body()?;
    let reply = gateway
        .upstream()
        .execute(UpstreamRequest::post(login_url, body))
        .await?;

    passthrough_json(&reply)
}
