// Origin negotiation for CORS responses
use url::Url;

use crate::proxy::config::OriginConfig;

/// Pick the single origin to echo in `Access-Control-Allow-Origin`.
///
/// First match wins: no header, production origin, exact allow-list entry,
/// host suffix pattern. Anything else (including `*`, empty and malformed
/// values) falls back to the production origin, so the result is never the
/// wildcard and never an unvetted caller origin.
pub fn resolve_origin(request_origin: Option<&str>, config: &OriginConfig) -> String {
    let origin = match request_origin.map(str::trim) {
        Some(o) if !o.is_empty() => o,
        _ => return config.production_origin.clone(),
    };

    if origin == config.production_origin {
        return origin.to_string();
    }

    if config.allowed.iter().any(|allowed| allowed == origin) {
        return origin.to_string();
    }

    if matches_suffix(origin, &config.suffixes) {
        return origin.to_string();
    }

    tracing::debug!("Unrecognized origin {:?}, answering with production origin", origin);
    config.production_origin.clone()
}

/// True when `origin` is a bare http(s) origin whose host ends with one of `suffixes`.
fn matches_suffix(origin: &str, suffixes: &[String]) -> bool {
    if suffixes.is_empty() {
        return false;
    }

    let url = match Url::parse(origin) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if !matches!(url.scheme(), "https" | "http") {
        return false;
    }
    // An Origin header carries scheme, host and port only
    if url.path() != "/"
        || origin.ends_with('/')
        || url.query().is_some()
        || url.fragment().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
    {
        return false;
    }

    let host = match url.host_str() {
        Some(h) => h.to_ascii_lowercase(),
        None => return false,
    };

    suffixes.iter().any(|suffix| {
        let suffix = suffix.to_ascii_lowercase();
        if suffix.starts_with('.') {
            host.len() > suffix.len() && host.ends_with(&suffix)
        } else {
            host.ends_with(&format!(".{}", suffix))
        }
    })
}
