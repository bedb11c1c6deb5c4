use crate::{ApiError, AppState};
use archgraph_core::{ApiKey, ApiKeyRepository, ApiKeyScope};
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "X-API-Key";

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Finds the stored key matching `plaintext` and records its use.
pub async fn authenticate(
    keys: &dyn ApiKeyRepository,
    plaintext: &str,
) -> Result<ApiKey, ApiError> {
    let prefix: String = plaintext.chars().take(8).collect();
    let now = Utc::now();

    let key = keys
        .find_all()
        .await?
        .into_iter()
        .filter(|k| k.prefix == prefix)
        .find(|k| k.verify(plaintext, now))
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired API key".to_string()))?;

    keys.touch(&key.name).await?;
    Ok(key)
}

/// Requires a key with `write` scope on mutating requests when auth is
/// enabled. Reads always pass.
pub async fn require_write_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth_enabled() || is_read_only(req.method()) {
        return Ok(next.run(req).await);
    }

    let plaintext = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", API_KEY_HEADER)))?;

    let key = match authenticate(state.repos.api_keys.as_ref(), &plaintext).await {
        Ok(key) => key,
        Err(err) => {
            warn!(method = %req.method(), path = %req.uri().path(), "Rejected API key");
            return Err(err);
        }
    };

    if !key.has_scope(ApiKeyScope::Write) {
        return Err(ApiError::Forbidden(format!(
            "key '{}' lacks write scope",
            key.name
        )));
    }

    debug!(key = %key.name, method = %req.method(), "Authenticated write request");
    Ok(next.run(req).await)
}
