use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::warn;

use nguma_gateway::auth::verify_token;
use nguma_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Who is calling a function endpoint.
#[derive(Debug, Clone)]
pub enum Caller {
    /// A trusted service holding one of the shared secrets.
    Service,
    User(Claims),
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Compares SHA-256 digests of both sides without short-circuiting.
pub fn secrets_match(given: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn is_service(state: &AppState, headers: &HeaderMap) -> bool {
    let secrets = &state.secrets;
    let service_key = secrets.service_key.expose_secret();

    let internal = match (&secrets.internal_secret, headers.get("x-internal-secret")) {
        (Some(expected), Some(given)) => given
            .to_str()
            .is_ok_and(|g| secrets_match(g, expected.expose_secret())),
        _ => false,
    };
    let bearer = bearer_token(headers).is_some_and(|t| secrets_match(t, service_key));
    let apikey = headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|k| secrets_match(k, service_key));

    internal | bearer | apikey
}

fn user_claims(state: &AppState, headers: &HeaderMap) -> Option<Claims> {
    bearer_token(headers).and_then(|token| verify_token(token, &state.jwt_secret))
}

/// Validate the platform JWT and expose its claims to handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = user_claims(&state, req.headers()).ok_or_else(ApiError::unauthorized)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Must run after [`require_auth`].
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub)
        .ok_or_else(ApiError::unauthorized)?;

    if !state.blocking(move |db| db.is_admin(user_id)).await? {
        warn!("User {} denied admin route {}", user_id, req.uri().path());
        return Err(ApiError::forbidden());
    }
    Ok(next.run(req).await)
}

pub async fn require_service(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !is_service(&state, req.headers()) {
        return Err(ApiError::unauthorized());
    }
    req.extensions_mut().insert(Caller::Service);
    Ok(next.run(req).await)
}

/// Accept either a service secret or a valid user JWT.
pub async fn require_service_or_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = if is_service(&state, req.headers()) {
        Caller::Service
    } else {
        Caller::User(user_claims(&state, req.headers()).ok_or_else(ApiError::unauthorized)?)
    };
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Only `Authorization: Bearer <CRON_SECRET>` passes.
pub async fn require_cron(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ok = bearer_token(req.headers())
        .is_some_and(|t| secrets_match(t, state.secrets.cron_secret.expose_secret()));
    if !ok {
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn secrets_compare_by_value() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cret", "s3creT"));
        assert!(!secrets_match("", ""));
        assert!(!secrets_match("s3cret", ""));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
