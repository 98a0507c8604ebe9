use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use viaro_core::identity::Caller;

use crate::state::AppState;

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by a bearer token. `role` must be one of the labels the
/// identity module understands (`CUSTOMER` or `ADMIN`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that validates bearer tokens and attaches the resolved
/// [`Caller`] to request extensions for handlers to consume.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let caller = authenticate(&state, &req)?;
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Same as [`auth_middleware`] but additionally requires the admin role.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let caller = authenticate(&state, &req)?;
    if !caller.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

fn authenticate(state: &AppState, req: &Request) -> Result<Caller, StatusCode> {
    // 1. Extract the Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Strip the Bearer prefix
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Decode and validate the token signature and expiry
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    // 4. Map the role claim onto a caller identity
    let claims = token_data.claims;
    match claims.role.as_str() {
        "CUSTOMER" => Ok(Caller::customer(claims.sub)),
        "ADMIN" => Ok(Caller::admin(claims.sub)),
        _ => Err(StatusCode::FORBIDDEN),
    }
}
