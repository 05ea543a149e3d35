// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication and role middleware.

use crate::config::SESSION_COOKIE;
use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session lifetime.
const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60; // 30 days

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user uid)
    pub sub: String,
    /// Role at the time the session was issued
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated session extracted from the JWT.
///
/// The role here is what the token was issued with. Role-gated routes check
/// the stored role instead (see `require_admin` / `require_coach`), so a
/// demotion takes effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub role: Role,
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Cookie first, then header. A stale cookie does not shadow a valid
    // Bearer token.
    let from_cookie = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| decode_jwt(cookie.value(), &state.config.jwt_signing_key).ok());

    let claims = match from_cookie {
        Some(claims) => claims,
        None => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or(StatusCode::UNAUTHORIZED)?;
            decode_jwt(token, &state.config.jwt_signing_key)
                .map_err(|_| StatusCode::UNAUTHORIZED)?
        }
    };

    let auth_user = AuthUser {
        uid: claims.sub,
        role: claims.role,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware for admin-only routes. Must run after `require_auth`.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (auth_user, path) = session_of(&request)?;
    require_stored_role(&state, &auth_user, &path, |role| {
        role == Role::Admin
    })
    .await?;
    Ok(next.run(request).await)
}

/// Middleware for coach routes (admins included). Must run after `require_auth`.
pub async fn require_coach(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (auth_user, path) = session_of(&request)?;
    require_stored_role(&state, &auth_user, &path, |role| {
        role.can_coach()
    })
    .await?;
    Ok(next.run(request).await)
}

fn session_of(request: &Request) -> Result<(AuthUser, String), StatusCode> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)?;
    Ok((auth_user, request.uri().path().to_string()))
}

async fn require_stored_role(
    state: &AppState,
    auth_user: &AuthUser,
    path: &str,
    allowed: impl Fn(Role) -> bool,
) -> Result<(), StatusCode> {
    let user = state
        .db
        .get_user(&auth_user.uid)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, uid = %auth_user.uid, "Failed to load user for role check");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !allowed(user.role) {
        tracing::warn!(
            uid = %auth_user.uid,
            role = user.role.as_str(),
            path,
            "Blocked request: insufficient role"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(())
}

/// Create a JWT for a user session.
pub fn create_jwt(uid: &str, role: Role, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        role,
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Decode and validate a session JWT.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> anyhow::Result<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}
