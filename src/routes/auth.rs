// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! E-mail/password authentication routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::SESSION_COOKIE;
use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::user::{Credentials, PasswordReset};
use crate::models::{User, UserResponse};
use crate::services::password::{self, MIN_PASSWORD_LEN};
use crate::services::profile;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339, parse_rfc3339};
use crate::AppState;

/// How long a password reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/password-reset", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Password is too short"))]
    pub password: String,
    #[validate(length(min = 1, max = 80))]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetConfirmRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Password is too short"))]
    pub new_password: String,
}

/// A signed-in session. The token is also set as an HttpOnly cookie for
/// browser clients; the mobile app sends it as a Bearer header.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Build the session cookie for a token.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Issue a token for `user` and attach it to the cookie jar.
pub fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(&user.uid, user.role, &state.config.jwt_signing_key)
        .map_err(AppError::Internal)?;
    let jar = jar.add(session_cookie(token.clone()));
    Ok((
        jar,
        Json(SessionResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// Create an account and sign it in.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    body.validate()?;
    let display_name = profile::validate_display_name(&body.display_name)?;

    let now = now_rfc3339();
    let uid = uuid::Uuid::new_v4().to_string();
    let user = User::new(uid, &body.email, &display_name, &now);
    let credentials = Credentials {
        uid: user.uid.clone(),
        password_hash: password::hash_password(&body.password)?,
        updated_at: now,
    };

    state.db.create_account(&user, &credentials).await?;
    tracing::info!(uid = %user.uid, "Account created");

    let (jar, session) = start_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, session))
}

/// Verify e-mail and password and start a session.
///
/// Unknown e-mail and wrong password are indistinguishable to the caller.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let Some(index) = state.db.find_by_email(&body.email).await? else {
        tracing::debug!("Sign-in for unknown e-mail");
        return Err(AppError::Unauthorized);
    };
    let credentials = state
        .db
        .get_credentials(&index.uid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&body.password, &credentials.password_hash)? {
        tracing::warn!(uid = %index.uid, "Sign-in with wrong password");
        return Err(AppError::Unauthorized);
    }

    let user = state
        .db
        .get_user(&index.uid)
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::info!(uid = %user.uid, "Signed in");
    start_session(&state, jar, user)
}

async fn sign_out(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

/// Mail a reset link if the e-mail is registered.
///
/// Always answers 202 so the endpoint does not reveal which e-mails have accounts.
async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequest>,
) -> Result<StatusCode> {
    body.validate()?;

    let Some(index) = state.db.find_by_email(&body.email).await? else {
        tracing::debug!("Password reset requested for unknown e-mail");
        return Ok(StatusCode::ACCEPTED);
    };

    let (token, token_hash) = password::new_reset_token();
    let expires_at =
        format_utc_rfc3339(chrono::Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
    state
        .db
        .set_password_reset(&PasswordReset {
            uid: index.uid.clone(),
            token_hash,
            expires_at,
        })
        .await?;

    let reset_url = format!(
        "{}/reset-password?token={}",
        state.config.app_url.trim_end_matches('/'),
        token
    );
    if let Err(e) = state
        .email
        .send_password_reset(&index.email, &reset_url)
        .await
    {
        tracing::error!(uid = %index.uid, error = %e, "Failed to send password reset e-mail");
    }

    Ok(StatusCode::ACCEPTED)
}

/// Set a new password from a reset token. Tokens are single use.
async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetConfirmRequest>,
) -> Result<StatusCode> {
    body.validate()?;

    let token_hash = password::hash_reset_token(&body.token);
    let invalid = || AppError::BadRequest("Reset link is invalid or has expired".to_string());

    let reset = state
        .db
        .consume_password_reset(&token_hash)
        .await?
        .ok_or_else(invalid)?;

    if reset_expired(&reset, chrono::Utc::now()) {
        tracing::debug!(uid = %reset.uid, "Expired reset token redeemed");
        return Err(invalid());
    }

    state
        .db
        .set_credentials(&Credentials {
            uid: reset.uid.clone(),
            password_hash: password::hash_password(&body.new_password)?,
            updated_at: now_rfc3339(),
        })
        .await?;

    tracing::info!(uid = %reset.uid, "Password reset completed");
    Ok(StatusCode::NO_CONTENT)
}

/// A reset with an unreadable expiry counts as expired.
fn reset_expired(reset: &PasswordReset, now: chrono::DateTime<chrono::Utc>) -> bool {
    parse_rfc3339(&reset.expires_at).map_or(true, |t| t < now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_boundary() {
        let request = |password: &str| ResetConfirmRequest {
            token: "t".to_string(),
            new_password: password.to_string(),
        };
        let shortest = "x".repeat(MIN_PASSWORD_LEN as usize);
        assert!(request(&shortest).validate().is_ok());
        assert!(request(&shortest[1..]).validate().is_err());
    }

    #[test]
    fn test_reset_expiry() {
        let now = parse_rfc3339("2026-03-02T10:00:00Z").unwrap();
        let reset = |expires_at: &str| PasswordReset {
            uid: "u1".to_string(),
            token_hash: "h".to_string(),
            expires_at: expires_at.to_string(),
        };

        assert!(!reset_expired(&reset("2026-03-02T10:30:00Z"), now));
        assert!(!reset_expired(&reset("2026-03-02T11:00:00+01:00"), now));
        assert!(reset_expired(&reset("2026-03-02T09:59:59Z"), now));
        assert!(reset_expired(&reset("not a timestamp"), now));
    }

    #[test]
    fn test_sign_up_validation() {
        let ok = SignUpRequest {
            email: "alex@example.com".to_string(),
            password: "long enough".to_string(),
            display_name: "Alex".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = SignUpRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            display_name: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("display_name"));
    }

    #[test]
    fn test_session_cookie_is_http_only() {
        let cookie = session_cookie("abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
