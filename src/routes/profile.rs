// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session, profile and coach directory routes.

use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Role, UserResponse};
use crate::routes::auth::{start_session, SessionResponse};
use crate::routes::load_user;
use crate::services::profile::{self, ProfileUpdate};
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// Profile routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route("/api/coaches", get(list_coaches))
}

/// Current session, re-issued from the stored user document.
///
/// A role change made by an admin shows up here without signing out.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = load_user(&state, &auth.uid).await?;
    if user.role != auth.role {
        tracing::info!(
            uid = %auth.uid,
            token_role = auth.role.as_str(),
            stored_role = user.role.as_str(),
            "Session role refreshed"
        );
    }
    start_session(&state, jar, user)
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    Ok(Json(load_user(&state, &auth.uid).await?.into()))
}

/// Update one profile field.
///
/// Only the edited user document is rewritten, against its latest stored
/// state, so a concurrent role change is not lost.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    let now = now_rfc3339();
    let (user, _) = state
        .db
        .update_user(&auth.uid, move |user| {
            profile::apply_update(user, update.clone(), &now).map(Some)
        })
        .await?;

    tracing::debug!(uid = %auth.uid, "Profile updated");
    Ok(Json(user.into()))
}

/// Public card of a coach.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CoachSummary {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub rating: Option<f64>,
}

async fn list_coaches(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CoachSummary>>> {
    let coaches = state.db.list_users_by_role(Role::Coach).await?;

    Ok(Json(
        profile::sort_coaches(coaches)
            .into_iter()
            .map(|c| CoachSummary {
                uid: c.uid,
                display_name: c.display_name,
                avatar_url: c.avatar_url,
                rating: c.rating,
            })
            .collect(),
    ))
}
