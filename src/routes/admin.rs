// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin user management. The admin role is checked in routes/mod.rs.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Role, UserResponse};
use crate::routes::load_user;
use crate::services::profile::{self, UserQuery};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{uid}/role", put(set_role))
        .route("/api/admin/users/{uid}", delete(delete_user))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = match query.role {
        Some(role) => state.db.list_users_by_role(role).await?,
        None => state.db.list_users().await?,
    };

    Ok(Json(
        profile::filter_and_sort(users, &query)
            .into_iter()
            .map(UserResponse::from)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Promote or demote a user.
async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>> {
    if uid == admin.uid {
        return Err(AppError::Forbidden(
            "Admins cannot change their own role".to_string(),
        ));
    }

    let role = body.role;
    let now = now_rfc3339();
    let (user, previous) = state
        .db
        .update_user(&uid, move |user| {
            if user.role == role {
                return Ok(None);
            }
            let previous = user.role;
            user.role = role;
            user.updated_at = now.clone();
            Ok(Some(previous))
        })
        .await?;

    if let Some(previous) = previous {
        tracing::info!(
            admin_uid = %admin.uid,
            target_uid = %uid,
            from = previous.as_str(),
            to = body.role.as_str(),
            "Role changed"
        );
    }

    Ok(Json(user.into()))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteUserResponse {
    pub uid: String,
    pub documents_deleted: usize,
}

/// Delete a user and all their data.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    if uid == admin.uid {
        return Err(AppError::Forbidden(
            "Admins cannot delete their own account here".to_string(),
        ));
    }

    let user = load_user(&state, &uid).await?;
    let documents_deleted = state.db.delete_user_data(&user).await?;

    tracing::info!(
        admin_uid = %admin.uid,
        target_uid = %uid,
        documents_deleted,
        "User deleted by admin"
    );

    Ok(Json(DeleteUserResponse {
        uid,
        documents_deleted,
    }))
}
