// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Availability and appointment routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::booking::{self, GridCell, OpenDay};
use crate::time_utils::{now_rfc3339, today_utc};
use crate::AppState;

/// Booking routes open to every signed-in user.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/coaches/{coach_uid}/availability",
            get(list_availability),
        )
        .route(
            "/api/appointments",
            get(list_appointments).post(book_appointment),
        )
        .route("/api/appointments/{id}/cancel", post(cancel_appointment))
}

/// Routes for coaches only (role checked in routes/mod.rs).
pub fn coach_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/availability", put(publish_availability))
        .route(
            "/api/appointments/{id}/complete",
            post(complete_appointment),
        )
}

// ─── Availability ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub cells: Vec<GridCell>,
}

/// A booked hour left untouched by a publication.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SkippedHour {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub hour: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublishResponse {
    pub days_updated: usize,
    /// Hours sent as available that already carry a booking
    pub skipped: Vec<SkippedHour>,
}

/// Publish the coach's grid, one transaction per day.
async fn publish_availability(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<PublishRequest>,
) -> Result<Json<PublishResponse>> {
    let days = booking::group_grid(body.cells, today_utc())?;

    let mut skipped = Vec::new();
    for day in &days {
        let hours = state.db.publish_availability_day(&auth.uid, day).await?;
        skipped.extend(hours.into_iter().map(|hour| SkippedHour {
            date: day.date,
            hour,
        }));
    }

    tracing::info!(
        coach_uid = %auth.uid,
        days = days.len(),
        skipped = skipped.len(),
        "Availability published"
    );

    Ok(Json(PublishResponse {
        days_updated: days.len(),
        skipped,
    }))
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Free hours of a coach, grouped by day.
async fn list_availability(
    State(state): State<Arc<AppState>>,
    Path(coach_uid): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<OpenDay>>> {
    let (from, to) = booking::resolve_range(params.from, params.to, today_utc())?;
    let days = state
        .db
        .get_availability_range(&coach_uid, from, to)
        .await?;
    Ok(Json(booking::open_days(&days)))
}

// ─── Appointments ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub coach_uid: String,
    pub date: NaiveDate,
    pub hour: String,
}

/// Book an open slot with a coach.
async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<BookRequest>,
) -> Result<(StatusCode, Json<Appointment>)> {
    let hour = booking::validate_booking(
        &body.coach_uid,
        &auth.uid,
        body.date,
        &body.hour,
        today_utc(),
    )?;

    let coach = state
        .db
        .get_user(&body.coach_uid)
        .await?
        .filter(|u| u.role.can_coach())
        .ok_or_else(|| AppError::NotFound(format!("Coach {}", body.coach_uid)))?;

    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        coach_uid: coach.uid,
        client_uid: auth.uid.clone(),
        date: body.date,
        hour,
        status: AppointmentStatus::Confirme,
        created_at: now_rfc3339(),
        updated_at: None,
    };

    state.db.reserve_slot(&appointment).await?;

    tracing::info!(
        appointment_id = %appointment.id,
        coach_uid = %appointment.coach_uid,
        client_uid = %appointment.client_uid,
        date = %appointment.date,
        hour = %appointment.hour,
        "Appointment booked"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ListAs {
    #[default]
    Client,
    Coach,
}

#[derive(Debug, Deserialize)]
struct AppointmentsQuery {
    #[serde(default, rename = "as")]
    as_role: ListAs,
}

async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>> {
    let as_coach = matches!(params.as_role, ListAs::Coach);
    Ok(Json(state.db.list_appointments(&auth.uid, as_coach).await?))
}

/// Fetch an appointment the caller takes part in.
async fn appointment_for(state: &AppState, id: &str, uid: &str) -> Result<Appointment> {
    let appointment = state
        .db
        .get_appointment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {}", id)))?;

    if !appointment.involves(uid) {
        tracing::warn!(uid, appointment_id = id, "Access to another user's appointment");
        return Err(AppError::Forbidden("Not your appointment".to_string()));
    }
    Ok(appointment)
}

/// Cancel an appointment (client or coach). The hour is offered again
/// unless the day has passed.
async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>> {
    let appointment = appointment_for(&state, &id, &auth.uid).await?;
    let reopen = appointment.date >= today_utc();

    let cancelled = state.db.cancel_appointment(&id, reopen).await?;

    tracing::info!(
        appointment_id = %id,
        by = %auth.uid,
        reopened = reopen,
        "Appointment cancelled"
    );
    Ok(Json(cancelled))
}

async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>> {
    let appointment = appointment_for(&state, &id, &auth.uid).await?;
    if appointment.coach_uid != auth.uid {
        tracing::warn!(uid = %auth.uid, appointment_id = %id, "Client tried to complete");
        return Err(AppError::Forbidden(
            "Only the coach can complete an appointment".to_string(),
        ));
    }

    let done = state.db.complete_appointment(&id).await?;
    tracing::info!(appointment_id = %id, coach_uid = %auth.uid, "Appointment completed");
    Ok(Json(done))
}
