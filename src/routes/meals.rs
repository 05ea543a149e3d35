// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal log and calorie routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityLevel, Meal, MealType, Sex};
use crate::routes::load_user;
use crate::services::nutrition::{self, DailySummary};
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// Most steps accepted for the burned-calories estimate.
const MAX_STEPS: u32 = 200_000;

/// Meal routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meals", get(list_meals).post(add_meal))
        .route("/api/meals/summary", get(daily_summary))
        .route("/api/meals/{id}", delete(delete_meal))
        .route("/api/calories/compute", post(compute_calories))
}

// ─── Meals ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct AddMealRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(range(max = 10000))]
    pub calories: u32,
    pub meal_type: MealType,
    pub date: NaiveDate,
    #[validate(url)]
    pub photo_url: Option<String>,
}

async fn add_meal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<AddMealRequest>,
) -> Result<(StatusCode, Json<Meal>)> {
    body.validate()?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be blank".to_string()));
    }

    let meal = Meal {
        id: uuid::Uuid::new_v4().to_string(),
        owner_uid: auth.uid.clone(),
        name: name.to_string(),
        calories: body.calories,
        meal_type: body.meal_type,
        date: body.date,
        photo_url: body.photo_url,
        created_at: now_rfc3339(),
    };
    state.db.add_meal(&meal).await?;

    tracing::debug!(
        uid = %auth.uid,
        meal_id = %meal.id,
        date = %meal.date,
        calories = meal.calories,
        "Meal logged"
    );
    Ok((StatusCode::CREATED, Json(meal)))
}

#[derive(Debug, Deserialize)]
struct MealsQuery {
    date: NaiveDate,
    meal_type: Option<MealType>,
}

/// Meals of one day, optionally of one type, in the order they were logged.
async fn list_meals(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<MealsQuery>,
) -> Result<Json<Vec<Meal>>> {
    let mut meals = state.db.get_meals_for_day(&auth.uid, params.date).await?;
    if let Some(meal_type) = params.meal_type {
        meals.retain(|m| m.meal_type == meal_type);
    }
    meals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(meals))
}

async fn delete_meal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let meal = state
        .db
        .get_meal(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meal {}", id)))?;

    if meal.owner_uid != auth.uid {
        tracing::warn!(uid = %auth.uid, meal_id = %id, "Attempt to delete another user's meal");
        return Err(AppError::Forbidden("Not your meal".to_string()));
    }

    state.db.delete_meal(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    date: NaiveDate,
    #[serde(default)]
    steps: u32,
}

/// Calorie totals for a day against the user's target.
async fn daily_summary(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<DailySummary>> {
    if params.steps > MAX_STEPS {
        return Err(AppError::BadRequest(format!(
            "steps must be at most {}",
            MAX_STEPS
        )));
    }

    let user = load_user(&state, &auth.uid).await?;
    let meals = state.db.get_meals_for_day(&auth.uid, params.date).await?;
    let target = user.daily_calories.or_else(|| nutrition::target_for(&user));

    Ok(Json(nutrition::summarize_day(&meals, target, params.steps)))
}

// ─── Calculator ──────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ComputeRequest {
    #[validate(range(min = 20.0, max = 400.0))]
    pub weight_kg: f64,
    #[validate(range(min = 80.0, max = 260.0))]
    pub height_cm: f64,
    #[validate(range(min = 10, max = 120))]
    pub age: u32,
    pub sex: Sex,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ComputeResponse {
    pub bmr: f64,
    pub multiplier: f64,
    pub daily_calories: f64,
}

/// Pure calculator; nothing is stored.
async fn compute_calories(Json(body): Json<ComputeRequest>) -> Result<Json<ComputeResponse>> {
    body.validate()?;
    let level = body.activity_level.unwrap_or(ActivityLevel::Unknown);
    let bmr = nutrition::bmr(body.weight_kg, body.height_cm, body.age, body.sex);
    let multiplier = nutrition::activity_multiplier(level);

    Ok(Json(ComputeResponse {
        bmr,
        multiplier,
        daily_calories: bmr * multiplier,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compute_reference_profile() {
        let Json(res) = compute_calories(Json(ComputeRequest {
            weight_kg: 70.0,
            height_cm: 175.0,
            age: 30,
            sex: Sex::Homme,
            activity_level: Some(ActivityLevel::Moderee),
        }))
        .await
        .unwrap();

        assert!((res.bmr - 1648.75).abs() < 1e-9);
        assert!((res.daily_calories - 2555.5625).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_compute_rejects_out_of_range() {
        let err = compute_calories(Json(ComputeRequest {
            weight_kg: 5.0,
            height_cm: 175.0,
            age: 30,
            sex: Sex::Femme,
            activity_level: None,
        }))
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_add_meal_validation() {
        let req: AddMealRequest = serde_json::from_value(serde_json::json!({
            "name": "Salade",
            "calories": 20000,
            "meal_type": "dejeuner",
            "date": "2026-03-02"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
