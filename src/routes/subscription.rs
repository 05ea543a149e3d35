// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plan catalog and subscription routes.

use axum::{
    extract::State,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{PaymentReceipt, Plan, PlanTier, UserResponse};
use crate::services::payment;
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/plans", get(list_plans))
        .route("/api/subscription/checkout", post(start_checkout))
        .route("/api/subscription/confirm", post(confirm_subscription))
        .route("/api/subscription", delete(cancel_subscription))
}

async fn list_plans(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Plan>>> {
    let mut plans = state.db.list_plans().await?;
    plans.sort_by_key(|p| p.price_cents);
    Ok(Json(plans))
}

async fn plan_for(state: &AppState, tier: PlanTier) -> Result<Plan> {
    state
        .db
        .get_plan(tier)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Plan {}", tier.as_str())))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub tier: PlanTier,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckoutResponse {
    pub payment_intent_id: String,
    /// Handed to the payment sheet on the device
    pub client_secret: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount: u64,
    pub currency: String,
}

/// Create a payment intent for a plan.
async fn start_checkout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let plan = plan_for(&state, body.tier).await?;
    let intent = state
        .payments
        .create_payment_intent(&plan, &auth.uid)
        .await?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| AppError::Payment("Payment intent has no client secret".to_string()))?;

    Ok(Json(CheckoutResponse {
        payment_intent_id: intent.id,
        client_secret,
        amount: intent.amount,
        currency: intent.currency,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub tier: PlanTier,
    pub payment_intent_id: String,
}

/// Grant a plan once the payment provider reports the intent as paid.
///
/// Each intent grants a plan once; replaying it gives 402.
async fn confirm_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<UserResponse>> {
    payment::validate_intent_id(&body.payment_intent_id)?;
    let plan = plan_for(&state, body.tier).await?;

    let intent = state
        .payments
        .retrieve_payment_intent(&body.payment_intent_id)
        .await?;
    payment::verify_intent(&intent, &plan, &auth.uid, body.tier)?;

    let receipt = PaymentReceipt {
        payment_intent_id: intent.id.clone(),
        uid: auth.uid.clone(),
        tier: body.tier,
        amount: intent.amount,
        currency: intent.currency.clone(),
        consumed_at: now_rfc3339(),
    };
    let user = state.db.apply_plan_payment(&receipt).await?;

    tracing::info!(
        uid = %auth.uid,
        tier = body.tier.as_str(),
        intent = %intent.id,
        "Subscription activated"
    );
    Ok(Json(user.into()))
}

async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let now = now_rfc3339();
    let (user, cancelled) = state
        .db
        .update_user(&auth.uid, move |user| {
            let tier = user.plan.take();
            if tier.is_some() {
                user.updated_at = now.clone();
            }
            Ok(tier)
        })
        .await?;
    if let Some(tier) = cancelled {
        tracing::info!(uid = %auth.uid, tier = tier.as_str(), "Subscription cancelled");
    }
    Ok(Json(user.into()))
}
