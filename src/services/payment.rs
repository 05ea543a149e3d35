// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stripe payment intents for plan subscriptions.
//!
//! The mobile app confirms the card with the hosted payment sheet; the server
//! only creates the intent and later re-reads it to check that it succeeded
//! before granting the plan.

use crate::error::AppError;
use crate::models::{Plan, PlanTier};
use serde::Deserialize;
use std::collections::HashMap;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

/// Stripe REST client.
#[derive(Clone)]
pub struct PaymentService {
    http: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

/// Subset of a Stripe PaymentIntent we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentService {
    /// Create a client. Payments are disabled when `secret_key` is `None`.
    pub fn new(secret_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: STRIPE_API_URL.to_string(),
            secret_key,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }

    fn key(&self) -> Result<&str, AppError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| AppError::Payment("Payments are not configured".to_string()))
    }

    /// Create a payment intent for one month of `plan`, tagged with the buyer.
    pub async fn create_payment_intent(
        &self,
        plan: &Plan,
        uid: &str,
    ) -> Result<PaymentIntent, AppError> {
        let key = self.key()?;
        let url = format!("{}/payment_intents", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .form(&[
                ("amount", plan.price_cents.to_string()),
                ("currency", plan.currency.clone()),
                ("automatic_payment_methods[enabled]", "true".to_string()),
                ("metadata[uid]", uid.to_string()),
                ("metadata[tier]", plan.tier.as_str().to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        let intent: PaymentIntent = self.check_response_json(response).await?;
        tracing::info!(uid, tier = plan.tier.as_str(), intent = %intent.id, "Payment intent created");
        Ok(intent)
    }

    /// Fetch a payment intent by ID.
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, AppError> {
        validate_intent_id(id)?;
        let key = self.key()?;
        let url = format!("{}/payment_intents/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 {
                return Err(AppError::NotFound("Payment intent".to_string()));
            }

            return Err(AppError::Payment(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("JSON parse error: {}", e)))
    }
}

/// Reject anything that is not a Stripe intent ID before building a URL.
pub fn validate_intent_id(id: &str) -> Result<(), AppError> {
    let valid = id.starts_with("pi_")
        && id.len() <= 255
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid payment_intent_id".to_string()))
    }
}

/// Check that an intent really paid for `tier` by `uid`.
pub fn verify_intent(
    intent: &PaymentIntent,
    plan: &Plan,
    uid: &str,
    tier: PlanTier,
) -> Result<(), AppError> {
    if intent.status != "succeeded" {
        return Err(AppError::PaymentRequired(format!(
            "payment status is '{}'",
            intent.status
        )));
    }
    if intent.amount != plan.price_cents || !intent.currency.eq_ignore_ascii_case(&plan.currency) {
        return Err(AppError::PaymentRequired(
            "payment amount does not match the plan".to_string(),
        ));
    }
    if intent.metadata.get("uid").map(String::as_str) != Some(uid)
        || intent.metadata.get("tier").map(String::as_str) != Some(tier.as_str())
    {
        return Err(AppError::PaymentRequired(
            "payment was made for another account or plan".to_string(),
        ));
    }
    Ok(())
}
