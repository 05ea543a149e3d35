// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription plan catalog.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Plus,
    Pro,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Basic, PlanTier::Plus, PlanTier::Pro];

    /// Document ID of the plan in the `plans` collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Basic => "basic",
            PlanTier::Plus => "plus",
            PlanTier::Pro => "pro",
        }
    }
}

/// Plan document stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Plan {
    pub tier: PlanTier,
    pub name: String,
    /// Monthly price in the smallest currency unit
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub price_cents: u64,
    /// ISO currency code, lower-case ("eur")
    pub currency: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Receipt of a payment intent that has been turned into a plan.
///
/// Keyed by the intent ID; an intent with a receipt is never accepted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_intent_id: String,
    pub uid: String,
    pub tier: PlanTier,
    pub amount: u64,
    pub currency: String,
    pub consumed_at: String,
}

impl Plan {
    /// Catalog written on first start when the `plans` collection is empty.
    pub fn default_catalog(currency: &str) -> Vec<Plan> {
        let plan = |tier: PlanTier, name: &str, price_cents: u64, features: &[&str]| Plan {
            tier,
            name: name.to_string(),
            price_cents,
            currency: currency.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        };

        vec![
            plan(
                PlanTier::Basic,
                "Basic",
                499,
                &["Suivi des repas", "Calcul des calories"],
            ),
            plan(
                PlanTier::Plus,
                "Plus",
                999,
                &["Tout Basic", "Réservation de coachs"],
            ),
            plan(
                PlanTier::Pro,
                "Pro",
                1999,
                &["Tout Plus", "Séances illimitées", "Support prioritaire"],
            ),
        ]
    }
}
