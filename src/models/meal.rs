// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal log model for storage and API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    PetitDejeuner,
    Dejeuner,
    Diner,
    Collation,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::PetitDejeuner,
        MealType::Dejeuner,
        MealType::Diner,
        MealType::Collation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::PetitDejeuner => "petit_dejeuner",
            MealType::Dejeuner => "dejeuner",
            MealType::Diner => "diner",
            MealType::Collation => "collation",
        }
    }
}

/// Stored meal record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    /// Generated ID (also used as document ID)
    pub id: String,
    /// Owner's user ID
    pub owner_uid: String,
    pub name: String,
    pub calories: u32,
    pub meal_type: MealType,
    /// Calendar day the meal was eaten, in the user's local time
    pub date: NaiveDate,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// When the entry was logged (ISO 8601)
    pub created_at: String,
}
