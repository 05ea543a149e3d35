// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::plan::PlanTier;

/// Role governing which features and permissions a user has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Utilisateur,
    Coach,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Utilisateur => "utilisateur",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    /// Coaches and admins can manage availability and complete sessions.
    pub fn can_coach(&self) -> bool {
        matches!(self, Role::Coach | Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utilisateur" => Ok(Role::Utilisateur),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Homme,
    Femme,
}

/// Self-reported activity level used to scale the BMR.
///
/// Anything we don't recognise deserializes to `Unknown`, which uses the
/// sedentary multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentaire,
    Leger,
    Moderee,
    Intense,
    #[serde(other)]
    Unknown,
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Generated identifier (also used as document ID)
    pub uid: String,
    /// Login e-mail, stored lower-cased
    pub email: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    /// Derived daily calorie target (see `services::nutrition`)
    #[serde(default)]
    pub daily_calories: Option<f64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Active subscription tier, if any
    #[serde(default)]
    pub plan: Option<PlanTier>,
    /// Coach rating (0..=5), only meaningful for coaches
    #[serde(default)]
    pub rating: Option<f64>,
    /// When the account was created (ISO 8601)
    pub created_at: String,
    /// Last profile change (ISO 8601)
    pub updated_at: String,
}

impl User {
    /// Build a fresh account document with the default role.
    pub fn new(uid: String, email: &str, display_name: &str, now: &str) -> Self {
        Self {
            uid,
            email: email.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            role: Role::Utilisateur,
            weight_kg: None,
            height_cm: None,
            age: None,
            sex: None,
            activity_level: None,
            daily_calories: None,
            avatar_url: None,
            plan: None,
            rating: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Password credentials, kept out of the profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub uid: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub updated_at: String,
}

/// E-mail uniqueness index, keyed by the encoded lower-case e-mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailIndex {
    pub email: String,
    pub uid: String,
}

/// Pending password reset, keyed by the SHA-256 hash of the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub uid: String,
    pub token_hash: String,
    /// Expiry (ISO 8601)
    pub expires_at: String,
}

/// Public view of a user returned by the API.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub activity_level: Option<ActivityLevel>,
    pub daily_calories: Option<f64>,
    pub avatar_url: Option<String>,
    pub plan: Option<PlanTier>,
    pub rating: Option<f64>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            weight_kg: user.weight_kg,
            height_cm: user.height_cm,
            age: user.age,
            sex: user.sex,
            activity_level: user.activity_level,
            daily_calories: user.daily_calories,
            avatar_url: user.avatar_url,
            plan: user.plan,
            rating: user.rating,
            created_at: user.created_at,
        }
    }
}
