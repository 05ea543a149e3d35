// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Appointment model for storage and API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AppointmentStatus {
    #[serde(rename = "confirmé")]
    Confirme,
    #[serde(rename = "annulé")]
    Annule,
    #[serde(rename = "terminé")]
    Termine,
}

/// Stored appointment record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Appointment {
    /// Generated ID (also used as document ID)
    pub id: String,
    pub coach_uid: String,
    pub client_uid: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// Slot hour ("HH:MM")
    pub hour: String,
    pub status: AppointmentStatus,
    /// When the booking was made (ISO 8601)
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Appointment {
    /// Whether `uid` is one of the two parties of this appointment.
    pub fn involves(&self, uid: &str) -> bool {
        self.client_uid == uid || self.coach_uid == uid
    }
}
