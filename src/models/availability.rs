// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coach availability model.
//!
//! One document per coach and calendar day. The coach, the date and every
//! hour are explicit fields; the document ID is only an address and is never
//! parsed back.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// State of one cell in the coach's week grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Undefined,
    Available,
    Busy,
}

/// Why a slot could not be claimed or released.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("{0} is already booked")]
    AlreadyBooked(String),

    #[error("{0} is not open for booking")]
    NotAvailable(String),
}

/// One day of a coach's grid as submitted, hours already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGrid {
    pub date: NaiveDate,
    pub cells: Vec<(String, CellState)>,
}

/// Stored availability for one coach on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub coach_uid: String,
    pub date: NaiveDate,
    /// Hours ("HH:MM") open for booking
    #[serde(default)]
    pub available_hours: BTreeSet<String>,
    /// Hours the coach marked as unavailable
    #[serde(default)]
    pub busy_hours: BTreeSet<String>,
    /// Hours claimed by an appointment
    #[serde(default)]
    pub booked_hours: BTreeSet<String>,
    /// Booked hours the latest grid no longer offers
    #[serde(default)]
    pub withdrawn_hours: BTreeSet<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl AvailabilityDay {
    pub fn new(coach_uid: &str, date: NaiveDate) -> Self {
        Self {
            coach_uid: coach_uid.to_string(),
            date,
            available_hours: BTreeSet::new(),
            busy_hours: BTreeSet::new(),
            booked_hours: BTreeSet::new(),
            withdrawn_hours: BTreeSet::new(),
            updated_at: String::new(),
        }
    }

    /// Firestore document ID for a coach's day.
    pub fn document_id(coach_uid: &str, date: NaiveDate) -> String {
        format!("{}_{}", urlencoding::encode(coach_uid), date)
    }

    /// Replace the published grid for this day.
    ///
    /// Booked hours are kept as they are; an `Available` cell on an hour that
    /// is already booked is ignored. Returns the hours that were skipped for
    /// that reason. A booked hour the grid does not offer again is remembered
    /// as withdrawn and stays closed when its booking is released.
    pub fn apply_grid<'a, I>(&mut self, cells: I, now: &str) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, CellState)>,
    {
        self.available_hours.clear();
        self.busy_hours.clear();
        let mut skipped = Vec::new();

        for (hour, state) in cells {
            match state {
                CellState::Undefined => {}
                CellState::Available if self.booked_hours.contains(hour) => {
                    skipped.push(hour.to_string());
                }
                CellState::Available => {
                    self.available_hours.insert(hour.to_string());
                }
                CellState::Busy => {
                    self.busy_hours.insert(hour.to_string());
                }
            }
        }

        // Busy wins if the same hour was sent twice with different states.
        self.available_hours.retain(|h| !self.busy_hours.contains(h));
        self.withdrawn_hours = self
            .booked_hours
            .iter()
            .filter(|h| self.busy_hours.contains(*h) || !skipped.contains(*h))
            .cloned()
            .collect();
        self.updated_at = now.to_string();
        skipped
    }

    /// Claim an open hour.
    pub fn reserve(&mut self, hour: &str, now: &str) -> Result<(), SlotError> {
        if self.booked_hours.contains(hour) {
            return Err(SlotError::AlreadyBooked(hour.to_string()));
        }
        if !self.available_hours.remove(hour) {
            return Err(SlotError::NotAvailable(hour.to_string()));
        }
        self.booked_hours.insert(hour.to_string());
        self.updated_at = now.to_string();
        Ok(())
    }

    /// Drop the booking on an hour.
    ///
    /// With `reopen` the hour goes back to the pool, unless the coach has
    /// since marked it busy or left it out of the grid. Returns `false` if
    /// the hour was not booked.
    pub fn release(&mut self, hour: &str, reopen: bool, now: &str) -> bool {
        if !self.booked_hours.remove(hour) {
            return false;
        }
        let withdrawn = self.withdrawn_hours.remove(hour);
        if reopen && !withdrawn && !self.busy_hours.contains(hour) {
            self.available_hours.insert(hour.to_string());
        }
        self.updated_at = now.to_string();
        true
    }

    /// Hours still open for booking, in order.
    pub fn free_hours(&self) -> Vec<String> {
        self.available_hours.iter().cloned().collect()
    }
}

/// Normalize a free-text hour ("9:00", "09h30", "14h") to "HH:MM".
pub fn normalize_hour(raw: &str) -> Option<String> {
    let raw = raw.trim();
    ["%H:%M", "%Hh%M", "%HH%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            let hour = raw.strip_suffix(['h', 'H'])?.parse::<u32>().ok()?;
            NaiveTime::from_hms_opt(hour, 0, 0)
        })
        .map(|t| t.format("%H:%M").to_string())
}
