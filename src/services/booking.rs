// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking rules that do not need the database.
//!
//! The handlers in `routes::booking` validate input here and then hand the
//! normalized values to the transactional operations in `db::firestore`.

use crate::error::{AppError, Result};
use crate::models::availability::{normalize_hour, DayGrid};
use crate::models::{AvailabilityDay, CellState};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Days shown when the client does not give a range.
pub const DEFAULT_RANGE_DAYS: i64 = 14;

/// Longest range a client may ask for in one call.
pub const MAX_RANGE_DAYS: i64 = 62;

/// Most distinct days accepted in one publication.
pub const MAX_GRID_DAYS: usize = 31;

/// One cell of the coach's grid as sent by the app.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GridCell {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub hour: String,
    pub state: CellState,
}

/// A day with at least one open hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OpenDay {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub hours: Vec<String>,
}

/// Group grid cells by date, normalizing every hour label.
///
/// Cells dated before `today` are rejected.
pub fn group_grid(cells: Vec<GridCell>, today: NaiveDate) -> Result<Vec<DayGrid>> {
    if cells.is_empty() {
        return Err(AppError::BadRequest("Grid is empty".to_string()));
    }

    let mut days: BTreeMap<NaiveDate, Vec<(String, CellState)>> = BTreeMap::new();
    for cell in cells {
        if cell.date < today {
            return Err(AppError::BadRequest(format!(
                "Cannot publish availability for past date {}",
                cell.date
            )));
        }
        let hour = normalize_hour(&cell.hour)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid hour '{}'", cell.hour)))?;
        days.entry(cell.date).or_default().push((hour, cell.state));
    }

    if days.len() > MAX_GRID_DAYS {
        return Err(AppError::BadRequest(format!(
            "A grid may cover at most {} days",
            MAX_GRID_DAYS
        )));
    }

    Ok(days
        .into_iter()
        .map(|(date, cells)| DayGrid { date, cells })
        .collect())
}

/// Check a booking request and return the normalized hour.
pub fn validate_booking(
    coach_uid: &str,
    client_uid: &str,
    date: NaiveDate,
    hour: &str,
    today: NaiveDate,
) -> Result<String> {
    if coach_uid.trim().is_empty() {
        return Err(AppError::BadRequest("coach_uid is required".to_string()));
    }
    if coach_uid == client_uid {
        return Err(AppError::BadRequest(
            "A coach cannot book their own slot".to_string(),
        ));
    }
    if date < today {
        return Err(AppError::BadRequest(format!(
            "Cannot book a slot in the past ({})",
            date
        )));
    }
    normalize_hour(hour).ok_or_else(|| AppError::BadRequest(format!("Invalid hour '{}'", hour)))
}

/// Resolve the listing range, defaulting to two weeks from today.
pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let from = from.unwrap_or(today);
    let to = to.unwrap_or(from + Duration::days(DEFAULT_RANGE_DAYS - 1));

    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be before 'from'".to_string(),
        ));
    }
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "Range may cover at most {} days",
            MAX_RANGE_DAYS
        )));
    }
    Ok((from, to))
}

/// Days with free hours, sorted by date. Empty days are dropped.
pub fn open_days(days: &[AvailabilityDay]) -> Vec<OpenDay> {
    let mut open: Vec<OpenDay> = days
        .iter()
        .filter(|d| !d.available_hours.is_empty())
        .map(|d| OpenDay {
            date: d.date,
            hours: d.free_hours(),
        })
        .collect();
    open.sort_by_key(|d| d.date);
    open
}
