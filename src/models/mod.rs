// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod appointment;
pub mod availability;
pub mod meal;
pub mod plan;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus};
pub use availability::{AvailabilityDay, CellState, SlotError};
pub use meal::{Meal, MealType};
pub use plan::{PaymentReceipt, Plan, PlanTier};
pub use user::{ActivityLevel, Credentials, Role, Sex, User, UserResponse};
