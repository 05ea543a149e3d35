// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coach booking: fitness coaching backend
//!
//! This crate provides the JSON API behind the coaching app: accounts and
//! profiles, calorie tracking, coach availability and appointment booking,
//! admin user management and plan subscriptions.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{EmailService, PaymentService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub email: EmailService,
    pub payments: PaymentService,
}
