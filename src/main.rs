// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coach booking API server
//!
//! Backend for the coaching app: accounts, calorie tracking, coach
//! availability and bookings, admin tools and plan subscriptions.

use coach_booking::{
    config::Config,
    db::FirestoreDb,
    models::Plan,
    services::{EmailService, PaymentService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting coach booking API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    seed_plans(&db, &config.payment_currency).await?;

    let email = EmailService::new(config.smtp.as_ref()).expect("Failed to initialize e-mail");

    let payments = PaymentService::new(config.stripe_secret_key.clone());
    if payments.is_enabled() {
        tracing::info!(currency = %config.payment_currency, "Payments enabled");
    } else {
        tracing::warn!("STRIPE_SECRET_KEY not set, subscriptions are disabled");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        email,
        payments,
    });

    // Build router
    let app = coach_booking::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Write the default plan catalog if none exists yet.
async fn seed_plans(db: &FirestoreDb, currency: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !db.list_plans().await?.is_empty() {
        return Ok(());
    }

    for plan in Plan::default_catalog(currency) {
        db.upsert_plan(&plan).await?;
    }
    tracing::info!(currency, "Seeded default plan catalog");
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coach_booking=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
