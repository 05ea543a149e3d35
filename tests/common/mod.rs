// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use coach_booking::config::Config;
use coach_booking::db::FirestoreDb;
use coach_booking::middleware::auth::create_jwt;
use coach_booking::models::{Role, User};
use coach_booking::routes::create_router;
use coach_booking::services::{EmailService, PaymentService};
use coach_booking::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(test_db_offline())
}

/// Create a test app on top of a given database (usually the emulator).
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        db,
        email: EmailService::new_mock(),
        payments: PaymentService::new(None),
    });

    (create_router(state.clone()), state)
}

/// Session token as issued by sign-in.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, role: Role, signing_key: &[u8]) -> String {
    create_jwt(uid, role, signing_key).expect("Failed to create JWT")
}

/// Unique ID for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// A stored user with the given role.
#[allow(dead_code)]
pub fn test_user(uid: &str, role: Role) -> User {
    let now = chrono::Utc::now().to_rfc3339();
    let mut user = User::new(uid.to_string(), &format!("{}@example.com", uid), "Test", &now);
    user.role = role;
    user
}
