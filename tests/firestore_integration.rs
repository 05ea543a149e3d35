// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at it, e.g. localhost:8080.
//!
//! Every test uses fresh uids, so runs against a shared emulator do not
//! interfere.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, NaiveDate, Utc};
use coach_booking::db::FirestoreDb;
use coach_booking::error::AppError;
use coach_booking::models::availability::DayGrid;
use coach_booking::models::user::{Credentials, PasswordReset};
use coach_booking::models::{
    Appointment, AppointmentStatus, CellState, Meal, MealType, PaymentReceipt, Plan, PlanTier,
    Role,
};
use coach_booking::services::password;
use coach_booking::services::profile::{self, ProfileUpdate};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

mod common;
use common::{create_test_app_with_db, create_test_jwt, test_db, test_user, unique_id};

fn future_date(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

fn grid(date: NaiveDate, cells: &[(&str, CellState)]) -> DayGrid {
    DayGrid {
        date,
        cells: cells.iter().map(|(h, s)| (h.to_string(), *s)).collect(),
    }
}

async fn create_user(db: &FirestoreDb, role: Role) -> String {
    let uid = unique_id("user");
    let user = test_user(&uid, role);
    let credentials = Credentials {
        uid: uid.clone(),
        password_hash: password::hash_password("initial password").unwrap(),
        updated_at: user.created_at.clone(),
    };
    db.create_account(&user, &credentials).await.unwrap();
    uid
}

/// Book `hour` on `date` with a fresh published slot.
async fn booked(
    db: &FirestoreDb,
    coach: &str,
    client: &str,
    date: NaiveDate,
    hour: &str,
) -> Appointment {
    db.publish_availability_day(coach, &grid(date, &[(hour, CellState::Available)]))
        .await
        .unwrap();
    let appt = appointment(coach, client, date, hour);
    db.reserve_slot(&appt).await.unwrap();
    appt
}

fn post_as(
    uid: &str,
    role: Role,
    key: &[u8],
    uri: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(uid, role, key)),
        )
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn appointment(coach_uid: &str, client_uid: &str, date: NaiveDate, hour: &str) -> Appointment {
    Appointment {
        id: unique_id("appt"),
        coach_uid: coach_uid.to_string(),
        client_uid: client_uid.to_string(),
        date,
        hour: hour.to_string(),
        status: AppointmentStatus::Confirme,
        created_at: Utc::now().to_rfc3339(),
        updated_at: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_account_email_is_unique() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("user");
    let user = test_user(&uid, Role::Utilisateur);
    let credentials = Credentials {
        uid: uid.clone(),
        password_hash: "hash".to_string(),
        updated_at: user.created_at.clone(),
    };

    db.create_account(&user, &credentials).await.unwrap();

    let index = db
        .find_by_email(&user.email.to_uppercase())
        .await
        .unwrap()
        .expect("e-mail index entry");
    assert_eq!(index.uid, uid);

    // Same e-mail, different uid
    let mut other = test_user(&unique_id("user"), Role::Utilisateur);
    other.email = user.email.clone();
    let err = db.create_account(&other, &credentials).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(db.get_user(&other.uid).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// MEAL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_meals_are_queried_by_owner_and_day() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_id("user");
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let meal = |name: &str, date: NaiveDate, owner_uid: &str| Meal {
        id: unique_id("meal"),
        owner_uid: owner_uid.to_string(),
        name: name.to_string(),
        calories: 400,
        meal_type: MealType::Dejeuner,
        date,
        photo_url: None,
        created_at: Utc::now().to_rfc3339(),
    };

    db.add_meal(&meal("Salade", day, &owner)).await.unwrap();
    db.add_meal(&meal("Soupe", day, &owner)).await.unwrap();
    db.add_meal(&meal("Hier", day - Duration::days(1), &owner))
        .await
        .unwrap();
    db.add_meal(&meal("Autre", day, &unique_id("user")))
        .await
        .unwrap();

    let meals = db.get_meals_for_day(&owner, day).await.unwrap();
    let mut names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Salade", "Soupe"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// BOOKING TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_publish_book_cancel_cycle() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let client = unique_id("client");
    let date = future_date(3);

    let skipped = db
        .publish_availability_day(
            &coach,
            &grid(
                date,
                &[("09:00", CellState::Available), ("10:00", CellState::Busy)],
            ),
        )
        .await
        .unwrap();
    assert!(skipped.is_empty());

    let appt = appointment(&coach, &client, date, "09:00");
    db.reserve_slot(&appt).await.unwrap();

    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert!(day.booked_hours.contains("09:00"));
    assert!(day.available_hours.is_empty());

    // Re-publishing the same grid keeps the booking
    let skipped = db
        .publish_availability_day(&coach, &grid(date, &[("09:00", CellState::Available)]))
        .await
        .unwrap();
    assert_eq!(skipped, vec!["09:00"]);

    // Busy hour cannot be booked
    let err = db
        .reserve_slot(&appointment(&coach, &client, date, "10:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let cancelled = db.cancel_appointment(&appt.id, true).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Annule);

    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert!(day.available_hours.contains("09:00"));
    assert!(day.booked_hours.is_empty());

    // Second cancel is rejected and does not reopen twice
    let err = db.cancel_appointment(&appt.id, true).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = db.list_appointments(&client, false).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, AppointmentStatus::Annule);
}

#[tokio::test]
async fn test_concurrent_bookings_only_one_wins() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let coach = unique_id("coach");
    let date = future_date(5);

    db.publish_availability_day(&coach, &grid(date, &[("14:00", CellState::Available)]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let db = db.clone();
        let appt = appointment(&coach, &unique_id("client"), date, "14:00");
        handles.push(tokio::spawn(async move { db.reserve_slot(&appt).await }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => won += 1,
            // Losers either see the slot as taken or exhaust their retries
            Err(AppError::Conflict(_)) | Err(AppError::Database(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(won, 1);

    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert_eq!(day.booked_hours.len(), 1);
    assert!(day.available_hours.is_empty());

    let confirmed = db.list_appointments(&coach, true).await.unwrap();
    assert_eq!(confirmed.len(), 1);
}

#[tokio::test]
async fn test_complete_appointment() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let date = future_date(1);
    db.publish_availability_day(&coach, &grid(date, &[("08:00", CellState::Available)]))
        .await
        .unwrap();
    let appt = appointment(&coach, &unique_id("client"), date, "08:00");
    db.reserve_slot(&appt).await.unwrap();

    let done = db.complete_appointment(&appt.id).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Termine);

    let err = db.cancel_appointment(&appt.id, true).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// ADMIN / PLAN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_coach_cancels_clients_bookings() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_id("coach");
    let user = test_user(&uid, Role::Coach);
    let credentials = Credentials {
        uid: uid.clone(),
        password_hash: "hash".to_string(),
        updated_at: user.created_at.clone(),
    };
    db.create_account(&user, &credentials).await.unwrap();

    let client = unique_id("client");
    let date = future_date(2);
    let appt = booked(&db, &uid, &client, date, "11:00").await;

    let deleted = db.delete_user_data(&user).await.unwrap();
    // 1 availability day + credentials, index, profile
    assert_eq!(deleted, 4);

    assert!(db.get_user(&uid).await.unwrap().is_none());
    assert!(db.get_credentials(&uid).await.unwrap().is_none());
    assert!(db.find_by_email(&user.email).await.unwrap().is_none());
    assert!(db.get_availability_day(&uid, date).await.unwrap().is_none());

    // The client keeps a record of the booking
    let kept = db.get_appointment(&appt.id).await.unwrap().unwrap();
    assert_eq!(kept.status, AppointmentStatus::Annule);
}

#[tokio::test]
async fn test_delete_client_gives_hours_back() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let client_uid = create_user(&db, Role::Utilisateur).await;
    let client = db.get_user(&client_uid).await.unwrap().unwrap();
    let date = future_date(4);
    let appt = booked(&db, &coach, &client_uid, date, "11:00").await;

    let deleted = db.delete_user_data(&client).await.unwrap();
    // 1 appointment + credentials, index, profile
    assert_eq!(deleted, 4);

    assert!(db.get_appointment(&appt.id).await.unwrap().is_none());
    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert!(day.booked_hours.is_empty());
    assert!(day.available_hours.contains("11:00"));
}

#[tokio::test]
async fn test_plan_catalog_round_trip() {
    require_emulator!();

    let db = test_db().await;
    for plan in Plan::default_catalog("eur") {
        db.upsert_plan(&plan).await.unwrap();
    }

    let plus = db.get_plan(PlanTier::Plus).await.unwrap().unwrap();
    assert_eq!(plus.tier, PlanTier::Plus);
    assert_eq!(plus.currency, "eur");
    assert!(db.list_plans().await.unwrap().len() >= 3);
}

#[tokio::test]
async fn test_payment_intent_grants_plan_once() {
    require_emulator!();

    let db = test_db().await;
    let uid = create_user(&db, Role::Utilisateur).await;
    let receipt = PaymentReceipt {
        payment_intent_id: unique_id("pi").replace('-', "_"),
        uid: uid.clone(),
        tier: PlanTier::Plus,
        amount: 999,
        currency: "eur".to_string(),
        consumed_at: Utc::now().to_rfc3339(),
    };

    let user = db.apply_plan_payment(&receipt).await.unwrap();
    assert_eq!(user.plan, Some(PlanTier::Plus));

    // Cancelling and replaying the same payment does not restore the plan
    let (user, cancelled) = db
        .update_user(&uid, |user| Ok(user.plan.take()))
        .await
        .unwrap();
    assert_eq!(cancelled, Some(PlanTier::Plus));
    assert_eq!(user.plan, None);

    let err = db.apply_plan_payment(&receipt).await.unwrap_err();
    assert!(matches!(err, AppError::PaymentRequired(_)));
    assert_eq!(db.get_user(&uid).await.unwrap().unwrap().plan, None);
}

// ═══════════════════════════════════════════════════════════════════════════
// LIFECYCLE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_cancel_keeps_hour_coach_closed_after_booking() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let date = future_date(6);
    let appt = booked(&db, &coach, &unique_id("client"), date, "09:00").await;

    db.publish_availability_day(&coach, &grid(date, &[("09:00", CellState::Busy)]))
        .await
        .unwrap();
    db.cancel_appointment(&appt.id, true).await.unwrap();

    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert!(day.booked_hours.is_empty());
    assert!(day.busy_hours.contains("09:00"));
    assert!(!day.available_hours.contains("09:00"));
}

#[tokio::test]
async fn test_cancel_past_appointment_does_not_reopen() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let client = unique_id("client");
    let date = future_date(-2);
    let appt = booked(&db, &coach, &client, date, "09:00").await;

    let (app, state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(post_as(
            &client,
            Role::Utilisateur,
            &state.config.jwt_signing_key,
            &format!("/api/appointments/{}/cancel", appt.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let day = db.get_availability_day(&coach, date).await.unwrap().unwrap();
    assert!(day.booked_hours.is_empty());
    assert!(day.available_hours.is_empty());
    let stored = db.get_appointment(&appt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Annule);
}

#[tokio::test]
async fn test_outsider_cannot_cancel() {
    require_emulator!();

    let db = test_db().await;
    let coach = unique_id("coach");
    let appt = booked(&db, &coach, &unique_id("client"), future_date(3), "10:00").await;

    let (app, state) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(post_as(
            &unique_id("stranger"),
            Role::Utilisateur,
            &state.config.jwt_signing_key,
            &format!("/api/appointments/{}/cancel", appt.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = db.get_appointment(&appt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirme);
}

#[tokio::test]
async fn test_only_the_coach_completes() {
    require_emulator!();

    let db = test_db().await;
    let coach = create_user(&db, Role::Coach).await;
    // A coach booking another coach passes the role gate but is the client here
    let client = create_user(&db, Role::Coach).await;
    let appt = booked(&db, &coach, &client, future_date(2), "16:00").await;
    let uri = format!("/api/appointments/{}/complete", appt.id);

    let (app, state) = create_test_app_with_db(db.clone());
    let key = &state.config.jwt_signing_key;

    let response = app
        .clone()
        .oneshot(post_as(&client, Role::Coach, key, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let plain_client = create_user(&db, Role::Utilisateur).await;
    let response = app
        .clone()
        .oneshot(post_as(&plain_client, Role::Utilisateur, key, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = db.get_appointment(&appt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirme);

    let response = app
        .oneshot(post_as(&coach, Role::Coach, key, &uri, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_profile_edit_keeps_role_change() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    let uid = create_user(&db, Role::Coach).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let db = db.clone();
        let uid = uid.clone();
        handles.push(tokio::spawn(async move {
            let now = Utc::now().to_rfc3339();
            db.update_user(&uid, move |user| {
                profile::apply_update(user, ProfileUpdate::WeightKg(70.0 + i as f64), &now)
                    .map(Some)
            })
            .await
            .map(|_| ())
        }));
    }
    let demote = {
        let db = db.clone();
        let uid = uid.clone();
        tokio::spawn(async move {
            db.update_user(&uid, |user| {
                user.role = Role::Utilisateur;
                Ok(Some(()))
            })
            .await
            .map(|_| ())
        })
    };

    let demoted = demote.await.unwrap();
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    // Contended transactions may give up, but a committed demotion is never
    // written over by a profile edit.
    let user = db.get_user(&uid).await.unwrap().unwrap();
    if demoted.is_ok() {
        assert_eq!(user.role, Role::Utilisateur);
    } else {
        assert_eq!(user.role, Role::Coach);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PASSWORD RESET TESTS
// ═══════════════════════════════════════════════════════════════════════════

fn reset_request(token: &str, new_password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/password-reset/confirm")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"token": token, "new_password": new_password}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    require_emulator!();

    let db = test_db().await;
    let uid = create_user(&db, Role::Utilisateur).await;
    let (token, token_hash) = password::new_reset_token();
    db.set_password_reset(&PasswordReset {
        uid: uid.clone(),
        token_hash,
        expires_at: (Utc::now() + Duration::minutes(30)).to_rfc3339(),
    })
    .await
    .unwrap();

    let (app, _) = create_test_app_with_db(db.clone());
    let response = app
        .clone()
        .oneshot(reset_request(&token, "brand new password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let credentials = db.get_credentials(&uid).await.unwrap().unwrap();
    assert!(password::verify_password("brand new password", &credentials.password_hash).unwrap());

    let response = app
        .oneshot(reset_request(&token, "another password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    require_emulator!();

    let db = test_db().await;
    let uid = create_user(&db, Role::Utilisateur).await;
    let (token, token_hash) = password::new_reset_token();
    db.set_password_reset(&PasswordReset {
        uid: uid.clone(),
        token_hash: token_hash.clone(),
        expires_at: (Utc::now() - Duration::minutes(1)).to_rfc3339(),
    })
    .await
    .unwrap();

    let (app, _) = create_test_app_with_db(db.clone());
    let response = app
        .oneshot(reset_request(&token, "brand new password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The expired entry is gone and the old password still works
    assert!(db.consume_password_reset(&token_hash).await.unwrap().is_none());
    let credentials = db.get_credentials(&uid).await.unwrap().unwrap();
    assert!(password::verify_password("initial password", &credentials.password_hash).unwrap());
}
