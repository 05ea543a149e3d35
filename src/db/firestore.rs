// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, credentials, e-mail index, password resets)
//! - Meals (per-user meal log)
//! - Availability and appointments (booking flow)
//! - Plans (subscription catalog and consumed payment intents)
//!
//! Every multi-document write that depends on a prior read runs inside a
//! Firestore transaction. Firestore retries the closure on contention, so two
//! clients racing for the same slot cannot both succeed.

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::{Credentials, EmailIndex, PasswordReset};
use crate::models::availability::DayGrid;
use crate::models::{
    Appointment, AppointmentStatus, AvailabilityDay, Meal, PaymentReceipt, Plan, PlanTier, Role,
    User,
};
use chrono::NaiveDate;
use futures_util::FutureExt;
use serde::{de::DeserializeOwned, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, uid).await
    }

    /// Read-modify-write of one user document in a transaction.
    ///
    /// `apply` returns `Ok(None)` when it changed nothing, in which case
    /// nothing is written; otherwise its value is handed back with the
    /// updated user. It may run more than once on contention.
    pub async fn update_user<F, T>(
        &self,
        uid: &str,
        apply: F,
    ) -> Result<(User, Option<T>), AppError>
    where
        F: Fn(&mut User) -> Result<Option<T>, AppError> + Clone + Send + Sync + 'static,
        T: Send + 'static,
    {
        let uid = uid.to_string();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let uid = uid.clone();
                let apply = apply.clone();

                async move {
                    let stored: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&uid)
                        .await?;

                    let Some(mut user) = stored else {
                        return Ok(Err(AppError::NotFound(format!("User {}", uid))));
                    };

                    let outcome = match apply(&mut user) {
                        Ok(Some(outcome)) => outcome,
                        Ok(None) => return Ok(Ok((user, None))),
                        Err(e) => return Ok(Err(e)),
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&uid)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Ok((user, Some(outcome))))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("User update failed: {}", e)))?
    }

    /// All users (admin screens filter and sort in memory).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Users holding a given role.
    pub async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("role").eq(role.as_str()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new account: profile, credentials and e-mail index.
    ///
    /// Fails with `Conflict` if the e-mail is already registered. The
    /// uniqueness check and the writes run in one transaction.
    pub async fn create_account(
        &self,
        user: &User,
        credentials: &Credentials,
    ) -> Result<(), AppError> {
        let index_id = email_doc_id(&user.email);
        let user = user.clone();
        let credentials = credentials.clone();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let index_id = index_id.clone();
                let user = user.clone();
                let credentials = credentials.clone();

                async move {
                    let existing: Option<EmailIndex> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::EMAIL_INDEX)
                        .obj()
                        .one(&index_id)
                        .await?;

                    if existing.is_some() {
                        return Ok(Err(AppError::Conflict(
                            "E-mail already registered".to_string(),
                        )));
                    }

                    let index = EmailIndex {
                        email: user.email.clone(),
                        uid: user.uid.clone(),
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::EMAIL_INDEX)
                        .document_id(&index_id)
                        .object(&index)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.uid)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::CREDENTIALS)
                        .document_id(&credentials.uid)
                        .object(&credentials)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Account creation failed: {}", e)))?
    }

    /// Look up the account registered under an e-mail.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<EmailIndex>, AppError> {
        self.get_doc(collections::EMAIL_INDEX, &email_doc_id(email))
            .await
    }

    pub async fn get_credentials(&self, uid: &str) -> Result<Option<Credentials>, AppError> {
        self.get_doc(collections::CREDENTIALS, uid).await
    }

    pub async fn set_credentials(&self, credentials: &Credentials) -> Result<(), AppError> {
        self.set_doc(collections::CREDENTIALS, &credentials.uid, credentials)
            .await
    }

    // ─── Password Reset Operations ───────────────────────────────

    pub async fn set_password_reset(&self, reset: &PasswordReset) -> Result<(), AppError> {
        self.set_doc(collections::PASSWORD_RESETS, &reset.token_hash, reset)
            .await
    }

    /// Take a pending reset out of the store.
    ///
    /// The read and the delete share a transaction, so a token can be
    /// redeemed once even when two requests race.
    pub async fn consume_password_reset(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordReset>, AppError> {
        let token_hash = token_hash.to_string();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let token_hash = token_hash.clone();

                async move {
                    let stored: Option<PasswordReset> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::PASSWORD_RESETS)
                        .obj()
                        .one(&token_hash)
                        .await?;

                    if stored.is_some() {
                        db.fluent()
                            .delete()
                            .from(collections::PASSWORD_RESETS)
                            .document_id(&token_hash)
                            .add_to_transaction(transaction)?;
                    }

                    Ok(stored)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to redeem reset token: {}", e)))
    }

    // ─── Meal Operations ─────────────────────────────────────────

    pub async fn add_meal(&self, meal: &Meal) -> Result<(), AppError> {
        self.set_doc(collections::MEALS, &meal.id, meal).await
    }

    pub async fn get_meal(&self, id: &str) -> Result<Option<Meal>, AppError> {
        self.get_doc(collections::MEALS, id).await
    }

    pub async fn delete_meal(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::MEALS, id).await
    }

    /// Meals a user logged for one calendar day.
    ///
    /// Filters on owner and date in the query itself, so the cost does not
    /// grow with the user's whole history.
    pub async fn get_meals_for_day(
        &self,
        owner_uid: &str,
        date: NaiveDate,
    ) -> Result<Vec<Meal>, AppError> {
        let date = date.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEALS)
            .filter(|q| {
                q.for_all([
                    q.field("owner_uid").eq(owner_uid),
                    q.field("date").eq(date.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Availability Operations ─────────────────────────────────

    pub async fn get_availability_day(
        &self,
        coach_uid: &str,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityDay>, AppError> {
        self.get_doc(
            collections::AVAILABILITY,
            &AvailabilityDay::document_id(coach_uid, date),
        )
        .await
    }

    /// Availability documents for a coach between two dates (inclusive).
    pub async fn get_availability_range(
        &self,
        coach_uid: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailabilityDay>, AppError> {
        let from = from.to_string();
        let to = to.to_string();
        let mut days: Vec<AvailabilityDay> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::AVAILABILITY)
            .filter(|q| {
                q.for_all([
                    q.field("coach_uid").eq(coach_uid),
                    q.field("date").greater_than_or_equal(from.as_str()),
                    q.field("date").less_than_or_equal(to.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    /// Publish one day of a coach's grid.
    ///
    /// Reads the stored day inside the transaction so that hours booked in
    /// the meantime are kept booked. Returns the hours that could not be
    /// re-opened because they are booked.
    pub async fn publish_availability_day(
        &self,
        coach_uid: &str,
        grid: &DayGrid,
    ) -> Result<Vec<String>, AppError> {
        let coach_uid = coach_uid.to_string();
        let grid = grid.clone();
        let doc_id = AvailabilityDay::document_id(&coach_uid, grid.date);

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let coach_uid = coach_uid.clone();
                let grid = grid.clone();
                let doc_id = doc_id.clone();

                async move {
                    let stored: Option<AvailabilityDay> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::AVAILABILITY)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let mut day =
                        stored.unwrap_or_else(|| AvailabilityDay::new(&coach_uid, grid.date));
                    let now = crate::time_utils::now_rfc3339();
                    let skipped = day.apply_grid(
                        grid.cells.iter().map(|(hour, state)| (hour.as_str(), *state)),
                        &now,
                    );

                    db.fluent()
                        .update()
                        .in_col(collections::AVAILABILITY)
                        .document_id(&doc_id)
                        .object(&day)
                        .add_to_transaction(transaction)?;

                    Ok(skipped)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to publish availability: {}", e)))
    }

    // ─── Appointment Operations ──────────────────────────────────

    pub async fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, AppError> {
        self.get_doc(collections::APPOINTMENTS, id).await
    }

    /// Appointments where `uid` is the client, or the coach when `as_coach`.
    pub async fn list_appointments(
        &self,
        uid: &str,
        as_coach: bool,
    ) -> Result<Vec<Appointment>, AppError> {
        let field = if as_coach { "coach_uid" } else { "client_uid" };
        let mut appointments: Vec<Appointment> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::APPOINTMENTS)
            .filter(|q| q.field(field).eq(uid))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        appointments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.hour.cmp(&b.hour)));
        Ok(appointments)
    }

    /// Atomically claim a slot and create the appointment.
    ///
    /// The availability read, the slot update and the appointment insert
    /// commit together. If another booking touches the same day concurrently,
    /// Firestore retries with fresh data and the loser sees the slot as taken.
    pub async fn reserve_slot(&self, appointment: &Appointment) -> Result<(), AppError> {
        let appointment = appointment.clone();
        let doc_id = AvailabilityDay::document_id(&appointment.coach_uid, appointment.date);

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let appointment = appointment.clone();
                let doc_id = doc_id.clone();

                async move {
                    let stored: Option<AvailabilityDay> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::AVAILABILITY)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let Some(mut day) = stored else {
                        return Ok(Err(AppError::Conflict(format!(
                            "No availability published for {}",
                            appointment.date
                        ))));
                    };

                    let now = crate::time_utils::now_rfc3339();
                    if let Err(e) = day.reserve(&appointment.hour, &now) {
                        return Ok(Err(e.into()));
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::AVAILABILITY)
                        .document_id(&doc_id)
                        .object(&day)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::APPOINTMENTS)
                        .document_id(&appointment.id)
                        .object(&appointment)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Booking transaction failed: {}", e)))??;

        Ok(())
    }

    /// Atomically cancel an appointment and reopen its slot.
    ///
    /// The booking is always dropped from the coach's day. The hour is only
    /// offered again when `reopen_slot` is set (the date has not passed) and
    /// the coach's latest grid still offers it.
    pub async fn cancel_appointment(
        &self,
        id: &str,
        reopen_slot: bool,
    ) -> Result<Appointment, AppError> {
        let id = id.to_string();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let id = id.clone();

                async move {
                    let stored: Option<Appointment> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::APPOINTMENTS)
                        .obj()
                        .one(&id)
                        .await?;

                    let Some(mut appointment) = stored else {
                        return Ok(Err(AppError::NotFound(format!("Appointment {}", id))));
                    };
                    if appointment.status != AppointmentStatus::Confirme {
                        return Ok(Err(AppError::Conflict(
                            "Only confirmed appointments can be cancelled".to_string(),
                        )));
                    }

                    let now = crate::time_utils::now_rfc3339();
                    let day_id =
                        AvailabilityDay::document_id(&appointment.coach_uid, appointment.date);
                    let day: Option<AvailabilityDay> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::AVAILABILITY)
                        .obj()
                        .one(&day_id)
                        .await?;

                    if let Some(mut day) = day {
                        if day.release(&appointment.hour, reopen_slot, &now) {
                            db.fluent()
                                .update()
                                .in_col(collections::AVAILABILITY)
                                .document_id(&day_id)
                                .object(&day)
                                .add_to_transaction(transaction)?;
                        }
                    }

                    appointment.status = AppointmentStatus::Annule;
                    appointment.updated_at = Some(now);

                    db.fluent()
                        .update()
                        .in_col(collections::APPOINTMENTS)
                        .document_id(&appointment.id)
                        .object(&appointment)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(appointment))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Cancel transaction failed: {}", e)))?
    }

    /// Mark a confirmed appointment as done.
    ///
    /// Runs in a transaction so a concurrent cancellation cannot be
    /// overwritten.
    pub async fn complete_appointment(&self, id: &str) -> Result<Appointment, AppError> {
        let id = id.to_string();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let id = id.clone();

                async move {
                    let stored: Option<Appointment> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::APPOINTMENTS)
                        .obj()
                        .one(&id)
                        .await?;

                    let Some(mut appointment) = stored else {
                        return Ok(Err(AppError::NotFound(format!("Appointment {}", id))));
                    };
                    if appointment.status != AppointmentStatus::Confirme {
                        return Ok(Err(AppError::Conflict(
                            "Only confirmed appointments can be completed".to_string(),
                        )));
                    }

                    appointment.status = AppointmentStatus::Termine;
                    appointment.updated_at = Some(crate::time_utils::now_rfc3339());

                    db.fluent()
                        .update()
                        .in_col(collections::APPOINTMENTS)
                        .document_id(&appointment.id)
                        .object(&appointment)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(appointment))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Complete transaction failed: {}", e)))?
    }

    // ─── Plan Operations ─────────────────────────────────────────

    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLANS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_plan(&self, tier: PlanTier) -> Result<Option<Plan>, AppError> {
        self.get_doc(collections::PLANS, tier.as_str()).await
    }

    pub async fn upsert_plan(&self, plan: &Plan) -> Result<(), AppError> {
        self.set_doc(collections::PLANS, plan.tier.as_str(), plan)
            .await
    }

    /// Grant the plan paid for by a verified payment intent.
    ///
    /// The receipt and the user's plan are written together. An intent that
    /// already has a receipt is refused with `PaymentRequired`.
    pub async fn apply_plan_payment(&self, receipt: &PaymentReceipt) -> Result<User, AppError> {
        let receipt = receipt.clone();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let receipt = receipt.clone();

                async move {
                    let used: Option<PaymentReceipt> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::PAYMENTS)
                        .obj()
                        .one(&receipt.payment_intent_id)
                        .await?;

                    if used.is_some() {
                        return Ok(Err(AppError::PaymentRequired(
                            "payment was already used".to_string(),
                        )));
                    }

                    let stored: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&receipt.uid)
                        .await?;

                    let Some(mut user) = stored else {
                        return Ok(Err(AppError::NotFound(format!("User {}", receipt.uid))));
                    };

                    user.plan = Some(receipt.tier);
                    user.updated_at = receipt.consumed_at.clone();

                    db.fluent()
                        .update()
                        .in_col(collections::PAYMENTS)
                        .document_id(&receipt.payment_intent_id)
                        .object(&receipt)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.uid)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(user))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Plan payment failed: {}", e)))?
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    async fn query_by_field<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.field(field).eq(value))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Data Deletion ────────────────────────────────────────

    /// Cancel an appointment, ignoring one that is no longer confirmed.
    async fn cancel_if_confirmed(&self, id: &str, reopen_slot: bool) -> Result<(), AppError> {
        match self.cancel_appointment(id, reopen_slot).await {
            Ok(_) | Err(AppError::Conflict(_)) | Err(AppError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete a user and everything they own.
    ///
    /// Deletes:
    /// - `meals` owned by the user
    /// - `appointments` where the user is the client, after cancelling the
    ///   confirmed ones so the coach gets the hour back
    /// - nothing of other clients' appointments with the user as coach;
    ///   confirmed ones are cancelled instead
    /// - `availability` published by the user
    /// - `credentials/{uid}`, the e-mail index entry and `users/{uid}`
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user: &User) -> Result<usize, AppError> {
        let uid = user.uid.as_str();
        let mut deleted_count = 0;

        // 1. Meals
        let meals: Vec<Meal> = self
            .query_by_field(collections::MEALS, "owner_uid", uid)
            .await?;
        self.batch_delete(&meals, collections::MEALS, |m: &Meal| m.id.clone())
            .await?;
        deleted_count += meals.len();
        tracing::debug!(uid, count = meals.len(), "Deleted meals");

        // 2. Appointments. Confirmed ones are cancelled first so booked
        //    hours are released on the coach's side.
        let as_client: Vec<Appointment> = self
            .query_by_field(collections::APPOINTMENTS, "client_uid", uid)
            .await?;
        let as_coach: Vec<Appointment> = self
            .query_by_field(collections::APPOINTMENTS, "coach_uid", uid)
            .await?;

        let today = crate::time_utils::today_utc();
        let mut cancelled = 0;
        for appointment in &as_client {
            if appointment.status == AppointmentStatus::Confirme {
                self.cancel_if_confirmed(&appointment.id, appointment.date >= today)
                    .await?;
                cancelled += 1;
            }
        }
        // Clients keep their side of a deleted coach's bookings, as cancelled.
        // The coach's availability goes away below, so nothing is reopened.
        for appointment in &as_coach {
            if appointment.status == AppointmentStatus::Confirme {
                self.cancel_if_confirmed(&appointment.id, false).await?;
                cancelled += 1;
            }
        }

        self.batch_delete(&as_client, collections::APPOINTMENTS, |a: &Appointment| {
            a.id.clone()
        })
        .await?;
        deleted_count += as_client.len();
        tracing::debug!(
            uid,
            deleted = as_client.len(),
            cancelled,
            "Deleted appointments"
        );

        // 3. Published availability
        let days: Vec<AvailabilityDay> = self
            .query_by_field(collections::AVAILABILITY, "coach_uid", uid)
            .await?;
        self.batch_delete(&days, collections::AVAILABILITY, |d: &AvailabilityDay| {
            AvailabilityDay::document_id(&d.coach_uid, d.date)
        })
        .await?;
        deleted_count += days.len();
        tracing::debug!(uid, count = days.len(), "Deleted availability");

        // 4. Credentials, e-mail index and profile
        self.delete_doc(collections::CREDENTIALS, uid).await?;
        self.delete_doc(collections::EMAIL_INDEX, &email_doc_id(&user.email))
            .await?;
        self.delete_doc(collections::USERS, uid).await?;
        deleted_count += 3;

        tracing::info!(uid, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}

/// Document ID in the e-mail index.
fn email_doc_id(email: &str) -> String {
    urlencoding::encode(&email.trim().to_lowercase()).into_owned()
}
