//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Password hashes (keyed by uid)
    pub const CREDENTIALS: &str = "credentials";
    /// E-mail uniqueness index (keyed by encoded e-mail)
    pub const EMAIL_INDEX: &str = "email_index";
    /// Pending password resets (keyed by token hash)
    pub const PASSWORD_RESETS: &str = "password_resets";
    pub const MEALS: &str = "meals";
    /// Coach availability (keyed by `{coach_uid}_{date}`)
    pub const AVAILABILITY: &str = "availability";
    pub const APPOINTMENTS: &str = "appointments";
    pub const PLANS: &str = "plans";
    /// Consumed payment intents (keyed by intent ID)
    pub const PAYMENTS: &str = "payments";
}
