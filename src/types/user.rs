//! User accounts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Maximum length of the short text columns (`username`, `email`, `nickname`).
pub const MAX_SHORT_TEXT: usize = 45;

/// A registered account as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Row id.
    pub id: UserId,
    /// Unique login name; also the token subject.
    pub username: String,
    /// Hex SHA-256 digest of the password.
    pub hashed_password: String,
    /// Unique contact address.
    pub email: String,
    /// Self-reported age.
    pub age: i32,
    /// Optional display name.
    pub nickname: Option<String>,
    /// Day the account was created.
    pub registration_date: NaiveDate,
    /// Bypasses every category visibility rule.
    pub admin: bool,
}

impl User {
    /// Public view of the account (no password digest).
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            email: self.email.clone(),
            age: self.age,
            nickname: self.nickname.clone(),
            admin: self.admin,
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Requested login name.
    pub username: String,
    /// Plaintext password; hashed before it reaches storage.
    pub password: String,
    /// Contact address.
    pub email: String,
    /// Self-reported age.
    pub age: i32,
    /// Optional display name.
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Row to insert into `users`.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Hex SHA-256 digest, never the plaintext.
    pub hashed_password: String,
    /// Contact address.
    pub email: String,
    /// Self-reported age.
    pub age: i32,
    /// Optional display name.
    pub nickname: Option<String>,
    /// Day of registration.
    pub registration_date: NaiveDate,
}

/// Account fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Self-reported age.
    pub age: i32,
    /// Optional display name.
    pub nickname: Option<String>,
    /// Whether the account is an admin.
    pub admin: bool,
}
