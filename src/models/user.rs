//! User accounts and authentication payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Access role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered user. Credential material is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// A user ready to be inserted; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Request body for registering a new account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
    }
}

/// Request body for logging in. Both fields are checked by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for starting a password reset.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
}

/// Request body for the final password-reset step.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Legacy clients send the user id returned by the token check.
    #[serde(default)]
    pub id: Option<String>,
}

/// Emails are compared case-insensitively.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
