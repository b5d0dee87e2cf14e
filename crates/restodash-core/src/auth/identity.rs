use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

/// An authenticated account as reported by the identity collaborator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub token: String,
}

// Keep bearer tokens out of logs
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been disabled")]
    AccountDisabled,

    #[error("No account found for {0}")]
    NotFound(String),

    #[error("Too many failed attempts - please try again later")]
    TooManyAttempts,

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AuthError {
    /// Map an identity-service error code to an `AuthError`.
    ///
    /// Codes follow the hosted identity toolkit (`EMAIL_NOT_FOUND`,
    /// `INVALID_PASSWORD : ...`); anything unrecognised counts as bad
    /// credentials rather than leaking the raw code.
    pub fn from_code(code: &str, email: &str) -> Self {
        let head = code.split(':').next().unwrap_or("").trim();
        match head {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthError::NotFound(email.to_string()),
            "USER_DISABLED" => AuthError::AccountDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            _ => AuthError::InvalidCredentials,
        }
    }
}

/// The hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}
