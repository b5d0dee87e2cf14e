//! Authentication module for dashboard identities.
//!
//! This module provides:
//! - `AuthProvider`: contract of the hosted identity service
//! - `AuthService`: current identity plus identity-change subscriptions
//! - `StoredSession`: login persisted to disk between runs (tokens expire after 60 minutes)
//! - `CredentialStore`: optional OS keychain storage via keyring

pub mod credentials;
pub mod identity;
pub mod service;
pub mod session;
pub mod watch;

pub use credentials::CredentialStore;
pub use identity::{AuthError, AuthProvider, Identity};
pub use service::AuthService;
pub use session::{SessionData, StoredSession};
pub use watch::{IdentityWatch, Subscription};
