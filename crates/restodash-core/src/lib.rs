//! restodash core - restaurant dashboard state and access control.
//!
//! This crate holds everything the dashboard front ends share:
//!
//! - `cache`: per-section entity cache with a 5-minute freshness window
//! - `guard`: route gating and the role-aware sidebar
//! - `auth`: sign-in, identity-change subscriptions, persisted sessions
//! - `api`: REST client for the hosted backend
//! - `payment`: CinetPay checkout
//! - `qr`: validated targets for table QR codes
//! - `memory`: in-memory backend for demos and tests

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod guard;
pub mod memory;
pub mod models;
pub mod payment;
pub mod qr;
pub mod store;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthProvider, AuthService, Identity, Subscription};
pub use cache::{CacheError, CacheSources, EntityCache, RefreshOutcome, SectionKey};
pub use config::Config;
pub use guard::{Decision, NavigationGuard, Session, SessionResolver, StaffAccess};
pub use memory::MemoryBackend;
pub use payment::{PaymentError, PaymentGateway, PaymentRequest, PaymentSession, PaymentStatus};
pub use qr::{QrEncoder, QrTarget};
pub use store::{EntityStore, StaffDirectory, StoreError};
pub use validation::ValidationError;
