//! REST API client module for the hosted restaurant backend.
//!
//! This module provides the `ApiClient` for signing in and for reading and
//! writing menu items, categories, orders, and staff records.
//!
//! Requests carry the identity token obtained at sign-in as a bearer token.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_AUTH_URL};
pub use error::ApiError;
