//! Storage collaborator contracts.
//!
//! The hosted document database is reached through these traits so that
//! the cache and the guard only ever hold `Arc<dyn ...>` handles. The REST
//! client (`ApiClient`) and the in-memory backend (`MemoryBackend`) both
//! implement them.

use async_trait::async_trait;
use thiserror::Error;

use crate::api::ApiError;
use crate::models::{Category, MenuItem, NewStaffMember, Order, StaffMember, StaffUpdate};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Short text for a transient notification.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Api(ApiError::NetworkError(_)) | StoreError::Unavailable(_) => {
                "Connection problem - please try again".to_string()
            }
            StoreError::Api(ApiError::Unauthorized) => {
                "Your session has expired - please sign in again".to_string()
            }
            StoreError::Api(ApiError::RateLimited) => {
                "Too many requests - please wait a moment".to_string()
            }
            StoreError::NotFound(_) | StoreError::Api(ApiError::NotFound(_)) => {
                "That record no longer exists".to_string()
            }
            StoreError::Conflict(what) => format!("{} already exists", what),
            other => other.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record type living in its own backend collection.
pub trait Document: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Replace the id once the store has assigned one.
    fn with_id(self, id: String) -> Self;
}

impl Document for MenuItem {
    const COLLECTION: &'static str = "menuItems";

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }
}

impl Document for StaffMember {
    const COLLECTION: &'static str = "staff";

    fn id(&self) -> &str {
        &self.id
    }

    fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }
}

/// Generic list/get/create access to one entity collection.
#[async_trait]
pub trait EntityStore<T: Document>: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<T>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<T>>;

    /// Persist a new record, returning the id the store assigned.
    async fn create(&self, record: T) -> StoreResult<String>;
}

/// Staff records keyed by the email of their authenticated identity.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<StaffMember>>;

    async fn create(&self, member: NewStaffMember) -> StoreResult<StaffMember>;

    async fn update(&self, id: &str, update: StaffUpdate) -> StoreResult<StaffMember>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    async fn list_all(&self) -> StoreResult<Vec<StaffMember>>;
}
