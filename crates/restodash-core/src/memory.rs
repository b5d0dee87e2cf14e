//! In-memory backend.
//!
//! Implements every collaborator contract (auth, staff directory, entity
//! stores) over plain vectors, with per-operation failure injection for
//! exercising error paths. Used by the test suite and by `restodash --demo`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::auth::{AuthError, AuthProvider, Identity};
use crate::cache::{CacheSources, Cached, SectionKey};
use crate::models::{Category, MenuItem, NewStaffMember, Order, StaffMember, StaffUpdate};
use crate::store::{Document, EntityStore, StaffDirectory, StoreError, StoreResult};

/// Failed sign-ins allowed before an account is locked out.
const MAX_FAILED_SIGN_INS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List(SectionKey),
    Get(SectionKey),
    Create(SectionKey),
    GetStaffByEmail,
    UpdateStaff,
    DeleteStaff,
    SignIn,
    SignOut,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    message: String,
    /// Number of times to fail before succeeding (None = always fail)
    fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_count: None,
        }
    }

    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

#[derive(Debug, Default)]
struct FailureInjector {
    configs: HashMap<Operation, FailureConfig>,
    call_counts: HashMap<Operation, u32>,
}

impl FailureInjector {
    /// Count the call and return the injected failure message, if any.
    fn check(&mut self, op: Operation) -> Option<String> {
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;
        let config = self.configs.get(&op)?;
        match config.fail_count {
            Some(limit) if *count > limit => None,
            _ => Some(config.message.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
    disabled: bool,
    failed_attempts: u32,
}

#[derive(Default)]
struct Inner {
    menu: Vec<MenuItem>,
    categories: Vec<Category>,
    orders: Vec<Order>,
    staff: Vec<StaffMember>,
    accounts: HashMap<String, Account>,
    failures: FailureInjector,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn guard(&mut self, op: Operation) -> StoreResult<()> {
        match self.failures.check(op) {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cache sources backed by this store.
    pub fn cache_sources(self: &Arc<Self>) -> CacheSources {
        CacheSources {
            menu: self.clone(),
            categories: self.clone(),
            orders: self.clone(),
            staff: self.clone(),
        }
    }

    pub fn seed_menu(&self, items: Vec<MenuItem>) {
        self.lock().menu = items;
    }

    pub fn seed_categories(&self, categories: Vec<Category>) {
        self.lock().categories = categories;
    }

    pub fn add_account(&self, email: &str, password: &str, uid: &str) {
        self.lock().accounts.insert(
            email.to_lowercase(),
            Account {
                uid: uid.to_string(),
                password: password.to_string(),
                disabled: false,
                failed_attempts: 0,
            },
        );
    }

    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    pub fn inject_failure(&self, op: Operation, config: FailureConfig) {
        self.lock().failures.configs.insert(op, config);
    }

    pub fn call_count(&self, op: Operation) -> u32 {
        self.lock().failures.call_counts.get(&op).copied().unwrap_or(0)
    }
}

macro_rules! entity_store {
    ($ty:ty, $field:ident) => {
        #[async_trait]
        impl EntityStore<$ty> for MemoryBackend {
            async fn list(&self) -> StoreResult<Vec<$ty>> {
                let mut inner = self.lock();
                inner.guard(Operation::List(<$ty as Cached>::SECTION))?;
                Ok(inner.$field.clone())
            }

            async fn get_by_id(&self, id: &str) -> StoreResult<Option<$ty>> {
                let mut inner = self.lock();
                inner.guard(Operation::Get(<$ty as Cached>::SECTION))?;
                Ok(inner.$field.iter().find(|r| r.id == id).cloned())
            }

            async fn create(&self, record: $ty) -> StoreResult<String> {
                let mut inner = self.lock();
                inner.guard(Operation::Create(<$ty as Cached>::SECTION))?;
                let id = inner.next_id(<$ty as Document>::COLLECTION);
                inner.$field.push(record.with_id(id.clone()));
                debug!(collection = <$ty as Document>::COLLECTION, id = %id, "Created record");
                Ok(id)
            }
        }
    };
}

entity_store!(MenuItem, menu);
entity_store!(Category, categories);
entity_store!(Order, orders);

#[async_trait]
impl StaffDirectory for MemoryBackend {
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<StaffMember>> {
        let mut inner = self.lock();
        inner.guard(Operation::GetStaffByEmail)?;
        let email = email.to_lowercase();
        Ok(inner.staff.iter().find(|m| m.email == email).cloned())
    }

    async fn create(&self, member: NewStaffMember) -> StoreResult<StaffMember> {
        let mut inner = self.lock();
        inner.guard(Operation::Create(SectionKey::Staff))?;
        if inner.staff.iter().any(|m| m.email == member.email) {
            return Err(StoreError::Conflict(member.email));
        }
        let id = inner.next_id(StaffMember::COLLECTION);
        let record = StaffMember::from_new(id, member, Utc::now());
        inner.staff.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, update: StaffUpdate) -> StoreResult<StaffMember> {
        let mut inner = self.lock();
        inner.guard(Operation::UpdateStaff)?;
        let member = inner
            .staff
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        member.apply(&update, Utc::now());
        Ok(member.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.guard(Operation::DeleteStaff)?;
        let before = inner.staff.len();
        inner.staff.retain(|m| m.id != id);
        if inner.staff.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<StaffMember>> {
        let mut inner = self.lock();
        inner.guard(Operation::List(SectionKey::Staff))?;
        Ok(inner.staff.clone())
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut inner = self.lock();
        if let Some(message) = inner.failures.check(Operation::SignIn) {
            return Err(AuthError::Network(message));
        }
        let email = email.to_lowercase();
        let account = inner
            .accounts
            .get_mut(&email)
            .ok_or_else(|| AuthError::NotFound(email.clone()))?;

        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }
        if account.failed_attempts >= MAX_FAILED_SIGN_INS {
            return Err(AuthError::TooManyAttempts);
        }
        if account.password != password {
            account.failed_attempts += 1;
            return Err(AuthError::InvalidCredentials);
        }
        account.failed_attempts = 0;

        Ok(Identity {
            uid: account.uid.clone(),
            email: email.clone(),
            display_name: None,
            token: format!("memory-token-{}", account.uid),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        match self.lock().failures.check(Operation::SignOut) {
            Some(message) => Err(AuthError::Network(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, RouteId};

    #[tokio::test]
    async fn test_staff_round_trip_defaults() {
        let backend = MemoryBackend::new();
        let new = NewStaffMember::new("Serveur@Maquis.ci", "Serveur", Role::Staff).unwrap();
        let created = StaffDirectory::create(&backend, new).await.unwrap();

        let fetched = backend.get_by_email("serveur@maquis.ci").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.active);
        assert!(fetched.permissions.is_empty());
        assert_eq!(fetched.role, Role::Staff);
    }

    #[tokio::test]
    async fn test_duplicate_staff_email_conflicts() {
        let backend = MemoryBackend::new();
        let new = NewStaffMember::new("a@maquis.ci", "A", Role::Staff).unwrap();
        StaffDirectory::create(&backend, new.clone()).await.unwrap();
        let err = StaffDirectory::create(&backend, new).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_staff() {
        let backend = MemoryBackend::new();
        let new = NewStaffMember::new("a@maquis.ci", "A", Role::Staff).unwrap();
        let created = StaffDirectory::create(&backend, new).await.unwrap();

        let update = StaffUpdate {
            permissions: Some([RouteId::Menu].into_iter().collect()),
            ..Default::default()
        };
        let updated = backend.update(&created.id, update).await.unwrap();
        assert!(updated.permissions.contains(&RouteId::Menu));

        backend.delete(&created.id).await.unwrap();
        assert!(backend.list_all().await.unwrap().is_empty());
        assert!(matches!(backend.delete(&created.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_entity_store_assigns_ids() {
        let backend = MemoryBackend::new();
        let category = Category {
            id: String::new(),
            name: "Grillades".to_string(),
            position: 0,
        };
        let id = EntityStore::<Category>::create(&backend, category).await.unwrap();
        let fetched = EntityStore::<Category>::get_by_id(&backend, &id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert!(EntityStore::<Category>::get_by_id(&backend, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_count_then_recover() {
        let backend = MemoryBackend::new();
        backend.inject_failure(
            Operation::List(SectionKey::Menu),
            FailureConfig::unavailable("flaky").with_fail_count(1),
        );
        assert!(EntityStore::<MenuItem>::list(&backend).await.is_err());
        assert!(EntityStore::<MenuItem>::list(&backend).await.is_ok());
        assert_eq!(backend.call_count(Operation::List(SectionKey::Menu)), 2);
    }

    #[tokio::test]
    async fn test_sign_in_errors() {
        let backend = MemoryBackend::new();
        backend.add_account("owner@maquis.ci", "motdepasse", "u1");

        assert!(matches!(
            backend.sign_in("ghost@maquis.ci", "motdepasse").await,
            Err(AuthError::NotFound(_))
        ));
        for _ in 0..MAX_FAILED_SIGN_INS {
            assert!(matches!(
                backend.sign_in("owner@maquis.ci", "nope-nope").await,
                Err(AuthError::InvalidCredentials)
            ));
        }
        assert!(matches!(
            backend.sign_in("owner@maquis.ci", "motdepasse").await,
            Err(AuthError::TooManyAttempts)
        ));

        backend.add_account("staff@maquis.ci", "motdepasse", "u2");
        backend.disable_account("staff@maquis.ci");
        assert!(matches!(
            backend.sign_in("staff@maquis.ci", "motdepasse").await,
            Err(AuthError::AccountDisabled)
        ));

        backend.inject_failure(Operation::SignIn, FailureConfig::unavailable("offline"));
        assert!(matches!(
            backend.sign_in("staff@maquis.ci", "motdepasse").await,
            Err(AuthError::Network(_))
        ));
    }
}
