use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info};

use super::state::{
    reduce, should_refresh, CacheAction, CacheSection, CacheState, Cached, PaginationPatch,
    SectionItems, SectionKey,
};
use crate::models::{Category, MenuItem, Order};
use crate::store::{EntityStore, StaffDirectory, StoreError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to refresh {section}: {source}")]
    Refresh {
        section: SectionKey,
        source: StoreError,
    },
}

impl CacheError {
    pub fn section(&self) -> SectionKey {
        match self {
            CacheError::Refresh { section, .. } => *section,
        }
    }

    /// Text for the transient notification shown after a failed refresh.
    pub fn user_message(&self) -> String {
        match self {
            CacheError::Refresh { section, source } => {
                format!("Could not update {}: {}", section, source.user_message())
            }
        }
    }
}

/// What a `refresh` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Data is within the freshness window; nothing was fetched.
    Fresh,
    /// Another refresh of the same section is still running.
    InFlight,
    /// The section was replaced with `count` fetched records.
    Refreshed { count: usize },
}

/// Storage handles the cache lists from, one per section.
#[derive(Clone)]
pub struct CacheSources {
    pub menu: Arc<dyn EntityStore<MenuItem>>,
    pub categories: Arc<dyn EntityStore<Category>>,
    pub orders: Arc<dyn EntityStore<Order>>,
    pub staff: Arc<dyn StaffDirectory>,
}

impl CacheSources {
    async fn fetch(&self, key: SectionKey) -> Result<SectionItems, StoreError> {
        Ok(match key {
            SectionKey::Menu => SectionItems::Menu(self.menu.list().await?),
            SectionKey::Categories => SectionItems::Categories(self.categories.list().await?),
            SectionKey::Orders => SectionItems::Orders(self.orders.list().await?),
            SectionKey::Staff => SectionItems::Staff(self.staff.list_all().await?),
        })
    }
}

/// In-memory entity cache.
///
/// Holds the single `CacheState` value; every change is a `reduce` call
/// under a short lock that is never held across an `.await`. Reads return
/// snapshots.
pub struct EntityCache {
    state: Mutex<CacheState>,
    sources: CacheSources,
}

impl EntityCache {
    pub fn new(sources: CacheSources, page_size: u32) -> Self {
        Self {
            state: Mutex::new(CacheState::with_page_size(page_size)),
            sources,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // State is only ever replaced wholesale, so a poisoned value is still whole
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(state: &mut CacheState, action: CacheAction) {
        let current = std::mem::take(state);
        *state = reduce(current, action);
    }

    pub fn dispatch(&self, action: CacheAction) {
        let mut state = self.lock();
        Self::apply(&mut state, action);
    }

    pub fn snapshot(&self) -> CacheState {
        self.lock().clone()
    }

    /// Typed snapshot of one section.
    pub fn section<T: Cached>(&self) -> CacheSection<T> {
        T::section(&self.lock()).clone()
    }

    /// Refresh a section from its storage collaborator unless it is still
    /// fresh or already being refreshed.
    ///
    /// On failure the previous items stay in place and the error is logged
    /// and returned; nothing is retried.
    pub async fn refresh(&self, key: SectionKey) -> Result<RefreshOutcome, CacheError> {
        {
            let mut state = self.lock();
            let status = state.status(key);
            if status.loading {
                debug!(section = %key, "Refresh already in flight");
                return Ok(RefreshOutcome::InFlight);
            }
            if !should_refresh(status.last_fetched, Utc::now()) {
                debug!(section = %key, "Cache fresh, skipping refresh");
                return Ok(RefreshOutcome::Fresh);
            }
            Self::apply(&mut state, CacheAction::RefreshStarted(key));
        }

        match self.sources.fetch(key).await {
            Ok(items) => {
                let count = items.len();
                self.dispatch(CacheAction::RefreshSucceeded {
                    items,
                    at: Utc::now(),
                });
                info!(section = %key, count, "Cache section refreshed");
                Ok(RefreshOutcome::Refreshed { count })
            }
            Err(source) => {
                self.dispatch(CacheAction::RefreshFailed(key));
                error!(section = %key, error = %source, "Cache refresh failed");
                Err(CacheError::Refresh { section: key, source })
            }
        }
    }

    /// Refresh every section concurrently.
    pub async fn refresh_all(&self) -> Vec<(SectionKey, Result<RefreshOutcome, CacheError>)> {
        let results = join_all(SectionKey::ALL.iter().map(|key| self.refresh(*key))).await;
        SectionKey::ALL.into_iter().zip(results).collect()
    }

    pub fn set_pagination(&self, section: SectionKey, patch: PaginationPatch) {
        self.dispatch(CacheAction::SetPagination { section, patch });
    }

    /// Mark a section stale so the next `refresh` fetches, e.g. after the
    /// admin forms created or edited a record.
    pub fn invalidate(&self, section: SectionKey) {
        debug!(section = %section, "Cache section invalidated");
        self.dispatch(CacheAction::Invalidate(section));
    }

    pub fn any_stale(&self) -> bool {
        let state = self.lock();
        let now = Utc::now();
        SectionKey::ALL
            .iter()
            .any(|key| should_refresh(state.status(*key).last_fetched, now))
    }
}
