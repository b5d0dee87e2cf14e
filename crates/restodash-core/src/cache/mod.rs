//! In-memory entity cache for list-type resources.
//!
//! This module provides the `EntityCache` dispatcher over a pure reducer.
//! Each section (menu items, categories, orders, staff) keeps its records,
//! the time of the last successful fetch, and a pagination cursor. Data is
//! considered stale after 5 minutes.

pub mod manager;
pub mod state;

pub use manager::{CacheError, CacheSources, EntityCache, RefreshOutcome};
pub use state::{
    reduce, should_refresh, CacheAction, CacheSection, CacheState, Cached, Pagination,
    PaginationPatch, SectionItems, SectionKey, SectionStatus, DEFAULT_PAGE_SIZE,
    FRESHNESS_WINDOW_MINUTES,
};
