//! Cache state and its pure transition function.
//!
//! Every mutation of the cache goes through [`reduce`]; the dispatcher in
//! `manager.rs` only decides which action to apply and when.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, MenuItem, Order, StaffMember};
use crate::store::Document;
use crate::validation::ValidationError;

/// Cached sections are considered fresh for 5 minutes.
/// Menu and staff edits happen at human pace, so a coarse TTL is enough.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 5;

/// Page size used until the UI picks another one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// True when a section has never been populated or its data is older than
/// the freshness window.
pub fn should_refresh(last_fetched: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_fetched {
        None => true,
        Some(at) => now - at > Duration::minutes(FRESHNESS_WINDOW_MINUTES),
    }
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Menu,
    Categories,
    Orders,
    Staff,
}

impl SectionKey {
    pub const ALL: [SectionKey; 4] = [
        SectionKey::Menu,
        SectionKey::Categories,
        SectionKey::Orders,
        SectionKey::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Menu => "menu",
            SectionKey::Categories => "categories",
            SectionKey::Orders => "orders",
            SectionKey::Staff => "staff",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SectionKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == lower)
            .ok_or_else(|| ValidationError::UnknownSection(s.to_string()))
    }
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            page_size: page_size.max(1),
        }
    }

    /// Recompute `total_pages` for `len` items and clamp `current_page`.
    fn recomputed(self, len: usize) -> Self {
        let page_size = self.page_size.max(1);
        let total_pages = len.div_ceil(page_size as usize) as u32;
        Self {
            current_page: self.current_page.clamp(1, total_pages.max(1)),
            total_pages,
            page_size,
        }
    }
}

/// Fields the UI may change; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationPatch {
    pub current_page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationPatch {
    pub fn page(page: u32) -> Self {
        Self { current_page: Some(page), page_size: None }
    }

    pub fn page_size(size: u32) -> Self {
        Self { current_page: None, page_size: Some(size) }
    }
}

/// One cached collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSection<T> {
    pub items: Vec<T>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub pagination: Pagination,
    #[serde(skip)]
    pub loading: bool,
}

impl<T> Default for CacheSection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_fetched: None,
            pagination: Pagination::default(),
            loading: false,
        }
    }
}

impl<T> CacheSection<T> {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            pagination: Pagination::with_page_size(page_size),
            ..Self::default()
        }
    }

    pub fn is_stale(&self) -> bool {
        should_refresh(self.last_fetched, Utc::now())
    }

    /// Items on the current page.
    pub fn current_page_items(&self) -> &[T] {
        let size = self.pagination.page_size.max(1) as usize;
        let start = (self.pagination.current_page.saturating_sub(1) as usize) * size;
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.last_fetched.map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            None => "never".to_string(),
            // Clock skew shows up as a negative age
            Some(minutes) if minutes < 1 => "just now".to_string(),
            Some(minutes) if minutes < 60 => format!("{}m ago", minutes),
            Some(minutes) if minutes < 1440 => format!("{}h ago", minutes / 60),
            Some(minutes) => format!("{}d ago", minutes / 1440),
        }
    }

    pub fn status(&self) -> SectionStatus {
        SectionStatus {
            last_fetched: self.last_fetched,
            loading: self.loading,
            len: self.items.len(),
            pagination: self.pagination,
        }
    }

    fn populated(self, items: Vec<T>, at: DateTime<Utc>) -> Self {
        let pagination = self.pagination.recomputed(items.len());
        Self {
            items,
            last_fetched: Some(at),
            pagination,
            loading: false,
        }
    }

    fn paginated(self, patch: PaginationPatch) -> Self {
        let mut pagination = self.pagination;
        if let Some(size) = patch.page_size.filter(|size| *size > 0) {
            pagination.page_size = size;
        }
        if let Some(page) = patch.current_page {
            pagination.current_page = page;
        }
        let pagination = pagination.recomputed(self.items.len());
        Self { pagination, ..self }
    }
}

/// Type-erased view of a section used by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStatus {
    pub last_fetched: Option<DateTime<Utc>>,
    pub loading: bool,
    pub len: usize,
    pub pagination: Pagination,
}

/// Freshly fetched records for one section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionItems {
    Menu(Vec<MenuItem>),
    Categories(Vec<Category>),
    Orders(Vec<Order>),
    Staff(Vec<StaffMember>),
}

impl SectionItems {
    pub fn key(&self) -> SectionKey {
        match self {
            SectionItems::Menu(_) => SectionKey::Menu,
            SectionItems::Categories(_) => SectionKey::Categories,
            SectionItems::Orders(_) => SectionKey::Orders,
            SectionItems::Staff(_) => SectionKey::Staff,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SectionItems::Menu(items) => items.len(),
            SectionItems::Categories(items) => items.len(),
            SectionItems::Orders(items) => items.len(),
            SectionItems::Staff(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheAction {
    RefreshStarted(SectionKey),
    RefreshSucceeded {
        items: SectionItems,
        at: DateTime<Utc>,
    },
    RefreshFailed(SectionKey),
    SetPagination {
        section: SectionKey,
        patch: PaginationPatch,
    },
    Invalidate(SectionKey),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheState {
    pub menu: CacheSection<MenuItem>,
    pub categories: CacheSection<Category>,
    pub orders: CacheSection<Order>,
    pub staff: CacheSection<StaffMember>,
}

impl CacheState {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            menu: CacheSection::with_page_size(page_size),
            categories: CacheSection::with_page_size(page_size),
            orders: CacheSection::with_page_size(page_size),
            staff: CacheSection::with_page_size(page_size),
        }
    }

    pub fn status(&self, key: SectionKey) -> SectionStatus {
        match key {
            SectionKey::Menu => self.menu.status(),
            SectionKey::Categories => self.categories.status(),
            SectionKey::Orders => self.orders.status(),
            SectionKey::Staff => self.staff.status(),
        }
    }

    pub fn age_display(&self, key: SectionKey) -> String {
        match key {
            SectionKey::Menu => self.menu.age_display(),
            SectionKey::Categories => self.categories.age_display(),
            SectionKey::Orders => self.orders.age_display(),
            SectionKey::Staff => self.staff.age_display(),
        }
    }

    /// Apply `f` to the section named by `key`, whatever its item type.
    fn map_section(self, key: SectionKey, f: impl SectionFn) -> Self {
        match key {
            SectionKey::Menu => Self { menu: f.call(self.menu), ..self },
            SectionKey::Categories => Self { categories: f.call(self.categories), ..self },
            SectionKey::Orders => Self { orders: f.call(self.orders), ..self },
            SectionKey::Staff => Self { staff: f.call(self.staff), ..self },
        }
    }
}

/// A section transition that works for any item type.
trait SectionFn {
    fn call<T>(self, section: CacheSection<T>) -> CacheSection<T>;
}

struct SetLoading(bool);

impl SectionFn for SetLoading {
    fn call<T>(self, section: CacheSection<T>) -> CacheSection<T> {
        CacheSection { loading: self.0, ..section }
    }
}

struct Paginate(PaginationPatch);

impl SectionFn for Paginate {
    fn call<T>(self, section: CacheSection<T>) -> CacheSection<T> {
        section.paginated(self.0)
    }
}

struct Invalidate;

impl SectionFn for Invalidate {
    fn call<T>(self, section: CacheSection<T>) -> CacheSection<T> {
        CacheSection { last_fetched: None, ..section }
    }
}

/// Pure transition: `(state, action) -> state'`.
pub fn reduce(state: CacheState, action: CacheAction) -> CacheState {
    match action {
        CacheAction::RefreshStarted(key) => state.map_section(key, SetLoading(true)),
        CacheAction::RefreshFailed(key) => state.map_section(key, SetLoading(false)),
        CacheAction::RefreshSucceeded { items, at } => match items {
            SectionItems::Menu(items) => CacheState {
                menu: state.menu.populated(items, at),
                ..state
            },
            SectionItems::Categories(items) => CacheState {
                categories: state.categories.populated(items, at),
                ..state
            },
            SectionItems::Orders(items) => CacheState {
                orders: state.orders.populated(items, at),
                ..state
            },
            SectionItems::Staff(items) => CacheState {
                staff: state.staff.populated(items, at),
                ..state
            },
        },
        CacheAction::SetPagination { section, patch } => state.map_section(section, Paginate(patch)),
        CacheAction::Invalidate(key) => state.map_section(key, Invalidate),
    }
}

/// Entity types that own a section of the cache.
pub trait Cached: Document + 'static {
    const SECTION: SectionKey;

    fn section(state: &CacheState) -> &CacheSection<Self>;

    fn wrap(items: Vec<Self>) -> SectionItems;
}

impl Cached for MenuItem {
    const SECTION: SectionKey = SectionKey::Menu;

    fn section(state: &CacheState) -> &CacheSection<Self> {
        &state.menu
    }

    fn wrap(items: Vec<Self>) -> SectionItems {
        SectionItems::Menu(items)
    }
}

impl Cached for Category {
    const SECTION: SectionKey = SectionKey::Categories;

    fn section(state: &CacheState) -> &CacheSection<Self> {
        &state.categories
    }

    fn wrap(items: Vec<Self>) -> SectionItems {
        SectionItems::Categories(items)
    }
}

impl Cached for Order {
    const SECTION: SectionKey = SectionKey::Orders;

    fn section(state: &CacheState) -> &CacheSection<Self> {
        &state.orders
    }

    fn wrap(items: Vec<Self>) -> SectionItems {
        SectionItems::Orders(items)
    }
}

impl Cached for StaffMember {
    const SECTION: SectionKey = SectionKey::Staff;

    fn section(state: &CacheState) -> &CacheSection<Self> {
        &state.staff
    }

    fn wrap(items: Vec<Self>) -> SectionItems {
        SectionItems::Staff(items)
    }
}
