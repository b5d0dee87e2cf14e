//! Navigation guard: route gating and role-aware menus.
//!
//! `SessionResolver` turns identity changes into a `Session`, `decide` /
//! `NavigationGuard::check` answer whether a route may be opened, and
//! `visible_menu` filters the sidebar. A failed staff lookup restricts the
//! session to public routes.

pub mod access;
pub mod decision;
pub mod menu;

pub use access::{Session, SessionResolver, StaffAccess};
pub use decision::{decide, Decision, NavigationGuard};
pub use menu::{entry_for, visible_entries, visible_menu, FormFactor, MenuArea, MenuEntry, MENU};
