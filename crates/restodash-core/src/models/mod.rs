//! Data models for restaurant dashboard entities.
//!
//! This module contains the records exchanged with the hosted backend:
//!
//! - `MenuItem`, `Category`: menu management
//! - `Order`, `OrderLine`, `OrderDraft`: order taking at the point of sale
//! - `StaffMember`, `Role`: staff authorization profiles
//! - `RouteId`: the closed set of dashboard sections

pub mod menu;
pub mod order;
pub mod route;
pub mod staff;

pub use menu::{Category, MenuItem};
pub use order::{Order, OrderDraft, OrderLine, OrderStatus};
pub use route::{RouteId, DASHBOARD_PREFIX, FALLBACK_ROUTE, PUBLIC_ROUTES};
pub use staff::{NewStaffMember, Role, StaffMember, StaffUpdate};
