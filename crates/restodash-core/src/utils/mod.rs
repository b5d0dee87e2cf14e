//! Display helpers shared by the CLI and the core's user-facing messages.

pub mod format;

pub use format::{format_amount, format_optional, format_timestamp, truncate_string};
