//! Targets for table QR codes.
//!
//! Image rendering is left to a `QrEncoder` supplied by the front end; this
//! module only guarantees that what gets encoded is an absolute web URL.

use std::fmt;

use reqwest::Url;

use crate::validation::ValidationError;

/// A URL that is safe to put in a QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrTarget(Url);

impl QrTarget {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidUrl(input.to_string());
        let url = Url::parse(input.trim()).map_err(|_| invalid())?;
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(invalid()),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        Ok(Self(url))
    }

    /// Ordering page for one table: `{base}/r/{restaurant_id}?table={table}`.
    pub fn table_menu(base: &str, restaurant_id: &str, table: &str) -> Result<Self, ValidationError> {
        let restaurant_id = restaurant_id.trim();
        let table = table.trim();
        if restaurant_id.is_empty() || table.is_empty() {
            return Err(ValidationError::InvalidUrl(format!(
                "{}/r/{}?table={}",
                base, restaurant_id, table
            )));
        }
        let target = Self::parse(base)?;
        let mut url = target.0;
        url.path_segments_mut()
            .map_err(|_| ValidationError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .push("r")
            .push(restaurant_id);
        url.query_pairs_mut().clear().append_pair("table", table);
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for QrTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a target to image bytes. Implementations hold no state.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, target: &QrTarget) -> Vec<u8>;
}
