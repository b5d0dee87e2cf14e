//! Application configuration management.
//!
//! Configuration is stored at `~/.config/restodash/config.json`. A handful
//! of environment variables (usually set through a `.env` file) override
//! the file so deployments and CI can run without editing it.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_PAGE_SIZE;
use crate::guard::NavigationGuard;
use crate::models::RouteId;
use crate::payment::CinetPayConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "restodash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "RESTODASH_API_URL";
pub const ENV_API_KEY: &str = "RESTODASH_API_KEY";
pub const ENV_RESTAURANT_ID: &str = "RESTODASH_RESTAURANT_ID";
pub const ENV_CINETPAY_API_KEY: &str = "CINETPAY_API_KEY";
pub const ENV_CINETPAY_SITE_ID: &str = "CINETPAY_SITE_ID";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Web API key of the identity service.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Routes staff may be granted. Every admin route when unset.
    #[serde(default)]
    pub grantable_routes: Option<BTreeSet<RouteId>>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub cinetpay: Option<CinetPayConfig>,
    #[serde(default)]
    pub public_menu_base_url: Option<String>,
    /// File values of the environment-controlled fields, written back by `save`.
    #[serde(skip)]
    file_values: Option<Box<Config>>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.to_file())?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// The config as it belongs on disk: environment overrides are replaced
    /// by the values they shadowed, everything else is kept as set.
    pub fn to_file(&self) -> Config {
        let mut file = self.clone();
        file.file_values = None;
        if let Some(original) = self.file_values.as_deref() {
            file.api_base_url = original.api_base_url.clone();
            file.api_key = original.api_key.clone();
            file.restaurant_id = original.restaurant_id.clone();
            file.cinetpay = original.cinetpay.clone();
        }
        file
    }

    /// Overlay values from the environment. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.file_values.is_none() {
            self.file_values = Some(Box::new(self.clone()));
        }
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(id) = get(ENV_RESTAURANT_ID) {
            self.restaurant_id = Some(id);
        }

        let api_key = get(ENV_CINETPAY_API_KEY);
        let site_id = get(ENV_CINETPAY_SITE_ID);
        if let Some(cinetpay) = self.cinetpay.as_mut() {
            if let Some(key) = api_key {
                cinetpay.api_key = key;
            }
            if let Some(site) = site_id {
                cinetpay.site_id = site;
            }
        } else if let (Some(api_key), Some(site_id)) = (api_key, site_id) {
            self.cinetpay = Some(CinetPayConfig {
                api_key,
                site_id,
                currency: crate::payment::DEFAULT_CURRENCY.to_string(),
                return_url: None,
                notify_url: None,
            });
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn navigation_guard(&self) -> NavigationGuard {
        match &self.grantable_routes {
            Some(routes) => NavigationGuard::new(routes.iter().copied()),
            None => NavigationGuard::default(),
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref restaurant) = self.restaurant_id {
            path = path.join(restaurant);
        }
        Ok(path)
    }
}
