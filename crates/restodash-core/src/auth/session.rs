use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Identity;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Identity tokens from the hosted auth service are valid for one hour.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Buffer time before expiry to trigger a fresh sign-in (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Check if the token will expire soon and should be renewed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at =
            self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

/// Login persisted between CLI runs.
pub struct StoredSession {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl StoredSession {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk; expired sessions are ignored.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, identity: Identity) {
        self.data = Some(SessionData::new(identity));
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.data.as_ref().map(|d| &d.identity)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: "u1".to_string(),
            email: "owner@maquis.ci".to_string(),
            display_name: Some("Owner".to_string()),
            token: "tok".to_string(),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("restodash-test-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_session_expiry() {
        let fresh = SessionData::new(identity());
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());

        let mut old = SessionData::new(identity());
        old.created_at = Utc::now() - Duration::minutes(57);
        assert!(!old.is_expired());
        assert!(old.needs_refresh());

        old.created_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_expired());
        assert_eq!(old.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = temp_dir("session");
        let mut session = StoredSession::new(dir.clone());
        session.update(identity());
        session.save().unwrap();

        let mut loaded = StoredSession::new(dir.clone());
        assert!(loaded.load().unwrap());
        assert_eq!(loaded.identity().unwrap().uid, "u1");
        assert!(!loaded.data.as_ref().unwrap().is_expired());

        loaded.clear().unwrap();
        let mut again = StoredSession::new(dir.clone());
        assert!(!again.load().unwrap());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_expired_session_not_loaded() {
        let dir = temp_dir("expired");
        let mut session = StoredSession::new(dir.clone());
        let mut data = SessionData::new(identity());
        data.created_at = Utc::now() - Duration::hours(2);
        session.data = Some(data);
        session.save().unwrap();

        let mut loaded = StoredSession::new(dir.clone());
        assert!(!loaded.load().unwrap());
        assert!(loaded.identity().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }
}
