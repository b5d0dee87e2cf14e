use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RouteId;
use crate::validation::{validate_email, validate_name, ValidationError};

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

/// Authorization profile attached to an authenticated identity.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub permissions: BTreeSet<RouteId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl StaffMember {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Build a stored record from a creation request.
    ///
    /// New members start active with no explicit grants.
    pub fn from_new(id: String, new: NewStaffMember, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: new.email,
            name: new.name,
            role: new.role,
            active: true,
            permissions: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, update: &StaffUpdate, now: DateTime<Utc>) {
        if let Some(ref name) = update.name {
            self.name = name.clone();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(ref permissions) = update.permissions {
            self.permissions = permissions.clone();
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.updated_at = now;
    }
}

/// Validated payload of the "add staff member" form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStaffMember {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl NewStaffMember {
    pub fn new(email: &str, name: &str, role: Role) -> Result<Self, ValidationError> {
        Ok(Self {
            email: validate_email(email)?,
            name: validate_name(name)?,
            role,
        })
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<RouteId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role) -> StaffMember {
        let new = NewStaffMember::new("awa@maquis.ci", "Awa", role).unwrap();
        StaffMember::from_new("s1".to_string(), new, Utc::now())
    }

    #[test]
    fn test_new_member_defaults() {
        let m = member(Role::Staff);
        assert!(m.active);
        assert!(m.permissions.is_empty());
        assert_eq!(m.created_at, m.updated_at);
    }

    #[test]
    fn test_apply_update() {
        let mut m = member(Role::Staff);
        let later = m.updated_at + chrono::Duration::minutes(1);
        let update = StaffUpdate {
            active: Some(false),
            permissions: Some([RouteId::Inventory].into_iter().collect()),
            ..Default::default()
        };
        m.apply(&update, later);
        assert!(!m.active);
        assert!(m.permissions.contains(&RouteId::Inventory));
        assert_eq!(m.role, Role::Staff);
        assert_eq!(m.updated_at, later);
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let json = r#"{
            "id": "s9",
            "email": "koffi@maquis.ci",
            "name": "Koffi",
            "role": "staff",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }"#;
        let m: StaffMember = serde_json::from_str(json).unwrap();
        assert!(m.active);
        assert!(m.permissions.is_empty());
    }
}
