use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Path prefix every dashboard section lives under.
pub const DASHBOARD_PREFIX: &str = "/dashboard";

/// A dashboard section a staff member can navigate to.
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteId {
    Dashboard,
    Pos,
    Orders,
    QrCode,
    Analytics,
    Menu,
    Categories,
    Inventory,
    Finance,
    Customers,
    Staff,
    Settings,
}

/// Routes any authenticated staff member may reach.
pub const PUBLIC_ROUTES: [RouteId; 3] = [RouteId::Pos, RouteId::Orders, RouteId::QrCode];

/// Where denied navigations land.
pub const FALLBACK_ROUTE: RouteId = RouteId::Pos;

impl RouteId {
    pub const ALL: [RouteId; 12] = [
        RouteId::Dashboard,
        RouteId::Pos,
        RouteId::Orders,
        RouteId::QrCode,
        RouteId::Analytics,
        RouteId::Menu,
        RouteId::Categories,
        RouteId::Inventory,
        RouteId::Finance,
        RouteId::Customers,
        RouteId::Staff,
        RouteId::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteId::Dashboard => "dashboard",
            RouteId::Pos => "pos",
            RouteId::Orders => "orders",
            RouteId::QrCode => "qr-code",
            RouteId::Analytics => "analytics",
            RouteId::Menu => "menu",
            RouteId::Categories => "categories",
            RouteId::Inventory => "inventory",
            RouteId::Finance => "finance",
            RouteId::Customers => "customers",
            RouteId::Staff => "staff",
            RouteId::Settings => "settings",
        }
    }

    /// Browser path for this section. The dashboard home is the prefix itself.
    pub fn path(&self) -> String {
        match self {
            RouteId::Dashboard => DASHBOARD_PREFIX.to_string(),
            other => format!("{}/{}", DASHBOARD_PREFIX, other.as_str()),
        }
    }

    pub fn is_public(&self) -> bool {
        PUBLIC_ROUTES.contains(self)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteId {
    type Err = ValidationError;

    /// Accepts either the bare tag (`"qr-code"`) or a full path
    /// (`"/dashboard/qr-code"`, `"/dashboard"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        let tag = match trimmed.strip_prefix(DASHBOARD_PREFIX) {
            Some("") => "dashboard",
            Some(rest) => rest.trim_start_matches('/'),
            None => trimmed,
        };
        let tag = tag.to_ascii_lowercase();
        RouteId::ALL
            .iter()
            .copied()
            .find(|route| route.as_str() == tag)
            .ok_or_else(|| ValidationError::UnknownRoute(s.to_string()))
    }
}
