use std::collections::BTreeSet;

use tracing::debug;

use super::{Session, StaffAccess};
use crate::models::{RouteId, FALLBACK_ROUTE};

/// Result of evaluating one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Denied; send the user here instead.
    Redirect(RouteId),
    /// Nobody is signed in.
    RequireLogin,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The route decision table.
///
/// Unrestricted identities and admins pass; everyone else reaches public
/// routes plus `allowed_routes`, and is redirected to the point of sale
/// otherwise.
pub fn decide(route: RouteId, access: &StaffAccess, allowed_routes: &BTreeSet<RouteId>) -> Decision {
    if !access.is_restricted() || access.is_admin() || route.is_public() || allowed_routes.contains(&route) {
        Decision::Allow
    } else {
        Decision::Redirect(FALLBACK_ROUTE)
    }
}

/// Route gate for the current session.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    grantable: BTreeSet<RouteId>,
}

impl NavigationGuard {
    /// `grantable` is the restaurant-level set of routes staff may be given.
    pub fn new(grantable: impl IntoIterator<Item = RouteId>) -> Self {
        Self {
            grantable: grantable.into_iter().collect(),
        }
    }

    pub fn grantable(&self) -> &BTreeSet<RouteId> {
        &self.grantable
    }

    /// Routes this session may open beyond the public ones.
    pub fn allowed_routes(&self, access: &StaffAccess) -> BTreeSet<RouteId> {
        access
            .permissions()
            .intersection(&self.grantable)
            .copied()
            .collect()
    }

    pub fn check(&self, route: RouteId, session: &Session) -> Decision {
        if !session.is_authenticated() {
            return Decision::RequireLogin;
        }
        let decision = decide(route, &session.access, &self.allowed_routes(&session.access));
        debug!(route = %route, ?decision, "Navigation evaluated");
        decision
    }
}

impl Default for NavigationGuard {
    /// Every non-public route is grantable.
    fn default() -> Self {
        Self::new(RouteId::ALL.into_iter().filter(|route| !route.is_public()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::models::{NewStaffMember, Role, StaffMember};
    use chrono::Utc;

    fn member(role: Role, permissions: &[RouteId]) -> StaffMember {
        let mut m = StaffMember::from_new(
            "s1".to_string(),
            NewStaffMember::new("serveur@maquis.ci", "Serveur", role).unwrap(),
            Utc::now(),
        );
        m.permissions = permissions.iter().copied().collect();
        m
    }

    fn session(access: StaffAccess) -> Session {
        Session {
            identity: Some(Identity {
                uid: "u".to_string(),
                email: "serveur@maquis.ci".to_string(),
                display_name: None,
                token: "t".to_string(),
            }),
            access,
        }
    }

    fn routes(list: &[RouteId]) -> BTreeSet<RouteId> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_staff_decisions() {
        let access = StaffAccess::Staff(member(Role::Staff, &[]));
        let allowed = routes(&[RouteId::Orders]);

        assert_eq!(decide(RouteId::Settings, &access, &allowed), Decision::Redirect(RouteId::Pos));
        assert_eq!(decide(RouteId::Orders, &access, &allowed), Decision::Allow);
        assert_eq!(decide(RouteId::Pos, &access, &allowed), Decision::Allow);
    }

    #[test]
    fn test_admin_allowed_everywhere() {
        let access = StaffAccess::Staff(member(Role::Admin, &[]));
        for route in RouteId::ALL {
            assert_eq!(decide(route, &access, &BTreeSet::new()), Decision::Allow);
        }
    }

    #[test]
    fn test_unrestricted_allowed_everywhere() {
        for route in RouteId::ALL {
            assert!(decide(route, &StaffAccess::Unrestricted, &BTreeSet::new()).is_allowed());
        }
    }

    #[test]
    fn test_unresolved_fails_closed() {
        let allowed = BTreeSet::new();
        assert!(decide(RouteId::QrCode, &StaffAccess::Unresolved, &allowed).is_allowed());
        assert_eq!(
            decide(RouteId::Staff, &StaffAccess::Unresolved, &allowed),
            Decision::Redirect(RouteId::Pos)
        );
    }

    #[test]
    fn test_guard_intersects_permissions_with_grantable() {
        let guard = NavigationGuard::new([RouteId::Menu, RouteId::Inventory]);
        let access = StaffAccess::Staff(member(Role::Staff, &[RouteId::Menu, RouteId::Settings]));
        let s = session(access);

        assert_eq!(guard.check(RouteId::Menu, &s), Decision::Allow);
        assert_eq!(guard.check(RouteId::Settings, &s), Decision::Redirect(RouteId::Pos));
        assert_eq!(guard.check(RouteId::Inventory, &s), Decision::Redirect(RouteId::Pos));
    }

    #[test]
    fn test_inactive_staff_limited_to_public() {
        let mut m = member(Role::Admin, &[RouteId::Menu]);
        m.active = false;
        let s = session(StaffAccess::Staff(m));
        let guard = NavigationGuard::default();
        assert_eq!(guard.check(RouteId::Menu, &s), Decision::Redirect(RouteId::Pos));
        assert_eq!(guard.check(RouteId::Orders, &s), Decision::Allow);
    }

    #[test]
    fn test_signed_out_requires_login() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check(RouteId::Pos, &Session::signed_out()), Decision::RequireLogin);
    }

    #[test]
    fn test_default_grantable_excludes_public() {
        let guard = NavigationGuard::default();
        assert!(!guard.grantable().contains(&RouteId::Pos));
        assert!(guard.grantable().contains(&RouteId::Settings));
        assert_eq!(guard.grantable().len(), RouteId::ALL.len() - 3);
    }
}
