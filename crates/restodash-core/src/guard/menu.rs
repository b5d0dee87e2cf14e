use serde::Serialize;

use super::StaffAccess;
use crate::models::RouteId;

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuArea {
    CoreOperations,
    Analytics,
    MenuManagement,
    StockFinance,
    CustomerRelations,
    Administration,
}

impl MenuArea {
    pub fn title(&self) -> &'static str {
        match self {
            MenuArea::CoreOperations => "Operations",
            MenuArea::Analytics => "Analytics",
            MenuArea::MenuManagement => "Menu",
            MenuArea::StockFinance => "Stock & Finance",
            MenuArea::CustomerRelations => "Customers",
            MenuArea::Administration => "Administration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFactor {
    Desktop,
    Mobile,
}

/// One entry of the dashboard sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub route: RouteId,
    pub label: &'static str,
    pub area: MenuArea,
    pub requires_admin: bool,
    pub mobile_visible: bool,
}

const fn entry(
    route: RouteId,
    label: &'static str,
    area: MenuArea,
    requires_admin: bool,
    mobile_visible: bool,
) -> MenuEntry {
    MenuEntry {
        route,
        label,
        area,
        requires_admin,
        mobile_visible,
    }
}

/// Sidebar in display order.
pub static MENU: [MenuEntry; 12] = [
    entry(RouteId::Dashboard, "Overview", MenuArea::CoreOperations, true, true),
    entry(RouteId::Pos, "Point of Sale", MenuArea::CoreOperations, false, true),
    entry(RouteId::Orders, "Orders", MenuArea::CoreOperations, false, true),
    entry(RouteId::QrCode, "QR Codes", MenuArea::CoreOperations, false, true),
    entry(RouteId::Analytics, "Reports", MenuArea::Analytics, true, false),
    entry(RouteId::Menu, "Menu Items", MenuArea::MenuManagement, true, true),
    entry(RouteId::Categories, "Categories", MenuArea::MenuManagement, true, true),
    entry(RouteId::Inventory, "Inventory", MenuArea::StockFinance, true, true),
    entry(RouteId::Finance, "Finance", MenuArea::StockFinance, true, false),
    entry(RouteId::Customers, "Customers", MenuArea::CustomerRelations, true, true),
    entry(RouteId::Staff, "Staff", MenuArea::Administration, true, false),
    entry(RouteId::Settings, "Settings", MenuArea::Administration, true, false),
];

pub fn entry_for(route: RouteId) -> Option<&'static MenuEntry> {
    MENU.iter().find(|e| e.route == route)
}

/// Filter `entries` for the given access and device, keeping their order.
pub fn visible_entries<'a>(
    entries: &'a [MenuEntry],
    access: &StaffAccess,
    form_factor: FormFactor,
) -> Vec<&'a MenuEntry> {
    let permissions = access.permissions();
    entries
        .iter()
        .filter(|e| form_factor == FormFactor::Desktop || e.mobile_visible)
        .filter(|e| {
            !access.is_restricted()
                || access.is_admin()
                || !e.requires_admin
                || permissions.contains(&e.route)
        })
        .collect()
}

pub fn visible_menu(access: &StaffAccess, form_factor: FormFactor) -> Vec<&'static MenuEntry> {
    visible_entries(&MENU, access, form_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewStaffMember, Role, StaffMember};
    use chrono::Utc;

    fn staff(role: Role, permissions: &[RouteId]) -> StaffAccess {
        let mut m = StaffMember::from_new(
            "s1".to_string(),
            NewStaffMember::new("serveur@maquis.ci", "Serveur", role).unwrap(),
            Utc::now(),
        );
        m.permissions = permissions.iter().copied().collect();
        StaffAccess::Staff(m)
    }

    fn routes(entries: &[&MenuEntry]) -> Vec<RouteId> {
        entries.iter().map(|e| e.route).collect()
    }

    #[test]
    fn test_menu_covers_every_route_once() {
        for route in RouteId::ALL {
            assert_eq!(MENU.iter().filter(|e| e.route == route).count(), 1);
        }
    }

    #[test]
    fn test_public_entries_do_not_require_admin() {
        for e in MENU.iter() {
            assert_eq!(e.requires_admin, !e.route.is_public(), "{}", e.route);
        }
    }

    #[test]
    fn test_staff_sees_public_and_granted_in_order() {
        let access = staff(Role::Staff, &[RouteId::Inventory, RouteId::Menu]);
        let visible = visible_menu(&access, FormFactor::Desktop);
        assert_eq!(
            routes(&visible),
            vec![RouteId::Pos, RouteId::Orders, RouteId::QrCode, RouteId::Menu, RouteId::Inventory]
        );
    }

    #[test]
    fn test_admin_and_owner_see_everything_on_desktop() {
        assert_eq!(visible_menu(&staff(Role::Admin, &[]), FormFactor::Desktop).len(), MENU.len());
        assert_eq!(visible_menu(&StaffAccess::Unrestricted, FormFactor::Desktop).len(), MENU.len());
    }

    #[test]
    fn test_mobile_hides_desktop_only_regardless_of_role() {
        for access in [StaffAccess::Unrestricted, staff(Role::Admin, &[]), staff(Role::Staff, &[RouteId::Settings])] {
            let visible = visible_menu(&access, FormFactor::Mobile);
            assert!(visible.iter().all(|e| e.mobile_visible));
            assert!(!routes(&visible).contains(&RouteId::Settings));
        }
    }

    #[test]
    fn test_unresolved_sees_only_public() {
        let visible = visible_menu(&StaffAccess::Unresolved, FormFactor::Desktop);
        assert!(visible.iter().all(|e| e.route.is_public()));
        assert_eq!(visible.len(), 3);
    }

    #[test]
    fn test_custom_entries() {
        let entries = [
            entry(RouteId::Finance, "Cash", MenuArea::StockFinance, false, false),
            entry(RouteId::Pos, "Till", MenuArea::CoreOperations, false, true),
        ];
        let visible = visible_entries(&entries, &StaffAccess::Unresolved, FormFactor::Mobile);
        assert_eq!(routes(&visible), vec![RouteId::Pos]);
        assert_eq!(entry_for(RouteId::Staff).unwrap().area, MenuArea::Administration);
    }
}
