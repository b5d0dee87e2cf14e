//! Seed data for `restodash --demo`.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use restodash_core::memory::MemoryBackend;
use restodash_core::models::{
    Category, MenuItem, NewStaffMember, Order, OrderDraft, Role, RouteId, StaffUpdate,
};
use restodash_core::store::{EntityStore, StaffDirectory};

pub const RESTAURANT_ID: &str = "maquis-demo";
pub const MENU_BASE_URL: &str = "https://menu.restodash.app";
pub const PASSWORD: &str = "demo1234";
pub const OWNER_EMAIL: &str = "owner@demo.restodash.app";
pub const WAITER_EMAIL: &str = "awa@demo.restodash.app";
pub const MANAGER_EMAIL: &str = "kouame@demo.restodash.app";

const DISHES: &[(&str, &str, i64)] = &[
    ("Attiéké poisson", "plats", 3500),
    ("Garba", "plats", 1000),
    ("Alloco", "plats", 1500),
    ("Kedjenou de poulet", "plats", 5000),
    ("Foutou sauce graine", "plats", 4000),
    ("Placali sauce kplala", "plats", 3000),
    ("Poulet braisé", "grillades", 4500),
    ("Poisson braisé", "grillades", 5000),
    ("Brochettes de boeuf", "grillades", 2500),
    ("Bissap", "boissons", 500),
    ("Gnamakoudji", "boissons", 500),
    ("Jus de baobab", "boissons", 700),
];

fn categories() -> Vec<Category> {
    ["plats", "grillades", "boissons"]
        .iter()
        .enumerate()
        .map(|(i, id)| Category {
            id: id.to_string(),
            name: id[..1].to_uppercase() + &id[1..],
            position: i as u32,
        })
        .collect()
}

fn menu() -> Vec<MenuItem> {
    DISHES
        .iter()
        .enumerate()
        .map(|(i, (name, category, price))| MenuItem {
            id: format!("dish-{}", i + 1),
            name: name.to_string(),
            description: None,
            price: *price,
            category_id: category.to_string(),
            available: *name != "Kedjenou de poulet",
            image_url: None,
        })
        .collect()
}

/// In-memory backend with a small restaurant: two signed-up staff (one
/// waiter, one manager) and an owner account with no staff record.
pub async fn backend() -> Result<Arc<MemoryBackend>> {
    let backend = Arc::new(MemoryBackend::new());
    let menu = menu();
    backend.seed_categories(categories());
    backend.seed_menu(menu.clone());

    for email in [OWNER_EMAIL, WAITER_EMAIL, MANAGER_EMAIL] {
        backend.add_account(email, PASSWORD, &email.replace(['@', '.'], "-"));
    }

    let waiter = NewStaffMember::new(WAITER_EMAIL, "Awa Traoré", Role::Staff)?;
    let waiter = StaffDirectory::create(backend.as_ref(), waiter).await?;
    let grants = StaffUpdate {
        permissions: Some([RouteId::Menu, RouteId::Inventory].into_iter().collect()),
        ..Default::default()
    };
    backend.update(&waiter.id, grants).await?;

    let manager = NewStaffMember::new(MANAGER_EMAIL, "Kouamé N'Guessan", Role::Admin)?;
    StaffDirectory::create(backend.as_ref(), manager).await?;

    let now = Utc::now();
    for (table, picks, minutes_ago) in [("4", [0, 9], 45), ("7", [6, 10], 12), ("2", [1, 11], 3)] {
        let mut draft = OrderDraft::new(Some(table.to_string()));
        for pick in picks {
            draft.add(&menu[pick], 2);
        }
        let order = draft.submit(now - Duration::minutes(minutes_ago))?;
        EntityStore::<Order>::create(backend.as_ref(), order).await?;
    }

    Ok(backend)
}
