use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MenuItem;
use crate::validation::ValidationError;

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Served,
    Paid,
    Cancelled,
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl OrderLine {
    pub fn subtotal(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub table: Option<String>,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    pub total: i64,
    pub created_at: DateTime<Utc>,
}

/// Order being composed at the point of sale.
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    table: Option<String>,
    lines: Vec<OrderLine>,
}

impl OrderDraft {
    pub fn new(table: Option<String>) -> Self {
        Self { table, lines: Vec::new() }
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` of a menu item, merging with an existing line.
    pub fn add(&mut self, item: &MenuItem, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.menu_item_id == item.id) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(OrderLine {
                menu_item_id: item.id.clone(),
                name: item.name.clone(),
                unit_price: item.price,
                quantity,
            }),
        }
    }

    /// Set a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, menu_item_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(menu_item_id);
        } else if let Some(line) = self.lines.iter_mut().find(|l| l.menu_item_id == menu_item_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove(&mut self, menu_item_id: &str) {
        self.lines.retain(|l| l.menu_item_id != menu_item_id);
    }

    pub fn total(&self) -> i64 {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    /// Freeze the draft into an order ready for the storage collaborator.
    ///
    /// The id is left empty; the store assigns one on `create`.
    pub fn submit(self, now: DateTime<Utc>) -> Result<Order, ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        let total = self.total();
        Ok(Order {
            id: String::new(),
            table: self.table,
            lines: self.lines,
            status: OrderStatus::Pending,
            total,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(id: &str, price: i64) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: None,
            price,
            category_id: "mains".to_string(),
            available: true,
            image_url: None,
        }
    }

    #[test]
    fn test_draft_merges_lines_and_totals() {
        let mut draft = OrderDraft::new(Some("T4".to_string()));
        draft.add(&dish("alloco", 1000), 2);
        draft.add(&dish("bissap", 500), 1);
        draft.add(&dish("alloco", 1000), 1);

        assert_eq!(draft.lines().len(), 2);
        assert_eq!(draft.lines()[0].quantity, 3);
        assert_eq!(draft.total(), 3500);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut draft = OrderDraft::default();
        draft.add(&dish("garba", 1500), 1);
        draft.set_quantity("garba", 4);
        assert_eq!(draft.total(), 6000);
        draft.set_quantity("garba", 0);
        assert!(draft.is_empty());
    }

    #[test]
    fn test_submit_empty_draft_fails() {
        let draft = OrderDraft::new(None);
        assert_eq!(draft.submit(Utc::now()), Err(ValidationError::EmptyOrder));
    }

    #[test]
    fn test_submit_builds_pending_order() {
        let mut draft = OrderDraft::new(Some("T1".to_string()));
        draft.add(&dish("kedjenou", 4500), 2);
        let order = draft.submit(Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, 9000);
        assert_eq!(order.table.as_deref(), Some("T1"));
    }
}
