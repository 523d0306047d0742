mod line_item;
mod report;
mod total;

pub use line_item::{parse_item_input, subtotal, LineItem, CURRENCY_DP};
pub(crate) use line_item::round_currency;
pub use report::{grand_total, summarize, MonthlyReportRow, ReportOptions, ReportRange};
pub use total::total;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RentalError, Result};

/// Customer and date details captured when an order is created
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub order_date: NaiveDate,
    pub rental_start_date: NaiveDate,
    pub rental_end_date: NaiveDate,
    pub notes: Option<String>,
}

/// A customer rental order.
///
/// Every mutation goes through [`Order::add_item`], [`Order::replace_item`] or
/// [`Order::remove_item`], which recompute `total_amount` before returning.
/// A failed mutation leaves the order untouched.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_address: Option<String>,
    pub order_date: NaiveDate,
    pub rental_start_date: NaiveDate,
    pub rental_end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn new(details: OrderDetails, items: Vec<LineItem>) -> Result<Self> {
        let mut order = Self {
            id: Uuid::new_v4(),
            customer_name: details.customer_name,
            customer_phone: details.customer_phone,
            customer_address: details.customer_address,
            order_date: details.order_date,
            rental_start_date: details.rental_start_date,
            rental_end_date: details.rental_end_date,
            notes: details.notes,
            total_amount: Decimal::ZERO,
            items: Vec::new(),
        };
        order.commit(items)?;
        Ok(order)
    }

    /// First 8 hex characters of the id, uppercase
    pub fn short_id(&self) -> String {
        let mut id = self.id.simple().to_string();
        id.truncate(8);
        id.to_uppercase()
    }

    pub fn add_item(&mut self, item: LineItem) -> Result<()> {
        let mut items = self.items.clone();
        items.push(item);
        self.commit(items)
    }

    /// Replace the item at `index` (0-based), keeping its identity
    pub fn replace_item(&mut self, index: usize, item: LineItem) -> Result<()> {
        let existing = self
            .items
            .get(index)
            .ok_or_else(|| self.item_not_found(index))?;
        let replacement = existing.replaced_with(item);

        let mut items = self.items.clone();
        items[index] = replacement;
        self.commit(items)
    }

    /// Remove the item at `index` (0-based) and return it
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem> {
        if index >= self.items.len() {
            return Err(self.item_not_found(index));
        }

        let mut items = self.items.clone();
        let removed = items.remove(index);
        self.commit(items)?;
        Ok(removed)
    }

    pub fn recompute_total(&mut self) -> Result<()> {
        let items = self.items.clone();
        self.commit(items)
    }

    /// Whether the stored total matches a fresh recomputation from the items
    pub fn has_consistent_total(&self) -> bool {
        total(&self.items)
            .map(|computed| computed == self.total_amount)
            .unwrap_or(false)
    }

    fn commit(&mut self, mut items: Vec<LineItem>) -> Result<()> {
        for item in &mut items {
            item.subtotal = item.computed_subtotal()?;
        }
        let total_amount = total(&items)?;

        self.items = items;
        self.total_amount = total_amount;
        Ok(())
    }

    fn item_not_found(&self, index: usize) -> RentalError {
        RentalError::ItemNotFound {
            order: self.short_id(),
            index: index + 1,
            count: self.items.len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn details(order_date: &str) -> OrderDetails {
        let date = NaiveDate::parse_from_str(order_date, "%Y-%m-%d").unwrap();
        OrderDetails {
            customer_name: "Budi Santoso".to_string(),
            customer_phone: "+62 812 3456 7890".to_string(),
            customer_address: Some("Jl. Merdeka 10, Bandung".to_string()),
            order_date: date,
            rental_start_date: date,
            rental_end_date: date + chrono::Duration::days(3),
            notes: None,
        }
    }

    pub fn item(input: &str) -> LineItem {
        parse_item_input(input).unwrap()
    }
}
