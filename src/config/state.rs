use serde::{Deserialize, Serialize};

use crate::error::{RentalError, Result};
use crate::order::Order;

/// Every recorded order, oldest first
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl State {
    /// Orders as shown by `list`: newest first
    pub fn newest_first(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().rev()
    }

    /// Resolve an order reference to its position in `orders`.
    ///
    /// Accepts a 1-based index from `list` (plain digits) or an id prefix of
    /// at least four characters (case-insensitive, dashes optional).
    pub fn position(&self, reference: &str) -> Result<usize> {
        // Digits only: `parse` would also take a leading '+'
        let index = reference
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| reference.parse::<usize>().ok())
            .flatten();
        if let Some(idx) = index {
            if (1..=self.orders.len()).contains(&idx) {
                return Ok(self.orders.len() - idx);
            }
            // Longer digit runs may still be an id prefix
            if reference.len() < 4 {
                return Err(RentalError::InvalidOrderIndex(reference.to_string()));
            }
        }

        let needle = reference.replace('-', "").to_lowercase();
        if needle.len() < 4 {
            return Err(RentalError::OrderNotFound(reference.to_string()));
        }

        let mut matches = self
            .orders
            .iter()
            .enumerate()
            .filter(|(_, order)| order.id.simple().to_string().starts_with(&needle))
            .map(|(pos, _)| pos);

        match (matches.next(), matches.next()) {
            (Some(pos), None) => Ok(pos),
            (Some(_), Some(_)) => Err(RentalError::AmbiguousOrder(reference.to_string())),
            (None, _) => Err(RentalError::OrderNotFound(reference.to_string())),
        }
    }
}
