use rust_decimal::Decimal;

use super::line_item::{round_currency, LineItem};
use crate::error::{RentalError, Result};

/// Order total: the sum of every item's subtotal, each recomputed from the
/// item's fields. Stored subtotals are ignored. An empty order totals zero.
pub fn total(items: &[LineItem]) -> Result<Decimal> {
    let mut sum = Decimal::ZERO;
    for item in items {
        let subtotal = item.computed_subtotal()?;
        sum = sum
            .checked_add(subtotal)
            .ok_or_else(|| RentalError::invalid("order total is too large to represent"))?;
    }
    Ok(round_currency(sum))
}
