use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{RentalError, Result};

/// Decimal places kept for every stored amount
pub const CURRENCY_DP: u32 = 2;

pub(crate) fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal of one rental line: `quantity × daily_rate × days`, rounded to
/// currency precision (half away from zero).
///
/// Out-of-domain values are rejected rather than clamped.
pub fn subtotal(quantity: u32, daily_rate: Decimal, days: u32) -> Result<Decimal> {
    if quantity == 0 {
        return Err(RentalError::invalid("quantity must be at least 1"));
    }
    if days == 0 {
        return Err(RentalError::invalid("days must be at least 1"));
    }
    if daily_rate < Decimal::ZERO {
        return Err(RentalError::invalid(format!(
            "daily rate must not be negative (got {daily_rate})"
        )));
    }

    let product = Decimal::from(quantity)
        .checked_mul(daily_rate)
        .and_then(|amount| amount.checked_mul(Decimal::from(days)))
        .ok_or_else(|| RentalError::invalid("subtotal is too large to represent"))?;

    Ok(round_currency(product))
}

/// One rented vehicle type on an order
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LineItem {
    pub id: Uuid,
    pub car_type: String,
    pub quantity: u32,
    pub daily_rate: Decimal,
    pub days: u32,
    /// Stored copy of the derived subtotal. Totals never read it back.
    pub subtotal: Decimal,
}

impl LineItem {
    pub fn new(
        car_type: impl Into<String>,
        quantity: u32,
        daily_rate: Decimal,
        days: u32,
    ) -> Result<Self> {
        let car_type = car_type.into().trim().to_string();
        if car_type.is_empty() {
            return Err(RentalError::invalid("car type must not be empty"));
        }

        let subtotal = subtotal(quantity, daily_rate, days)?;

        Ok(Self {
            id: Uuid::new_v4(),
            car_type,
            quantity,
            daily_rate,
            days,
            subtotal,
        })
    }

    /// Replace every field with `replacement`'s while keeping this item's identity
    pub fn replaced_with(&self, replacement: LineItem) -> LineItem {
        LineItem {
            id: self.id,
            ..replacement
        }
    }

    /// Subtotal derived from the item's current fields
    pub fn computed_subtotal(&self) -> Result<Decimal> {
        subtotal(self.quantity, self.daily_rate, self.days)
    }
}

/// Parse item input like "Avanza:2:150000:3" into a line item.
///
/// Fields are split from the right, so a car type may itself contain ':'.
pub fn parse_item_input(input: &str) -> Result<LineItem> {
    let mut parts = input.rsplitn(4, ':');
    let (Some(days), Some(rate), Some(quantity), Some(car_type)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RentalError::InvalidItemFormat(input.to_string()));
    };

    let quantity: u32 = quantity.trim().parse().map_err(|_| {
        RentalError::invalid(format!(
            "quantity '{quantity}' for '{car_type}' must be a whole number"
        ))
    })?;
    let days: u32 = days.trim().parse().map_err(|_| {
        RentalError::invalid(format!(
            "days '{days}' for '{car_type}' must be a whole number"
        ))
    })?;
    let daily_rate = Decimal::from_str(rate.trim()).map_err(|_| {
        RentalError::invalid(format!("daily rate '{rate}' for '{car_type}' is not a number"))
    })?;

    LineItem::new(car_type, quantity, daily_rate, days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subtotal_multiplies_quantity_rate_and_days() {
        assert_eq!(subtotal(2, dec!(150000), 3).unwrap(), dec!(900000));
    }

    #[test]
    fn subtotal_rounds_half_away_from_zero() {
        assert_eq!(subtotal(1, dec!(10.005), 1).unwrap(), dec!(10.01));
        assert_eq!(subtotal(1, dec!(10.004), 1).unwrap(), dec!(10.00));
        assert_eq!(subtotal(3, dec!(0.335), 1).unwrap(), dec!(1.01));
    }

    #[test]
    fn subtotal_accepts_zero_rate() {
        assert_eq!(subtotal(4, Decimal::ZERO, 7).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn subtotal_is_never_negative_for_valid_input() {
        for quantity in 1..=5 {
            for days in 1..=10 {
                let value = subtotal(quantity, dec!(12.345), days).unwrap();
                assert!(value >= Decimal::ZERO);
                let exact = Decimal::from(quantity) * dec!(12.345) * Decimal::from(days);
                assert_eq!(value, round_currency(exact));
            }
        }
    }

    #[test]
    fn subtotal_rejects_out_of_domain_values() {
        assert!(matches!(
            subtotal(0, dec!(100), 1),
            Err(RentalError::InvalidInput(_))
        ));
        assert!(matches!(
            subtotal(1, dec!(100), 0),
            Err(RentalError::InvalidInput(_))
        ));
        assert!(matches!(
            subtotal(1, dec!(-0.01), 1),
            Err(RentalError::InvalidInput(_))
        ));
    }

    #[test]
    fn subtotal_reports_overflow_as_invalid_input() {
        assert!(matches!(
            subtotal(u32::MAX, Decimal::MAX, u32::MAX),
            Err(RentalError::InvalidInput(_))
        ));
    }

    #[test]
    fn new_item_stores_derived_subtotal() {
        let item = LineItem::new("  Avanza ", 2, dec!(150000), 3).unwrap();
        assert_eq!(item.car_type, "Avanza");
        assert_eq!(item.subtotal, dec!(900000));
    }

    #[test]
    fn new_item_rejects_blank_car_type() {
        assert!(LineItem::new("   ", 1, dec!(1), 1).is_err());
    }

    #[test]
    fn replacement_keeps_identity() {
        let original = LineItem::new("Avanza", 1, dec!(100), 1).unwrap();
        let edited = original.replaced_with(LineItem::new("Innova", 2, dec!(300), 2).unwrap());
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.car_type, "Innova");
        assert_eq!(edited.subtotal, dec!(1200));
    }

    #[test]
    fn parse_item_input_reads_all_fields() {
        let item = parse_item_input("Avanza:2:150000:3").unwrap();
        assert_eq!(item.car_type, "Avanza");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.daily_rate, dec!(150000));
        assert_eq!(item.days, 3);
        assert_eq!(item.subtotal, dec!(900000));
    }

    #[test]
    fn parse_item_input_allows_colon_in_car_type() {
        let item = parse_item_input("Van: 12 seat:1:250000.50:2").unwrap();
        assert_eq!(item.car_type, "Van: 12 seat");
        assert_eq!(item.subtotal, dec!(500001));
    }

    #[test]
    fn parse_item_input_rejects_bad_input() {
        assert!(matches!(
            parse_item_input("Avanza:2"),
            Err(RentalError::InvalidItemFormat(_))
        ));
        assert!(matches!(
            parse_item_input("Avanza:two:150000:3"),
            Err(RentalError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_item_input("Avanza:2:abc:3"),
            Err(RentalError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_item_input("Avanza:0:150000:3"),
            Err(RentalError::InvalidInput(_))
        ));
    }
}
