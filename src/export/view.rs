use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{Company, Config};
use crate::error::Result;
use crate::order::{round_currency, subtotal, total, Order, CURRENCY_DP};

/// A line item on the invoice, already formatted for display
#[derive(Debug, Serialize)]
pub struct InvoiceViewItem {
    pub number: usize,
    pub car_type: String,
    pub quantity: u32,
    pub days: u32,
    pub daily_rate: String,
    pub subtotal: String,
}

/// Everything the invoice template needs
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    pub number: String,
    pub order_date: String,
    pub rental_start_date: String,
    pub rental_end_date: String,
    pub company: Company,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: Option<String>,
    pub items: Vec<InvoiceViewItem>,
    pub total: String,
    pub notes: Option<String>,
    pub payment_note: Option<String>,
}

impl InvoiceView {
    /// Totals are recomputed from the items rather than read from the order
    pub fn from_order(order: &Order, config: &Config) -> Result<Self> {
        let symbol = &config.invoice.currency_symbol;

        let items = order
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Ok(InvoiceViewItem {
                    number: i + 1,
                    car_type: item.car_type.clone(),
                    quantity: item.quantity,
                    days: item.days,
                    daily_rate: format_money(item.daily_rate, symbol),
                    subtotal: format_money(
                        subtotal(item.quantity, item.daily_rate, item.days)?,
                        symbol,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            number: order.short_id(),
            order_date: order.order_date.format("%d %B %Y").to_string(),
            rental_start_date: order.rental_start_date.format("%d %B %Y").to_string(),
            rental_end_date: order.rental_end_date.format("%d %B %Y").to_string(),
            company: config.company.clone(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_address: order.customer_address.clone(),
            items,
            total: format_money(total(&order.items)?, symbol),
            notes: order.notes.clone(),
            payment_note: config.invoice.payment_note.clone(),
        })
    }
}

/// `1234567.5` → `Rp 1,234,567.50`
pub fn format_money(amount: Decimal, currency_symbol: &str) -> String {
    let fixed = format!("{:.*}", CURRENCY_DP as usize, round_currency(amount.abs()));
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{currency_symbol}{grouped}")
    } else {
        format!("{sign}{currency_symbol}{grouped}.{frac}")
    }
}
