use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::Order;
use crate::error::{RentalError, Result};

/// Revenue summary for one calendar month of order dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyReportRow {
    pub year: i32,
    pub month: u32,
    pub order_count: usize,
    pub total_revenue: Decimal,
}

/// Inclusive bounds on `order_date`. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl ReportRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(RentalError::invalid(format!(
                    "report range starts ({from}) after it ends ({to})"
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub range: ReportRange,
    /// Emit zero rows for months without orders
    pub dense: bool,
}

type MonthKey = (i32, u32);

fn month_of(date: NaiveDate) -> MonthKey {
    (date.year(), date.month())
}

fn next_month((year, month): MonthKey) -> MonthKey {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Group orders by the calendar month of their order date.
///
/// Revenue is the sum of each order's stored `total_amount`; line items are
/// not consulted. Rows come back oldest month first.
pub fn summarize(orders: &[Order], options: &ReportOptions) -> Result<Vec<MonthlyReportRow>> {
    let mut months: BTreeMap<MonthKey, (usize, Decimal)> = BTreeMap::new();

    for order in orders
        .iter()
        .filter(|order| options.range.contains(order.order_date))
    {
        let entry = months
            .entry(month_of(order.order_date))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 = add_revenue(entry.1, order.total_amount)?;
    }

    if options.dense {
        let first = options
            .range
            .start()
            .map(month_of)
            .or_else(|| months.keys().next().copied());
        let last = options
            .range
            .end()
            .map(month_of)
            .or_else(|| months.keys().next_back().copied());

        if let (Some(first), Some(last)) = (first, last) {
            let mut key = first;
            while key <= last {
                months.entry(key).or_insert((0, Decimal::ZERO));
                key = next_month(key);
            }
        }
    }

    Ok(months
        .into_iter()
        .map(|((year, month), (order_count, total_revenue))| MonthlyReportRow {
            year,
            month,
            order_count,
            total_revenue,
        })
        .collect())
}

/// Order count and revenue across all rows
pub fn grand_total(rows: &[MonthlyReportRow]) -> Result<(usize, Decimal)> {
    rows.iter()
        .try_fold((0, Decimal::ZERO), |(count, revenue), row| {
            Ok((count + row.order_count, add_revenue(revenue, row.total_revenue)?))
        })
}

fn add_revenue(sum: Decimal, amount: Decimal) -> Result<Decimal> {
    sum.checked_add(amount)
        .ok_or_else(|| RentalError::invalid("report revenue is too large to represent"))
}
