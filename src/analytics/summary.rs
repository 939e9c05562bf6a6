use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::transaction::types::round2;
use crate::transaction::{AccountSummary, Transaction};

/// Inflow/outflow totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub inflow: f64,
    pub outflow: f64,
    pub net: f64,
    pub count: usize,
}

/// Compute the account summary. An empty collection yields all zeros.
pub fn account_summary(transactions: &[Transaction]) -> AccountSummary {
    if transactions.is_empty() {
        return AccountSummary::default();
    }

    let (inflow, outflow) = flows(transactions.iter());
    let total: f64 = transactions.iter().map(|t| t.amount).sum();
    let flagged = transactions.iter().filter(|t| t.flagged).count();

    AccountSummary {
        total_balance: round2(inflow - outflow),
        total_inflow: round2(inflow),
        total_outflow: round2(outflow),
        transactions_count: transactions.len(),
        flagged_transactions: flagged,
        average_transaction_amount: round2(total / transactions.len() as f64),
    }
}

/// Per-day totals for the `window_days` days ending with `today`, oldest first.
///
/// Always returns exactly `window_days` entries; days without transactions are zeroed.
pub fn daily_totals(
    transactions: &[Transaction],
    window_days: u32,
    today: NaiveDate,
) -> Vec<DailyTotal> {
    let mut by_date: HashMap<NaiveDate, Vec<&Transaction>> = HashMap::new();
    for tx in transactions {
        by_date.entry(tx.date).or_default().push(tx);
    }

    (0..window_days)
        .rev()
        .map(|back| {
            let date = today - Duration::days(i64::from(back));
            let day = by_date.get(&date).map(|v| v.as_slice()).unwrap_or(&[]);
            let (inflow, outflow) = flows(day.iter().copied());
            DailyTotal {
                date,
                inflow: round2(inflow),
                outflow: round2(outflow),
                net: round2(inflow - outflow),
                count: day.len(),
            }
        })
        .collect()
}

/// Percentage change from `previous` to `current`.
/// A zero baseline reports 100 for growth and 0 otherwise.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous.abs() * 100.0
}

fn flows<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> (f64, f64) {
    transactions.fold((0.0, 0.0), |(inflow, outflow), t| {
        if t.tx_type.is_inflow() {
            (inflow + t.amount, outflow)
        } else if t.tx_type.is_outflow() {
            (inflow, outflow + t.amount)
        } else {
            (inflow, outflow)
        }
    })
}
