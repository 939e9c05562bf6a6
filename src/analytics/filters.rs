use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionStatus, TransactionType};

/// Display risk level. Thresholds differ from the generation bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=19 => Self::Low,
            20..=49 => Self::Medium,
            50..=79 => Self::High,
            _ => Self::Critical,
        }
    }
}

/// Trailing period selector used by the date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Week,
    Month,
    Year,
}

impl Period {
    /// First day included by the period, or None for `All`.
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::All => None,
            Self::Week => Some(today - Duration::days(7)),
            Self::Month => today.checked_sub_months(Months::new(1)),
            Self::Year => today.checked_sub_months(Months::new(12)),
        }
    }
}

/// Conjunctive listing filter. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub min_risk: Option<u8>,
    pub max_risk: Option<u8>,
    pub flagged: Option<bool>,
    #[serde(default)]
    pub period: Period,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction, today: NaiveDate) -> bool {
        if let Some(start) = self.period.start(today) {
            if tx.date < start {
                return false;
            }
        }
        self.since.map_or(true, |d| tx.date >= d)
            && self.until.map_or(true, |d| tx.date <= d)
            && self.min_amount.map_or(true, |a| tx.amount >= a)
            && self.max_amount.map_or(true, |a| tx.amount <= a)
            && self.tx_type.map_or(true, |t| tx.tx_type == t)
            && self.min_risk.map_or(true, |r| tx.risk_score >= r)
            && self.max_risk.map_or(true, |r| tx.risk_score <= r)
            && self.flagged.map_or(true, |f| tx.flagged == f)
    }

    pub fn apply(&self, transactions: &[Transaction], today: NaiveDate) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| self.matches(t, today))
            .cloned()
            .collect()
    }
}

/// Open fraud alerts: flagged by score but not yet confirmed, highest risk first.
pub fn open_alerts(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut alerts: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.flagged && t.status != TransactionStatus::Flagged)
        .cloned()
        .collect();
    alerts.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    alerts
}

/// Display currency. Amounts are stored in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Inr,
}

const INR_PER_USD: f64 = 83.0;

impl Currency {
    pub fn convert(&self, usd: f64) -> f64 {
        match self {
            Self::Usd => usd,
            Self::Inr => usd * INR_PER_USD,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Inr => "₹",
        }
    }

    /// Convert and render with thousands separators and two decimals, e.g. `$1,234.50`.
    pub fn format(&self, usd: f64) -> String {
        let value = self.convert(usd);
        let sign = if value < 0.0 { "-" } else { "" };
        let cents = (value.abs() * 100.0).round() as u64;
        let whole = (cents / 100).to_string();

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        format!("{}{}{}.{:02}", sign, self.symbol(), grouped, cents % 100)
    }
}
