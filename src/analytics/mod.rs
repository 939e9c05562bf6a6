//! Pure aggregations over a transaction collection.
//!
//! Every function accepts an empty slice and returns zeroed output for it.

pub mod breakdown;
pub mod filters;
pub mod summary;

pub use breakdown::{
    by_category, by_type, risk_distribution, top_merchants_by_amount, top_merchants_by_count,
};
pub use filters::{open_alerts, Currency, Period, RiskLevel, TransactionFilter};
pub use summary::{account_summary, daily_totals, percent_change, DailyTotal};
