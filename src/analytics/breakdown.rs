use serde::Serialize;
use std::collections::BTreeMap;

use crate::transaction::types::round2;
use crate::transaction::{Transaction, TransactionType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeBreakdown {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBucket {
    pub range: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantCount {
    pub merchant: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantAmount {
    pub merchant: String,
    pub amount: f64,
}

/// Risk histogram buckets. All are half-open except the last, which includes 100.
const RISK_BUCKETS: [(&str, u8, u8); 5] = [
    ("0-20", 0, 20),
    ("20-40", 20, 40),
    ("40-60", 40, 60),
    ("60-80", 60, 80),
    ("80-100", 80, 100),
];

/// Count and total per transaction type, always in deposit/withdrawal/transfer/payment order.
pub fn by_type(transactions: &[Transaction]) -> Vec<TypeBreakdown> {
    TransactionType::ALL
        .iter()
        .map(|tx_type| {
            let (count, total) = transactions
                .iter()
                .filter(|t| t.tx_type == *tx_type)
                .fold((0usize, 0.0), |(c, s), t| (c + 1, s + t.amount));
            TypeBreakdown {
                tx_type: *tx_type,
                count,
                total: round2(total),
            }
        })
        .collect()
}

/// Count and amount per category, most frequent first (ties alphabetical).
pub fn by_category(transactions: &[Transaction]) -> Vec<CategoryBreakdown> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for tx in transactions {
        let entry = groups.entry(tx.category.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += tx.amount;
    }

    let mut out: Vec<CategoryBreakdown> = groups
        .into_iter()
        .map(|(category, (count, amount))| CategoryBreakdown {
            category: category.to_string(),
            count,
            amount: round2(amount),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

pub fn risk_distribution(transactions: &[Transaction]) -> Vec<RiskBucket> {
    let last = RISK_BUCKETS.len() - 1;
    RISK_BUCKETS
        .iter()
        .enumerate()
        .map(|(i, (range, low, high))| {
            let count = transactions
                .iter()
                .filter(|t| {
                    t.risk_score >= *low
                        && (t.risk_score < *high || (i == last && t.risk_score <= *high))
                })
                .count();
            RiskBucket {
                range: *range,
                count,
            }
        })
        .collect()
}

pub fn top_merchants_by_count(transactions: &[Transaction], limit: usize) -> Vec<MerchantCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tx in transactions {
        *counts.entry(tx.merchant.as_str()).or_default() += 1;
    }

    let mut out: Vec<MerchantCount> = counts
        .into_iter()
        .map(|(merchant, count)| MerchantCount {
            merchant: merchant.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(limit);
    out
}

pub fn top_merchants_by_amount(
    transactions: &[Transaction],
    limit: usize,
) -> Vec<MerchantAmount> {
    let mut amounts: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in transactions {
        *amounts.entry(tx.merchant.as_str()).or_default() += tx.amount;
    }

    let mut out: Vec<MerchantAmount> = amounts
        .into_iter()
        .map(|(merchant, amount)| MerchantAmount {
            merchant: merchant.to_string(),
            amount: round2(amount),
        })
        .collect();
    out.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{tx, tx_at};
    use chrono::NaiveDate;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_by_type_fixed_order_even_when_empty() {
        let out = by_type(&[]);
        let order: Vec<_> = out.iter().map(|b| b.tx_type).collect();
        assert_eq!(order, TransactionType::ALL.to_vec());
        assert!(out.iter().all(|b| b.count == 0 && b.total == 0.0));
    }

    #[test]
    fn test_by_type_totals() {
        let txs = vec![
            tx("a", d(), 10.0, TransactionType::Payment, 0, false),
            tx("b", d(), 15.5, TransactionType::Payment, 0, false),
            tx("c", d(), 3.0, TransactionType::Deposit, 0, false),
        ];
        let out = by_type(&txs);
        assert_eq!(out[0].count, 1);
        assert_eq!(out[3].count, 2);
        assert_eq!(out[3].total, 25.5);
    }

    #[test]
    fn test_risk_bucket_boundaries() {
        let scores = [0u8, 19, 20, 39, 40, 60, 79, 80, 100];
        let txs: Vec<_> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| tx(&i.to_string(), d(), 1.0, TransactionType::Deposit, *s, false))
            .collect();

        let counts: Vec<_> = risk_distribution(&txs).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 1, 2, 2]);
        assert_eq!(risk_distribution(&[]).iter().map(|b| b.count).sum::<usize>(), 0);
    }

    #[test]
    fn test_by_category_sorted_by_count() {
        let txs = vec![
            tx_at("a", "Shopping", "Amazon", 5.0),
            tx_at("b", "Travel", "Delta Airlines", 500.0),
            tx_at("c", "Shopping", "Target", 7.0),
        ];
        let out = by_category(&txs);
        assert_eq!(out[0].category, "Shopping");
        assert_eq!(out[0].count, 2);
        assert_eq!(out[0].amount, 12.0);
        assert_eq!(out[1].category, "Travel");
    }

    #[test]
    fn test_top_merchants() {
        let txs = vec![
            tx_at("a", "Shopping", "Amazon", 5.0),
            tx_at("b", "Shopping", "Amazon", 5.0),
            tx_at("c", "Travel", "Airbnb", 900.0),
            tx_at("d", "Retail", "Target", 1.0),
        ];
        let by_count = top_merchants_by_count(&txs, 2);
        assert_eq!(by_count.len(), 2);
        assert_eq!(by_count[0].merchant, "Amazon");
        assert_eq!(by_count[0].count, 2);

        let by_amount = top_merchants_by_amount(&txs, 5);
        assert_eq!(by_amount[0].merchant, "Airbnb");
        assert_eq!(by_amount.len(), 3);
    }
}
