use serde::Serialize;

use crate::transaction::Transaction;

use super::types::{Condition, FraudRule, RuleType};

/// An enabled rule that fired for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleHit {
    pub rule_id: String,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub threshold: u8,
    pub detail: String,
}

/// Descriptive factor shown next to a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub factor: &'static str,
    pub description: &'static str,
}

const AMOUNT_EPSILON: f64 = 0.005;

/// Evaluate every enabled rule against `tx`.
///
/// `context` is the collection `tx` belongs to; frequency rules count
/// transactions at the same merchant on the same day within it.
pub fn evaluate(tx: &Transaction, rules: &[FraudRule], context: &[Transaction]) -> Vec<RuleHit> {
    rules
        .iter()
        .filter(|r| r.enabled)
        .filter_map(|rule| {
            let detail = match rule.rule_type {
                RuleType::Amount => check_amount(tx, rule),
                RuleType::Merchant => check_text(rule, &[tx.merchant.as_str()]),
                RuleType::Location => {
                    check_text(rule, &[tx.category.as_str(), tx.description.as_str()])
                }
                RuleType::Frequency => check_frequency(tx, rule, context),
            }?;
            Some(RuleHit {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                rule_type: rule.rule_type,
                threshold: rule.threshold,
                detail,
            })
        })
        .collect()
}

/// Highest threshold among the hits, or 0 when nothing fired.
pub fn rule_score(hits: &[RuleHit]) -> u8 {
    hits.iter().map(|h| h.threshold).max().unwrap_or(0)
}

pub fn risk_factors(tx: &Transaction) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if tx.amount > 5000.0 {
        factors.push(RiskFactor {
            factor: "Large Transaction Amount",
            description: "Transaction exceeds $5,000",
        });
    }
    if tx.risk_score > 80 {
        factors.push(RiskFactor {
            factor: "High Risk Score",
            description: "Risk score exceeds 80%",
        });
    }
    if factors.is_empty() {
        factors.push(RiskFactor {
            factor: "Unusual Transaction Pattern",
            description: "Transaction deviates from normal patterns",
        });
    }

    factors
}

fn compare(actual: f64, condition: Condition, expected: f64) -> bool {
    match condition {
        Condition::Greater => actual > expected,
        Condition::Less => actual < expected,
        Condition::Equal => (actual - expected).abs() < AMOUNT_EPSILON,
        Condition::Contains => false,
    }
}

fn check_amount(tx: &Transaction, rule: &FraudRule) -> Option<String> {
    let expected = rule.value.as_f64()?;
    compare(tx.amount, rule.condition, expected).then(|| {
        format!("amount {:.2} {:?} {}", tx.amount, rule.condition, expected).to_lowercase()
    })
}

fn check_frequency(tx: &Transaction, rule: &FraudRule, context: &[Transaction]) -> Option<String> {
    let expected = rule.value.as_f64()?;
    let same_day = context
        .iter()
        .filter(|t| t.merchant == tx.merchant && t.date == tx.date)
        .count()
        .max(1);
    compare(same_day as f64, rule.condition, expected).then(|| {
        format!(
            "{} transactions at {} on {}",
            same_day, tx.merchant, tx.date
        )
    })
}

fn check_text(rule: &FraudRule, fields: &[&str]) -> Option<String> {
    let terms = rule.value.terms();
    for field in fields {
        let haystack = field.to_lowercase();
        for term in &terms {
            let needle = term.to_lowercase();
            let hit = match rule.condition {
                Condition::Contains => haystack.contains(&needle),
                Condition::Equal => haystack == needle,
                Condition::Greater | Condition::Less => false,
            };
            if hit {
                return Some(format!("'{}' matches '{}'", field, term));
            }
        }
    }
    None
}
