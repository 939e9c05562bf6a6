use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value as JsonValue};

use crate::transaction::types::round2;
use crate::transaction::{Transaction, TransactionStatus, TransactionType};

/// Why a row could not become a transaction even after defaults were applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("row is not an object")]
    NotAnObject,
    #[error("amount {0} is not a non-negative number")]
    InvalidAmount(f64),
    #[error("risk score {0} is outside 0..=100")]
    RiskOutOfRange(f64),
}

const DEFAULT_MERCHANT: &str = "Unknown";
const DEFAULT_DESCRIPTION: &str = "Transaction";
const DEFAULT_CATEGORY: &str = "Uncategorized";
const TOKEN_LEN: usize = 9;

/// Coerce one uploaded row into a transaction, filling defaults for missing
/// or invalid fields, then check the result's shape.
pub fn coerce_row<R: Rng + ?Sized>(
    rng: &mut R,
    row: &JsonValue,
    today: NaiveDate,
) -> Result<Transaction, ValidationError> {
    let obj = row.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = text(obj, "id").unwrap_or_else(|| random_token(rng));

    let date = obj
        .get("date")
        .and_then(JsonValue::as_str)
        .and_then(parse_date)
        .unwrap_or(today);

    let raw_amount = number(obj, "amount").unwrap_or(0.0);
    let amount = round2(raw_amount);
    if !amount.is_finite() || raw_amount < 0.0 {
        return Err(ValidationError::InvalidAmount(raw_amount));
    }

    let tx_type = obj
        .get("type")
        .and_then(JsonValue::as_str)
        .and_then(TransactionType::parse)
        .unwrap_or(TransactionType::Payment);

    let status = obj
        .get("status")
        .and_then(JsonValue::as_str)
        .and_then(TransactionStatus::parse)
        .unwrap_or(TransactionStatus::Completed);

    let risk = number(obj, "riskScore").unwrap_or(0.0).round();
    if !(0.0..=100.0).contains(&risk) {
        return Err(ValidationError::RiskOutOfRange(risk));
    }

    let flagged = match obj.get("flagged") {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    Ok(Transaction {
        id,
        date,
        amount,
        tx_type,
        status,
        merchant: text(obj, "merchant").unwrap_or_else(|| DEFAULT_MERCHANT.to_string()),
        description: text(obj, "description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        category: text(obj, "category").unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        risk_score: risk as u8,
        flagged,
    })
}

/// Non-empty string or number rendered as text.
fn text(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match obj.get(key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Number or numeric string. NaN never comes back.
fn number(obj: &Map<String, JsonValue>, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (!value.is_nan()).then_some(value)
}

/// Accepts `YYYY-MM-DD` and anything that starts with it (ISO timestamps).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn random_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TOKEN_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 4).unwrap()
    }

    fn coerce(row: JsonValue) -> Result<Transaction, ValidationError> {
        coerce_row(&mut StdRng::seed_from_u64(1), &row, today())
    }

    #[test]
    fn test_scenario_loose_row() {
        let tx = coerce(json!({
            "id": "TX1",
            "date": "2024-01-01",
            "amount": "12.5",
            "type": "bogus",
            "status": "done",
            "merchant": "X",
            "description": "",
            "category": "",
            "riskScore": "notanumber",
            "flagged": "no"
        }))
        .unwrap();

        assert_eq!(tx.id, "TX1");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(tx.amount, 12.5);
        assert_eq!(tx.tx_type, TransactionType::Payment);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.merchant, "X");
        assert_eq!(tx.description, "Transaction");
        assert_eq!(tx.category, "Uncategorized");
        assert_eq!(tx.risk_score, 0);
        assert!(!tx.flagged);
    }

    #[test]
    fn test_empty_object_gets_all_defaults() {
        let tx = coerce(json!({})).unwrap();
        assert_eq!(tx.id.len(), TOKEN_LEN);
        assert!(tx.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(tx.date, today());
        assert_eq!(tx.amount, 0.0);
        assert_eq!(tx.merchant, "Unknown");
        assert_eq!(tx.risk_score, 0);
    }

    #[test]
    fn test_typed_values_pass_through() {
        let tx = coerce(json!({
            "id": 77,
            "date": "2024-02-03T10:00:00Z",
            "amount": 99.999,
            "type": "Deposit",
            "status": "flagged",
            "riskScore": 88,
            "flagged": true
        }))
        .unwrap();
        assert_eq!(tx.id, "77");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(tx.amount, 100.0);
        assert_eq!(tx.tx_type, TransactionType::Deposit);
        assert_eq!(tx.status, TransactionStatus::Flagged);
        assert_eq!(tx.risk_score, 88);
        assert!(tx.flagged);
    }

    #[test]
    fn test_csv_style_strings() {
        let tx = coerce(json!({"flagged": "TRUE", "riskScore": " 42 ", "date": "not a date"}))
            .unwrap();
        assert!(tx.flagged);
        assert_eq!(tx.risk_score, 42);
        assert_eq!(tx.date, today());
    }

    #[test]
    fn test_shape_failures() {
        assert_eq!(coerce(json!(5)), Err(ValidationError::NotAnObject));
        assert_eq!(
            coerce(json!({"amount": -3})),
            Err(ValidationError::InvalidAmount(-3.0))
        );
        // finite on its own but overflows once rounded to cents
        assert_eq!(
            coerce(json!({"amount": "1e307"})),
            Err(ValidationError::InvalidAmount(1e307))
        );
        assert_eq!(
            coerce(json!({"amount": f64::MAX})),
            Err(ValidationError::InvalidAmount(f64::MAX))
        );
        assert_eq!(
            coerce(json!({"riskScore": 140})),
            Err(ValidationError::RiskOutOfRange(140.0))
        );
    }
}
