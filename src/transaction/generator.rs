//! Single-record synthetic transaction generation.

use chrono::{Duration, NaiveDate};
use rand::Rng;

use super::types::{round2, Transaction, TransactionStatus, TransactionType};

/// Merchant vocabulary. The last `SUSPICIOUS_SLICE` entries are the suspicious slice.
pub const MERCHANTS: [&str; 36] = [
    "Amazon",
    "Netflix",
    "Uber",
    "Starbucks",
    "Apple Store",
    "Walmart",
    "Target",
    "Best Buy",
    "Home Depot",
    "Costco",
    "Whole Foods",
    "Spotify",
    "DoorDash",
    "Airbnb",
    "Shell",
    "AT&T",
    "Verizon",
    "CVS Pharmacy",
    "PayPal",
    "eBay",
    "Southwest Airlines",
    "Delta Airlines",
    "Marriott Hotels",
    "GitHub",
    "Microsoft",
    "Google",
    "Steam",
    "Hulu",
    "Tesla Charging",
    "Unknown Merchant",
    "Foreign Vendor",
    "Crypto Exchange",
    "Unverified Service",
    "International Transfer",
    "Cash Withdrawal",
    "ATM",
];

/// Category vocabulary. The last `SUSPICIOUS_SLICE` entries are the suspicious slice.
pub const CATEGORIES: [&str; 21] = [
    "Shopping",
    "Entertainment",
    "Transportation",
    "Food & Dining",
    "Technology",
    "Retail",
    "Groceries",
    "Home Improvement",
    "Subscription",
    "Delivery",
    "Travel",
    "Utility",
    "Telecommunications",
    "Healthcare",
    "Financial",
    "Gaming",
    "Cryptocurrency",
    "International",
    "Cash Services",
    "Unknown",
    "Suspicious",
];

pub const SUSPICIOUS_SLICE: usize = 6;

const SUSPICIOUS_VOCAB_MIN_RISK: u8 = 60;
const SUSPICIOUS_VOCAB_CHANCE: f64 = 0.7;
const UNUSUAL_AMOUNT_MIN_RISK: u8 = 70;
const UNUSUAL_AMOUNT_CHANCE: f64 = 0.6;
const RISKY_TYPE_MIN_RISK: u8 = 75;

const NORMAL_AMOUNT_MAX: f64 = 1_000.0;
const UNUSUAL_AMOUNT_MAX: f64 = 10_000.0;

/// Status cascade: (risk must exceed, chance, resulting status). First match wins.
const STATUS_CASCADE: [(u8, f64, TransactionStatus); 3] = [
    (70, 0.5, TransactionStatus::Flagged),
    (50, 0.3, TransactionStatus::Pending),
    (40, 0.2, TransactionStatus::Failed),
];

/// Generate one transaction whose risk score falls in `[risk_min, risk_max]`
/// and whose date falls in `[start, end]`.
///
/// Callers guarantee `risk_min <= risk_max <= 100` and `start <= end`.
pub fn generate_one<R: Rng + ?Sized>(
    rng: &mut R,
    index: usize,
    prefix: &str,
    risk_min: u8,
    risk_max: u8,
    start: NaiveDate,
    end: NaiveDate,
) -> Transaction {
    let risk_score = rng.gen_range(risk_min..=risk_max);

    let span_days = (end - start).num_days().max(0);
    let date = start + Duration::days(rng.gen_range(0..=span_days));

    let suspicious_vocab =
        risk_score > SUSPICIOUS_VOCAB_MIN_RISK && rng.gen_bool(SUSPICIOUS_VOCAB_CHANCE);
    let unusual_amount =
        risk_score > UNUSUAL_AMOUNT_MIN_RISK && rng.gen_bool(UNUSUAL_AMOUNT_CHANCE);

    let amount_max = if unusual_amount {
        UNUSUAL_AMOUNT_MAX
    } else {
        NORMAL_AMOUNT_MAX
    };
    let amount = round2(rng.gen::<f64>() * amount_max);

    let merchant = pick(rng, &MERCHANTS, suspicious_vocab);
    let category = pick(rng, &CATEGORIES, suspicious_vocab);

    let tx_type = if risk_score > RISKY_TYPE_MIN_RISK {
        if rng.gen_bool(0.5) {
            TransactionType::Withdrawal
        } else {
            TransactionType::Transfer
        }
    } else {
        TransactionType::ALL[rng.gen_range(0..TransactionType::ALL.len())]
    };

    let status = STATUS_CASCADE
        .iter()
        .find(|(min_risk, chance, _)| risk_score > *min_risk && rng.gen_bool(*chance))
        .map(|(_, _, status)| *status)
        .unwrap_or(TransactionStatus::Completed);

    Transaction {
        id: format!("{}-{:06}", prefix, index),
        date,
        amount,
        tx_type,
        status,
        merchant: merchant.to_string(),
        description: Transaction::describe(tx_type, merchant),
        category: category.to_string(),
        risk_score,
        flagged: Transaction::derive_flagged(risk_score, status),
    }
}

/// Pick from the suspicious tail or the normal head of a vocabulary.
fn pick<R: Rng + ?Sized>(rng: &mut R, vocab: &[&'static str], suspicious: bool) -> &'static str {
    let split = vocab.len() - SUSPICIOUS_SLICE;
    let idx = if suspicious {
        split + rng.gen_range(0..SUSPICIOUS_SLICE)
    } else {
        rng.gen_range(0..split)
    };
    vocab[idx]
}
