use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of money movement for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::Transfer,
        Self::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
        }
    }

    /// Capitalized form used in generated descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Transfer => "Transfer",
            Self::Payment => "Payment",
        }
    }

    /// Case-insensitive parse. Returns None for anything outside the enum.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deposit" => Some(Self::Deposit),
            "withdrawal" => Some(Self::Withdrawal),
            "transfer" => Some(Self::Transfer),
            "payment" => Some(Self::Payment),
            _ => None,
        }
    }

    /// Deposits count as inflow.
    pub fn is_inflow(&self) -> bool {
        matches!(self, Self::Deposit)
    }

    /// Withdrawals and payments count as outflow. Transfers are neither.
    pub fn is_outflow(&self) -> bool {
        matches!(self, Self::Withdrawal | Self::Payment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Flagged,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Flagged => "flagged",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => Some(Self::Completed),
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            "flagged" => Some(Self::Flagged),
            _ => None,
        }
    }
}

/// A single dashboard transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub merchant: String,
    pub description: String,
    pub category: String,
    pub risk_score: u8,
    pub flagged: bool,
}

impl Transaction {
    /// The creation-time flag rule: high risk or an explicit flagged status.
    pub fn derive_flagged(risk_score: u8, status: TransactionStatus) -> bool {
        risk_score > 70 || status == TransactionStatus::Flagged
    }

    /// `"{Type} - {Merchant}"`.
    pub fn describe(tx_type: TransactionType, merchant: &str) -> String {
        format!("{} - {}", tx_type.label(), merchant)
    }
}

/// Aggregate view over a transaction collection. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub total_balance: f64,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub transactions_count: usize,
    pub flagged_transactions: usize,
    pub average_transaction_amount: f64,
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
