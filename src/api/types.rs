use serde::{Deserialize, Serialize};

use crate::analytics::breakdown::{MerchantAmount, MerchantCount};
use crate::analytics::Currency;
use crate::rules::RulePatch;
use crate::session::User;
use crate::transaction::{AccountSummary, Transaction};

// ============================================================
// Query params
// ============================================================

/// Paging for listings. Read alongside a `TransactionFilter` from the same query string.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DailyParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

// ============================================================
// Request bodies
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRecommendationRequest {
    pub suggested_changes: Vec<RulePatch>,
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub transactions: usize,
    pub rules: usize,
    pub signed_in: bool,
    pub last_uploaded_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub generated: usize,
}

#[derive(Debug, Serialize)]
pub struct FormattedSummary {
    pub balance: String,
    pub inflow: String,
    pub outflow: String,
    pub average: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: AccountSummary,
    pub currency: Currency,
    pub formatted: FormattedSummary,
    /// Last 30 days against the 30 before, in percent.
    pub inflow_change: f64,
    pub outflow_change: f64,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMerchantsResponse {
    pub by_count: Vec<MerchantCount>,
    pub by_amount: Vec<MerchantAmount>,
}
