//! Fraud report confirmation mail.
//!
//! Building the message is pure; delivery goes through [`ReportSender`].
//! [`HttpSender`] posts to a Resend-compatible `/emails` endpoint and
//! [`LogSender`] only logs.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::NotifyConfig;
use crate::transaction::Transaction;

pub const DEFAULT_FROM: &str = "FinSafe Security <security@finsafe.local>";
pub const DEFAULT_ENDPOINT: &str = "https://api.resend.com/emails";

const REF_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudReportRequest {
    pub transaction_id: String,
    pub merchant: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reported_by: String,
    pub reported_at: String,
}

impl FraudReportRequest {
    pub fn for_transaction(tx: &Transaction, reported_by: &str, reported_at: String) -> Self {
        Self {
            transaction_id: tx.id.clone(),
            merchant: tx.merchant.clone(),
            amount: tx.amount,
            date: tx.date.to_string(),
            category: tx.category.clone(),
            description: tx.description.clone(),
            reported_by: reported_by.to_string(),
            reported_at,
        }
    }

    /// First eight characters of the transaction id.
    pub fn transaction_ref(&self) -> &str {
        match self.transaction_id.char_indices().nth(REF_LEN) {
            Some((idx, _)) => &self.transaction_id[..idx],
            None => &self.transaction_id,
        }
    }

    pub fn subject(&self) -> String {
        format!("Fraud Report Confirmation - Transaction {}", self.transaction_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// `{success, data?, error?}` as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Escape text for use inside HTML element content and quoted attributes.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_report_html(req: &FraudReportRequest) -> String {
    let description = if req.description.trim().is_empty() {
        "N/A"
    } else {
        req.description.as_str()
    };

    format!(
        concat!(
            "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">",
            "<h1>Fraud Report Confirmation</h1>",
            "<p>We have received your fraud report for transaction {reference}.</p>",
            "<h2>Transaction Details:</h2>",
            "<ul>",
            "<li><strong>Merchant:</strong> {merchant}</li>",
            "<li><strong>Amount:</strong> ${amount:.2}</li>",
            "<li><strong>Date:</strong> {date}</li>",
            "<li><strong>Category:</strong> {category}</li>",
            "<li><strong>Description:</strong> {description}</li>",
            "</ul>",
            "<p>Our fraud investigation team has been notified and will review this transaction.</p>",
            "<p>This is an automated email. Please do not reply to this message.</p>",
            "</div>"
        ),
        reference = escape_html(req.transaction_ref()),
        merchant = escape_html(&req.merchant),
        amount = req.amount,
        date = escape_html(&req.date),
        category = escape_html(&req.category),
        description = escape_html(description),
    )
}

/// Build the confirmation mail. Fails when the reporter address is missing.
pub fn build_email(from: &str, req: &FraudReportRequest) -> Result<OutgoingEmail, String> {
    let to = req.reported_by.trim();
    if to.is_empty() {
        return Err("Missing email address (reportedBy)".to_string());
    }
    Ok(OutgoingEmail {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: req.subject(),
        html: render_report_html(req),
    })
}

/// Delivery port. Returns the provider's response body.
pub trait ReportSender: Send + Sync {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, eyre::Result<JsonValue>>;
}

/// Logs the message and reports success.
#[derive(Debug, Default, Clone)]
pub struct LogSender;

impl ReportSender for LogSender {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, eyre::Result<JsonValue>> {
        Box::pin(async move {
            tracing::info!(
                to = ?email.to,
                subject = %email.subject,
                bytes = email.html.len(),
                "Fraud report email dispatched (log only)"
            );
            Ok(json!({ "delivered": false, "to": email.to }))
        })
    }
}

/// Posts the mail as JSON with a bearer key and returns the provider's reply.
pub struct HttpSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSender {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre::eyre!("Failed to build mail API client: {}", e))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &NotifyConfig) -> eyre::Result<Option<Self>> {
        match &config.api_key {
            Some(key) => Self::new(
                &config.endpoint,
                key,
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }
}

impl ReportSender for HttpSender {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, eyre::Result<JsonValue>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(email)
                .send()
                .await
                .map_err(|e| eyre::eyre!("Failed to reach mail API: {}", e))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| eyre::eyre!("Failed to read mail API response: {}", e))?;

            if !status.is_success() {
                return Err(eyre::eyre!(
                    "Mail API returned {}: {}",
                    status.as_u16(),
                    provider_message(&body)
                ));
            }

            serde_json::from_str(&body)
                .map_err(|e| eyre::eyre!("Failed to parse mail API response: {}", e))
        })
    }
}

/// `message` from a JSON error body, else the raw text.
fn provider_message(body: &str) -> String {
    let parsed = serde_json::from_str::<JsonValue>(body).ok();
    match parsed.as_ref().and_then(|v| v.get("message")).and_then(JsonValue::as_str) {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response".to_string(),
        None => body.trim().to_string(),
    }
}

/// Build and send a report, folding every failure into the response.
pub async fn dispatch_report(
    sender: &dyn ReportSender,
    from: &str,
    req: &FraudReportRequest,
) -> ReportResponse {
    let email = match build_email(from, req) {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!(transaction = %req.transaction_id, error = %e, "Fraud report rejected");
            return ReportResponse::failed(e);
        }
    };

    match sender.send(&email).await {
        Ok(data) => {
            tracing::info!(transaction = %req.transaction_id, "Fraud report sent");
            ReportResponse::ok(data)
        }
        Err(e) => {
            tracing::error!(transaction = %req.transaction_id, error = %e, "Fraud report failed");
            ReportResponse::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FraudReportRequest {
        FraudReportRequest {
            transaction_id: "TX-000123-extra".to_string(),
            merchant: "Crypto Exchange".to_string(),
            amount: 1234.5,
            date: "2024-05-01".to_string(),
            category: "Cryptocurrency".to_string(),
            description: String::new(),
            reported_by: "ana@example.com".to_string(),
            reported_at: "2024-05-02T10:00:00Z".to_string(),
        }
    }

    struct Broken;

    impl ReportSender for Broken {
        fn send<'a>(&'a self, _: &'a OutgoingEmail) -> BoxFuture<'a, eyre::Result<JsonValue>> {
            Box::pin(async { Err(eyre::eyre!("provider down")) })
        }
    }

    #[test]
    fn test_reference_and_subject() {
        let req = request();
        assert_eq!(req.transaction_ref(), "TX-00012");
        assert_eq!(req.subject(), "Fraud Report Confirmation - Transaction TX-00012");

        let short = FraudReportRequest {
            transaction_id: "abc".to_string(),
            ..request()
        };
        assert_eq!(short.transaction_ref(), "abc");
    }

    #[test]
    fn test_html_body() {
        let html = render_report_html(&request());
        assert!(html.contains("$1234.50"));
        assert!(html.contains("<strong>Description:</strong> N/A"));
        assert!(html.contains("Crypto Exchange"));
    }

    #[test]
    fn test_html_body_escapes_row_text() {
        let req = FraudReportRequest {
            merchant: "<script>alert(1)</script>".to_string(),
            category: "Food & Drink".to_string(),
            description: "said \"refund\" <b>now</b>".to_string(),
            ..request()
        };
        let html = render_report_html(&req);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("Food &amp; Drink"));
        assert!(html.contains("said &quot;refund&quot; &lt;b&gt;now&lt;/b&gt;"));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["transactionId"], "TX-000123-extra");
        assert_eq!(json["reportedBy"], "ana@example.com");
    }

    #[tokio::test]
    async fn test_missing_reporter_fails_without_sending() {
        let req = FraudReportRequest {
            reported_by: " ".to_string(),
            ..request()
        };
        let resp = dispatch_report(&Broken, DEFAULT_FROM, &req).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Missing email address (reportedBy)"));
    }

    #[tokio::test]
    async fn test_log_sender_succeeds_and_failures_surface() {
        let ok = dispatch_report(&LogSender, DEFAULT_FROM, &request()).await;
        assert!(ok.success);
        assert!(ok.data.is_some());

        let err = dispatch_report(&Broken, DEFAULT_FROM, &request()).await;
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("provider down"));
    }

    async fn mail_api() -> String {
        use axum::http::{HeaderMap, StatusCode};
        use axum::{routing::post, Json, Router};

        async fn emails(
            headers: HeaderMap,
            Json(body): Json<JsonValue>,
        ) -> (StatusCode, Json<JsonValue>) {
            let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
            if auth != Some("Bearer re_good") {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "statusCode": 401,
                        "name": "validation_error",
                        "message": "API key is invalid"
                    })),
                );
            }
            (StatusCode::OK, Json(json!({ "id": "em_1", "to": body["to"] })))
        }

        async fn down() -> (StatusCode, &'static str) {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
        }

        let app = Router::new()
            .route("/emails", post(emails))
            .route("/down", post(down));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn http_sender(endpoint: &str, key: &str) -> HttpSender {
        HttpSender::new(endpoint, key, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_http_sender_delivers() {
        let base = mail_api().await;
        let sender = http_sender(&format!("{}/emails", base), "re_good");

        let resp = dispatch_report(&sender, DEFAULT_FROM, &request()).await;
        assert!(resp.success, "{:?}", resp.error);
        let data = resp.data.unwrap();
        assert_eq!(data["id"], "em_1");
        assert_eq!(data["to"], json!(["ana@example.com"]));
    }

    #[tokio::test]
    async fn test_http_sender_errors_become_failed_responses() {
        let base = mail_api().await;

        let rejected = http_sender(&format!("{}/emails", base), "re_bad");
        let resp = dispatch_report(&rejected, DEFAULT_FROM, &request()).await;
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(
            resp.error.as_deref(),
            Some("Mail API returned 401: API key is invalid")
        );

        let broken = http_sender(&format!("{}/down", base), "re_good");
        let resp = dispatch_report(&broken, DEFAULT_FROM, &request()).await;
        assert_eq!(
            resp.error.as_deref(),
            Some("Mail API returned 500: upstream exploded")
        );

        // nothing listening on the port once the listener is dropped
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);
        let unreachable = http_sender(&format!("http://{}/emails", addr), "re_good");
        let resp = dispatch_report(&unreachable, DEFAULT_FROM, &request()).await;
        assert!(!resp.success);
        assert!(resp
            .error
            .unwrap()
            .starts_with("Failed to reach mail API"));
    }

    #[test]
    fn test_http_sender_only_with_key() {
        let mut config = NotifyConfig::default();
        assert!(HttpSender::from_config(&config).unwrap().is_none());

        config.api_key = Some("re_good".to_string());
        let sender = HttpSender::from_config(&config).unwrap().unwrap();
        assert_eq!(sender.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_provider_message() {
        assert_eq!(provider_message(r#"{"message": "bad from"}"#), "bad from");
        assert_eq!(provider_message(" gateway timeout \n"), "gateway timeout");
        assert_eq!(provider_message(""), "empty response");
    }
}
