//! The dashboard state container.
//!
//! Owns the active transaction collection, the rule list and the session.
//! Every mutation goes through a named command and either completes or
//! leaves prior state untouched.

use chrono::{Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::{open_alerts, RiskLevel};
use crate::config::{Config, GeneratorConfig};
use crate::notify::{dispatch_report, FraudReportRequest, ReportResponse, ReportSender};
use crate::rules::matcher::{self, RiskFactor, RuleHit};
use crate::rules::types::validate_threshold;
use crate::rules::{
    apply_recommendation, recommend, FraudRule, NewRule, Recommendation, RulePatch, RuleStore,
};
use crate::session::{ProfileUpdate, SessionStore, SignIn, SignUp, User};
use crate::storage::KeyValueStore;
use crate::transaction::dataset::{
    self, DatasetOptions, DatasetPreset, RiskDistribution, TimeRange,
};
use crate::transaction::{Transaction, TransactionStatus};
use crate::upload::{self, UploadError};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(String),
    #[error("sign in required")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Parse(#[from] UploadError),
    #[error("notification failed: {0}")]
    Remote(String),
    #[error("storage error: {0}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for DashboardError {
    fn from(e: eyre::Report) -> Self {
        Self::Storage(e)
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

/// Commands that replace or edit the transaction collection.
#[derive(Debug, Clone)]
pub enum DatasetCommand {
    Replace {
        transactions: Vec<Transaction>,
        file_name: Option<String>,
    },
    ResetToDemo,
    Flag(String),
    /// Clears `flagged` only; `status` keeps whatever it was.
    Dismiss(String),
}

/// Commands that edit the fraud rule list. Each persists the whole list.
#[derive(Debug, Clone)]
pub enum RuleCommand {
    Add(NewRule),
    Toggle(String),
    SetThreshold { id: String, threshold: u8 },
    Delete(String),
    ApplyRecommendation(Vec<RulePatch>),
}

/// Parameters for generating a fresh dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default = "default_preset")]
    pub preset: DatasetPreset,
    pub count: Option<usize>,
    pub distribution: Option<RiskDistribution>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn default_preset() -> DatasetPreset {
    DatasetPreset::Custom
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            count: None,
            distribution: None,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub file_name: String,
    pub imported: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    pub transaction_id: String,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub hits: Vec<RuleHit>,
    pub risk_factors: Vec<RiskFactor>,
}

pub struct Dashboard {
    transactions: Vec<Transaction>,
    last_uploaded_file: Option<String>,
    rules: Vec<FraudRule>,
    rule_store: RuleStore,
    sessions: SessionStore,
    user: Option<User>,
    rng: StdRng,
    generator: GeneratorConfig,
    sender: Arc<dyn ReportSender>,
    from: String,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Dashboard {
    /// Restore rules and session from `store` and load the demo dataset.
    pub async fn init(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        sender: Arc<dyn ReportSender>,
    ) -> eyre::Result<Self> {
        let rule_store = RuleStore::new(store.clone(), config.storage.rules_key.clone());
        let sessions = SessionStore::new(store, config.storage.user_key.clone());

        let rules = rule_store.load().await?;
        let user = sessions.load().await?;

        let rng = match config.generator.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut dashboard = Self {
            transactions: Vec::new(),
            last_uploaded_file: None,
            rules,
            rule_store,
            sessions,
            user,
            rng,
            generator: config.generator.clone(),
            sender,
            from: config.notify.from.clone(),
        };
        dashboard.reset_to_demo();

        tracing::info!(
            transactions = dashboard.transactions.len(),
            rules = dashboard.rules.len(),
            signed_in = dashboard.user.is_some(),
            "Dashboard initialized"
        );

        Ok(dashboard)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn last_uploaded_file(&self) -> Option<&str> {
        self.last_uploaded_file.as_deref()
    }

    pub fn rules(&self) -> &[FraudRule] {
        &self.rules
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn require_user(&self) -> DashboardResult<&User> {
        self.user.as_ref().ok_or(DashboardError::Unauthorized)
    }

    fn find_mut(&mut self, id: &str) -> DashboardResult<&mut Transaction> {
        self.transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DashboardError::NotFound(format!("transaction '{}'", id)))
    }

    // ============================================================
    // Transactions
    // ============================================================

    pub fn dataset(&mut self, command: DatasetCommand) -> DashboardResult<()> {
        match command {
            DatasetCommand::Replace {
                transactions,
                file_name,
            } => {
                tracing::info!(
                    count = transactions.len(),
                    file = file_name.as_deref().unwrap_or("-"),
                    "Dataset replaced"
                );
                self.transactions = transactions;
                self.last_uploaded_file = file_name;
            }
            DatasetCommand::ResetToDemo => self.reset_to_demo(),
            DatasetCommand::Flag(id) => {
                let tx = self.find_mut(&id)?;
                tx.status = TransactionStatus::Flagged;
                tx.flagged = true;
                tracing::info!(transaction = %id, "Transaction flagged");
            }
            DatasetCommand::Dismiss(id) => {
                let tx = self.find_mut(&id)?;
                tx.flagged = false;
                tracing::info!(transaction = %id, status = tx.status.as_str(), "Alert dismissed");
            }
        }
        Ok(())
    }

    fn reset_to_demo(&mut self) {
        let mut options = DatasetOptions::from_size(self.generator.demo, today());
        options.id_prefix = self.generator.id_prefix.clone();
        self.transactions = dataset::generate(&mut self.rng, &options);
        self.last_uploaded_file = None;
        tracing::info!(count = self.transactions.len(), "Demo dataset loaded");
    }

    /// Replace the collection with a freshly generated dataset.
    pub fn generate(&mut self, request: GenerateRequest) -> DashboardResult<usize> {
        let size = self.generator.size(request.preset);
        let today = today();
        let mut options = DatasetOptions::from_size(size, today);
        options.id_prefix = self.generator.id_prefix.clone();

        if let Some(count) = request.count {
            if count == 0 {
                return Err(DashboardError::Validation(
                    "Transaction count must be at least 1".to_string(),
                ));
            }
            if count > self.generator.max_count {
                return Err(DashboardError::Validation(format!(
                    "Transaction count {} exceeds the maximum of {}",
                    count, self.generator.max_count
                )));
            }
            options.count = count;
        }
        if let Some(distribution) = request.distribution {
            distribution.validate().map_err(DashboardError::Validation)?;
            options.distribution = distribution;
        }
        if request.start.is_some() || request.end.is_some() {
            let end = request.end.unwrap_or(today);
            let start = request.start.unwrap_or(options.range.start);
            if start > end {
                return Err(DashboardError::Validation(format!(
                    "Start date {} is after end date {}",
                    start, end
                )));
            }
            options.range = TimeRange { start, end };
        }

        let transactions = dataset::generate(&mut self.rng, &options);
        let count = transactions.len();
        self.dataset(DatasetCommand::Replace {
            transactions,
            file_name: None,
        })?;
        Ok(count)
    }

    /// Import an uploaded file. Prior state is kept on any failure.
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> DashboardResult<UploadSummary> {
        let report = upload::import(&mut self.rng, file_name, bytes, today())?;
        let summary = UploadSummary {
            file_name: file_name.to_string(),
            imported: report.transactions.len(),
            rejected: report.rejected.len(),
        };
        self.dataset(DatasetCommand::Replace {
            transactions: report.transactions,
            file_name: Some(file_name.to_string()),
        })?;
        Ok(summary)
    }

    /// Flagged transactions not yet confirmed, highest risk first.
    pub fn alerts(&self) -> Vec<Transaction> {
        open_alerts(&self.transactions)
    }

    pub fn rule_report(&self, id: &str) -> DashboardResult<RuleReport> {
        let tx = self
            .transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| DashboardError::NotFound(format!("transaction '{}'", id)))?;
        let hits = matcher::evaluate(tx, &self.rules, &self.transactions);
        Ok(RuleReport {
            transaction_id: tx.id.clone(),
            score: matcher::rule_score(&hits),
            risk_level: RiskLevel::from_score(tx.risk_score),
            hits,
            risk_factors: matcher::risk_factors(tx),
        })
    }

    /// Send a fraud report for `id`. Success flags the transaction.
    pub async fn report_fraud(&mut self, id: &str) -> DashboardResult<ReportResponse> {
        let email = self.require_user()?.email.clone();
        let tx = self
            .transactions
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| DashboardError::NotFound(format!("transaction '{}'", id)))?;

        let request = FraudReportRequest::for_transaction(tx, &email, Utc::now().to_rfc3339());
        let response = dispatch_report(self.sender.as_ref(), &self.from, &request).await;
        if !response.success {
            let reason = response.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(DashboardError::Remote(reason));
        }

        let already_flagged = self.find_mut(id)?.flagged;
        if !already_flagged {
            self.dataset(DatasetCommand::Flag(id.to_string()))?;
        }
        Ok(response)
    }

    // ============================================================
    // Rules
    // ============================================================

    pub async fn rule(&mut self, command: RuleCommand) -> DashboardResult<Vec<FraudRule>> {
        self.require_user()?;

        let updated = match command {
            RuleCommand::Add(new_rule) => {
                let new_rule = new_rule.validate().map_err(DashboardError::Validation)?;
                let id = self.next_rule_id();
                let mut rules = self.rules.clone();
                rules.push(new_rule.into_rule(id));
                rules
            }
            RuleCommand::Toggle(id) => self.edit_rule(&id, |r| {
                r.enabled = !r.enabled;
                Ok(())
            })?,
            RuleCommand::SetThreshold { id, threshold } => self.edit_rule(&id, |r| {
                validate_threshold(threshold)?;
                r.threshold = threshold;
                Ok(())
            })?,
            RuleCommand::Delete(id) => {
                if !self.rules.iter().any(|r| r.id == id) {
                    return Err(DashboardError::NotFound(format!("rule '{}'", id)));
                }
                self.rules.iter().filter(|r| r.id != id).cloned().collect()
            }
            RuleCommand::ApplyRecommendation(patches) => {
                for threshold in patches.iter().filter_map(|p| p.threshold) {
                    validate_threshold(threshold).map_err(DashboardError::Validation)?;
                }
                apply_recommendation(&self.rules, &patches)
            }
        };

        self.rules = self.rule_store.save(updated).await?;
        Ok(self.rules.clone())
    }

    fn edit_rule<F>(&self, id: &str, edit: F) -> DashboardResult<Vec<FraudRule>>
    where
        F: FnOnce(&mut FraudRule) -> Result<(), String>,
    {
        let mut rules = self.rules.clone();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DashboardError::NotFound(format!("rule '{}'", id)))?;
        edit(rule).map_err(DashboardError::Validation)?;
        Ok(rules)
    }

    /// Millisecond timestamp, bumped until unused.
    fn next_rule_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.rules.iter().any(|r| r.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    pub fn recommend(&mut self) -> DashboardResult<Recommendation> {
        self.require_user()?;
        Ok(recommend(&mut self.rng, &self.rules))
    }

    // ============================================================
    // Session
    // ============================================================

    pub async fn sign_in(&mut self, input: SignIn) -> DashboardResult<User> {
        let user = input.into_user().map_err(DashboardError::Validation)?;
        self.start_session(user).await
    }

    pub async fn sign_up(&mut self, input: SignUp) -> DashboardResult<User> {
        let user = input.into_user().map_err(DashboardError::Validation)?;
        self.start_session(user).await
    }

    async fn start_session(&mut self, user: User) -> DashboardResult<User> {
        self.sessions.save(&user).await?;
        self.user = Some(user.clone());
        Ok(user)
    }

    pub async fn sign_out(&mut self) -> DashboardResult<()> {
        self.sessions.clear().await?;
        self.user = None;
        Ok(())
    }

    pub async fn update_profile(&mut self, update: ProfileUpdate) -> DashboardResult<User> {
        let current = self.require_user()?;
        let updated = update.apply(current).map_err(DashboardError::Validation)?;
        self.start_session(updated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogSender, OutgoingEmail};
    use crate::rules::{default_rules, Condition, RuleType, RuleValue};
    use crate::storage::MemoryStore;
    use futures::future::BoxFuture;
    use serde_json::Value as JsonValue;

    struct Unreachable;

    impl ReportSender for Unreachable {
        fn send<'a>(&'a self, _: &'a OutgoingEmail) -> BoxFuture<'a, eyre::Result<JsonValue>> {
            Box::pin(async { Err(eyre::eyre!("connection refused")) })
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.generator.seed = Some(11);
        config
    }

    async fn dashboard_with(sender: Arc<dyn ReportSender>) -> (Arc<MemoryStore>, Dashboard) {
        let kv = Arc::new(MemoryStore::new());
        let dashboard = Dashboard::init(&config(), kv.clone(), sender).await.unwrap();
        (kv, dashboard)
    }

    async fn dashboard() -> (Arc<MemoryStore>, Dashboard) {
        dashboard_with(Arc::new(LogSender)).await
    }

    fn sign_in() -> SignIn {
        SignIn {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    fn new_rule() -> NewRule {
        NewRule {
            name: "Night spend".to_string(),
            rule_type: RuleType::Amount,
            threshold: 60,
            condition: Condition::Greater,
            value: RuleValue::text("250"),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_init_loads_demo_and_default_rules() {
        let (_, d) = dashboard().await;
        assert_eq!(d.transactions().len(), 100);
        assert_eq!(d.rules(), default_rules().as_slice());
        assert!(d.user().is_none());
        assert!(d.last_uploaded_file().is_none());
    }

    #[tokio::test]
    async fn test_flag_then_dismiss_leaves_status_flagged() {
        let (_, mut d) = dashboard().await;
        let id = d.transactions()[0].id.clone();

        d.dataset(DatasetCommand::Flag(id.clone())).unwrap();
        let tx = d.transactions().iter().find(|t| t.id == id).unwrap();
        assert!(tx.flagged);
        assert_eq!(tx.status, TransactionStatus::Flagged);

        d.dataset(DatasetCommand::Dismiss(id.clone())).unwrap();
        let tx = d.transactions().iter().find(|t| t.id == id).unwrap();
        assert!(!tx.flagged);
        assert_eq!(tx.status, TransactionStatus::Flagged);

        assert!(matches!(
            d.dataset(DatasetCommand::Flag("nope".to_string())),
            Err(DashboardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_validates_before_mutating() {
        let (_, mut d) = dashboard().await;
        let before = d.transactions().to_vec();

        let bad = GenerateRequest {
            distribution: Some(RiskDistribution {
                low: 50,
                medium: 50,
                high: 10,
                critical: 0,
            }),
            ..Default::default()
        };
        assert!(matches!(d.generate(bad), Err(DashboardError::Validation(_))));
        assert_eq!(d.transactions(), before.as_slice());

        let count = d
            .generate(GenerateRequest {
                preset: DatasetPreset::Large,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(count, 250);
        assert_eq!(d.transactions().len(), 250);
    }

    #[tokio::test]
    async fn test_generate_rejects_oversized_count() {
        let (_, mut d) = dashboard().await;
        let before = d.transactions().to_vec();

        let huge = GenerateRequest {
            count: Some(usize::MAX / 16),
            ..Default::default()
        };
        assert!(matches!(d.generate(huge), Err(DashboardError::Validation(_))));

        let just_over = GenerateRequest {
            count: Some(100_001),
            ..Default::default()
        };
        assert!(matches!(d.generate(just_over), Err(DashboardError::Validation(_))));
        assert_eq!(d.transactions(), before.as_slice());

        let count = d
            .generate(GenerateRequest {
                count: Some(500),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(count, 500);
    }

    #[tokio::test]
    async fn test_upload_replaces_or_keeps_state() {
        let (_, mut d) = dashboard().await;
        let before = d.transactions().to_vec();

        let err = d.upload("tx.json", b"{\"not\": \"array\"}").unwrap_err();
        assert!(matches!(err, DashboardError::Parse(UploadError::NotAnArray)));
        assert_eq!(d.transactions(), before.as_slice());

        let summary = d
            .upload("tx.json", br#"[{"id": "U1", "amount": 5}, {"amount": -2}]"#)
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(d.transactions()[0].id, "U1");
        assert_eq!(d.last_uploaded_file(), Some("tx.json"));

        d.dataset(DatasetCommand::ResetToDemo).unwrap();
        assert_eq!(d.transactions().len(), 100);
        assert!(d.last_uploaded_file().is_none());
    }

    #[tokio::test]
    async fn test_rule_commands_require_session() {
        let (kv, mut d) = dashboard().await;
        assert!(matches!(
            d.rule(RuleCommand::Toggle("1".to_string())).await,
            Err(DashboardError::Unauthorized)
        ));
        assert!(matches!(d.recommend(), Err(DashboardError::Unauthorized)));
        assert_eq!(kv.get("fraudRules").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rule_lifecycle_persists_whole_list() {
        let (kv, mut d) = dashboard().await;
        d.sign_in(sign_in()).await.unwrap();

        let rules = d.rule(RuleCommand::Add(new_rule())).await.unwrap();
        assert_eq!(rules.len(), 5);
        let added = rules.last().unwrap().clone();
        assert_eq!(added.value, RuleValue::int(250));

        d.rule(RuleCommand::Toggle("1".to_string())).await.unwrap();
        assert!(!d.rules()[0].enabled);

        let err = d
            .rule(RuleCommand::SetThreshold {
                id: "2".to_string(),
                threshold: 20,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(d.rules()[1].threshold, 85);

        d.rule(RuleCommand::Delete(added.id.clone())).await.unwrap();
        assert_eq!(d.rules().len(), 4);

        let stored: Vec<FraudRule> =
            serde_json::from_str(&kv.get("fraudRules").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, d.rules());
    }

    #[tokio::test]
    async fn test_add_rule_ids_are_unique() {
        let (_, mut d) = dashboard().await;
        d.sign_in(sign_in()).await.unwrap();
        d.rule(RuleCommand::Add(new_rule())).await.unwrap();
        d.rule(RuleCommand::Add(new_rule())).await.unwrap();
        let mut ids: Vec<_> = d.rules().iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn test_recommendation_apply() {
        let (_, mut d) = dashboard().await;
        d.sign_in(sign_in()).await.unwrap();
        let rec = d.recommend().unwrap();
        let ids: Vec<_> = d.rules().iter().map(|r| r.id.clone()).collect();
        assert!(rec.suggested_changes.iter().all(|c| ids.contains(&c.id)));

        let rules = d
            .rule(RuleCommand::ApplyRecommendation(rec.suggested_changes.clone()))
            .await
            .unwrap();
        for change in &rec.suggested_changes {
            let rule = rules.iter().find(|r| r.id == change.id).unwrap();
            assert_eq!(Some(rule.threshold), change.threshold);
        }
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let (kv, mut d) = dashboard().await;
        d.sign_in(sign_in()).await.unwrap();

        let restored = Dashboard::init(&config(), kv.clone(), Arc::new(LogSender))
            .await
            .unwrap();
        assert_eq!(restored.user().map(|u| u.email.as_str()), Some("ana@example.com"));

        d.sign_out().await.unwrap();
        assert_eq!(kv.get("user").await.unwrap(), None);
        assert!(matches!(
            d.update_profile(ProfileUpdate::default()).await,
            Err(DashboardError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_report_fraud_flags_on_success() {
        let (_, mut d) = dashboard().await;
        let id = d
            .transactions()
            .iter()
            .find(|t| !t.flagged)
            .map(|t| t.id.clone())
            .unwrap();

        assert!(matches!(
            d.report_fraud(&id).await,
            Err(DashboardError::Unauthorized)
        ));

        d.sign_in(sign_in()).await.unwrap();
        let resp = d.report_fraud(&id).await.unwrap();
        assert!(resp.success);
        let tx = d.transactions().iter().find(|t| t.id == id).unwrap();
        assert!(tx.flagged);
        assert_eq!(tx.status, TransactionStatus::Flagged);
    }

    #[tokio::test]
    async fn test_report_fraud_failure_changes_nothing() {
        let (_, mut d) = dashboard_with(Arc::new(Unreachable)).await;
        d.sign_in(sign_in()).await.unwrap();
        let before = d.transactions().to_vec();
        let id = before.iter().find(|t| !t.flagged).unwrap().id.clone();

        let err = d.report_fraud(&id).await.unwrap_err();
        assert!(matches!(err, DashboardError::Remote(ref m) if m == "connection refused"));
        assert_eq!(d.transactions(), before.as_slice());
    }

    #[tokio::test]
    async fn test_alerts_exclude_confirmed() {
        let (_, mut d) = dashboard().await;
        let alerts = d.alerts();
        assert!(alerts
            .iter()
            .all(|t| t.flagged && t.status != TransactionStatus::Flagged));
        assert!(alerts.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));

        if let Some(first) = alerts.first() {
            let id = first.id.clone();
            d.dataset(DatasetCommand::Flag(id.clone())).unwrap();
            assert!(d.alerts().iter().all(|t| t.id != id));
        }
    }

    #[tokio::test]
    async fn test_rule_report() {
        let (_, d) = dashboard().await;
        let id = d.transactions()[0].id.clone();
        let report = d.rule_report(&id).unwrap();
        assert_eq!(report.transaction_id, id);
        assert!(!report.risk_factors.is_empty());
        assert!(matches!(d.rule_report("missing"), Err(DashboardError::NotFound(_))));
    }
}
