use std::sync::Arc;

use crate::storage::KeyValueStore;

use super::types::{Condition, FraudRule, RuleType, RuleValue};

pub const DEFAULT_RULES_KEY: &str = "fraudRules";

/// The rule set used until something has been saved.
pub fn default_rules() -> Vec<FraudRule> {
    vec![
        FraudRule {
            id: "1".to_string(),
            name: "High-Value Transaction".to_string(),
            rule_type: RuleType::Amount,
            threshold: 90,
            condition: Condition::Greater,
            value: RuleValue::int(1000),
            enabled: true,
        },
        FraudRule {
            id: "2".to_string(),
            name: "Foreign Transaction".to_string(),
            rule_type: RuleType::Location,
            threshold: 85,
            condition: Condition::Contains,
            value: RuleValue::text("International"),
            enabled: true,
        },
        FraudRule {
            id: "3".to_string(),
            name: "Unusual Merchant".to_string(),
            rule_type: RuleType::Merchant,
            threshold: 80,
            condition: Condition::Contains,
            value: RuleValue::text("Gambling"),
            enabled: true,
        },
        FraudRule {
            id: "4".to_string(),
            name: "Rapid Transaction Frequency".to_string(),
            rule_type: RuleType::Frequency,
            threshold: 75,
            condition: Condition::Greater,
            value: RuleValue::int(5),
            enabled: true,
        },
    ]
}

/// Whole-list persistence for fraud rules. Performs no validation.
#[derive(Clone)]
pub struct RuleStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl RuleStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load the persisted rules, or the defaults when nothing usable is stored.
    pub async fn load(&self) -> eyre::Result<Vec<FraudRule>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            tracing::debug!(key = %self.key, "No saved rules, using defaults");
            return Ok(default_rules());
        };

        match serde_json::from_str::<Vec<FraudRule>>(&raw) {
            Ok(rules) => {
                tracing::debug!(key = %self.key, rules = rules.len(), "Loaded fraud rules");
                Ok(rules)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Stored rules unreadable, using defaults");
                Ok(default_rules())
            }
        }
    }

    /// Replace the stored list and hand it back.
    pub async fn save(&self, rules: Vec<FraudRule>) -> eyre::Result<Vec<FraudRule>> {
        let raw = serde_json::to_string(&rules)?;
        self.store.set(&self.key, raw).await?;
        tracing::info!(key = %self.key, rules = rules.len(), "Fraud rules saved");
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, RuleStore) {
        let kv = Arc::new(MemoryStore::new());
        let rules = RuleStore::new(kv.clone(), DEFAULT_RULES_KEY);
        (kv, rules)
    }

    #[tokio::test]
    async fn test_defaults_on_first_use() {
        let (kv, rules) = store();
        let loaded = rules.load().await.unwrap();
        assert_eq!(loaded, default_rules());
        assert_eq!(loaded.len(), 4);
        // loading does not write
        assert_eq!(kv.get(DEFAULT_RULES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_returns_what_was_saved() {
        let (_, rules) = store();
        let mut list = default_rules();
        list.truncate(2);
        let saved = rules.save(list.clone()).await.unwrap();
        assert_eq!(saved, list);
        assert_eq!(rules.load().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_save_of_load_is_noop_on_stored_value() {
        let (kv, rules) = store();
        rules.save(default_rules()).await.unwrap();
        let before = kv.get(DEFAULT_RULES_KEY).await.unwrap();

        let loaded = rules.load().await.unwrap();
        rules.save(loaded).await.unwrap();
        assert_eq!(kv.get(DEFAULT_RULES_KEY).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_value_falls_back_to_defaults() {
        let (kv, rules) = store();
        kv.set(DEFAULT_RULES_KEY, "{not json".to_string()).await.unwrap();
        assert_eq!(rules.load().await.unwrap(), default_rules());
    }
}
