use serde::{Deserialize, Serialize};
use serde_json::Number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Amount,
    Location,
    Merchant,
    Frequency,
}

impl RuleType {
    /// Numeric-valued rule types compare numbers; the others match text.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Amount | Self::Frequency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Greater,
    Less,
    Equal,
    Contains,
}

/// Rule comparison value. Numbers keep their JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(Number),
    Text(String),
}

impl RuleValue {
    pub fn int(n: i64) -> Self {
        Self::Number(Number::from(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Numeric view. Numeric strings count.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Comma-separated, trimmed, non-empty terms.
    pub fn terms(&self) -> Vec<String> {
        match self {
            Self::Number(n) => vec![n.to_string()],
            Self::Text(s) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub threshold: u8,
    pub condition: Condition,
    pub value: RuleValue,
    pub enabled: bool,
}

/// Partial rule used by recommendations. `id` selects the target rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulePatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl RulePatch {
    /// Merge over `rule`; patch fields win. The id is never changed.
    pub fn merge_into(&self, rule: &FraudRule) -> FraudRule {
        FraudRule {
            id: rule.id.clone(),
            name: self.name.clone().unwrap_or_else(|| rule.name.clone()),
            rule_type: self.rule_type.unwrap_or(rule.rule_type),
            threshold: self.threshold.unwrap_or(rule.threshold),
            condition: self.condition.unwrap_or(rule.condition),
            value: self.value.clone().unwrap_or_else(|| rule.value.clone()),
            enabled: self.enabled.unwrap_or(rule.enabled),
        }
    }
}

/// Input for creating a rule. The id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default = "default_new_threshold")]
    pub threshold: u8,
    pub condition: Condition,
    pub value: RuleValue,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_new_threshold() -> u8 {
    75
}

fn default_true() -> bool {
    true
}

pub const MIN_THRESHOLD: u8 = 30;
pub const MAX_THRESHOLD: u8 = 100;

impl NewRule {
    /// Check caller-side invariants and normalize numeric values.
    pub fn validate(self) -> Result<NewRule, String> {
        if self.name.trim().is_empty() {
            return Err("Rule name is required".to_string());
        }
        if self.value.is_blank() {
            return Err("Rule value is required".to_string());
        }
        validate_threshold(self.threshold)?;
        if self.condition == Condition::Contains && self.rule_type.is_numeric() {
            return Err(format!(
                "Condition 'contains' is not valid for {:?} rules",
                self.rule_type
            ));
        }

        let value = if self.rule_type.is_numeric() {
            match &self.value {
                RuleValue::Number(_) => self.value.clone(),
                RuleValue::Text(s) => {
                    let parsed: Number = s.trim().parse::<Number>().map_err(|_| {
                        format!("Rule value '{}' must be numeric for {:?} rules", s, self.rule_type)
                    })?;
                    RuleValue::Number(parsed)
                }
            }
        } else {
            match &self.value {
                RuleValue::Number(n) => RuleValue::Text(n.to_string()),
                RuleValue::Text(_) => self.value.clone(),
            }
        };

        Ok(NewRule { value, ..self })
    }

    pub fn into_rule(self, id: String) -> FraudRule {
        FraudRule {
            id,
            name: self.name,
            rule_type: self.rule_type,
            threshold: self.threshold,
            condition: self.condition,
            value: self.value,
            enabled: self.enabled,
        }
    }
}

pub fn validate_threshold(threshold: u8) -> Result<(), String> {
    if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        return Err(format!(
            "Threshold must be between {} and {}, got {}",
            MIN_THRESHOLD, MAX_THRESHOLD, threshold
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_rule(rule_type: RuleType, condition: Condition, value: RuleValue) -> NewRule {
        NewRule {
            name: "Test".to_string(),
            rule_type,
            threshold: 75,
            condition,
            value,
            enabled: true,
        }
    }

    #[test]
    fn test_value_keeps_integer_representation() {
        let rule: FraudRule = serde_json::from_str(
            r#"{"id":"1","name":"x","type":"amount","threshold":90,"condition":"greater","value":1000,"enabled":true}"#,
        )
        .unwrap();
        assert_eq!(rule.value, RuleValue::int(1000));
        assert!(serde_json::to_string(&rule).unwrap().contains(r#""value":1000,"#));
    }

    #[test]
    fn test_terms_split_commas() {
        let v = RuleValue::text("Gambling, Adult ,,Crypto");
        assert_eq!(v.terms(), vec!["Gambling", "Adult", "Crypto"]);
    }

    #[test]
    fn test_validate_normalizes_numeric_text() {
        let rule = new_rule(RuleType::Amount, Condition::Greater, RuleValue::text("250"))
            .validate()
            .unwrap();
        assert_eq!(rule.value, RuleValue::int(250));
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        assert!(new_rule(RuleType::Amount, Condition::Contains, RuleValue::int(5))
            .validate()
            .is_err());
        assert!(new_rule(RuleType::Frequency, Condition::Greater, RuleValue::text("lots"))
            .validate()
            .is_err());
        assert!(new_rule(RuleType::Merchant, Condition::Contains, RuleValue::text("  "))
            .validate()
            .is_err());

        let mut low = new_rule(RuleType::Merchant, Condition::Contains, RuleValue::text("Bet"));
        low.threshold = 29;
        assert!(low.validate().is_err());

        let mut unnamed = new_rule(RuleType::Merchant, Condition::Contains, RuleValue::text("Bet"));
        unnamed.name = String::new();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_patch_merge() {
        let rule = new_rule(RuleType::Amount, Condition::Greater, RuleValue::int(1000))
            .into_rule("1".to_string());
        let patch = RulePatch {
            id: "1".to_string(),
            threshold: Some(85),
            value: Some(RuleValue::int(800)),
            ..Default::default()
        };
        let merged = patch.merge_into(&rule);
        assert_eq!(merged.threshold, 85);
        assert_eq!(merged.value, RuleValue::int(800));
        assert_eq!(merged.name, rule.name);
    }
}
