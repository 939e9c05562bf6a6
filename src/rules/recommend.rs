//! Canned rule recommendations.
//!
//! Suggestions come from a fixed table; nothing here looks at transaction data.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::types::{FraudRule, RulePatch, RuleValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub message: String,
    pub suggested_changes: Vec<RulePatch>,
}

#[derive(Debug, Clone, Copy)]
enum CannedValue {
    Number(i64),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct CannedChange {
    id: &'static str,
    value: CannedValue,
    threshold: u8,
}

struct Template {
    message: &'static str,
    changes: &'static [CannedChange],
}

const TEMPLATES: [Template; 4] = [
    Template {
        message: "Consider lowering your large transaction threshold",
        changes: &[CannedChange {
            id: "1",
            value: CannedValue::Number(800),
            threshold: 85,
        }],
    },
    Template {
        message: "Your merchant category parameters could be expanded for better coverage",
        changes: &[CannedChange {
            id: "3",
            value: CannedValue::Text("Gambling,Adult,Crypto"),
            threshold: 75,
        }],
    },
    Template {
        message: "Add more location-based parameters for comprehensive risk detection",
        changes: &[],
    },
    Template {
        message: "Increase threshold sensitivity for frequency-based transaction monitoring",
        changes: &[CannedChange {
            id: "4",
            value: CannedValue::Number(3),
            threshold: 80,
        }],
    },
];

pub fn template_count() -> usize {
    TEMPLATES.len()
}

/// The recommendation at `index` (wrapping), restricted to rules present in `rules`.
pub fn recommendation_at(index: usize, rules: &[FraudRule]) -> Recommendation {
    let template = &TEMPLATES[index % TEMPLATES.len()];
    let suggested_changes = template
        .changes
        .iter()
        .filter(|c| rules.iter().any(|r| r.id == c.id))
        .map(|c| RulePatch {
            id: c.id.to_string(),
            threshold: Some(c.threshold),
            value: Some(match c.value {
                CannedValue::Number(n) => RuleValue::int(n),
                CannedValue::Text(s) => RuleValue::text(s),
            }),
            ..Default::default()
        })
        .collect();

    Recommendation {
        message: template.message.to_string(),
        suggested_changes,
    }
}

/// Pick a recommendation at random.
pub fn recommend<R: Rng + ?Sized>(rng: &mut R, rules: &[FraudRule]) -> Recommendation {
    recommendation_at(rng.gen_range(0..TEMPLATES.len()), rules)
}

/// Merge the first patch matching each rule's id. Unknown ids are ignored.
pub fn apply_recommendation(rules: &[FraudRule], patches: &[RulePatch]) -> Vec<FraudRule> {
    rules
        .iter()
        .map(|rule| match patches.iter().find(|p| p.id == rule.id) {
            Some(patch) => patch.merge_into(rule),
            None => rule.clone(),
        })
        .collect()
}
