pub mod matcher;
pub mod recommend;
pub mod store;
pub mod types;

pub use recommend::{apply_recommendation, recommend, Recommendation};
pub use store::{default_rules, RuleStore};
pub use types::{Condition, FraudRule, NewRule, RulePatch, RuleType, RuleValue};
