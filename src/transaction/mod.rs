pub mod dataset;
pub mod generator;
pub mod types;

pub use types::{AccountSummary, Transaction, TransactionStatus, TransactionType};
