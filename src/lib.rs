pub mod analytics;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod notify;
pub mod rules;
pub mod session;
pub mod storage;
pub mod transaction;
pub mod upload;
