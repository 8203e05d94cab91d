//! Type definitions for the fraud pipeline

pub mod alert;
pub mod transaction;

pub use alert::FraudAlert;
pub use transaction::{ScoredTransaction, Transaction};
