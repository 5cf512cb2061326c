// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbHistoryStore: implements HistoryStore for the door state ledger

pub mod history_store;
pub mod models;
pub mod repositories;

pub use history_store::DbHistoryStore;
pub use models::*;
pub use repositories::*;
