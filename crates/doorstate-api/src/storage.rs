// Storage backend selection
// Decision: PostgreSQL in production, in-memory in dev mode
//
// Both backends implement doorstate_core::HistoryStore, so the rest of the
// server only sees a trait object.

use anyhow::{Context, Result};
use doorstate_core::{HistoryStore, InMemoryHistoryStore};
use doorstate_storage::{Database, DbHistoryStore};
use std::sync::Arc;

use crate::config::ServerConfig;

/// Open the history store the configuration asks for
pub async fn open_history_store(config: &ServerConfig) -> Result<Arc<dyn HistoryStore>> {
    match &config.database_url {
        Some(url) => {
            let db = Database::connect_with_retry(url, config.db_connect_retries)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            Ok(Arc::new(DbHistoryStore::new(db)))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, running in dev mode with in-memory storage (data is lost on restart)"
            );
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
    }
}
