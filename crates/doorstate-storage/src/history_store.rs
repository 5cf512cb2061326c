// Database-backed HistoryStore implementation
//
// Upserts rely on the primary key on `time`: `ON CONFLICT DO UPDATE` is a
// single atomic statement, so concurrent submissions for the same instant
// serialize in PostgreSQL and readers only ever see committed rows.

use async_trait::async_trait;
use doorstate_core::{DoorstateError, HistoryRange, HistoryStore, Result, StateEvent};

use crate::models::DoorStateRow;
use crate::repositories::Database;

// ============================================================================
// DbHistoryStore - Stores door state changes in PostgreSQL
// ============================================================================

#[derive(Clone)]
pub struct DbHistoryStore {
    db: Database,
}

impl DbHistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn to_event(row: DoorStateRow) -> Result<StateEvent> {
    StateEvent::try_from(row).map_err(|e| DoorstateError::store(format!("corrupt ledger row: {}", e)))
}

#[async_trait]
impl HistoryStore for DbHistoryStore {
    async fn append_or_replace(&self, event: StateEvent) -> Result<StateEvent> {
        let row = self
            .db
            .upsert_door_state(event.timestamp, event.state.as_str())
            .await
            .map_err(|e| DoorstateError::store(e.to_string()))?;
        to_event(row)
    }

    async fn query(&self, range: &HistoryRange) -> Result<Vec<StateEvent>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(range.limit).unwrap_or(i64::MAX);
        self.db
            .list_door_states(range.since, range.until, limit)
            .await
            .map_err(|e| DoorstateError::store(e.to_string()))?
            .into_iter()
            .map(to_event)
            .collect()
    }

    async fn latest(&self) -> Result<Option<StateEvent>> {
        self.db
            .get_latest_door_state()
            .await
            .map_err(|e| DoorstateError::store(e.to_string()))?
            .map(to_event)
            .transpose()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
