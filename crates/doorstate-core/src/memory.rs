// In-memory implementations for dev mode and testing
//
// Keeps the ledger in a BTreeMap keyed by timestamp, so upsert and ordered
// range scans come for free. Data is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::door::{DoorState, StateEvent};
use crate::error::Result;
use crate::traits::HistoryStore;
use crate::window::HistoryRange;

// ============================================================================
// InMemoryHistoryStore - Stores door state changes in memory
// ============================================================================

/// In-memory history store
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistoryStore {
    events: Arc<RwLock<BTreeMap<DateTime<Utc>, DoorState>>>,
}

impl InMemoryHistoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with events (useful for testing)
    pub async fn seed(&self, events: impl IntoIterator<Item = StateEvent>) {
        let mut guard = self.events.write().await;
        for event in events {
            guard.insert(event.timestamp, event.state);
        }
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append_or_replace(&self, event: StateEvent) -> Result<StateEvent> {
        self.events.write().await.insert(event.timestamp, event.state);
        Ok(event)
    }

    async fn query(&self, range: &HistoryRange) -> Result<Vec<StateEvent>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let events = self.events.read().await;
        let mut newest_first: Vec<StateEvent> = events
            .range(range.since..=range.until)
            .rev()
            .take(range.limit)
            .map(|(timestamp, state)| StateEvent {
                timestamp: *timestamp,
                state: *state,
            })
            .collect();
        newest_first.reverse();
        Ok(newest_first)
    }

    async fn latest(&self) -> Result<Option<StateEvent>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .next_back()
            .map(|(timestamp, state)| StateEvent {
                timestamp: *timestamp,
                state: *state,
            }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
