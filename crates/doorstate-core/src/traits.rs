// Core traits for pluggable backends
//
// HistoryStore lets the submission protocol and read paths run against:
// - In-memory implementation for dev mode and testing
// - Database implementation for production

use async_trait::async_trait;

use crate::door::StateEvent;
use crate::error::Result;
use crate::window::HistoryRange;

// ============================================================================
// HistoryStore - Ledger of door state changes
// ============================================================================

/// Append-only ledger of door state changes, keyed by timestamp
///
/// Implementations must:
/// - make `append_or_replace` atomic per timestamp (concurrent writers never
///   produce a mixed record)
/// - never expose a partially written event to readers
/// - never delete events
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert the event, or replace the state of the event already stored
    /// at the same timestamp. Returns the stored event.
    async fn append_or_replace(&self, event: StateEvent) -> Result<StateEvent>;

    /// The `range.limit` most recent events inside the range, oldest first
    async fn query(&self, range: &HistoryRange) -> Result<Vec<StateEvent>>;

    /// Most recent event, ignoring any window
    async fn latest(&self) -> Result<Option<StateEvent>>;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;
}
