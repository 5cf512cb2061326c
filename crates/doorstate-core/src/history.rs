// History facade
//
// Wraps a HistoryStore with the read window and the write rule: reads are
// always clipped, writes only accept validated submissions.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::door::StateEvent;
use crate::error::Result;
use crate::submission::ValidatedSubmission;
use crate::traits::HistoryStore;
use crate::window::HistoryWindow;

#[derive(Clone)]
pub struct History {
    store: Arc<dyn HistoryStore>,
    window: HistoryWindow,
}

impl History {
    pub fn new(store: Arc<dyn HistoryStore>, window: HistoryWindow) -> Self {
        Self { store, window }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// VALIDATED -> PERSISTED
    pub async fn record(&self, submission: ValidatedSubmission) -> Result<StateEvent> {
        let event = submission.event();
        let stored = self.store.append_or_replace(event).await?;
        tracing::debug!(
            time = stored.seconds(),
            state = %stored.state,
            "Recorded door state"
        );
        Ok(stored)
    }

    /// Most recent event regardless of the window
    pub async fn latest(&self) -> Result<Option<StateEvent>> {
        self.store.latest().await
    }

    /// Events in `[since, until]`, clipped to the window as of `now`
    pub async fn query_at(
        &self,
        now: DateTime<Utc>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<StateEvent>> {
        let range = self.window.clip(now, since, until, limit);
        self.store.query(&range).await
    }

    /// Same as `query_at` with the current time
    pub async fn query(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<StateEvent>> {
        self.query_at(Utc::now(), since, until, limit).await
    }
}
