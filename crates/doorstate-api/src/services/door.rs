// Door service for business logic
//
// Ties the submission protocol to the history facade:
// - Validating signed submissions and logging the concrete rejection reason
// - Recording accepted events (idempotent upsert by timestamp)
// - Current status text, windowed history reads and aggregate statistics

use chrono::{DateTime, FixedOffset, Utc};
use doorstate_core::{
    aggregate, Aggregated, Aggregation, DoorStatus, History, RawSubmission, Result, StateEvent,
    SubmissionProtocol,
};

/// Aggregated windowed history
#[derive(Debug, Clone, PartialEq)]
pub struct DoorStats {
    pub by: Aggregation,
    /// Offset the calendar buckets were computed in
    pub utc_offset: FixedOffset,
    /// Number of events aggregated
    pub events: usize,
    pub aggregated: Aggregated,
}

pub struct DoorService {
    protocol: SubmissionProtocol,
    history: History,
    utc_offset: FixedOffset,
}

impl DoorService {
    pub fn new(protocol: SubmissionProtocol, history: History, utc_offset: FixedOffset) -> Self {
        Self {
            protocol,
            history,
            utc_offset,
        }
    }

    /// Name of the history backend, for health reporting
    pub fn backend(&self) -> &'static str {
        self.history.backend()
    }

    /// Validate and record a submission received now
    pub async fn submit(&self, raw: RawSubmission) -> Result<StateEvent> {
        self.submit_at(raw, Utc::now()).await
    }

    /// Validate and record a submission received at `received_at`
    pub async fn submit_at(
        &self,
        raw: RawSubmission,
        received_at: DateTime<Utc>,
    ) -> Result<StateEvent> {
        let validated = self.protocol.validate(&raw, received_at).map_err(|e| {
            if let Some(reason) = e.rejection() {
                tracing::warn!(
                    reason = %reason,
                    authentication = reason.is_authentication(),
                    timestamp = raw.timestamp.as_deref().unwrap_or(""),
                    state = raw.state.as_deref().unwrap_or(""),
                    "Rejected door state submission"
                );
            }
            e
        })?;

        if !validated.timestamp_supplied() {
            tracing::debug!("Submission without timestamp, using receipt time");
        }

        let stored = self.history.record(validated).await?;
        tracing::info!(
            state = %stored.state,
            timestamp = stored.seconds(),
            "Door state accepted"
        );
        Ok(stored)
    }

    /// Latest state with a human readable summary
    pub async fn current(&self) -> Result<DoorStatus> {
        let latest = self.history.latest().await?;
        Ok(DoorStatus::describe(latest, Utc::now(), &self.utc_offset))
    }

    /// Events in the requested range, clipped to the history window
    pub async fn history(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<StateEvent>> {
        self.history.query(since, until, limit).await
    }

    /// Aggregate the windowed history into calendar buckets
    pub async fn stats(
        &self,
        by: Aggregation,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<DoorStats> {
        self.stats_at(Utc::now(), by, since, until).await
    }

    pub async fn stats_at(
        &self,
        now: DateTime<Utc>,
        by: Aggregation,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<DoorStats> {
        let events = self.history.query_at(now, since, until, None).await?;
        // The last state holds until the end of the requested range
        let end = until.map_or(now, |u| u.min(now));

        Ok(DoorStats {
            by,
            utc_offset: self.utc_offset,
            events: events.len(),
            aggregated: aggregate(by, &events, end, &self.utc_offset),
        })
    }
}
