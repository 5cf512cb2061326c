// Door State Core
//
// Domain logic shared by the API server and the sensor agent:
// - Debounce sampling of an unreliable binary sensor (majority vote, fail closed)
// - HMAC signing of (timestamp, state) submissions and server-side validation
// - A HistoryStore trait for the append/upsert ledger, with an in-memory backend
// - Window clipping for reads and calendar bucket aggregation for plots
//
// Key design decisions:
// - Sensor I/O is injected through SensorReader, the vote is a pure function
// - The signing key is a process-scoped value passed by reference, never global
// - Only a ValidatedSubmission can be recorded, so every stored event was signed
// - Idempotent upsert by timestamp instead of a nonce-based anti-replay scheme

pub mod aggregate;
pub mod door;
pub mod error;
pub mod history;
pub mod sampler;
pub mod signing;
pub mod status;
pub mod submission;
pub mod traits;
pub mod window;

// In-memory implementations for dev mode and testing
pub mod memory;

// Re-exports for convenience
pub use aggregate::{
    aggregate, aggregate_by_hour, aggregate_by_week, open_intervals, state_intervals,
    weekly_open_hours, Aggregated, Aggregation, BucketRow, BucketStats, HourOfDayProfile,
    HourOfWeekProfile, OpenInterval, StateInterval, WeekTotal,
};
pub use door::{DoorState, ParseDoorStateError, StateEvent};
pub use error::{DoorstateError, RejectionReason, Result};
pub use history::History;
pub use memory::InMemoryHistoryStore;
pub use sampler::{sample, tally, SampleReport, SamplingPolicy, SensorError, SensorReader};
pub use signing::{canonical_message, sign, verify, KeyError, SigningKey};
pub use status::{humanize, DoorStatus, ReportedState};
pub use submission::{RawSubmission, SubmissionPolicy, SubmissionProtocol, ValidatedSubmission};
pub use traits::HistoryStore;
pub use window::{HistoryRange, HistoryWindow};
