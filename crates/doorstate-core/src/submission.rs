// State submission protocol (server side)
//
// RECEIVED -> VALIDATED -> PERSISTED, or REJECTED at any validation step.
//
// `SubmissionProtocol::validate` is the only way to obtain a
// `ValidatedSubmission`, and `History::record` only accepts that type, so an
// event can only reach the ledger through a verified signature.
//
// Replays of a captured submission set the same state at the same timestamp,
// which the idempotent upsert turns into a no-op. There is no nonce, so
// submissions without a timestamp are refused unless the policy allows them.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::door::{DoorState, StateEvent};
use crate::error::{DoorstateError, RejectionReason, Result};
use crate::signing::{verify, SigningKey};

/// A submission as received, before any validation. All fields are raw
/// strings; an absent or empty timestamp means "use receipt time" when the
/// policy allows untimed submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSubmission {
    pub timestamp: Option<String>,
    pub state: Option<String>,
    pub signature: Option<String>,
}

impl RawSubmission {
    pub fn new(
        timestamp: Option<impl Into<String>>,
        state: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.map(Into::into),
            state: Some(state.into()),
            signature: Some(signature.into()),
        }
    }
}

/// A submission that passed every check and may be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSubmission {
    event: StateEvent,
    timestamp_supplied: bool,
}

impl ValidatedSubmission {
    pub fn event(&self) -> StateEvent {
        self.event
    }

    /// False when the server substituted receipt time
    pub fn timestamp_supplied(&self) -> bool {
        self.timestamp_supplied
    }
}

/// Acceptance rules besides the signature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionPolicy {
    /// When set, reject supplied timestamps further than this from receipt time
    pub max_clock_skew: Option<Duration>,
    /// Accept submissions without a timestamp, stamped with receipt time.
    /// Their signature does not cover an instant, so a captured one can be
    /// replayed later as a new event.
    pub allow_untimed: bool,
}

impl SubmissionPolicy {
    pub fn with_max_clock_skew(mut self, max_clock_skew: Duration) -> Self {
        self.max_clock_skew = Some(max_clock_skew);
        self
    }

    pub fn with_allow_untimed(mut self, allow_untimed: bool) -> Self {
        self.allow_untimed = allow_untimed;
        self
    }
}

/// Validates signed submissions against the shared key
#[derive(Debug, Clone)]
pub struct SubmissionProtocol {
    key: Arc<SigningKey>,
    policy: SubmissionPolicy,
}

impl SubmissionProtocol {
    pub fn new(key: Arc<SigningKey>, policy: SubmissionPolicy) -> Self {
        Self { key, policy }
    }

    /// RECEIVED -> VALIDATED, or `DoorstateError::Rejected`
    pub fn validate(
        &self,
        raw: &RawSubmission,
        received_at: DateTime<Utc>,
    ) -> Result<ValidatedSubmission> {
        let state_token = non_empty(raw.state.as_deref()).ok_or(reject(RejectionReason::MissingField))?;
        let signature =
            non_empty(raw.signature.as_deref()).ok_or(reject(RejectionReason::MissingField))?;

        let timestamp = match non_empty(raw.timestamp.as_deref()) {
            Some(text) => Some(parse_timestamp(text)?),
            None if self.policy.allow_untimed => None,
            None => return Err(reject(RejectionReason::MissingField)),
        };

        let state: DoorState = state_token
            .parse()
            .map_err(|_| reject(RejectionReason::MalformedState))?;

        if !verify(&self.key, timestamp, state, signature) {
            return Err(reject(RejectionReason::BadSignature));
        }

        let event = match timestamp {
            Some(seconds) => StateEvent::from_seconds(seconds, state)
                .ok_or(reject(RejectionReason::MalformedTimestamp))?,
            None => StateEvent::new(received_at, state),
        };

        if let (Some(max_skew), true) = (self.policy.max_clock_skew, timestamp.is_some()) {
            let skew = (event.timestamp - received_at).abs();
            if skew > max_skew {
                return Err(reject(RejectionReason::StaleTimestamp));
            }
        }

        Ok(ValidatedSubmission {
            event,
            timestamp_supplied: timestamp.is_some(),
        })
    }
}

fn reject(reason: RejectionReason) -> DoorstateError {
    DoorstateError::rejected(reason)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Integer seconds since the epoch, decimal digits only
fn parse_timestamp(text: &str) -> Result<i64> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(reject(RejectionReason::MalformedTimestamp));
    }
    text.parse::<i64>()
        .map_err(|_| reject(RejectionReason::MalformedTimestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::sign;

    fn key() -> Arc<SigningKey> {
        Arc::new(SigningKey::from_bytes(b"test-key").unwrap())
    }

    fn protocol() -> SubmissionProtocol {
        SubmissionProtocol::new(key(), SubmissionPolicy::default())
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn signed(ts: i64, state: DoorState) -> RawSubmission {
        RawSubmission::new(Some(ts.to_string()), state.as_str(), sign(&key(), Some(ts), state))
    }

    fn rejection(result: Result<ValidatedSubmission>) -> RejectionReason {
        result.unwrap_err().rejection().expect("expected a rejection")
    }

    #[test]
    fn test_valid_submission() {
        let v = protocol().validate(&signed(1_600_000_000, DoorState::Open), now()).unwrap();
        assert_eq!(v.event(), StateEvent::from_seconds(1_600_000_000, DoorState::Open).unwrap());
        assert!(v.timestamp_supplied());
    }

    fn untimed(state: DoorState) -> RawSubmission {
        RawSubmission::new(None::<String>, state.as_str(), sign(&key(), None, state))
    }

    fn untimed_protocol() -> SubmissionProtocol {
        SubmissionProtocol::new(key(), SubmissionPolicy::default().with_allow_untimed(true))
    }

    #[test]
    fn test_omitted_timestamp_rejected_by_default() {
        let raw = untimed(DoorState::Open);
        assert_eq!(rejection(protocol().validate(&raw, now())), RejectionReason::MissingField);

        let mut empty = raw.clone();
        empty.timestamp = Some(" ".into());
        assert_eq!(rejection(protocol().validate(&empty, now())), RejectionReason::MissingField);
    }

    #[test]
    fn test_omitted_timestamp_uses_receipt_time_when_allowed() {
        let raw = untimed(DoorState::Closed);
        let v = untimed_protocol().validate(&raw, now()).unwrap();
        assert_eq!(v.event().timestamp, now());
        assert!(!v.timestamp_supplied());

        let mut empty = raw.clone();
        empty.timestamp = Some(String::new());
        assert_eq!(untimed_protocol().validate(&empty, now()).unwrap().event().timestamp, now());
    }

    #[test]
    fn test_captured_untimed_submission_cannot_be_replayed_by_default() {
        let captured = untimed(DoorState::Open);
        let later = now() + Duration::hours(25);
        for at in [now(), later] {
            assert_eq!(
                rejection(protocol().validate(&captured, at)),
                RejectionReason::MissingField
            );
        }
        // The explicit opt-in accepts it at every receipt time
        assert_ne!(
            untimed_protocol().validate(&captured, now()).unwrap().event(),
            untimed_protocol().validate(&captured, later).unwrap().event()
        );
    }

    #[test]
    fn test_signature_over_different_timestamp_rejected() {
        let mut raw = signed(1_600_000_000, DoorState::Open);
        raw.timestamp = Some("1600000001".into());
        assert_eq!(rejection(protocol().validate(&raw, now())), RejectionReason::BadSignature);
    }

    #[test]
    fn test_signature_over_different_state_rejected() {
        let mut raw = signed(1_600_000_000, DoorState::Open);
        raw.state = Some("closed".into());
        assert_eq!(rejection(protocol().validate(&raw, now())), RejectionReason::BadSignature);
    }

    #[test]
    fn test_malformed_inputs() {
        let p = protocol();

        let mut raw = signed(1_600_000_000, DoorState::Open);
        raw.state = Some("ajar".into());
        assert_eq!(rejection(p.validate(&raw, now())), RejectionReason::MalformedState);

        for bad in ["-5", "12.5", "1e9", "abc", "99999999999999999999"] {
            let mut raw = signed(1_600_000_000, DoorState::Open);
            raw.timestamp = Some(bad.into());
            assert_eq!(
                rejection(p.validate(&raw, now())),
                RejectionReason::MalformedTimestamp,
                "timestamp {:?}",
                bad
            );
        }

        let mut raw = signed(1_600_000_000, DoorState::Open);
        raw.signature = None;
        assert_eq!(rejection(p.validate(&raw, now())), RejectionReason::MissingField);

        let mut raw = signed(1_600_000_000, DoorState::Open);
        raw.state = Some("  ".into());
        assert_eq!(rejection(p.validate(&raw, now())), RejectionReason::MissingField);
    }

    #[test]
    fn test_out_of_range_timestamp_is_malformed() {
        // Digits only and fits i64, but chrono cannot represent it
        let ts = i64::MAX;
        let raw = signed(ts, DoorState::Open);
        assert_eq!(
            rejection(protocol().validate(&raw, now())),
            RejectionReason::MalformedTimestamp
        );
    }

    #[test]
    fn test_clock_skew_policy() {
        let p = SubmissionProtocol::new(
            key(),
            SubmissionPolicy::default().with_max_clock_skew(Duration::seconds(60)),
        );
        let ts = now().timestamp();
        assert!(p.validate(&signed(ts - 60, DoorState::Open), now()).is_ok());
        assert!(p.validate(&signed(ts + 60, DoorState::Open), now()).is_ok());
        assert_eq!(
            rejection(p.validate(&signed(ts - 61, DoorState::Open), now())),
            RejectionReason::StaleTimestamp
        );
        assert_eq!(
            rejection(p.validate(&signed(ts + 3600, DoorState::Open), now())),
            RejectionReason::StaleTimestamp
        );
    }

    #[test]
    fn test_default_policy_accepts_old_timestamps() {
        assert!(protocol().validate(&signed(0, DoorState::Closed), now()).is_ok());
    }
}
