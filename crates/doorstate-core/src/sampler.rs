// Debounce sampler
//
// Reads a binary sensor N times at a fixed interval and decides the door
// state by majority vote. The vote itself (`tally`) is a pure function over
// read outcomes so it can be tested without hardware; `sample` only adds the
// blocking read/sleep loop around it.
//
// Policy:
// - `inverted` is XORed into every successful raw read before counting
// - a failed read always counts as a closed vote, whatever `inverted` says
// - the door is open only if open votes are strictly greater than `threshold`

use std::time::Duration;
use thiserror::Error;

use crate::door::DoorState;
use crate::error::{DoorstateError, Result};

pub const DEFAULT_SAMPLES: u32 = 10;
pub const DEFAULT_THRESHOLD: u32 = 7;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// A single sensor read that did not produce a usable value
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor read timed out after {0:?}")]
    Timeout(Duration),

    #[error("sensor I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized sensor value: {0:?}")]
    InvalidValue(String),

    #[error("sensor command failed: {0}")]
    Command(String),
}

/// Source of raw sensor reads. `true` means the raw contact reports "open"
/// before inversion.
pub trait SensorReader {
    fn read(&mut self) -> std::result::Result<bool, SensorError>;
}

impl<F> SensorReader for F
where
    F: FnMut() -> std::result::Result<bool, SensorError>,
{
    fn read(&mut self) -> std::result::Result<bool, SensorError> {
        self()
    }
}

/// Debounce parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Number of reads per decision
    pub samples: u32,
    /// Open votes must be strictly greater than this to report open
    pub threshold: u32,
    /// Pause between two consecutive reads
    pub interval: Duration,
    /// Flip every successful raw read (switch wiring differs per deployment)
    pub inverted: bool,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            threshold: DEFAULT_THRESHOLD,
            interval: DEFAULT_INTERVAL,
            inverted: false,
        }
    }
}

impl SamplingPolicy {
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Reject policies that can never report open
    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 {
            return Err(DoorstateError::config("sample count must be at least 1"));
        }
        if self.threshold >= self.samples {
            return Err(DoorstateError::config(format!(
                "threshold {} must be below sample count {}",
                self.threshold, self.samples
            )));
        }
        Ok(())
    }

    /// Decide the door state from the number of open votes
    pub fn decide(&self, open_votes: u32) -> DoorState {
        if open_votes > self.threshold {
            DoorState::Open
        } else {
            DoorState::Closed
        }
    }
}

/// Outcome of one sampling round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub state: DoorState,
    pub open_votes: u32,
    pub failed_reads: u32,
    pub samples: u32,
}

/// Count votes over already collected read outcomes
pub fn tally<I>(policy: &SamplingPolicy, outcomes: I) -> SampleReport
where
    I: IntoIterator<Item = std::result::Result<bool, SensorError>>,
{
    let mut open_votes = 0;
    let mut failed_reads = 0;
    let mut samples = 0;

    for outcome in outcomes {
        samples += 1;
        match outcome {
            Ok(raw) => {
                if raw ^ policy.inverted {
                    open_votes += 1;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Sensor read failed, counting as closed");
                failed_reads += 1;
            }
        }
    }

    SampleReport {
        state: policy.decide(open_votes),
        open_votes,
        failed_reads,
        samples,
    }
}

/// Take `policy.samples` reads, sleeping `policy.interval` between them,
/// and vote. Blocks the calling thread for roughly `(samples - 1) * interval`.
pub fn sample<R: SensorReader + ?Sized>(reader: &mut R, policy: &SamplingPolicy) -> SampleReport {
    let mut outcomes = Vec::with_capacity(policy.samples as usize);
    for i in 0..policy.samples {
        if i > 0 && !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
        outcomes.push(reader.read());
    }

    let report = tally(policy, outcomes);
    if report.failed_reads > 0 {
        tracing::warn!(
            failed = report.failed_reads,
            samples = report.samples,
            "Sensor reads failed during sampling"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SamplingPolicy {
        SamplingPolicy::default().with_interval(Duration::ZERO)
    }

    fn reads(open: usize, total: usize) -> Vec<std::result::Result<bool, SensorError>> {
        (0..total).map(|i| Ok(i < open)).collect()
    }

    #[test]
    fn test_threshold_boundary() {
        let p = policy();
        assert_eq!(tally(&p, reads(8, 10)).state, DoorState::Open);
        assert_eq!(tally(&p, reads(7, 10)).state, DoorState::Closed);
        assert_eq!(tally(&p, reads(10, 10)).state, DoorState::Open);
        assert_eq!(tally(&p, reads(0, 10)).state, DoorState::Closed);
    }

    #[test]
    fn test_all_open_counts() {
        let p = policy();
        for open in 0..=10 {
            let expected = if open >= 8 {
                DoorState::Open
            } else {
                DoorState::Closed
            };
            assert_eq!(tally(&p, reads(open, 10)).state, expected, "open={}", open);
        }
    }

    #[test]
    fn test_inverted_polarity() {
        let p = policy().with_inverted(true);
        // 2 raw "open" reads become 8 open votes after inversion
        let report = tally(&p, reads(2, 10));
        assert_eq!(report.open_votes, 8);
        assert_eq!(report.state, DoorState::Open);

        let report = tally(&p, reads(10, 10));
        assert_eq!(report.open_votes, 0);
        assert_eq!(report.state, DoorState::Closed);
    }

    #[test]
    fn test_failed_reads_count_as_closed() {
        let p = policy();
        let mut outcomes = reads(8, 8);
        outcomes.push(Err(SensorError::Timeout(Duration::from_millis(5))));
        outcomes.push(Err(SensorError::InvalidValue("x".into())));
        let report = tally(&p, outcomes);
        assert_eq!(report.open_votes, 8);
        assert_eq!(report.failed_reads, 2);
        assert_eq!(report.state, DoorState::Open);

        let mut outcomes = reads(7, 7);
        outcomes.push(Err(SensorError::Command("exit 1".into())));
        outcomes.push(Ok(false));
        outcomes.push(Ok(false));
        assert_eq!(tally(&p, outcomes).state, DoorState::Closed);
    }

    #[test]
    fn test_failed_reads_stay_closed_when_inverted() {
        // With inversion a raw `false` is an open vote, a failure must not be
        let p = policy().with_inverted(true);
        let outcomes: Vec<_> = (0..10)
            .map(|_| Err(SensorError::Timeout(Duration::from_millis(1))))
            .collect();
        let report = tally(&p, outcomes);
        assert_eq!(report.open_votes, 0);
        assert_eq!(report.state, DoorState::Closed);
    }

    #[test]
    fn test_sample_reads_exactly_n_times() {
        let p = policy();
        let mut calls = 0;
        let mut reader = || -> std::result::Result<bool, SensorError> {
            calls += 1;
            Ok(true)
        };
        let report = sample(&mut reader, &p);
        assert_eq!(calls, 10);
        assert_eq!(report.samples, 10);
        assert_eq!(report.state, DoorState::Open);
    }

    #[test]
    fn test_sample_with_flaky_sensor() {
        let p = policy();
        let mut n = 0;
        let mut reader = || -> std::result::Result<bool, SensorError> {
            n += 1;
            if n % 4 == 0 {
                Err(SensorError::Timeout(Duration::from_millis(1)))
            } else {
                Ok(true)
            }
        };
        // reads 4 and 8 fail: 8 open votes
        let report = sample(&mut reader, &p);
        assert_eq!(report.failed_reads, 2);
        assert_eq!(report.state, DoorState::Open);
    }

    #[test]
    fn test_validate_policy() {
        assert!(SamplingPolicy::default().validate().is_ok());
        assert!(SamplingPolicy::default().with_samples(0).validate().is_err());
        assert!(SamplingPolicy::default()
            .with_samples(5)
            .with_threshold(5)
            .validate()
            .is_err());
        assert!(SamplingPolicy::default()
            .with_samples(1)
            .with_threshold(0)
            .validate()
            .is_ok());
    }
}
