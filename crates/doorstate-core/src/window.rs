// History window
//
// Every history read is clipped to the newest `max_events` events that are
// at most `max_age` old. The ledger itself is never trimmed; the window only
// bounds what a single read may return.

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_MAX_EVENTS: usize = 2000;
pub const DEFAULT_MAX_AGE_DAYS: i64 = 365;

/// Bounds applied to every history read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub max_events: usize,
    pub max_age: Duration,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }
}

/// A history range after window clipping. Stores return the `limit` most
/// recent events with `since <= timestamp <= until`, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub limit: usize,
}

impl HistoryRange {
    pub fn is_empty(&self) -> bool {
        self.limit == 0 || self.since > self.until
    }
}

impl HistoryWindow {
    pub fn new(max_events: usize, max_age: Duration) -> Self {
        Self {
            max_events,
            max_age,
        }
    }

    /// Oldest instant visible at `now`
    pub fn horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Clip a requested range. Missing bounds default to the window start,
    /// `now`, and `max_events`. Wider requests are narrowed silently.
    pub fn clip(
        &self,
        now: DateTime<Utc>,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> HistoryRange {
        let horizon = self.horizon(now);
        let since = since.map_or(horizon, |s| s.max(horizon));
        let until = until.unwrap_or(now);
        let limit = limit.map_or(self.max_events, |l| l.min(self.max_events));
        HistoryRange {
            since,
            until,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let range = HistoryWindow::default().clip(now(), None, None, None);
        assert_eq!(range.since, now() - Duration::days(365));
        assert_eq!(range.until, now());
        assert_eq!(range.limit, 2000);
    }

    #[test]
    fn test_wider_request_is_clipped() {
        let window = HistoryWindow::default();
        let ancient = DateTime::from_timestamp(0, 0).unwrap();
        let range = window.clip(now(), Some(ancient), None, Some(1_000_000));
        assert_eq!(range.since, now() - Duration::days(365));
        assert_eq!(range.limit, 2000);
    }

    #[test]
    fn test_narrower_request_is_kept() {
        let window = HistoryWindow::default();
        let since = now() - Duration::days(2);
        let until = now() - Duration::days(1);
        let range = window.clip(now(), Some(since), Some(until), Some(10));
        assert_eq!(range.since, since);
        assert_eq!(range.until, until);
        assert_eq!(range.limit, 10);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let window = HistoryWindow::default();
        let range = window.clip(now(), Some(now()), Some(now() - Duration::hours(1)), None);
        assert!(range.is_empty());
    }

    #[test]
    fn test_custom_window() {
        let window = HistoryWindow::new(5, Duration::days(7));
        let range = window.clip(now(), None, None, Some(50));
        assert_eq!(range.limit, 5);
        assert_eq!(range.since, now() - Duration::days(7));
    }
}
