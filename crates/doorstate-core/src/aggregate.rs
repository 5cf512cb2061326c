// History aggregation
//
// The ledger stores state changes. Between two consecutive events the door
// holds the earlier event's state; after the last event it holds that state
// until `now`. Time before the first event is not observed.
//
// Reconstructed intervals are cut at local hour boundaries and each slice is
// credited to its calendar bucket (hour of day, or weekday + hour). A bucket's
// fraction open is open seconds over observed seconds, summed across every
// day or week that contributed; a bucket nobody observed has no fraction.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::door::{DoorState, StateEvent};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Time observed in one calendar bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub open_seconds: i64,
    pub observed_seconds: i64,
}

impl BucketStats {
    /// `None` when the bucket was never observed
    pub fn fraction_open(&self) -> Option<f64> {
        if self.observed_seconds <= 0 {
            None
        } else {
            Some(self.open_seconds as f64 / self.observed_seconds as f64)
        }
    }

    fn add(&mut self, state: DoorState, seconds: i64) {
        self.observed_seconds += seconds;
        if state.is_open() {
            self.open_seconds += seconds;
        }
    }
}

/// One bucket flattened for output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BucketRow {
    /// Day of week, only present for hour-of-week profiles
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "Mon"))]
    pub weekday: Option<Weekday>,
    /// Hour of day, 0-23, in the aggregation time zone
    pub hour: u32,
    pub open_seconds: i64,
    pub observed_seconds: i64,
    /// Fraction of observed time the door was open; null when not observed
    pub fraction_open: Option<f64>,
}

/// Fraction open per hour of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourOfDayProfile {
    buckets: [BucketStats; 24],
}

impl Default for HourOfDayProfile {
    fn default() -> Self {
        Self {
            buckets: [BucketStats::default(); 24],
        }
    }
}

impl HourOfDayProfile {
    pub fn get(&self, hour: u32) -> Option<&BucketStats> {
        self.buckets.get(hour as usize)
    }

    pub fn fraction(&self, hour: u32) -> Option<f64> {
        self.get(hour).and_then(BucketStats::fraction_open)
    }

    pub fn rows(&self) -> Vec<BucketRow> {
        self.buckets
            .iter()
            .enumerate()
            .map(|(hour, stats)| BucketRow {
                weekday: None,
                hour: hour as u32,
                open_seconds: stats.open_seconds,
                observed_seconds: stats.observed_seconds,
                fraction_open: stats.fraction_open(),
            })
            .collect()
    }
}

/// Fraction open per weekday and hour of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourOfWeekProfile {
    buckets: [[BucketStats; 24]; 7],
}

impl Default for HourOfWeekProfile {
    fn default() -> Self {
        Self {
            buckets: [[BucketStats::default(); 24]; 7],
        }
    }
}

impl HourOfWeekProfile {
    pub fn get(&self, weekday: Weekday, hour: u32) -> Option<&BucketStats> {
        self.buckets[weekday.num_days_from_monday() as usize].get(hour as usize)
    }

    pub fn fraction(&self, weekday: Weekday, hour: u32) -> Option<f64> {
        self.get(weekday, hour).and_then(BucketStats::fraction_open)
    }

    pub fn rows(&self) -> Vec<BucketRow> {
        let mut rows = Vec::with_capacity(7 * 24);
        for (day, hours) in self.buckets.iter().enumerate() {
            let weekday = Weekday::try_from(day as u8).unwrap_or(Weekday::Mon);
            for (hour, stats) in hours.iter().enumerate() {
                rows.push(BucketRow {
                    weekday: Some(weekday),
                    hour: hour as u32,
                    open_seconds: stats.open_seconds,
                    observed_seconds: stats.observed_seconds,
                    fraction_open: stats.fraction_open(),
                });
            }
        }
        rows
    }
}

/// A stretch of time with a constant door state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: DoorState,
}

/// A period during which the door was open. `closed` is `None` while it
/// still is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct OpenInterval {
    #[serde(with = "chrono::serde::ts_seconds")]
    #[cfg_attr(feature = "openapi", schema(value_type = i64))]
    pub opened: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub closed: Option<DateTime<Utc>>,
}

/// Hours open during one calendar week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WeekTotal {
    /// Monday the week starts on, in the aggregation time zone
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2024-01-01"))]
    pub week_start: NaiveDate,
    pub open_hours: f64,
}

fn whole_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}

/// Events sorted by time with duplicate timestamps collapsed (last one wins)
fn normalized(events: &[StateEvent]) -> Vec<StateEvent> {
    let mut by_time: BTreeMap<DateTime<Utc>, DoorState> = BTreeMap::new();
    for event in events {
        by_time.insert(event.timestamp, event.state);
    }
    by_time
        .into_iter()
        .map(|(timestamp, state)| StateEvent { timestamp, state })
        .collect()
}

/// Rebuild constant-state intervals from change events, up to `now`
pub fn state_intervals(events: &[StateEvent], now: DateTime<Utc>) -> Vec<StateInterval> {
    let now = whole_seconds(now);
    let events = normalized(events);
    let mut intervals = Vec::with_capacity(events.len());

    for (i, event) in events.iter().enumerate() {
        let end = events.get(i + 1).map_or(now, |next| next.timestamp).min(now);
        if end > event.timestamp {
            intervals.push(StateInterval {
                start: event.timestamp,
                end,
                state: event.state,
            });
        }
    }
    intervals
}

/// Cut an interval at local hour boundaries, calling `f(local_start, seconds)`
/// for every slice
fn for_each_hour_slice<Tz, F>(interval: &StateInterval, tz: &Tz, mut f: F)
where
    Tz: TimeZone,
    F: FnMut(&DateTime<Tz>, i64),
{
    let mut cursor = interval.start;
    while cursor < interval.end {
        let local = cursor.with_timezone(tz);
        let into_hour = i64::from(local.minute()) * 60 + i64::from(local.second());
        let boundary = cursor + Duration::seconds(3600 - into_hour);
        let slice_end = boundary.min(interval.end);
        f(&local, (slice_end - cursor).num_seconds());
        cursor = slice_end;
    }
}

/// Fraction open per hour of day in `tz`
pub fn aggregate_by_hour<Tz: TimeZone>(
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> HourOfDayProfile {
    let mut profile = HourOfDayProfile::default();
    for interval in state_intervals(events, now) {
        for_each_hour_slice(&interval, tz, |local, seconds| {
            profile.buckets[local.hour() as usize].add(interval.state, seconds);
        });
    }
    profile
}

/// Fraction open per (weekday, hour of day) in `tz`
pub fn aggregate_by_week<Tz: TimeZone>(
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> HourOfWeekProfile {
    let mut profile = HourOfWeekProfile::default();
    for interval in state_intervals(events, now) {
        for_each_hour_slice(&interval, tz, |local, seconds| {
            let day = local.weekday().num_days_from_monday() as usize;
            profile.buckets[day][local.hour() as usize].add(interval.state, seconds);
        });
    }
    profile
}

/// Merge consecutive open events into open periods
pub fn open_intervals(events: &[StateEvent], now: DateTime<Utc>) -> Vec<OpenInterval> {
    state_intervals(events, now)
        .into_iter()
        .filter(|interval| interval.state.is_open())
        .fold(Vec::new(), |mut acc: Vec<OpenInterval>, interval| {
            match acc.last_mut() {
                Some(last) if last.closed == Some(interval.start) => {
                    last.closed = Some(interval.end);
                }
                _ => acc.push(OpenInterval {
                    opened: interval.start,
                    closed: Some(interval.end),
                }),
            }
            acc
        })
        .into_iter()
        .map(|mut interval| {
            // An interval reaching `now` is still open
            if interval.closed == Some(whole_seconds(now)) {
                interval.closed = None;
            }
            interval
        })
        .collect()
}

/// Open hours per calendar week (weeks start Monday 00:00 in `tz`)
pub fn weekly_open_hours<Tz: TimeZone>(
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<WeekTotal> {
    let mut seconds_by_week: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for interval in state_intervals(events, now) {
        if !interval.state.is_open() {
            continue;
        }
        for_each_hour_slice(&interval, tz, |local, seconds| {
            let date = local.date_naive();
            let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
            *seconds_by_week.entry(monday).or_default() += seconds;
        });
    }
    seconds_by_week
        .into_iter()
        .map(|(week_start, seconds)| WeekTotal {
            week_start,
            open_hours: seconds as f64 / 3600.0,
        })
        .collect()
}

/// Calendar aggregation offered to readers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// Fraction open per hour of day
    #[default]
    Hour,
    /// Fraction open per weekday and hour
    Week,
    /// Open hours per calendar week
    WeeklyTotals,
}

/// Output of an `Aggregation`
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    Buckets(Vec<BucketRow>),
    Weeks(Vec<WeekTotal>),
}

/// Run `by` over `events` as seen at `now`, bucketed in `tz`
pub fn aggregate<Tz: TimeZone>(
    by: Aggregation,
    events: &[StateEvent],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Aggregated {
    match by {
        Aggregation::Hour => Aggregated::Buckets(aggregate_by_hour(events, now, tz).rows()),
        Aggregation::Week => Aggregated::Buckets(aggregate_by_week(events, now, tz).rows()),
        Aggregation::WeeklyTotals => Aggregated::Weeks(weekly_open_hours(events, now, tz)),
    }
}
