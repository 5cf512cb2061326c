// Current door status as shown to readers

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::door::{DoorState, StateEvent};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// State reported to readers; `unknown` until the first event exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ReportedState {
    Open,
    Closed,
    Unknown,
}

impl From<DoorState> for ReportedState {
    fn from(state: DoorState) -> Self {
        match state {
            DoorState::Open => ReportedState::Open,
            DoorState::Closed => ReportedState::Closed,
        }
    }
}

impl std::fmt::Display for ReportedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedState::Open => write!(f, "open"),
            ReportedState::Closed => write!(f, "closed"),
            ReportedState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Current door status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DoorStatus {
    pub state: ReportedState,
    /// Time of the last change in seconds since the epoch, 0 if unknown
    #[cfg_attr(feature = "openapi", schema(example = 1700000000))]
    pub time: i64,
    /// Human readable summary
    #[cfg_attr(feature = "openapi", schema(example = "Open for 2 hours."))]
    pub text: String,
}

impl DoorStatus {
    /// Build the status from the latest event as seen at `now` in `tz`
    pub fn describe<Tz: TimeZone>(latest: Option<StateEvent>, now: DateTime<Utc>, tz: &Tz) -> Self {
        let Some(event) = latest else {
            return Self {
                state: ReportedState::Unknown,
                time: 0,
                text: "No door state recorded yet.".to_string(),
            };
        };

        let since = humanize(now - event.timestamp);
        let text = match event.state {
            DoorState::Open => format!("Open for {}.", since),
            DoorState::Closed
                if event.timestamp.with_timezone(tz).date_naive()
                    != now.with_timezone(tz).date_naive() =>
            {
                "Not opened today yet.".to_string()
            }
            DoorState::Closed => format!("Last open {} ago.", since),
        };

        Self {
            state: event.state.into(),
            time: event.seconds(),
            text,
        }
    }
}

/// Coarse human readable duration ("5 minutes", "3 hours", "2 days")
pub fn humanize(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = elapsed.num_hours();
    if hours < 48 {
        return plural(hours, "hour");
    }
    plural(elapsed.num_days(), "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
