// Door domain types
//
// DoorState is the only thing the system tracks. StateEvent records a change
// of that state at a whole-second UTC instant. Used by API, storage and CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Door state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    /// Wire token used in signatures, the database and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DoorState::Open)
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown door state token: {0:?}")]
pub struct ParseDoorStateError(pub String);

impl FromStr for DoorState {
    type Err = ParseDoorStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(DoorState::Open),
            "closed" => Ok(DoorState::Closed),
            other => Err(ParseDoorStateError(other.to_string())),
        }
    }
}

/// A recorded door state change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StateEvent {
    /// When the state changed, integer seconds since the Unix epoch
    #[serde(rename = "time", with = "chrono::serde::ts_seconds")]
    #[cfg_attr(feature = "openapi", schema(value_type = i64, example = 1700000000))]
    pub timestamp: DateTime<Utc>,
    pub state: DoorState,
}

impl StateEvent {
    /// Create an event, truncating the timestamp to whole seconds
    pub fn new(timestamp: DateTime<Utc>, state: DoorState) -> Self {
        let timestamp = DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp);
        Self { timestamp, state }
    }

    /// Create an event from integer seconds since the Unix epoch
    pub fn from_seconds(seconds: i64, state: DoorState) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(|timestamp| Self { timestamp, state })
    }

    pub fn seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
