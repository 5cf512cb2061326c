// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use doorstate_core::{DoorState, ParseDoorStateError, StateEvent};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DoorStateRow {
    pub time: DateTime<Utc>,
    pub state: String,
}

impl TryFrom<DoorStateRow> for StateEvent {
    type Error = ParseDoorStateError;

    fn try_from(row: DoorStateRow) -> Result<Self, Self::Error> {
        let state: DoorState = row.state.parse()?;
        Ok(StateEvent::new(row.time, state))
    }
}
