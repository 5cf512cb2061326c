// Statistics HTTP routes
//
// Aggregates the windowed history server-side, in the configured UTC offset.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use doorstate_core::{Aggregated, Aggregation, BucketRow, WeekTotal};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{bad_request, error_response, ApiError, ErrorResponse};
use super::door::{instant_param, AppState};
use crate::services::DoorStats;

/// Create statistics routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/door/stats", get(get_stats))
        .with_state(state)
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// `hour` (default), `week` or `weekly-totals`
    #[serde(default)]
    #[param(value_type = Option<Aggregation>)]
    pub by: Aggregation,
    /// Oldest change time to include, seconds since the epoch
    pub from: Option<i64>,
    /// Newest change time to include, seconds since the epoch
    pub to: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub by: Aggregation,
    /// Offset the calendar buckets are computed in
    #[schema(example = "+00:00")]
    pub utc_offset: String,
    /// Number of events aggregated
    pub events: usize,
    /// Set for `hour` and `week`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketRow>>,
    /// Set for `weekly-totals`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<Vec<WeekTotal>>,
}

impl From<DoorStats> for StatsResponse {
    fn from(stats: DoorStats) -> Self {
        let (buckets, weeks) = match stats.aggregated {
            Aggregated::Buckets(rows) => (Some(rows), None),
            Aggregated::Weeks(weeks) => (None, Some(weeks)),
        };
        Self {
            by: stats.by,
            utc_offset: stats.utc_offset.to_string(),
            events: stats.events,
            buckets,
            weeks,
        }
    }
}

/// GET /door/stats - Aggregate statistics over the history window
#[utoipa::path(
    get,
    path = "/door/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Aggregated statistics", body = StatsResponse),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "door"
)]
pub async fn get_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsResponse>, ApiError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let since = instant_param("from", query.from)?;
    let until = instant_param("to", query.to)?;

    let stats = state
        .service
        .stats(query.by, since, until)
        .await
        .map_err(error_response)?;
    Ok(Json(stats.into()))
}
