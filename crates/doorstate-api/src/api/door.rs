// Door HTTP routes
//
// Design Decision: The submission endpoint accepts JSON or form bodies with the
// field names the sensor agents already send (`time`, `state`, `hmac`), plus
// `timestamp`/`signature` aliases. Every failure before the store is reached
// maps to the same 400 body; the reason is only logged.

use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequest, Query, Request, State},
    http::header,
    routing::get,
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use doorstate_core::{DoorStatus, DoorstateError, RawSubmission, RejectionReason, StateEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::common::{bad_request, error_response, ApiError, ErrorResponse, ListResponse};
use crate::services::DoorService;

/// App state for door routes
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DoorService>,
}

impl AppState {
    pub fn new(service: Arc<DoorService>) -> Self {
        Self { service }
    }
}

/// Create door routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/door/", get(get_current).post(submit_state))
        .route("/door/all/", get(list_history))
        .with_state(state)
}

// ============================================================================
// Request / response types
// ============================================================================

/// Seconds since the epoch, as a JSON number or a string of digits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTime {
    Seconds(i64),
    Text(String),
}

impl WireTime {
    fn into_text(self) -> String {
        match self {
            WireTime::Seconds(seconds) => seconds.to_string(),
            WireTime::Text(text) => text,
        }
    }
}

/// Signed door state submission
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SubmitStateRequest {
    /// Change time in seconds since the epoch; receipt time when omitted
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i64>, example = 1700000000)]
    pub time: Option<WireTime>,
    /// `open` or `closed`
    #[serde(default)]
    #[schema(example = "open")]
    pub state: Option<String>,
    /// Lowercase hex HMAC-SHA256 of `"<time>:<state>"`
    #[serde(default, alias = "signature")]
    pub hmac: Option<String>,
}

impl From<SubmitStateRequest> for RawSubmission {
    fn from(req: SubmitStateRequest) -> Self {
        RawSubmission {
            timestamp: req.time.map(WireTime::into_text),
            state: req.state,
            signature: req.hmac,
        }
    }
}

/// Submission body, parsed as JSON or as a urlencoded form
pub struct SubmissionBody(pub SubmitStateRequest);

#[async_trait]
impl<S> FromRequest<S> for SubmissionBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"));

        let parsed = if is_json {
            Json::<SubmitStateRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| e.body_text())
        } else {
            Form::<SubmitStateRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| e.body_text())
        };

        parsed.map(SubmissionBody).map_err(|detail| {
            tracing::warn!(
                reason = "unreadable_body",
                detail = %detail,
                "Rejected door state submission"
            );
            error_response(DoorstateError::rejected(RejectionReason::MissingField))
        })
    }
}

/// History query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Oldest change time to include, seconds since the epoch
    pub from: Option<i64>,
    /// Newest change time to include, seconds since the epoch
    pub to: Option<i64>,
    /// Maximum number of events; capped by the server's history window
    pub limit: Option<usize>,
}

/// Convert an optional epoch-seconds query parameter
pub(crate) fn instant_param(name: &str, value: Option<i64>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(seconds) => DateTime::from_timestamp(seconds, 0)
            .map(Some)
            .ok_or_else(|| bad_request(format!("'{}' is out of range: {}", name, seconds))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /door/ - Submit a signed door state change
#[utoipa::path(
    post,
    path = "/door/",
    request_body(
        content = SubmitStateRequest,
        description = "Signed state change, as JSON or application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Stored event", body = StateEvent),
        (status = 400, description = "Submission rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "door"
)]
pub async fn submit_state(
    State(state): State<AppState>,
    SubmissionBody(body): SubmissionBody,
) -> Result<Json<StateEvent>, ApiError> {
    let stored = state
        .service
        .submit(body.into())
        .await
        .map_err(error_response)?;
    Ok(Json(stored))
}

/// GET /door/ - Current door state
#[utoipa::path(
    get,
    path = "/door/",
    responses(
        (status = 200, description = "Current state", body = DoorStatus),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "door"
)]
pub async fn get_current(State(state): State<AppState>) -> Result<Json<DoorStatus>, ApiError> {
    let status = state.service.current().await.map_err(error_response)?;
    Ok(Json(status))
}

/// GET /door/all/ - Door state history, oldest first
#[utoipa::path(
    get,
    path = "/door/all/",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Events in range, clipped to the history window", body = ListResponse<StateEvent>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "door"
)]
pub async fn list_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ListResponse<StateEvent>>, ApiError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let since = instant_param("from", query.from)?;
    let until = instant_param("to", query.to)?;

    let events = state
        .service
        .history(since, until, query.limit)
        .await
        .map_err(error_response)?;
    Ok(Json(ListResponse::new(events)))
}
