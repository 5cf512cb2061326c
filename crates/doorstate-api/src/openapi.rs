// OpenAPI document
//
// Served by the API server under /api-doc/openapi.json with Swagger UI.

use crate::api;
use crate::api::{ErrorResponse, ListResponse};
use doorstate_core::{
    Aggregation, BucketRow, DoorState, DoorStatus, ReportedState, StateEvent, WeekTotal,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the door state API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::door::submit_state,
        api::door::get_current,
        api::door::list_history,
        api::stats::get_stats,
    ),
    components(
        schemas(
            DoorState, StateEvent, DoorStatus, ReportedState,
            BucketRow, WeekTotal,
            api::door::SubmitStateRequest,
            Aggregation, api::stats::StatsResponse,
            ListResponse<StateEvent>,
            ErrorResponse,
        )
    ),
    tags(
        (name = "door", description = "Door state submission and history endpoints")
    ),
    info(
        title = "Door State API",
        version = "0.2.0",
        description = "Signed door state submissions, current state, history and statistics",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;
