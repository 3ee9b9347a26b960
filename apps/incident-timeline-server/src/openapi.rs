use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthz_handler,
        crate::routes::comparison::compare_line_graph,
        crate::routes::comparison::compare_graph,
        crate::routes::incident_divisions::avg_resolved_time,
    ),
    components(schemas(
        crate::routes::health::HealthResponse,
        crate::routes::comparison::LineGraphComparisonRequest,
        crate::routes::comparison::GraphComparisonRequest,
        crate::routes::incident_divisions::AvgResolvedTimeResponse,
        crate::services::division_resolution::DivisionResolutionTime,
        crate::services::event_comparison::ComparisonResult,
        crate::services::event_comparison::IncidentEntry,
    )),
    tags(
        (name = "comparison", description = "Event incident timeline comparison"),
        (name = "incident-divisions", description = "Incident division analytics")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
