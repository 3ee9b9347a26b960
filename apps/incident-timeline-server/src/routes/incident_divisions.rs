use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{map_comparison_error, AppError};
use crate::services::division_resolution::{self, DivisionResolutionTime};
use crate::state::AppState;

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct AvgResolvedTimeQuery {
    /// Comma-separated event ids.
    event_ids: String,
    company_id: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct AvgResolvedTimeResponse {
    divisions: Vec<DivisionResolutionTime>,
}

fn parse_event_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| AppError::bad_request(format!("event_ids contains a non-integer: {value}")))
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/incident-divisions/avg-resolved-time",
    tag = "incident-divisions",
    params(AvgResolvedTimeQuery),
    responses(
        (status = 200, description = "Average resolution time per division", body = AvgResolvedTimeResponse),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Incident store unavailable")
    )
)]
pub(crate) async fn avg_resolved_time(
    State(state): State<AppState>,
    Query(query): Query<AvgResolvedTimeQuery>,
) -> Result<Json<AvgResolvedTimeResponse>, (StatusCode, String)> {
    let event_ids = parse_event_ids(&query.event_ids)?;
    let divisions = division_resolution::average_resolved_time(
        &state.db,
        &event_ids,
        query.company_id,
        state.config.max_events_per_comparison,
    )
    .await
    .map_err(map_comparison_error)?;
    Ok(Json(AvgResolvedTimeResponse { divisions }))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/incident-divisions/avg-resolved-time",
        get(avg_resolved_time),
    )
}
