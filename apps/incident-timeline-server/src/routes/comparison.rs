use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::map_comparison_error;
use crate::services::event_comparison::{ComparisonResult, EventComparisonService};
use crate::state::AppState;

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct LineGraphComparisonRequest {
    event_ids: Vec<i64>,
    incident_ids: Vec<i64>,
    #[schema(minimum = 1)]
    hour_difference: i64,
    #[serde(default)]
    company_id: Option<i64>,
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct GraphComparisonRequest {
    event_ids: Vec<i64>,
    #[schema(minimum = 1)]
    hour_difference: i64,
    #[serde(default)]
    company_id: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/events/comparison/line-graph",
    tag = "comparison",
    request_body = LineGraphComparisonRequest,
    responses(
        (status = 200, description = "Incidents of the listed ids bucketed per event", body = ComparisonResult),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Incident store unavailable")
    )
)]
pub(crate) async fn compare_line_graph(
    State(comparisons): State<Arc<EventComparisonService>>,
    Json(payload): Json<LineGraphComparisonRequest>,
) -> Result<Json<ComparisonResult>, (StatusCode, String)> {
    let result = comparisons
        .line_graph(
            &payload.event_ids,
            &payload.incident_ids,
            payload.hour_difference,
            payload.company_id,
        )
        .await
        .map_err(map_comparison_error)?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/events/comparison/graph",
    tag = "comparison",
    request_body = GraphComparisonRequest,
    responses(
        (status = 200, description = "Non-test incidents bucketed per event", body = ComparisonResult),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Incident store unavailable")
    )
)]
pub(crate) async fn compare_graph(
    State(comparisons): State<Arc<EventComparisonService>>,
    Json(payload): Json<GraphComparisonRequest>,
) -> Result<Json<ComparisonResult>, (StatusCode, String)> {
    let result = comparisons
        .graph(
            &payload.event_ids,
            payload.hour_difference,
            payload.company_id,
        )
        .await
        .map_err(map_comparison_error)?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/comparison/line-graph", post(compare_line_graph))
        .route("/events/comparison/graph", post(compare_graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .nest("/api", router())
            .with_state(crate::test_support::test_state())
    }

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, String) {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn graph_rejects_zero_hour_difference() {
        let (status, body) = post_json(
            "/api/events/comparison/graph",
            serde_json::json!({ "event_ids": [1, 2], "hour_difference": 0 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("hour_difference"));
    }

    #[tokio::test]
    async fn graph_rejects_single_event() {
        let (status, body) = post_json(
            "/api/events/comparison/graph",
            serde_json::json!({ "event_ids": [1], "hour_difference": 24 }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("event_ids"));
    }

    #[tokio::test]
    async fn line_graph_rejects_negative_hour_difference() {
        let (status, _) = post_json(
            "/api/events/comparison/line-graph",
            serde_json::json!({
                "event_ids": [1, 2],
                "incident_ids": [10],
                "hour_difference": -4
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn line_graph_requires_incident_ids() {
        let (status, _) = post_json(
            "/api/events/comparison/line-graph",
            serde_json::json!({ "event_ids": [1, 2], "hour_difference": 4 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
