use crate::config::ServerConfig;
use crate::services::event_comparison::EventComparisonService;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub db: PgPool,
    pub comparisons: Arc<EventComparisonService>,
}

impl FromRef<AppState> for Arc<EventComparisonService> {
    fn from_ref(state: &AppState) -> Arc<EventComparisonService> {
        state.comparisons.clone()
    }
}
