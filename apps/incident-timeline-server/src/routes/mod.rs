pub mod comparison;
pub mod health;
pub mod incident_divisions;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(comparison::router())
                .merge(incident_divisions::router())
                .merge(crate::openapi::router()),
        )
        .with_state(state)
}
