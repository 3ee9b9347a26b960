use crate::config::ServerConfig;
use crate::db;
use crate::services::event_comparison::{ComparisonLimits, EventComparisonService};
use crate::state::AppState;
use std::sync::Arc;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "postgresql://postgres@localhost/postgres".to_string(),
        db_max_connections: 2,
        db_acquire_timeout_seconds: 1,
        comparison_cache_enabled: false,
        comparison_cache_ttl_seconds: 60,
        comparison_cache_capacity: 16,
        max_events_per_comparison: 10,
        max_chunks_per_series: 1_000,
        rate_limit_per_second: 20,
        rate_limit_burst: 60,
    }
}

pub fn test_state() -> AppState {
    let config = test_config();
    let pool = db::connect_lazy(
        &config.database_url,
        config.db_max_connections,
        config.db_acquire_timeout_seconds,
    )
    .expect("connect_lazy");
    let comparisons = Arc::new(EventComparisonService::new(
        pool.clone(),
        ComparisonLimits {
            max_events: config.max_events_per_comparison,
            max_chunks_per_series: config.max_chunks_per_series,
        },
        None,
    ));

    AppState {
        config,
        db: pool,
        comparisons,
    }
}
