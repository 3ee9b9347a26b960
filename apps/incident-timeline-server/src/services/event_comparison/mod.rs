//! Aligns the incident timelines of several events onto a shared relative-hour
//! axis so they can be charted side by side.
//!
//! Each event's timeline starts at its earliest anchoring incident (the zero
//! point). Qualifying incidents are bucketed into fixed-width hour chunks, and
//! every series is gap-filled up to the largest offset seen across all events
//! in the call.

pub mod bucketing;
pub mod cache;
pub mod filter;
pub mod store;
pub mod types;

use sqlx::PgPool;
use std::sync::Arc;

pub use bucketing::{align_events, Alignment};
pub use cache::{ComparisonCache, ComparisonKey};
pub use filter::{IncidentAllowlist, IncidentFilter, NonTestIncidents};
pub use types::{
    ComparisonResult, EventId, EventRecord, EventSeries, HourDifference, IncidentEntry,
    IncidentId, IncidentRecord,
};

pub const MIN_EVENTS_PER_COMPARISON: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ComparisonError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("incident store query failed: {0}")]
    DataAccess(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonLimits {
    pub max_events: usize,
    pub max_chunks_per_series: usize,
}

/// Collapses duplicates (first occurrence wins) and enforces the event count bounds.
pub fn normalize_event_ids(
    event_ids: &[EventId],
    max_events: usize,
) -> Result<Vec<EventId>, ComparisonError> {
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<EventId> = event_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if unique.len() < MIN_EVENTS_PER_COMPARISON {
        return Err(ComparisonError::InvalidArgument(format!(
            "event_ids must name at least {MIN_EVENTS_PER_COMPARISON} distinct events"
        )));
    }
    if unique.len() > max_events {
        return Err(ComparisonError::InvalidArgument(format!(
            "event_ids may name at most {max_events} events"
        )));
    }
    Ok(unique)
}

pub struct EventComparisonService {
    db: PgPool,
    limits: ComparisonLimits,
    cache: Option<Arc<ComparisonCache>>,
}

impl EventComparisonService {
    pub fn new(db: PgPool, limits: ComparisonLimits, cache: Option<Arc<ComparisonCache>>) -> Self {
        Self { db, limits, cache }
    }

    pub fn limits(&self) -> ComparisonLimits {
        self.limits
    }

    pub fn cache(&self) -> Option<Arc<ComparisonCache>> {
        self.cache.clone()
    }

    /// Line-graph comparison over an explicit set of incidents.
    pub async fn line_graph(
        &self,
        event_ids: &[EventId],
        incident_ids: &[IncidentId],
        hour_difference: i64,
        company_id: Option<i64>,
    ) -> Result<ComparisonResult, ComparisonError> {
        let allowlist = IncidentAllowlist::new(incident_ids.iter().copied());
        if allowlist.is_empty() {
            return Err(ComparisonError::InvalidArgument(
                "incident_ids must not be empty".to_string(),
            ));
        }
        self.compare(event_ids, &allowlist, hour_difference, company_id)
            .await
    }

    /// Graph comparison over every incident whose type is not test data.
    pub async fn graph(
        &self,
        event_ids: &[EventId],
        hour_difference: i64,
        company_id: Option<i64>,
    ) -> Result<ComparisonResult, ComparisonError> {
        self.compare(event_ids, &NonTestIncidents, hour_difference, company_id)
            .await
    }

    pub async fn compare(
        &self,
        event_ids: &[EventId],
        filter: &dyn IncidentFilter,
        hour_difference: i64,
        company_id: Option<i64>,
    ) -> Result<ComparisonResult, ComparisonError> {
        let width = HourDifference::new(hour_difference)?;
        let event_ids = normalize_event_ids(event_ids, self.limits.max_events)?;

        let key = ComparisonKey::new(&event_ids, filter.fingerprint(), width, company_id);
        if let Some(cache) = self.cache.as_ref() {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(events = event_ids.len(), "comparison cache hit");
                return Ok(hit.as_ref().clone());
            }
        }

        let (events, incidents) = tokio::try_join!(
            store::fetch_events(&self.db, &event_ids, company_id),
            store::fetch_incidents(&self.db, &event_ids),
        )?;

        let alignment = align_events(
            &event_ids,
            &events,
            &incidents,
            filter,
            width,
            self.limits.max_chunks_per_series,
        )?;
        tracing::debug!(
            requested = event_ids.len(),
            compared = alignment.result.0.len(),
            incidents = incidents.len(),
            filter = %filter.fingerprint(),
            max_hour = alignment.max_hour,
            chunks = alignment.result.chunk_count(),
            "aligned event timelines"
        );

        if let Some(cache) = self.cache.as_ref() {
            cache.insert(key, Arc::new(alignment.result.clone())).await;
        }
        Ok(alignment.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_service() -> EventComparisonService {
        let pool = crate::db::connect_lazy("postgresql://postgres@localhost/postgres", 1, 1)
            .expect("connect_lazy");
        EventComparisonService::new(
            pool,
            ComparisonLimits {
                max_events: 4,
                max_chunks_per_series: 100,
            },
            None,
        )
    }

    #[test]
    fn normalize_event_ids_collapses_duplicates_in_order() {
        let ids = normalize_event_ids(&[5, 3, 5, 9], 10).expect("normalize");
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn normalize_event_ids_enforces_bounds() {
        assert!(matches!(
            normalize_event_ids(&[4, 4], 10),
            Err(ComparisonError::InvalidArgument(_))
        ));
        assert!(matches!(
            normalize_event_ids(&[1, 2, 3], 2),
            Err(ComparisonError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn zero_hour_difference_is_rejected_before_touching_the_database() {
        let err = lazy_service().graph(&[1, 2], 0, None).await.unwrap_err();
        assert!(matches!(err, ComparisonError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn empty_allowlist_is_rejected() {
        let err = lazy_service()
            .line_graph(&[1, 2], &[], 24, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ComparisonError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn too_many_events_is_rejected() {
        let err = lazy_service()
            .graph(&[1, 2, 3, 4, 5], 24, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ComparisonError::InvalidArgument(_)));
    }
}
