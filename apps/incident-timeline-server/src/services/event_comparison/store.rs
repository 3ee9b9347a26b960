use sqlx::PgPool;

use super::types::{EventId, EventRecord, IncidentRecord};

/// Requested events in the tenant scope, demo and deleted rows included so the
/// engine can decide eligibility.
pub async fn fetch_events(
    db: &PgPool,
    event_ids: &[EventId],
    company_id: Option<i64>,
) -> Result<Vec<EventRecord>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT e.id, e.demo_event, e.deleted_at
        FROM events e
        WHERE e.id = ANY($1)
          AND ($2::bigint IS NULL OR e.company_id = $2)
        ORDER BY e.id ASC
        "#,
    )
    .bind(event_ids)
    .bind(company_id)
    .fetch_all(db)
    .await
}

/// Live incidents of the given events, ordered by event then creation time.
pub async fn fetch_incidents(
    db: &PgPool,
    event_ids: &[EventId],
) -> Result<Vec<IncidentRecord>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            i.id,
            i.event_id,
            i.created_at,
            i.description,
            t.name AS incident_type,
            t.is_test AS incident_type_is_test
        FROM incidents i
        LEFT JOIN incident_types t ON t.id = i.incident_type_id
        WHERE i.event_id = ANY($1)
          AND i.deleted_at IS NULL
        ORDER BY i.event_id ASC, i.created_at ASC, i.id ASC
        "#,
    )
    .bind(event_ids)
    .fetch_all(db)
    .await
}
