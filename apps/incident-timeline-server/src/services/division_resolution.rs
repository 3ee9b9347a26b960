use sqlx::PgPool;

use crate::services::event_comparison::{ComparisonError, EventId};

pub const UNASSIGNED_DIVISION_NAME: &str = "Unassigned";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DivisionResolutionRow {
    pub division_id: Option<i64>,
    pub division_name: Option<String>,
    pub resolved_count: i64,
    pub open_count: i64,
    pub avg_resolved_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct DivisionResolutionTime {
    pub division_id: Option<i64>,
    pub name: String,
    pub resolved_count: i64,
    pub open_count: i64,
    pub avg_resolved_hours: Option<f64>,
}

impl From<DivisionResolutionRow> for DivisionResolutionTime {
    fn from(row: DivisionResolutionRow) -> Self {
        Self {
            division_id: row.division_id,
            name: row
                .division_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNASSIGNED_DIVISION_NAME.to_string()),
            resolved_count: row.resolved_count,
            open_count: row.open_count,
            avg_resolved_hours: row.avg_resolved_hours.map(round2),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average time-to-resolve per incident division across the given events.
/// Demo and deleted events, deleted incidents and test incident types are
/// left out; unresolved incidents only count towards `open_count`.
pub async fn average_resolved_time(
    db: &PgPool,
    event_ids: &[EventId],
    company_id: Option<i64>,
    max_events: usize,
) -> Result<Vec<DivisionResolutionTime>, ComparisonError> {
    let mut event_ids = event_ids.to_vec();
    event_ids.sort_unstable();
    event_ids.dedup();
    if event_ids.is_empty() {
        return Err(ComparisonError::InvalidArgument(
            "event_ids must name at least one event".to_string(),
        ));
    }
    if event_ids.len() > max_events {
        return Err(ComparisonError::InvalidArgument(format!(
            "event_ids may name at most {max_events} events"
        )));
    }

    let rows: Vec<DivisionResolutionRow> = sqlx::query_as(
        r#"
        SELECT
            d.id AS division_id,
            d.name AS division_name,
            COUNT(*) FILTER (WHERE i.resolved_at IS NOT NULL) AS resolved_count,
            COUNT(*) FILTER (WHERE i.resolved_at IS NULL) AS open_count,
            (
                AVG(EXTRACT(EPOCH FROM (i.resolved_at - i.created_at)) / 3600.0)
                    FILTER (WHERE i.resolved_at IS NOT NULL)
            )::float8 AS avg_resolved_hours
        FROM incidents i
        JOIN events e ON e.id = i.event_id
        LEFT JOIN incident_types t ON t.id = i.incident_type_id
        LEFT JOIN incident_divisions d ON d.id = i.incident_division_id
        WHERE i.event_id = ANY($1)
          AND i.deleted_at IS NULL
          AND e.deleted_at IS NULL
          AND (e.demo_event IS NULL OR e.demo_event = FALSE)
          AND (t.is_test IS NULL OR t.is_test = FALSE)
          AND ($2::bigint IS NULL OR e.company_id = $2)
        GROUP BY d.id, d.name
        ORDER BY d.name ASC NULLS LAST, d.id ASC
        "#,
    )
    .bind(&event_ids)
    .bind(company_id)
    .fetch_all(db)
    .await?;

    tracing::debug!(
        events = event_ids.len(),
        divisions = rows.len(),
        "computed division resolution times"
    );
    Ok(rows.into_iter().map(DivisionResolutionTime::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_without_a_division_are_reported_as_unassigned() {
        let row = DivisionResolutionRow {
            division_id: None,
            division_name: None,
            resolved_count: 0,
            open_count: 3,
            avg_resolved_hours: None,
        };
        let summary = DivisionResolutionTime::from(row);
        assert_eq!(summary.name, UNASSIGNED_DIVISION_NAME);
        assert_eq!(summary.avg_resolved_hours, None);
        assert_eq!(summary.open_count, 3);
    }

    #[test]
    fn averages_are_rounded_to_two_decimals() {
        let row = DivisionResolutionRow {
            division_id: Some(4),
            division_name: Some(" Security ".to_string()),
            resolved_count: 3,
            open_count: 0,
            avg_resolved_hours: Some(1.23456),
        };
        let summary = DivisionResolutionTime::from(row);
        assert_eq!(summary.name, "Security");
        assert_eq!(summary.avg_resolved_hours, Some(1.23));
    }
}
