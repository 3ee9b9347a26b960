use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::ComparisonError;

pub type EventId = i64;
pub type IncidentId = i64;

/// Chunk start offset, in whole hours from an event's zero point.
pub type ChunkStart = i64;

/// Incidents of one event grouped by chunk start. Keys ascend numerically and
/// serialize as stringified integers.
pub type EventSeries = BTreeMap<ChunkStart, Vec<IncidentEntry>>;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventRecord {
    pub id: EventId,
    pub demo_event: Option<bool>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EventRecord {
    /// Demo and soft-deleted events never take part in a comparison.
    pub fn is_comparable(&self) -> bool {
        self.deleted_at.is_none() && !self.demo_event.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IncidentRecord {
    pub id: IncidentId,
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub incident_type: Option<String>,
    pub incident_type_is_test: Option<bool>,
}

impl IncidentRecord {
    pub fn is_test(&self) -> bool {
        self.incident_type_is_test.unwrap_or(false)
    }
}

/// Width of one bucket in hours. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourDifference(i64);

impl HourDifference {
    pub fn new(hours: i64) -> Result<Self, ComparisonError> {
        if hours <= 0 {
            return Err(ComparisonError::InvalidArgument(format!(
                "hour_difference must be a positive integer (got {hours})"
            )));
        }
        Ok(Self(hours))
    }

    pub fn hours(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct IncidentEntry {
    pub id: IncidentId,
    pub created_at: String,
    pub description: Option<String>,
    pub incident_type: Option<String>,
}

impl From<&IncidentRecord> for IncidentEntry {
    fn from(record: &IncidentRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at.to_rfc3339(),
            description: record.description.clone(),
            incident_type: record.incident_type.clone(),
        }
    }
}

/// `event_id -> chunk_start -> incidents`, every series sharing one chunk range.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, utoipa::ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct ComparisonResult(pub BTreeMap<EventId, EventSeries>);

impl ComparisonResult {
    pub fn series(&self, event_id: EventId) -> Option<&EventSeries> {
        self.0.get(&event_id)
    }

    pub fn event_ids(&self) -> Vec<EventId> {
        self.0.keys().copied().collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.0.values().next().map(BTreeMap::len).unwrap_or(0)
    }
}
