use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::filter::IncidentFilter;
use super::types::{
    ChunkStart, ComparisonResult, EventId, EventRecord, EventSeries, HourDifference,
    IncidentEntry, IncidentRecord,
};
use super::ComparisonError;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

pub type ZeroPoints = BTreeMap<EventId, Option<DateTime<Utc>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub result: ComparisonResult,
    pub zero_points: ZeroPoints,
    pub max_hour: f64,
}

/// Requested events that exist, are live, and are not demo data.
pub fn comparable_event_ids(requested: &[EventId], events: &[EventRecord]) -> BTreeSet<EventId> {
    let requested: BTreeSet<EventId> = requested.iter().copied().collect();
    events
        .iter()
        .filter(|event| requested.contains(&event.id) && event.is_comparable())
        .map(|event| event.id)
        .collect()
}

pub fn resolve_zero_points(
    event_ids: &BTreeSet<EventId>,
    incidents: &[IncidentRecord],
    filter: &dyn IncidentFilter,
) -> ZeroPoints {
    let mut zero_points: ZeroPoints = event_ids.iter().map(|id| (*id, None)).collect();
    for incident in incidents {
        let Some(slot) = zero_points.get_mut(&incident.event_id) else {
            continue;
        };
        if !filter.anchors(incident) {
            continue;
        }
        match slot {
            Some(current) if *current <= incident.created_at => {}
            _ => *slot = Some(incident.created_at),
        }
    }
    zero_points
}

/// Fractional hours from `zero_point` to `ts`.
pub fn hours_since(zero_point: DateTime<Utc>, ts: DateTime<Utc>) -> f64 {
    (ts - zero_point).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

pub fn chunk_start(hours: f64, width: HourDifference) -> ChunkStart {
    // anchors() accepts every qualifying incident, so offsets are never negative.
    let hours = hours.max(0.0);
    (hours / width.hours() as f64).floor() as i64 * width.hours()
}

/// Number of chunks from 0 through `max_hour` inclusive.
pub fn chunk_count(max_hour: f64, width: HourDifference) -> usize {
    (chunk_start(max_hour, width) / width.hours()) as usize + 1
}

/// Qualifying incidents per event, in creation order. Events without a zero
/// point contribute nothing.
fn qualifying_timelines<'a>(
    zero_points: &ZeroPoints,
    incidents: &'a [IncidentRecord],
    filter: &dyn IncidentFilter,
) -> BTreeMap<EventId, Vec<&'a IncidentRecord>> {
    let mut timelines: BTreeMap<EventId, Vec<&'a IncidentRecord>> = BTreeMap::new();
    for incident in incidents {
        let anchored = matches!(zero_points.get(&incident.event_id), Some(Some(_)));
        if anchored && filter.qualifies(incident) {
            timelines.entry(incident.event_id).or_default().push(incident);
        }
    }
    for timeline in timelines.values_mut() {
        timeline.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    }
    timelines
}

pub fn global_max_hour(
    zero_points: &ZeroPoints,
    timelines: &BTreeMap<EventId, Vec<&IncidentRecord>>,
) -> f64 {
    let mut max_hour = 0.0_f64;
    for (event_id, timeline) in timelines {
        let Some(Some(zero_point)) = zero_points.get(event_id) else {
            continue;
        };
        for incident in timeline {
            max_hour = max_hour.max(hours_since(*zero_point, incident.created_at));
        }
    }
    max_hour
}

pub fn bucket_event(
    zero_point: DateTime<Utc>,
    timeline: &[&IncidentRecord],
    width: HourDifference,
) -> EventSeries {
    let mut series = EventSeries::new();
    for incident in timeline {
        let start = chunk_start(hours_since(zero_point, incident.created_at), width);
        series
            .entry(start)
            .or_default()
            .push(IncidentEntry::from(*incident));
    }
    series
}

pub fn fill_gaps(series: &mut EventSeries, max_hour: f64, width: HourDifference) {
    for index in 0..chunk_count(max_hour, width) as i64 {
        series.entry(index * width.hours()).or_default();
    }
}

/// Aligns every comparable requested event onto a shared chunk axis.
///
/// Phase one resolves zero points, buckets each event and finds the global
/// max offset. Phase two gap-fills each series against that max.
pub fn align_events(
    requested: &[EventId],
    events: &[EventRecord],
    incidents: &[IncidentRecord],
    filter: &dyn IncidentFilter,
    width: HourDifference,
    max_chunks_per_series: usize,
) -> Result<Alignment, ComparisonError> {
    let event_ids = comparable_event_ids(requested, events);
    let zero_points = resolve_zero_points(&event_ids, incidents, filter);
    let timelines = qualifying_timelines(&zero_points, incidents, filter);
    let max_hour = global_max_hour(&zero_points, &timelines);

    let chunks = chunk_count(max_hour, width);
    if chunks > max_chunks_per_series {
        return Err(ComparisonError::InvalidArgument(format!(
            "hour_difference {} yields {chunks} chunks per series (limit {max_chunks_per_series}); use a wider bucket",
            width.hours()
        )));
    }

    let mut series_by_event: BTreeMap<EventId, EventSeries> = BTreeMap::new();
    for (event_id, zero_point) in &zero_points {
        let series = match (zero_point, timelines.get(event_id)) {
            (Some(zero_point), Some(timeline)) => bucket_event(*zero_point, timeline, width),
            _ => EventSeries::new(),
        };
        series_by_event.insert(*event_id, series);
    }

    for series in series_by_event.values_mut() {
        fill_gaps(series, max_hour, width);
    }

    Ok(Alignment {
        result: ComparisonResult(series_by_event),
        zero_points,
        max_hour,
    })
}
