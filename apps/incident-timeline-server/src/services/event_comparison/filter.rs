use std::collections::BTreeSet;

use super::types::{IncidentId, IncidentRecord};

/// Decides which incidents of an event take part in a comparison.
///
/// `qualifies` selects the incidents that are plotted. `anchors` selects the
/// incidents that may define an event's zero point; it must accept at least
/// every qualifying incident so that no plotted offset is negative.
pub trait IncidentFilter: Send + Sync {
    fn qualifies(&self, incident: &IncidentRecord) -> bool;

    fn anchors(&self, incident: &IncidentRecord) -> bool {
        self.qualifies(incident)
    }

    /// Stable text form used in cache keys and logs.
    fn fingerprint(&self) -> String;
}

/// Line-graph comparison: only the listed incidents are plotted, while any
/// incident of the event can anchor its timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentAllowlist {
    ids: BTreeSet<IncidentId>,
}

impl IncidentAllowlist {
    pub fn new(ids: impl IntoIterator<Item = IncidentId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl IncidentFilter for IncidentAllowlist {
    fn qualifies(&self, incident: &IncidentRecord) -> bool {
        self.ids.contains(&incident.id)
    }

    fn anchors(&self, _incident: &IncidentRecord) -> bool {
        true
    }

    fn fingerprint(&self) -> String {
        let ids: Vec<String> = self.ids.iter().map(|id| id.to_string()).collect();
        format!("allowlist:{}", ids.join(","))
    }
}

/// Graph comparison: every incident whose type is not flagged as test data.
/// Untyped incidents count as real incidents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonTestIncidents;

impl IncidentFilter for NonTestIncidents {
    fn qualifies(&self, incident: &IncidentRecord) -> bool {
        !incident.is_test()
    }

    fn fingerprint(&self) -> String {
        "non_test".to_string()
    }
}
