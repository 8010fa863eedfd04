use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lane::LaneId;
use super::sprint::{SprintId, Timeline};

pub type CardId = Uuid;

/// A planning item occupying one lane and a contiguous sprint range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// `None` keeps the card out of the grid, in the unassigned pool.
    pub lane_id: Option<LaneId>,
    pub start_sprint: SprintId,
    pub end_sprint: SprintId,
    /// Tie-break among cards sharing a cell; lower sorts first.
    #[serde(default)]
    pub order: i64,
    /// Tags, status and whatever else collaborators attach. Not used for
    /// placement.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Card {
    pub fn new(
        name: impl Into<String>,
        lane_id: Option<LaneId>,
        start_sprint: SprintId,
        end_sprint: SprintId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            lane_id,
            start_sprint,
            end_sprint,
            order: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Start and end sprint indices, if both sprints exist.
    pub fn indices(&self, timeline: &Timeline) -> Option<(usize, usize)> {
        Some((
            timeline.index_of(self.start_sprint)?,
            timeline.index_of(self.end_sprint)?,
        ))
    }

    /// Number of sprints covered.
    pub fn span(&self, timeline: &Timeline) -> Option<usize> {
        self.indices(timeline)
            .map(|(s, e)| e.saturating_sub(s) + 1)
    }
}
