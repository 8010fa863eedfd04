use egui::Pos2;

use crate::geometry::{GridHit, PressTarget};
use crate::model::{CardId, LaneId, SprintId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pointer is down but has not moved past the drag threshold.
    Pending,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanEdge {
    Left,
    Right,
}

/// A promoted drag and its current candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Relocate {
        card: CardId,
        target: Option<GridHit>,
    },
    ResizeSpan {
        card: CardId,
        edge: SpanEdge,
        /// Indices at press time.
        start_idx: usize,
        end_idx: usize,
        /// Width of the sprint under the grabbed edge.
        grab_width: f32,
        preview: (usize, usize),
    },
    ReorderInCell {
        card: CardId,
        from: usize,
        to: usize,
        /// Cell members, spliced live as `to` changes.
        members: Vec<CardId>,
    },
    ResizeSprintWidth {
        sprint: SprintId,
        initial: f32,
        width: f32,
    },
    ResizeLaneHeight {
        lane: LaneId,
        initial: f32,
        height: f32,
    },
    ResizeLaneHeaderWidth {
        initial: f32,
        width: f32,
    },
    ReorderLanes {
        lane: LaneId,
        original: Vec<LaneId>,
        /// Lane order, spliced live as the pointer crosses lanes.
        order: Vec<LaneId>,
    },
    ResizeSprintDuration {
        sprint: SprintId,
        day_delta: i64,
    },
}

/// One pointer-driven interaction, from press to release.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub press: PressTarget,
    pub phase: Phase,
    pub origin: Pos2,
    pub pointer: Pos2,
    /// Set once the session is promoted to a drag.
    pub gesture: Option<Gesture>,
}

impl Session {
    pub(crate) fn new(press: PressTarget, origin: Pos2) -> Self {
        Self {
            press,
            phase: Phase::Pending,
            origin,
            pointer: origin,
            gesture: None,
        }
    }

    pub fn delta(&self) -> egui::Vec2 {
        self.pointer - self.origin
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }
}

/// A model or view change produced by a finished drag.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    MoveCard {
        card: CardId,
        lane: LaneId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    },
    ResizeSpan {
        card: CardId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    },
    ReorderCard {
        card: CardId,
        index: usize,
    },
    SprintWidth {
        sprint: SprintId,
        width: f32,
    },
    LaneHeight {
        lane: LaneId,
        height: f32,
    },
    LaneHeaderWidth(f32),
    ReorderLanes(Vec<LaneId>),
    ResizeSprintDuration {
        sprint: SprintId,
        delta_days: i64,
    },
}

impl Commit {
    /// Size edits only touch the viewer's overrides, never the roadmap.
    pub fn is_view_only(&self) -> bool {
        matches!(
            self,
            Commit::SprintWidth { .. } | Commit::LaneHeight { .. } | Commit::LaneHeaderWidth(_)
        )
    }
}

/// What a release (or cancellation) amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to do.
    None,
    Clicked(CardId),
    CellClicked(GridHit),
    SprintClicked(SprintId),
    LaneClicked(LaneId),
    Commit(Commit),
    /// The drag ended without a valid target, or was cancelled.
    Cancelled,
}
