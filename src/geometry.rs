//! Pure translation between grid coordinates and screen rectangles.
//!
//! Every rectangle is derived from cumulative sprint widths and lane heights
//! plus the header offsets, so the renderer, the interaction manager and
//! collaborators such as comment anchoring all read the same layout without
//! measuring anything on screen.

use std::collections::HashMap;

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::model::{Board, CardId, Cell, LaneId, SprintId};

/// Nominal sizes of the grid, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMetrics {
    pub sprint_width: f32,
    pub lane_height: f32,
    pub lane_header_width: f32,
    /// Sprint header; the upper half holds the width grips, the lower half
    /// the duration grips.
    pub header_height: f32,
    pub card_height: f32,
    pub card_gap: f32,
    pub cell_padding: f32,
    /// Vertical step between concurrent multi-sprint cards of one cell.
    pub multi_span_offset: f32,
    pub min_sprint_width: f32,
    pub min_lane_height: f32,
    pub min_lane_header_width: f32,
    /// Half-width of the grab zone around any draggable edge.
    pub edge_grip: f32,
    /// Width of the drag grip at the left of each lane header.
    pub lane_grip_width: f32,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            sprint_width: 180.0,
            lane_height: 96.0,
            lane_header_width: 160.0,
            header_height: 48.0,
            card_height: 26.0,
            card_gap: 4.0,
            cell_padding: 4.0,
            multi_span_offset: 30.0,
            min_sprint_width: 60.0,
            min_lane_height: 40.0,
            min_lane_header_width: 80.0,
            edge_grip: 5.0,
            lane_grip_width: 16.0,
        }
    }
}

/// Viewer-chosen sizes. Not part of the roadmap itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeOverrides {
    pub sprint_widths: HashMap<SprintId, f32>,
    pub lane_heights: HashMap<LaneId, f32>,
    pub lane_header_width: Option<f32>,
}

/// A grid coordinate: a lane and a sprint index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridHit {
    pub lane_id: LaneId,
    pub sprint_idx: usize,
}

/// Part of a card under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardZone {
    Body,
    LeftEdge,
    RightEdge,
}

/// Whatever a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
    Card { card: CardId, zone: CardZone },
    /// Right edge of a sprint header, upper half.
    SprintWidthEdge(SprintId),
    /// Right edge of a sprint header, lower half.
    SprintDurationEdge(SprintId),
    SprintHeader(SprintId),
    LaneHeightEdge(LaneId),
    LaneGrip(LaneId),
    LaneHeader(LaneId),
    LaneHeaderEdge,
    EmptyCell(GridHit),
}

/// Position inside a cell as fractions of its width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellAnchor {
    pub x_pct: f32,
    pub y_pct: f32,
}

/// Read-only layout over a board. Cheap to build; build one per frame.
pub struct GridGeometry<'a> {
    board: &'a Board,
    overrides: &'a SizeOverrides,
    metrics: &'a GridMetrics,
    origin: Pos2,
}

impl<'a> GridGeometry<'a> {
    pub fn new(
        board: &'a Board,
        overrides: &'a SizeOverrides,
        metrics: &'a GridMetrics,
        origin: Pos2,
    ) -> Self {
        Self {
            board,
            overrides,
            metrics,
            origin,
        }
    }

    pub fn board(&self) -> &'a Board {
        self.board
    }

    pub fn metrics(&self) -> &'a GridMetrics {
        self.metrics
    }

    pub fn origin(&self) -> Pos2 {
        self.origin
    }

    pub fn lane_header_width(&self) -> f32 {
        self.overrides
            .lane_header_width
            .unwrap_or(self.metrics.lane_header_width)
    }

    fn grid_left(&self) -> f32 {
        self.origin.x + self.lane_header_width()
    }

    fn grid_top(&self) -> f32 {
        self.origin.y + self.metrics.header_height
    }

    pub fn sprint_width(&self, idx: usize) -> f32 {
        self.board
            .timeline
            .id_at(idx)
            .and_then(|id| self.overrides.sprint_widths.get(&id).copied())
            .unwrap_or(self.metrics.sprint_width)
    }

    fn sprint_x(&self, idx: usize) -> f32 {
        self.grid_left() + (0..idx).map(|i| self.sprint_width(i)).sum::<f32>()
    }

    pub fn lane_height(&self, lane_id: LaneId) -> f32 {
        self.fixed_lane_height(lane_id).unwrap_or_else(|| {
            self.fitted_lane_height(&self.board.cards.cells_for(lane_id, &self.board.timeline))
        })
    }

    fn fixed_lane_height(&self, lane_id: LaneId) -> Option<f32> {
        self.overrides
            .lane_heights
            .get(&lane_id)
            .copied()
            .or_else(|| self.board.lanes.find(lane_id).and_then(|l| l.height))
    }

    /// Default height, grown to fit the tallest of `cells`.
    fn fitted_lane_height(&self, cells: &[Cell<'_>]) -> f32 {
        let m = self.metrics;
        let content = cells
            .iter()
            .map(|cell| {
                2.0 * m.cell_padding
                    + cell.multi.len() as f32 * m.multi_span_offset
                    + cell.single.len() as f32 * (m.card_height + m.card_gap)
            })
            .fold(0.0, f32::max);
        m.lane_height.max(content)
    }

    fn lane_top(&self, lane_id: LaneId) -> Option<f32> {
        let mut y = self.grid_top();
        for lane in self.board.lanes.lanes() {
            if lane.id == lane_id {
                return Some(y);
            }
            y += self.lane_height(lane.id);
        }
        None
    }

    pub fn grid_width(&self) -> f32 {
        (0..self.board.timeline.len()).map(|i| self.sprint_width(i)).sum()
    }

    pub fn grid_height(&self) -> f32 {
        self.board
            .lanes
            .lanes()
            .iter()
            .map(|l| self.lane_height(l.id))
            .sum()
    }

    /// Size of everything, headers included.
    pub fn total_size(&self) -> Vec2 {
        Vec2::new(
            self.lane_header_width() + self.grid_width(),
            self.metrics.header_height + self.grid_height(),
        )
    }

    /// The sprint's full column, header included.
    pub fn sprint_rect(&self, idx: usize) -> Option<Rect> {
        self.board.timeline.get(idx)?;
        Some(Rect::from_min_size(
            Pos2::new(self.sprint_x(idx), self.origin.y),
            Vec2::new(
                self.sprint_width(idx),
                self.metrics.header_height + self.grid_height(),
            ),
        ))
    }

    pub fn sprint_header_rect(&self, idx: usize) -> Option<Rect> {
        self.sprint_rect(idx).map(|r| {
            Rect::from_min_size(r.min, Vec2::new(r.width(), self.metrics.header_height))
        })
    }

    /// The lane's full row, header included.
    pub fn lane_rect(&self, lane_id: LaneId) -> Option<Rect> {
        let top = self.lane_top(lane_id)?;
        Some(Rect::from_min_size(
            Pos2::new(self.origin.x, top),
            Vec2::new(
                self.lane_header_width() + self.grid_width(),
                self.lane_height(lane_id),
            ),
        ))
    }

    pub fn lane_header_rect(&self, lane_id: LaneId) -> Option<Rect> {
        self.lane_rect(lane_id).map(|r| {
            Rect::from_min_size(r.min, Vec2::new(self.lane_header_width(), r.height()))
        })
    }

    pub fn cell_rect(&self, lane_id: LaneId, sprint_idx: usize) -> Option<Rect> {
        self.board.timeline.get(sprint_idx)?;
        let top = self.lane_top(lane_id)?;
        Some(Rect::from_min_size(
            Pos2::new(self.sprint_x(sprint_idx), top),
            Vec2::new(self.sprint_width(sprint_idx), self.lane_height(lane_id)),
        ))
    }

    /// The grid cell containing `pos`, if any. Cells are half-open on their
    /// right and bottom edges.
    pub fn hit_test(&self, pos: Pos2) -> Option<GridHit> {
        let sprint_idx = self.sprint_index_at(pos.x)?;
        let lane_id = self.lane_at(pos.y)?;
        Some(GridHit {
            lane_id,
            sprint_idx,
        })
    }

    fn sprint_index_at(&self, x: f32) -> Option<usize> {
        let mut left = self.grid_left();
        if x < left {
            return None;
        }
        for idx in 0..self.board.timeline.len() {
            let right = left + self.sprint_width(idx);
            if x < right {
                return Some(idx);
            }
            left = right;
        }
        None
    }

    fn lane_at(&self, y: f32) -> Option<LaneId> {
        let mut top = self.grid_top();
        if y < top {
            return None;
        }
        for lane in self.board.lanes.lanes() {
            let bottom = top + self.lane_height(lane.id);
            if y < bottom {
                return Some(lane.id);
            }
            top = bottom;
        }
        None
    }

    /// Slot index under `y` when the lanes are laid out in `order`, clamped
    /// to the first and last slot.
    pub fn lane_slot_at(&self, y: f32, order: &[LaneId]) -> Option<usize> {
        let last = order.len().checked_sub(1)?;
        let mut top = self.grid_top();
        for (slot, lane) in order.iter().enumerate() {
            let bottom = top + self.lane_height(*lane);
            if y < bottom {
                return Some(slot);
            }
            top = bottom;
        }
        Some(last)
    }

    /// Where a card is drawn. A one-sprint card takes its stacking slot in
    /// the owning cell below the cell's multi-sprint band; a multi-sprint
    /// card stretches across its sprints at a fixed offset per stack
    /// position.
    pub fn card_rect(&self, card_id: CardId) -> Option<Rect> {
        let card = self.board.cards.get(card_id)?;
        let lane_id = card.lane_id?;
        let (start, end) = card.indices(&self.board.timeline)?;
        let cell_rect = self.cell_rect(lane_id, start)?;
        let cell = self.board.cards.cell(lane_id, start, &self.board.timeline);
        let right = self.sprint_x(end) + self.sprint_width(end);
        self.slot_rect(&cell, card_id, cell_rect, right)
    }

    /// Every placed card's rectangle, laid out in one pass over the lanes.
    pub fn card_rects(&self) -> HashMap<CardId, Rect> {
        let timeline = &self.board.timeline;
        let mut edges = Vec::with_capacity(timeline.len() + 1);
        let mut x = self.grid_left();
        edges.push(x);
        for idx in 0..timeline.len() {
            x += self.sprint_width(idx);
            edges.push(x);
        }

        let mut rects = HashMap::new();
        let mut top = self.grid_top();
        for lane in self.board.lanes.lanes() {
            let cells = self.board.cards.cells_for(lane.id, timeline);
            let height = self
                .fixed_lane_height(lane.id)
                .unwrap_or_else(|| self.fitted_lane_height(&cells));
            for cell in &cells {
                let (Some(&left), Some(&right)) = (edges.get(cell.sprint_idx), edges.get(cell.sprint_idx + 1))
                else {
                    continue;
                };
                let cell_rect = Rect::from_min_max(Pos2::new(left, top), Pos2::new(right, top + height));
                for card in cell.multi.iter().chain(cell.single.iter()) {
                    let Some(&right) = card.indices(timeline).and_then(|(_, end)| edges.get(end + 1)) else {
                        continue;
                    };
                    if let Some(rect) = self.slot_rect(cell, card.id, cell_rect, right) {
                        rects.insert(card.id, rect);
                    }
                }
            }
            top += height;
        }
        rects
    }

    /// A card's slot in `cell`; `right` is the right edge of its last sprint.
    fn slot_rect(&self, cell: &Cell<'_>, card_id: CardId, cell_rect: Rect, right: f32) -> Option<Rect> {
        let m = self.metrics;
        let top = cell_rect.top() + m.cell_padding;
        let y = match cell.multi_position(card_id) {
            Some(pos) => top + pos as f32 * m.multi_span_offset,
            None => {
                let pos = cell.single_position(card_id)?;
                top + cell.multi.len() as f32 * m.multi_span_offset + pos as f32 * (m.card_height + m.card_gap)
            }
        };
        Some(Rect::from_min_max(
            Pos2::new(cell_rect.left() + m.cell_padding, y),
            Pos2::new(right - m.cell_padding, y + m.card_height),
        ))
    }

    /// Topmost card under `pos` and which part of it was hit.
    pub fn card_at(&self, pos: Pos2) -> Option<(CardId, CardZone)> {
        let rects = self.card_rects();
        let (id, rect) = self
            .board
            .cards
            .cards()
            .iter()
            .filter_map(|c| Some((c.id, *rects.get(&c.id)?)))
            .filter(|(_, r)| r.contains(pos))
            .last()?;
        let grip = self.metrics.edge_grip;
        let zone = if rect.width() <= 4.0 * grip {
            CardZone::Body
        } else if pos.x <= rect.left() + grip {
            CardZone::LeftEdge
        } else if pos.x >= rect.right() - grip {
            CardZone::RightEdge
        } else {
            CardZone::Body
        };
        Some((id, zone))
    }

    /// Resolve a pointer press to the thing it should grab.
    pub fn press_target(&self, pos: Pos2) -> Option<PressTarget> {
        let grip = self.metrics.edge_grip;
        if pos.x < self.origin.x || pos.y < self.origin.y {
            return None;
        }

        if (pos.x - self.grid_left()).abs() <= grip && pos.y < self.grid_top() + self.grid_height() {
            return Some(PressTarget::LaneHeaderEdge);
        }

        if pos.y < self.grid_top() {
            let mut right = self.grid_left();
            for (idx, sprint) in self.board.timeline.sprints().iter().enumerate() {
                right += self.sprint_width(idx);
                if (pos.x - right).abs() <= grip {
                    let upper = pos.y < self.origin.y + self.metrics.header_height / 2.0;
                    return Some(if upper {
                        PressTarget::SprintWidthEdge(sprint.id)
                    } else {
                        PressTarget::SprintDurationEdge(sprint.id)
                    });
                }
            }
            return self
                .sprint_index_at(pos.x)
                .and_then(|i| self.board.timeline.id_at(i))
                .map(PressTarget::SprintHeader);
        }

        if pos.x < self.grid_left() {
            let lane = self.lane_at(pos.y - grip)?;
            let rect = self.lane_header_rect(lane)?;
            if (pos.y - rect.bottom()).abs() <= grip {
                return Some(PressTarget::LaneHeightEdge(lane));
            }
            let lane = self.lane_at(pos.y)?;
            if pos.x < self.origin.x + self.metrics.lane_grip_width {
                return Some(PressTarget::LaneGrip(lane));
            }
            return Some(PressTarget::LaneHeader(lane));
        }

        if let Some((card, zone)) = self.card_at(pos) {
            return Some(PressTarget::Card { card, zone });
        }
        self.hit_test(pos).map(PressTarget::EmptyCell)
    }

    /// Screen point for an anchor stored relative to a cell.
    pub fn anchor_to_point(&self, lane_id: LaneId, sprint_idx: usize, anchor: CellAnchor) -> Option<Pos2> {
        let r = self.cell_rect(lane_id, sprint_idx)?;
        Some(Pos2::new(
            r.left() + r.width() * anchor.x_pct.clamp(0.0, 1.0),
            r.top() + r.height() * anchor.y_pct.clamp(0.0, 1.0),
        ))
    }

    /// Cell and relative anchor for a screen point.
    pub fn point_to_anchor(&self, pos: Pos2) -> Option<(GridHit, CellAnchor)> {
        let hit = self.hit_test(pos)?;
        let r = self.cell_rect(hit.lane_id, hit.sprint_idx)?;
        Some((
            hit,
            CellAnchor {
                x_pct: (pos.x - r.left()) / r.width(),
                y_pct: (pos.y - r.top()) / r.height(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, Timeline};
    use chrono::NaiveDate;
    use egui::Color32;

    struct Fixture {
        board: Board,
        overrides: SizeOverrides,
        metrics: GridMetrics,
        lanes: Vec<LaneId>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut board = Board::new("geo");
            board.timeline =
                Timeline::with_cadence(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 3, 14);
            let lanes = vec![
                board.lanes.append("A", Color32::RED),
                board.lanes.append("B", Color32::BLUE),
            ];
            Self {
                board,
                overrides: SizeOverrides::default(),
                metrics: GridMetrics::default(),
                lanes,
            }
        }

        fn geo(&self) -> GridGeometry<'_> {
            GridGeometry::new(&self.board, &self.overrides, &self.metrics, Pos2::ZERO)
        }

        fn sprint(&self, idx: usize) -> SprintId {
            self.board.timeline.id_at(idx).unwrap()
        }
    }

    #[test]
    fn rects_accumulate_overrides() {
        let mut f = Fixture::new();
        f.overrides.sprint_widths.insert(f.sprint(0), 100.0);
        f.overrides.lane_heights.insert(f.lanes[0], 50.0);
        let g = f.geo();
        let cell = g.cell_rect(f.lanes[1], 1).unwrap();
        assert_eq!(cell.left(), 160.0 + 100.0);
        assert_eq!(cell.top(), 48.0 + 50.0);
        assert_eq!(cell.width(), 180.0);
        assert_eq!(cell.height(), 96.0);
    }

    #[test]
    fn hit_test_inverts_cell_rect() {
        let f = Fixture::new();
        let g = f.geo();
        for lane in &f.lanes {
            for idx in 0..3 {
                let r = g.cell_rect(*lane, idx).unwrap();
                let hit = g.hit_test(r.center()).unwrap();
                assert_eq!(hit, GridHit { lane_id: *lane, sprint_idx: idx });
                assert_eq!(g.hit_test(r.min).unwrap(), hit);
            }
        }
        assert_eq!(g.hit_test(Pos2::new(10.0, 100.0)), None);
        assert_eq!(g.hit_test(Pos2::new(200.0, 10.0)), None);
        assert_eq!(g.hit_test(Pos2::new(160.0 + 3.0 * 180.0, 100.0)), None);
    }

    #[test]
    fn multi_span_cards_stack_at_fixed_offset() {
        let mut f = Fixture::new();
        let (s0, s2) = (f.sprint(0), f.sprint(2));
        let a = f.board.add_card(Card::new("a", Some(f.lanes[0]), s0, s2));
        let b = f.board.add_card(Card::new("b", Some(f.lanes[0]), s0, f.sprint(1)));
        let c = f.board.add_card(Card::new("c", Some(f.lanes[0]), s0, s0));
        let g = f.geo();

        let ra = g.card_rect(a).unwrap();
        let rb = g.card_rect(b).unwrap();
        let rc = g.card_rect(c).unwrap();
        assert_eq!(rb.top() - ra.top(), 30.0);
        assert_eq!(ra.right(), 160.0 + 3.0 * 180.0 - 4.0);
        assert_eq!(rb.right(), 160.0 + 2.0 * 180.0 - 4.0);
        assert_eq!(rc.top(), ra.top() + 2.0 * 30.0);
        assert_eq!(rc.width(), 180.0 - 8.0);
    }

    #[test]
    fn one_pass_layout_matches_single_lookups() {
        let mut f = Fixture::new();
        let (s0, s1, s2) = (f.sprint(0), f.sprint(1), f.sprint(2));
        let (a, b) = (f.lanes[0], f.lanes[1]);
        let ids = vec![
            f.board.add_card(Card::new("wide", Some(a), s0, s2)),
            f.board.add_card(Card::new("pair", Some(a), s0, s1)),
            f.board.add_card(Card::new("one", Some(a), s0, s0)),
            f.board.add_card(Card::new("two", Some(a), s0, s0)),
            f.board.add_card(Card::new("late", Some(b), s2, s2)),
        ];
        f.board.add_card(Card::new("pooled", None, s1, s1));
        f.overrides.sprint_widths.insert(s1, 120.0);
        f.overrides.lane_heights.insert(b, 70.0);

        let g = f.geo();
        let all = g.card_rects();
        assert_eq!(all.len(), ids.len());
        for id in ids {
            assert_eq!(all.get(&id).copied(), g.card_rect(id));
        }
    }

    #[test]
    fn lane_grows_with_content() {
        let mut f = Fixture::new();
        let s0 = f.sprint(0);
        for i in 0..5 {
            f.board.add_card(Card::new(format!("c{i}"), Some(f.lanes[0]), s0, s0));
        }
        let g = f.geo();
        assert_eq!(g.lane_height(f.lanes[0]), 8.0 + 5.0 * 30.0);
        assert_eq!(g.lane_height(f.lanes[1]), 96.0);
    }

    #[test]
    fn press_targets_edges_and_cards() {
        let mut f = Fixture::new();
        let s0 = f.sprint(0);
        let card = f.board.add_card(Card::new("a", Some(f.lanes[0]), s0, s0));
        let g = f.geo();
        let right0 = 160.0 + 180.0;

        assert_eq!(
            g.press_target(Pos2::new(right0 + 1.0, 10.0)),
            Some(PressTarget::SprintWidthEdge(s0))
        );
        assert_eq!(
            g.press_target(Pos2::new(right0 - 2.0, 40.0)),
            Some(PressTarget::SprintDurationEdge(s0))
        );
        assert_eq!(g.press_target(Pos2::new(160.0, 90.0)), Some(PressTarget::LaneHeaderEdge));
        assert_eq!(
            g.press_target(Pos2::new(80.0, 48.0 + 96.0 - 1.0)),
            Some(PressTarget::LaneHeightEdge(f.lanes[0]))
        );
        assert_eq!(g.press_target(Pos2::new(6.0, 90.0)), Some(PressTarget::LaneGrip(f.lanes[0])));

        let r = g.card_rect(card).unwrap();
        assert_eq!(
            g.press_target(r.center()),
            Some(PressTarget::Card { card, zone: CardZone::Body })
        );
        assert_eq!(
            g.press_target(Pos2::new(r.left() + 3.0, r.center().y)),
            Some(PressTarget::Card { card, zone: CardZone::LeftEdge })
        );
        assert!(matches!(
            g.press_target(Pos2::new(r.center().x, r.bottom() + 20.0)),
            Some(PressTarget::EmptyCell(_))
        ));
    }

    #[test]
    fn anchors_roundtrip_through_cells() {
        let f = Fixture::new();
        let g = f.geo();
        let anchor = CellAnchor { x_pct: 0.25, y_pct: 0.5 };
        let p = g.anchor_to_point(f.lanes[1], 2, anchor).unwrap();
        let (hit, back) = g.point_to_anchor(p).unwrap();
        assert_eq!(hit, GridHit { lane_id: f.lanes[1], sprint_idx: 2 });
        assert!((back.x_pct - 0.25).abs() < 1e-5);
        assert!((back.y_pct - 0.5).abs() < 1e-5);
    }
}
