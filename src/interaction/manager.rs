use egui::Pos2;
use tracing::debug;

use super::session::{Commit, Gesture, Outcome, Phase, Session, SpanEdge};
use crate::error::InteractionError;
use crate::geometry::{CardZone, GridGeometry, PressTarget};

pub const DEFAULT_DRAG_THRESHOLD: f32 = 5.0;

/// Owns at most one [`Session`] and advances it on pointer events.
///
/// Nothing here mutates the board: a release yields an [`Outcome`] and the
/// caller applies any [`Commit`] it carries.
#[derive(Debug, Clone)]
pub struct InteractionManager {
    session: Option<Session>,
    threshold: f32,
}

impl Default for InteractionManager {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD)
    }
}

impl InteractionManager {
    pub fn new(threshold: f32) -> Self {
        Self {
            session: None,
            threshold,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.session.as_ref().and_then(|s| s.gesture.as_ref())
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Start a pending session on whatever lies under `pos`. Returns
    /// `Ok(false)` when there is nothing to grab.
    pub fn pointer_down(&mut self, pos: Pos2, geo: &GridGeometry<'_>) -> Result<bool, InteractionError> {
        if self.session.is_some() {
            return Err(InteractionError::Busy);
        }
        match geo.press_target(pos) {
            Some(press) => {
                self.begin(press, pos)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start a pending session on an explicit target, e.g. a card pressed in
    /// the unassigned pool outside the grid.
    pub fn begin(&mut self, press: PressTarget, pos: Pos2) -> Result<(), InteractionError> {
        if self.session.is_some() {
            return Err(InteractionError::Busy);
        }
        debug!(?press, "session pending");
        self.session = Some(Session::new(press, pos));
        Ok(())
    }

    pub fn pointer_move(&mut self, pos: Pos2, geo: &GridGeometry<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.pointer = pos;
        if session.phase == Phase::Pending {
            if session.delta().length() <= self.threshold {
                return;
            }
            match promote(session, geo) {
                Some(gesture) => {
                    debug!(?gesture, "session active");
                    session.gesture = Some(gesture);
                    session.phase = Phase::Active;
                }
                None => {
                    // Dragging something that cannot be dragged.
                    self.session = None;
                    return;
                }
            }
        }
        update(session, geo);
    }

    pub fn pointer_up(&mut self, pos: Pos2, geo: &GridGeometry<'_>) -> Outcome {
        if self.session.is_some() {
            self.pointer_move(pos, geo);
        }
        let Some(session) = self.session.take() else {
            return Outcome::None;
        };
        let outcome = match session.phase {
            Phase::Pending => click(&session.press),
            Phase::Active => match session.gesture {
                Some(gesture) => commit(gesture, geo),
                None => Outcome::None,
            },
        };
        debug!(?outcome, "session finished");
        outcome
    }

    /// Drop the current session without committing anything (Escape, focus
    /// loss).
    pub fn cancel(&mut self) -> Outcome {
        match self.session.take() {
            Some(session) => {
                debug!(press = ?session.press, "session cancelled");
                Outcome::Cancelled
            }
            None => Outcome::None,
        }
    }
}

fn click(press: &PressTarget) -> Outcome {
    match *press {
        PressTarget::Card { card, .. } => Outcome::Clicked(card),
        PressTarget::EmptyCell(hit) => Outcome::CellClicked(hit),
        PressTarget::SprintHeader(sprint) => Outcome::SprintClicked(sprint),
        PressTarget::LaneHeader(lane) => Outcome::LaneClicked(lane),
        _ => Outcome::None,
    }
}

fn promote(session: &Session, geo: &GridGeometry<'_>) -> Option<Gesture> {
    let board = geo.board();
    let timeline = &board.timeline;
    match session.press {
        PressTarget::Card { card, zone } => {
            let c = board.cards.get(card)?;
            let indices = c.indices(timeline);
            match (zone, indices, c.lane_id) {
                (CardZone::LeftEdge | CardZone::RightEdge, Some((start_idx, end_idx)), Some(_)) => {
                    let edge = if zone == CardZone::LeftEdge {
                        SpanEdge::Left
                    } else {
                        SpanEdge::Right
                    };
                    let grabbed = if edge == SpanEdge::Left { start_idx } else { end_idx };
                    Some(Gesture::ResizeSpan {
                        card,
                        edge,
                        start_idx,
                        end_idx,
                        grab_width: geo.sprint_width(grabbed),
                        preview: (start_idx, end_idx),
                    })
                }
                (_, Some((start_idx, end_idx)), Some(lane)) => {
                    let d = session.delta();
                    let members = board.cards.cell(lane, start_idx, timeline).ordered_ids();
                    let vertical = d.y.abs() > d.x.abs();
                    if vertical && start_idx == end_idx && members.len() > 1 {
                        let from = members.iter().position(|m| *m == card)?;
                        Some(Gesture::ReorderInCell {
                            card,
                            from,
                            to: from,
                            members,
                        })
                    } else {
                        Some(Gesture::Relocate { card, target: None })
                    }
                }
                _ => Some(Gesture::Relocate { card, target: None }),
            }
        }
        PressTarget::SprintWidthEdge(sprint) => {
            let idx = timeline.index_of(sprint)?;
            let initial = geo.sprint_width(idx);
            Some(Gesture::ResizeSprintWidth {
                sprint,
                initial,
                width: initial,
            })
        }
        PressTarget::SprintDurationEdge(sprint) => Some(Gesture::ResizeSprintDuration {
            sprint,
            day_delta: 0,
        }),
        PressTarget::LaneHeightEdge(lane) => {
            let initial = geo.lane_height(lane);
            Some(Gesture::ResizeLaneHeight {
                lane,
                initial,
                height: initial,
            })
        }
        PressTarget::LaneHeaderEdge => {
            let initial = geo.lane_header_width();
            Some(Gesture::ResizeLaneHeaderWidth {
                initial,
                width: initial,
            })
        }
        PressTarget::LaneGrip(lane) => {
            let order = board.lanes.ids();
            Some(Gesture::ReorderLanes {
                lane,
                original: order.clone(),
                order,
            })
        }
        PressTarget::SprintHeader(_) | PressTarget::LaneHeader(_) | PressTarget::EmptyCell(_) => None,
    }
}

fn update(session: &mut Session, geo: &GridGeometry<'_>) {
    let d = session.delta();
    let pointer = session.pointer;
    let m = geo.metrics();
    let last = geo.board().timeline.last_index().unwrap_or(0);
    let Some(gesture) = session.gesture.as_mut() else {
        return;
    };
    match gesture {
        Gesture::Relocate { target, .. } => *target = geo.hit_test(pointer),
        Gesture::ResizeSpan {
            edge,
            start_idx,
            end_idx,
            grab_width,
            preview,
            ..
        } => {
            let offset = (d.x / grab_width.max(1.0)).round() as i64;
            *preview = match edge {
                SpanEdge::Left => {
                    let start = (*start_idx as i64 + offset).clamp(0, *end_idx as i64);
                    (start as usize, *end_idx)
                }
                SpanEdge::Right => {
                    let end = (*end_idx as i64 + offset).clamp(*start_idx as i64, last as i64);
                    (*start_idx, end as usize)
                }
            };
        }
        Gesture::ReorderInCell {
            from, to, members, ..
        } => {
            let pitch = m.card_height + m.card_gap;
            let shift = (d.y / pitch).round() as i64;
            let target = (*from as i64 + shift).clamp(0, members.len() as i64 - 1) as usize;
            if target != *to {
                let moved = members.remove(*to);
                members.insert(target, moved);
                *to = target;
            }
        }
        Gesture::ResizeSprintWidth { initial, width, .. } => {
            *width = (*initial + d.x).max(m.min_sprint_width);
        }
        Gesture::ResizeLaneHeight { initial, height, .. } => {
            *height = (*initial + d.y).max(m.min_lane_height);
        }
        Gesture::ResizeLaneHeaderWidth { initial, width } => {
            *width = (*initial + d.x).max(m.min_lane_header_width);
        }
        Gesture::ReorderLanes { lane, order, .. } => {
            let Some(slot) = geo.lane_slot_at(pointer.y, order) else {
                return;
            };
            if let Some(current) = order.iter().position(|l| l == lane) {
                if current != slot {
                    let moved = order.remove(current);
                    order.insert(slot, moved);
                }
            }
        }
        Gesture::ResizeSprintDuration { day_delta, .. } => {
            *day_delta = (d.x / m.sprint_width.max(1.0)).round() as i64;
        }
    }
}

fn commit(gesture: Gesture, geo: &GridGeometry<'_>) -> Outcome {
    let board = geo.board();
    let timeline = &board.timeline;
    let commit = match gesture {
        Gesture::Relocate { card, target } => {
            let Some(hit) = target else {
                return Outcome::Cancelled;
            };
            let Some(c) = board.cards.get(card) else {
                return Outcome::Cancelled;
            };
            let Some(last) = timeline.last_index() else {
                return Outcome::Cancelled;
            };
            let span = c.indices(timeline).map_or(0, |(s, e)| e.saturating_sub(s));
            let start = hit.sprint_idx;
            let end = (start + span).min(last);
            let (Some(start_sprint), Some(end_sprint)) = (timeline.id_at(start), timeline.id_at(end))
            else {
                return Outcome::Cancelled;
            };
            if c.lane_id == Some(hit.lane_id) && c.start_sprint == start_sprint && c.end_sprint == end_sprint {
                return Outcome::None;
            }
            Commit::MoveCard {
                card,
                lane: hit.lane_id,
                start_sprint,
                end_sprint,
            }
        }
        Gesture::ResizeSpan {
            card,
            start_idx,
            end_idx,
            preview,
            ..
        } => {
            if preview == (start_idx, end_idx) {
                return Outcome::None;
            }
            let (Some(start_sprint), Some(end_sprint)) = (timeline.id_at(preview.0), timeline.id_at(preview.1))
            else {
                return Outcome::Cancelled;
            };
            Commit::ResizeSpan {
                card,
                start_sprint,
                end_sprint,
            }
        }
        Gesture::ReorderInCell { card, from, to, .. } => {
            if from == to {
                return Outcome::None;
            }
            Commit::ReorderCard { card, index: to }
        }
        Gesture::ResizeSprintWidth {
            sprint,
            initial,
            width,
        } => {
            if width == initial {
                return Outcome::None;
            }
            Commit::SprintWidth { sprint, width }
        }
        Gesture::ResizeLaneHeight {
            lane,
            initial,
            height,
        } => {
            if height == initial {
                return Outcome::None;
            }
            Commit::LaneHeight { lane, height }
        }
        Gesture::ResizeLaneHeaderWidth { initial, width } => {
            if width == initial {
                return Outcome::None;
            }
            Commit::LaneHeaderWidth(width)
        }
        Gesture::ReorderLanes { original, order, .. } => {
            if original == order {
                return Outcome::None;
            }
            Commit::ReorderLanes(order)
        }
        Gesture::ResizeSprintDuration { sprint, day_delta } => {
            if day_delta == 0 {
                return Outcome::None;
            }
            Commit::ResizeSprintDuration {
                sprint,
                delta_days: day_delta,
            }
        }
    };
    Outcome::Commit(commit)
}
