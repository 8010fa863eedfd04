//! The engine facade the desktop shell talks to.
//!
//! A [`Planner`] owns the board and everything that edits it: pointer input
//! goes through the [`InteractionManager`], finished gestures and direct
//! edits mutate the board at once, and each mutation is sent to the store
//! through a [`SyncClient`] with a rollback snapshot kept in the [`Ledger`].

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::NaiveDate;
use egui::{Color32, Pos2, Rect};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{InteractionError, ModelError, SyncError};
use crate::geometry::{CardZone, GridGeometry, GridMetrics, PressTarget, SizeOverrides};
use crate::interaction::{Commit, Gesture, InteractionManager, Outcome, Session};
use crate::model::{Board, Card, CardId, DateField, LaneId, SprintId};
use crate::sync::{Completion, EntityKey, Ledger, MutationIntent, Snapshot, SyncClient, SyncResponse};

/// What became of a mutation sent to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Confirmed {
        seq: u64,
        label: &'static str,
    },
    /// The store's data was older than local edits and was dropped.
    Stale {
        seq: u64,
        label: &'static str,
    },
    /// The store refused; the local change has been rolled back.
    Failed {
        seq: u64,
        label: &'static str,
        error: SyncError,
    },
}

pub struct Planner {
    board: Board,
    overrides: SizeOverrides,
    metrics: GridMetrics,
    origin: Pos2,
    default_sprint_days: i64,
    interaction: InteractionManager,
    sync: Option<SyncClient>,
    ledger: Ledger,
    next_seq: u64,
    /// Events raised outside `poll_sync`, e.g. a submit to a dead worker.
    events: Vec<SyncEvent>,
}

impl Planner {
    pub fn new(board: Board, config: &Config) -> Self {
        Self {
            board,
            overrides: SizeOverrides::default(),
            metrics: config.metrics.clone(),
            origin: Pos2::ZERO,
            default_sprint_days: config.default_sprint_days.max(1),
            interaction: InteractionManager::new(config.drag_threshold),
            sync: None,
            ledger: Ledger::default(),
            next_seq: 1,
            events: Vec::new(),
        }
    }

    /// Route every later mutation to `client`.
    pub fn attach(&mut self, client: SyncClient) {
        self.sync = Some(client);
    }

    /// Swap in another board, dropping any gesture and unconfirmed
    /// mutations of the previous one. The caller attaches a store for it.
    pub fn replace_board(&mut self, board: Board) {
        self.interaction.cancel();
        self.sync = None;
        self.ledger = Ledger::default();
        self.events.clear();
        self.board = board;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn overrides(&self) -> &SizeOverrides {
        &self.overrides
    }

    pub fn set_overrides(&mut self, overrides: SizeOverrides) {
        self.overrides = overrides;
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    /// Screen position of the grid's top-left corner.
    pub fn set_origin(&mut self, origin: Pos2) {
        self.origin = origin;
    }

    /// The board as it should be drawn. While lanes or the cards of a cell
    /// are being reordered, the drag's live order is applied to a copy.
    pub fn preview_board(&self) -> Cow<'_, Board> {
        match self.interaction.gesture() {
            Some(Gesture::ReorderLanes { original, order, .. }) if original != order => {
                let mut board = self.board.clone();
                if let Err(error) = board.lanes.reorder(order) {
                    debug!(%error, "lane order preview is out of date");
                    return Cow::Borrowed(&self.board);
                }
                Cow::Owned(board)
            }
            Some(Gesture::ReorderInCell { from, to, members, .. }) if from != to => {
                let mut board = self.board.clone();
                for (order, id) in members.iter().enumerate() {
                    if let Some(card) = board.cards.get_mut(*id) {
                        card.order = order as i64;
                    }
                }
                Cow::Owned(board)
            }
            _ => Cow::Borrowed(&self.board),
        }
    }

    pub fn geometry(&self) -> GridGeometry<'_> {
        GridGeometry::new(&self.board, &self.overrides, &self.metrics, self.origin)
    }

    pub fn session(&self) -> Option<&Session> {
        self.interaction.session()
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.interaction.gesture()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.pending_count()
    }

    // --- Pointer input -------------------------------------------------

    pub fn pointer_down(&mut self, pos: Pos2) -> Result<bool, InteractionError> {
        let geo = GridGeometry::new(&self.board, &self.overrides, &self.metrics, self.origin);
        self.interaction.pointer_down(pos, &geo)
    }

    /// Grab a card from the unassigned pool, which lies outside the grid.
    pub fn begin_pool_drag(&mut self, card: CardId, pos: Pos2) -> Result<(), InteractionError> {
        let press = PressTarget::Card {
            card,
            zone: CardZone::Body,
        };
        self.interaction.begin(press, pos)
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        let geo = GridGeometry::new(&self.board, &self.overrides, &self.metrics, self.origin);
        self.interaction.pointer_move(pos, &geo);
    }

    /// Finish the current session and apply whatever it committed.
    pub fn pointer_up(&mut self, pos: Pos2) -> Result<Outcome, ModelError> {
        let geo = GridGeometry::new(&self.board, &self.overrides, &self.metrics, self.origin);
        let outcome = self.interaction.pointer_up(pos, &geo);
        if let Outcome::Commit(commit) = &outcome {
            self.apply_commit(commit.clone())?;
        }
        Ok(outcome)
    }

    /// Drop the current session (Escape, focus loss).
    pub fn cancel(&mut self) -> Outcome {
        self.interaction.cancel()
    }

    // --- Commits ---------------------------------------------------------

    /// Apply a finished gesture. Size edits only change the overrides;
    /// everything else mutates the board and is sent to the store.
    pub fn apply_commit(&mut self, commit: Commit) -> Result<(), ModelError> {
        match commit {
            Commit::SprintWidth { sprint, width } => {
                self.overrides.sprint_widths.insert(sprint, width);
            }
            Commit::LaneHeight { lane, height } => {
                self.overrides.lane_heights.insert(lane, height);
            }
            Commit::LaneHeaderWidth(width) => {
                self.overrides.lane_header_width = Some(width);
            }
            Commit::MoveCard {
                card,
                lane,
                start_sprint,
                end_sprint,
            } => {
                let snapshot = Snapshot::new().card(&self.board, card);
                self.board.move_card(card, lane, start_sprint, end_sprint)?;
                self.dispatch(
                    MutationIntent::MoveCard {
                        card,
                        lane,
                        start_sprint,
                        end_sprint,
                    },
                    snapshot,
                );
            }
            Commit::ResizeSpan {
                card,
                start_sprint,
                end_sprint,
            } => self.resize_card(card, start_sprint, end_sprint)?,
            Commit::ReorderCard { card, index } => self.reorder_card(card, index)?,
            Commit::ReorderLanes(order) => self.reorder_lanes(order)?,
            Commit::ResizeSprintDuration { sprint, delta_days } => {
                self.resize_sprint(sprint, delta_days)?;
            }
        }
        Ok(())
    }

    pub fn resize_card(
        &mut self,
        card: CardId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    ) -> Result<(), ModelError> {
        for sprint in [start_sprint, end_sprint] {
            self.board
                .timeline
                .find(sprint)
                .ok_or(ModelError::UnknownSprint(sprint))?;
        }
        let lane = self
            .board
            .cards
            .get(card)
            .ok_or(ModelError::UnknownCard(card))?
            .lane_id;
        let snapshot = Snapshot::new().card(&self.board, card);
        self.board
            .cards
            .place(card, lane, start_sprint, end_sprint, &self.board.timeline)?;
        let placed = self.board.cards.get(card).ok_or(ModelError::UnknownCard(card))?;
        let intent = MutationIntent::ResizeCardSpan {
            card,
            start_sprint: placed.start_sprint,
            end_sprint: placed.end_sprint,
        };
        self.dispatch(intent, snapshot);
        Ok(())
    }

    /// Move a card within its cell. Every card whose order changed gets its
    /// own intent.
    pub fn reorder_card(&mut self, card: CardId, index: usize) -> Result<(), ModelError> {
        let mut before: HashMap<CardId, Snapshot> = self
            .board
            .cards
            .cards()
            .iter()
            .map(|c| (c.id, Snapshot::new().card(&self.board, c.id)))
            .collect();
        let changed = self
            .board
            .cards
            .reorder_in_cell(card, index, &self.board.timeline)?;
        for (id, order) in changed {
            let snapshot = before.remove(&id).unwrap_or_default();
            self.dispatch(MutationIntent::ReorderCard { card: id, order }, snapshot);
        }
        Ok(())
    }

    // --- Timeline --------------------------------------------------------

    /// Append a sprint after the last one. `anchor` is its start when the
    /// timeline is empty.
    pub fn add_sprint(&mut self, name: Option<String>, anchor: NaiveDate) -> SprintId {
        let snapshot = Snapshot::new().timeline(&self.board);
        let name = name.unwrap_or_else(|| format!("Sprint {}", self.board.timeline.len() + 1));
        let id = self
            .board
            .timeline
            .append_sprint(name, self.default_sprint_days, anchor);
        if let Some(sprint) = self.board.timeline.find(id) {
            let intent = MutationIntent::CreateSprint {
                sprint: id,
                name: sprint.name.clone(),
                start: sprint.start,
                end: sprint.end,
            };
            self.dispatch(intent, snapshot);
        }
        id
    }

    /// Change a sprint's duration by whole days, cascading later sprints.
    pub fn resize_sprint(&mut self, sprint: SprintId, delta_days: i64) -> Result<(), ModelError> {
        let snapshot = Snapshot::new().timeline(&self.board);
        if !self.board.timeline.resize_sprint(sprint, delta_days) {
            return Err(ModelError::UnknownSprint(sprint));
        }
        let duration_days = self
            .board
            .timeline
            .find(sprint)
            .map_or(1, |s| s.duration_days);
        self.dispatch(
            MutationIntent::ResizeSprint {
                sprint,
                duration_days,
            },
            snapshot,
        );
        Ok(())
    }

    pub fn set_sprint_date(
        &mut self,
        sprint: SprintId,
        field: DateField,
        value: NaiveDate,
    ) -> Result<(), ModelError> {
        let snapshot = Snapshot::new().timeline(&self.board);
        self.board.timeline.set_sprint_date(sprint, field, value)?;
        self.dispatch(
            MutationIntent::SetSprintDate {
                sprint,
                field,
                value,
            },
            snapshot,
        );
        Ok(())
    }

    pub fn rename_sprint(&mut self, sprint: SprintId, name: impl Into<String>) -> Result<(), ModelError> {
        let name = name.into();
        let snapshot = Snapshot::new().timeline(&self.board);
        self.board.timeline.rename(sprint, name.clone())?;
        self.dispatch(MutationIntent::RenameSprint { sprint, name }, snapshot);
        Ok(())
    }

    /// Remove a sprint; its cards move to the following sprint, else the
    /// preceding one, else the pool. Returns the sprint that took them.
    pub fn remove_sprint(&mut self, sprint: SprintId) -> Result<Option<SprintId>, ModelError> {
        let touched: Vec<CardId> = self
            .board
            .cards
            .cards()
            .iter()
            .filter(|c| c.start_sprint == sprint || c.end_sprint == sprint)
            .map(|c| c.id)
            .collect();
        let snapshot = Snapshot::new()
            .timeline(&self.board)
            .cards(&self.board, touched);
        let (target, _) = self.board.remove_sprint(sprint)?;
        self.overrides.sprint_widths.remove(&sprint);
        self.dispatch(
            MutationIntent::RemoveSprint {
                sprint,
                reassign_to: target,
            },
            snapshot,
        );
        Ok(target)
    }

    // --- Lanes -----------------------------------------------------------

    pub fn add_lane(&mut self, name: impl Into<String>, color: Color32) -> LaneId {
        let name = name.into();
        let snapshot = Snapshot::new().lanes(&self.board);
        let lane = self.board.lanes.append(name.clone(), color);
        self.dispatch(MutationIntent::CreateLane { lane, name, color }, snapshot);
        lane
    }

    pub fn rename_lane(&mut self, lane: LaneId, name: impl Into<String>) -> Result<(), ModelError> {
        let name = name.into();
        let snapshot = Snapshot::new().lanes(&self.board);
        self.board.lanes.rename(lane, name.clone())?;
        self.dispatch(MutationIntent::RenameLane { lane, name }, snapshot);
        Ok(())
    }

    /// Remove a lane; its cards drop into the unassigned pool.
    pub fn remove_lane(&mut self, lane: LaneId) -> Result<Vec<CardId>, ModelError> {
        let touched: Vec<CardId> = self.board.cards.in_lane(lane).map(|c| c.id).collect();
        let snapshot = Snapshot::new()
            .lanes(&self.board)
            .cards(&self.board, touched);
        let unassigned = self.board.remove_lane(lane)?;
        self.overrides.lane_heights.remove(&lane);
        self.dispatch(MutationIntent::RemoveLane { lane }, snapshot);
        Ok(unassigned)
    }

    pub fn reorder_lanes(&mut self, order: Vec<LaneId>) -> Result<(), ModelError> {
        let snapshot = Snapshot::new().lanes(&self.board);
        self.board.lanes.reorder(&order)?;
        self.dispatch(MutationIntent::ReorderLanes { order }, snapshot);
        Ok(())
    }

    // --- Cards -----------------------------------------------------------

    /// Create a one-sprint card at the bottom of a cell, or in the pool when
    /// `lane` is `None`.
    pub fn add_card(
        &mut self,
        name: impl Into<String>,
        lane: Option<LaneId>,
        sprint: SprintId,
    ) -> Result<CardId, ModelError> {
        self.board
            .timeline
            .find(sprint)
            .ok_or(ModelError::UnknownSprint(sprint))?;
        if let Some(lane) = lane {
            self.board.lanes.find(lane).ok_or(ModelError::UnknownLane(lane))?;
        }
        let card = Card::new(name, lane, sprint, sprint);
        let snapshot = Snapshot::new().card(&self.board, card.id);
        let id = self.board.add_card(card);
        let card = self
            .board
            .cards
            .get(id)
            .cloned()
            .ok_or(ModelError::UnknownCard(id))?;
        self.dispatch(MutationIntent::CreateCard { card }, snapshot);
        Ok(id)
    }

    pub fn rename_card(&mut self, card: CardId, name: impl Into<String>) -> Result<(), ModelError> {
        let name = name.into();
        let snapshot = Snapshot::new().card(&self.board, card);
        self.board
            .cards
            .get_mut(card)
            .ok_or(ModelError::UnknownCard(card))?
            .name = name.clone();
        self.dispatch(MutationIntent::RenameCard { card, name }, snapshot);
        Ok(())
    }

    pub fn delete_card(&mut self, card: CardId) -> Result<Card, ModelError> {
        let snapshot = Snapshot::new().card(&self.board, card);
        let removed = self
            .board
            .cards
            .remove(card)
            .ok_or(ModelError::UnknownCard(card))?;
        self.dispatch(MutationIntent::DeleteCard { card }, snapshot);
        Ok(removed)
    }

    // --- Queries ---------------------------------------------------------

    pub fn resolve_cell_rect(&self, lane: LaneId, sprint: SprintId) -> Option<Rect> {
        let idx = self.board.timeline.index_of(sprint)?;
        self.geometry().cell_rect(lane, idx)
    }

    pub fn resolve_card_rect(&self, card: CardId) -> Option<Rect> {
        self.geometry().card_rect(card)
    }

    pub fn hit_test(&self, pos: Pos2) -> Option<(LaneId, SprintId)> {
        let hit = self.geometry().hit_test(pos)?;
        let sprint = self.board.timeline.id_at(hit.sprint_idx)?;
        Some((hit.lane_id, sprint))
    }

    // --- Sync ------------------------------------------------------------

    fn dispatch(&mut self, intent: MutationIntent, snapshot: Snapshot) {
        self.board.touch();
        let seq = self.next_seq;
        self.next_seq += 1;
        let label = intent.label();
        let Some(client) = &self.sync else {
            debug!(seq, label, "no store attached; change kept locally");
            return;
        };
        self.ledger.record(seq, snapshot, intent.clone());
        if let Err(error) = client.submit(seq, intent) {
            warn!(seq, label, %error, "could not reach the store");
            self.roll_back(seq);
            self.events.push(SyncEvent::Failed { seq, label, error });
        }
    }

    /// Drain finished store calls without blocking and reconcile the board
    /// with them.
    pub fn poll_sync(&mut self) -> Vec<SyncEvent> {
        let mut events = std::mem::take(&mut self.events);
        let mut completions = Vec::new();
        if let Some(client) = &self.sync {
            while let Some(completion) = client.try_recv() {
                completions.push(completion);
            }
        }
        for completion in completions {
            events.push(self.reconcile(completion));
        }
        events
    }

    fn reconcile(&mut self, completion: Completion) -> SyncEvent {
        let Completion { seq, intent, result } = completion;
        let label = intent.label();
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(seq, label, %error, "store refused change; rolling back");
                self.roll_back(seq);
                return SyncEvent::Failed { seq, label, error };
            }
        };
        self.ledger.confirm(seq);

        let fresh = match response {
            SyncResponse::Ack => true,
            SyncResponse::Sprints(sprints) => {
                let fresh = self.ledger.is_latest(seq, EntityKey::Timeline);
                if fresh {
                    self.board.timeline.replace(sprints);
                    if let Err(problem) = self.board.timeline.check_contiguity() {
                        warn!(seq, %problem, "store returned a broken timeline");
                    }
                }
                fresh
            }
            SyncResponse::Sprint(sprint) => {
                let MutationIntent::CreateSprint {
                    sprint: provisional, ..
                } = intent
                else {
                    return SyncEvent::Confirmed { seq, label };
                };
                let fresh = self.ledger.is_latest(seq, EntityKey::Timeline);
                if fresh {
                    self.board.adopt_sprint(provisional, sprint);
                } else if sprint.id != provisional {
                    if let Some(mut local) = self.board.timeline.find(provisional).cloned() {
                        local.id = sprint.id;
                        self.board.adopt_sprint(provisional, local);
                    }
                }
                fresh
            }
            SyncResponse::Lane(lane) => {
                let MutationIntent::CreateLane { lane: provisional, .. } = intent else {
                    return SyncEvent::Confirmed { seq, label };
                };
                let fresh = self.ledger.is_latest(seq, EntityKey::Lanes);
                if fresh {
                    self.board.adopt_lane(provisional, lane);
                } else if lane.id != provisional {
                    if let Some(mut local) = self.board.lanes.find(provisional).cloned() {
                        local.id = lane.id;
                        self.board.adopt_lane(provisional, local);
                    }
                }
                fresh
            }
        };

        if fresh {
            info!(seq, label, "store confirmed change");
            SyncEvent::Confirmed { seq, label }
        } else {
            debug!(seq, label, "dropped stale store data");
            SyncEvent::Stale { seq, label }
        }
    }

    fn roll_back(&mut self, seq: u64) {
        let unreplayable = self.ledger.fail(seq, &mut self.board);
        if !unreplayable.is_empty() {
            warn!(seq, ?unreplayable, "later changes depended on the refused one");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::sync::LocalStore;
    use std::time::{Duration, Instant};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    fn planner() -> Planner {
        Planner::new(Board::sample(today()), &Config::default())
    }

    fn drain(planner: &mut Planner, want: usize) -> Vec<SyncEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < want && Instant::now() < deadline {
            events.extend(planner.poll_sync());
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn queries_speak_in_ids() {
        let p = planner();
        let lane = p.board().lanes.ids()[0];
        let sprint = p.board().timeline.id_at(2).unwrap();
        let rect = p.resolve_cell_rect(lane, sprint).unwrap();
        assert_eq!(p.hit_test(rect.center()), Some((lane, sprint)));
        assert_eq!(p.resolve_cell_rect(lane, uuid::Uuid::new_v4()), None);
    }

    #[test]
    fn view_commits_leave_the_board_alone() {
        let mut p = planner();
        let before = p.board().clone();
        let sprint = before.timeline.id_at(0).unwrap();
        p.apply_commit(Commit::SprintWidth { sprint, width: 90.0 }).unwrap();
        p.apply_commit(Commit::LaneHeaderWidth(200.0)).unwrap();
        assert_eq!(p.board(), &before);
        assert_eq!(p.overrides().sprint_widths.get(&sprint), Some(&90.0));
        assert_eq!(p.geometry().lane_header_width(), 200.0);
    }

    #[test]
    fn store_refusal_rolls_back() {
        let mut p = planner();
        p.attach(SyncClient::spawn(
            |_: &MutationIntent| -> Result<SyncResponse, SyncError> {
                Err(SyncError::Rejected("read only".into()))
            },
        ));
        let lane = p.board().lanes.ids()[0];
        p.rename_lane(lane, "Renamed").unwrap();
        assert_eq!(p.board().lanes.find(lane).unwrap().name, "Renamed");

        let events = drain(&mut p, 1);
        assert!(matches!(events[0], SyncEvent::Failed { label: "rename lane", .. }));
        assert_eq!(p.board().lanes.find(lane).unwrap().name, "Platform");
        assert_eq!(p.pending_count(), 0);
    }

    #[test]
    fn local_store_confirms_sprint_creation() {
        let mut p = planner();
        p.attach(SyncClient::spawn(LocalStore::new(p.board().clone())));
        let id = p.add_sprint(None, today());
        let events = drain(&mut p, 1);
        assert_eq!(events, vec![SyncEvent::Confirmed { seq: 1, label: "create sprint" }]);
        assert_eq!(p.board().timeline.len(), 7);
        assert_eq!(p.board().timeline.find(id).unwrap().name, "Sprint 7");
        p.board().timeline.check_contiguity().unwrap();
    }
}
