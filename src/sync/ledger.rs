use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use super::intent::MutationIntent;
use crate::model::{Board, Card, CardId, Lane, Sprint};

/// Something a mutation can touch, for staleness and rollback bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Card(CardId),
    Timeline,
    Lanes,
}

/// The last state of one entity before an unconfirmed mutation touched it.
#[derive(Debug, Clone, PartialEq)]
pub enum Restore {
    /// `None` means the card did not exist.
    Card(CardId, Option<Card>),
    Timeline(Vec<Sprint>),
    Lanes(Vec<Lane>),
}

impl Restore {
    pub fn key(&self) -> EntityKey {
        match self {
            Restore::Card(id, _) => EntityKey::Card(*id),
            Restore::Timeline(_) => EntityKey::Timeline,
            Restore::Lanes(_) => EntityKey::Lanes,
        }
    }

    pub fn apply(self, board: &mut Board) {
        match self {
            Restore::Card(_, Some(card)) => board.cards.insert(card),
            Restore::Card(id, None) => {
                board.cards.remove(id);
            }
            Restore::Timeline(sprints) => board.timeline.replace(sprints),
            Restore::Lanes(lanes) => board.lanes.replace(lanes),
        }
    }
}

/// Pre-mutation copies of everything a mutation is about to touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    parts: BTreeMap<EntityKey, Restore>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(mut self, board: &Board, id: CardId) -> Self {
        self.parts
            .entry(EntityKey::Card(id))
            .or_insert_with(|| Restore::Card(id, board.cards.get(id).cloned()));
        self
    }

    pub fn cards(self, board: &Board, ids: impl IntoIterator<Item = CardId>) -> Self {
        ids.into_iter().fold(self, |snap, id| snap.card(board, id))
    }

    pub fn timeline(mut self, board: &Board) -> Self {
        self.parts
            .entry(EntityKey::Timeline)
            .or_insert_with(|| Restore::Timeline(board.timeline.sprints().to_vec()));
        self
    }

    pub fn lanes(mut self, board: &Board) -> Self {
        self.parts
            .entry(EntityKey::Lanes)
            .or_insert_with(|| Restore::Lanes(board.lanes.lanes().to_vec()));
        self
    }

    /// Everything `intent` is about to touch on `board`.
    pub fn touching(self, board: &Board, intent: &MutationIntent) -> Self {
        match intent {
            MutationIntent::MoveCard { card, .. }
            | MutationIntent::ResizeCardSpan { card, .. }
            | MutationIntent::ReorderCard { card, .. }
            | MutationIntent::RenameCard { card, .. }
            | MutationIntent::DeleteCard { card } => self.card(board, *card),
            MutationIntent::CreateCard { card } => self.card(board, card.id),
            MutationIntent::ResizeSprint { .. }
            | MutationIntent::SetSprintDate { .. }
            | MutationIntent::CreateSprint { .. }
            | MutationIntent::RenameSprint { .. } => self.timeline(board),
            MutationIntent::RemoveSprint { sprint, .. } => {
                let ids: Vec<CardId> = board
                    .cards
                    .cards()
                    .iter()
                    .filter(|c| c.start_sprint == *sprint || c.end_sprint == *sprint)
                    .map(|c| c.id)
                    .collect();
                self.timeline(board).cards(board, ids)
            }
            MutationIntent::CreateLane { .. }
            | MutationIntent::RenameLane { .. }
            | MutationIntent::ReorderLanes { .. } => self.lanes(board),
            MutationIntent::RemoveLane { lane } => {
                let ids: Vec<CardId> = board.cards.in_lane(*lane).map(|c| c.id).collect();
                self.lanes(board).cards(board, ids)
            }
        }
    }

    /// The same entities, copied again from `board`.
    pub fn recapture(&self, board: &Board) -> Self {
        self.keys().fold(Snapshot::new(), |snap, key| match key {
            EntityKey::Card(id) => snap.card(board, id),
            EntityKey::Timeline => snap.timeline(board),
            EntityKey::Lanes => snap.lanes(board),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.parts.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Optimistic mutations the store has not confirmed yet.
#[derive(Debug, Default)]
pub struct Ledger {
    pending: BTreeMap<u64, Pending>,
    latest: HashMap<EntityKey, u64>,
}

#[derive(Debug)]
struct Pending {
    snapshot: Snapshot,
    intent: MutationIntent,
}

impl Ledger {
    pub fn record(&mut self, seq: u64, snapshot: Snapshot, intent: MutationIntent) {
        for key in snapshot.keys() {
            self.latest.insert(key, seq);
        }
        self.pending.insert(seq, Pending { snapshot, intent });
    }

    pub fn is_pending(&self, seq: u64) -> bool {
        self.pending.contains_key(&seq)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of entities with a mutation still in flight.
    pub fn tracked_count(&self) -> usize {
        self.latest.len()
    }

    /// Whether no later mutation has been issued for `key`. Authoritative
    /// data from an older response would overwrite newer local state.
    pub fn is_latest(&self, seq: u64, key: EntityKey) -> bool {
        self.latest.get(&key).map_or(true, |latest| *latest <= seq)
    }

    pub fn confirm(&mut self, seq: u64) {
        if let Some(done) = self.pending.remove(&seq) {
            self.release(seq, &done.snapshot);
        }
    }

    /// Roll a refused mutation back on `board`.
    ///
    /// Its snapshot is restored at once. Newer pending mutations that
    /// touched the same entities were applied on top of the refused change,
    /// so they are replayed onto the restored state and their snapshots
    /// re-taken. Returns the sequence numbers that could not be replayed;
    /// the store will refuse those too.
    pub fn fail(&mut self, seq: u64, board: &mut Board) -> Vec<u64> {
        let Some(failed) = self.pending.remove(&seq) else {
            return Vec::new();
        };
        self.release(seq, &failed.snapshot);
        let mut dirty: BTreeSet<EntityKey> = failed.snapshot.keys().collect();
        for part in failed.snapshot.parts.into_values() {
            debug!(seq, key = ?part.key(), "restoring");
            part.apply(board);
        }

        let mut dropped = Vec::new();
        for (&later, entry) in self.pending.range_mut(seq + 1..) {
            if !entry.snapshot.keys().any(|key| dirty.contains(&key)) {
                continue;
            }
            entry.snapshot = entry.snapshot.recapture(board).touching(board, &entry.intent);
            for key in entry.snapshot.keys() {
                dirty.insert(key);
                let latest = self.latest.entry(key).or_insert(later);
                *latest = (*latest).max(later);
            }
            match entry.intent.apply_to(board) {
                Ok(_) => debug!(seq, later, label = entry.intent.label(), "replayed over rollback"),
                Err(error) => {
                    warn!(seq, later, label = entry.intent.label(), %error, "could not replay over rollback");
                    dropped.push(later);
                }
            }
        }
        dropped
    }

    fn release(&mut self, seq: u64, snapshot: &Snapshot) {
        for key in snapshot.keys() {
            if self.latest.get(&key) == Some(&seq) {
                self.latest.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use egui::Color32;

    fn board() -> Board {
        Board::sample(NaiveDate::from_ymd_opt(2025, 5, 5).unwrap())
    }

    /// Snapshot, record and apply an intent the way the planner does.
    fn commit(ledger: &mut Ledger, board: &mut Board, seq: u64, intent: MutationIntent) {
        let snapshot = Snapshot::new().touching(board, &intent);
        intent.apply_to(board).unwrap();
        ledger.record(seq, snapshot, intent);
    }

    #[test]
    fn failure_restores_snapshot() {
        let mut b = board();
        let id = b.cards.cards()[0].id;
        let before = b.cards.get(id).cloned();
        let mut ledger = Ledger::default();
        commit(&mut ledger, &mut b, 1, MutationIntent::DeleteCard { card: id });
        assert!(b.cards.get(id).is_none());

        assert!(ledger.fail(1, &mut b).is_empty());
        assert_eq!(b.cards.get(id).cloned(), before);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn newer_mutation_is_replayed_over_rollback() {
        let mut b = board();
        let before = b.lanes.clone();
        let lane = b.lanes.ids()[0];
        let card = b.cards.cards()[0].id;
        let mut ledger = Ledger::default();
        let phantom = uuid::Uuid::new_v4();
        commit(
            &mut ledger,
            &mut b,
            1,
            MutationIntent::CreateLane {
                lane: phantom,
                name: "Phantom".into(),
                color: Color32::GOLD,
            },
        );
        commit(&mut ledger, &mut b, 2, MutationIntent::RenameLane { lane, name: "Core".into() });
        commit(&mut ledger, &mut b, 3, MutationIntent::RenameCard { card, name: "Kept".into() });

        assert!(ledger.fail(1, &mut b).is_empty());
        assert!(b.lanes.find(phantom).is_none());
        assert_eq!(b.lanes.len(), before.len());
        assert_eq!(b.lanes.find(lane).unwrap().name, "Core");
        assert_eq!(b.cards.get(card).unwrap().name, "Kept");
        assert!(ledger.is_latest(2, EntityKey::Lanes));

        // The re-taken snapshot no longer holds the refused lane.
        ledger.fail(2, &mut b);
        assert_eq!(b.lanes, before);
    }

    #[test]
    fn replay_that_depends_on_the_refused_change_is_reported() {
        let mut b = board();
        let mut ledger = Ledger::default();
        let phantom = uuid::Uuid::new_v4();
        commit(
            &mut ledger,
            &mut b,
            1,
            MutationIntent::CreateLane {
                lane: phantom,
                name: "Phantom".into(),
                color: Color32::GOLD,
            },
        );
        commit(
            &mut ledger,
            &mut b,
            2,
            MutationIntent::RenameLane {
                lane: phantom,
                name: "Ghost".into(),
            },
        );

        assert_eq!(ledger.fail(1, &mut b), vec![2]);
        assert!(b.lanes.find(phantom).is_none());
        assert!(ledger.is_pending(2));
    }

    #[test]
    fn resolved_entities_are_forgotten() {
        let mut b = board();
        let lane = b.lanes.ids()[1];
        let card = b.cards.cards()[0].id;
        let mut ledger = Ledger::default();
        commit(&mut ledger, &mut b, 1, MutationIntent::RenameLane { lane, name: "A".into() });
        commit(&mut ledger, &mut b, 2, MutationIntent::RenameCard { card, name: "B".into() });
        commit(&mut ledger, &mut b, 3, MutationIntent::RenameLane { lane, name: "C".into() });
        assert_eq!(ledger.tracked_count(), 2);

        ledger.confirm(1);
        assert!(!ledger.is_latest(1, EntityKey::Lanes));
        ledger.confirm(2);
        ledger.fail(3, &mut b);
        assert_eq!(ledger.tracked_count(), 0);
        assert_eq!(ledger.pending_count(), 0);
    }
}
