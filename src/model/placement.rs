use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::card::{Card, CardId};
use super::lane::LaneId;
use super::sprint::{SprintId, Timeline};
use crate::error::ModelError;

/// The cards sharing a lane and a start sprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<'a> {
    pub lane_id: LaneId,
    pub sprint_idx: usize,
    /// One-sprint cards, stacked vertically.
    pub single: Vec<&'a Card>,
    /// Cards spanning several sprints, stacked at a fixed offset each.
    pub multi: Vec<&'a Card>,
}

impl<'a> Cell<'a> {
    fn new(lane_id: LaneId, sprint_idx: usize) -> Self {
        Self {
            lane_id,
            sprint_idx,
            single: Vec::new(),
            multi: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.single.len() + self.multi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_empty()
    }

    /// Every member in intra-cell order, regardless of span.
    pub fn ordered_ids(&self) -> Vec<CardId> {
        let mut all: Vec<&Card> = self.single.iter().chain(self.multi.iter()).copied().collect();
        all.sort_by(|a, b| cell_order(a, b));
        all.into_iter().map(|c| c.id).collect()
    }

    /// Stack position of a multi-span card within this cell.
    pub fn multi_position(&self, id: CardId) -> Option<usize> {
        self.multi.iter().position(|c| c.id == id)
    }

    pub fn single_position(&self, id: CardId) -> Option<usize> {
        self.single.iter().position(|c| c.id == id)
    }
}

fn cell_order(a: &Card, b: &Card) -> std::cmp::Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

/// Where every card sits. Cell groupings are derived on demand and never
/// stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placement {
    cards: Vec<Card>,
}

impl Placement {
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub fn insert(&mut self, card: Card) {
        match self.get_mut(card.id) {
            Some(slot) => *slot = card,
            None => self.cards.push(card),
        }
    }

    /// Put every card's sprints in start-end order. Returns how many
    /// were reversed.
    pub fn normalize_spans(&mut self, timeline: &Timeline) -> usize {
        let mut fixed = 0;
        for card in &mut self.cards {
            let before = card.start_sprint;
            normalize(card, timeline);
            if card.start_sprint != before {
                fixed += 1;
            }
        }
        fixed
    }

    pub fn remove(&mut self, id: CardId) -> Option<Card> {
        let idx = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(idx))
    }

    /// Next free order value at the bottom of a cell.
    pub fn next_order(&self, lane_id: LaneId, start_sprint: SprintId) -> i64 {
        self.cards
            .iter()
            .filter(|c| c.lane_id == Some(lane_id) && c.start_sprint == start_sprint)
            .map(|c| c.order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Set a card's lane and sprint range. Sprint existence is the caller's
    /// business, but a reversed range is swapped into order.
    pub fn place(
        &mut self,
        id: CardId,
        lane_id: Option<LaneId>,
        start_sprint: SprintId,
        end_sprint: SprintId,
        timeline: &Timeline,
    ) -> Result<(), ModelError> {
        let card = self.get_mut(id).ok_or(ModelError::UnknownCard(id))?;
        card.lane_id = lane_id;
        card.start_sprint = start_sprint;
        card.end_sprint = end_sprint;
        normalize(card, timeline);
        debug!(%id, ?lane_id, %start_sprint, %end_sprint, "card placed");
        Ok(())
    }

    pub fn set_order(&mut self, id: CardId, order: i64) -> Result<(), ModelError> {
        let card = self.get_mut(id).ok_or(ModelError::UnknownCard(id))?;
        card.order = order;
        Ok(())
    }

    /// Move a card to `new_index` within its cell and renumber the cell.
    /// Returns the `(card, order)` pairs that changed; cards outside the
    /// cell are never touched.
    pub fn reorder_in_cell(
        &mut self,
        id: CardId,
        new_index: usize,
        timeline: &Timeline,
    ) -> Result<Vec<(CardId, i64)>, ModelError> {
        let card = self.get(id).ok_or(ModelError::UnknownCard(id))?;
        let (Some(lane_id), Some(sprint_idx)) = (card.lane_id, timeline.index_of(card.start_sprint))
        else {
            return Ok(Vec::new());
        };
        let mut members = self.cell(lane_id, sprint_idx, timeline).ordered_ids();
        let from = members.iter().position(|m| *m == id).unwrap_or_default();
        let moved = members.remove(from);
        members.insert(new_index.min(members.len()), moved);

        let mut changed = Vec::new();
        for (order, member) in members.into_iter().enumerate() {
            let order = order as i64;
            if let Some(card) = self.get_mut(member) {
                if card.order != order {
                    card.order = order;
                    changed.push((member, order));
                }
            }
        }
        Ok(changed)
    }

    pub fn cell(&self, lane_id: LaneId, sprint_idx: usize, timeline: &Timeline) -> Cell<'_> {
        let mut cell = Cell::new(lane_id, sprint_idx);
        for card in &self.cards {
            if card.lane_id != Some(lane_id) {
                continue;
            }
            if let Some((start, end)) = card.indices(timeline) {
                if start == sprint_idx {
                    push_member(&mut cell, card, start, end);
                }
            }
        }
        sort_cell(&mut cell);
        cell
    }

    /// Every non-empty cell of a lane, ordered by sprint.
    pub fn cells_for(&self, lane_id: LaneId, timeline: &Timeline) -> Vec<Cell<'_>> {
        let mut cells: BTreeMap<usize, Cell<'_>> = BTreeMap::new();
        for card in self.cards.iter().filter(|c| c.lane_id == Some(lane_id)) {
            let Some((start, end)) = card.indices(timeline) else {
                continue;
            };
            let cell = cells
                .entry(start)
                .or_insert_with(|| Cell::new(lane_id, start));
            push_member(cell, card, start, end);
        }
        cells
            .into_values()
            .map(|mut cell| {
                sort_cell(&mut cell);
                cell
            })
            .collect()
    }

    /// Cards that sit outside the grid.
    pub fn unassigned(&self) -> Vec<&Card> {
        let mut pool: Vec<&Card> = self.cards.iter().filter(|c| c.lane_id.is_none()).collect();
        pool.sort_by(|a, b| cell_order(a, b));
        pool
    }

    pub fn in_lane(&self, lane_id: LaneId) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |c| c.lane_id == Some(lane_id))
    }

    /// Move every card of `lane_id` to the unassigned pool.
    pub fn unassign_lane(&mut self, lane_id: LaneId) -> Vec<CardId> {
        let mut affected = Vec::new();
        for card in self.cards.iter_mut().filter(|c| c.lane_id == Some(lane_id)) {
            card.lane_id = None;
            affected.push(card.id);
        }
        affected
    }

    /// Point every reference to `removed` at `target`. With no target left
    /// the cards drop into the unassigned pool. `timeline` is the timeline
    /// after removal.
    pub fn reassign_sprint(
        &mut self,
        removed: SprintId,
        target: Option<SprintId>,
        timeline: &Timeline,
    ) -> Vec<CardId> {
        let mut affected = Vec::new();
        for card in self
            .cards
            .iter_mut()
            .filter(|c| c.start_sprint == removed || c.end_sprint == removed)
        {
            match target {
                Some(target) => {
                    if card.start_sprint == removed {
                        card.start_sprint = target;
                    }
                    if card.end_sprint == removed {
                        card.end_sprint = target;
                    }
                    normalize(card, timeline);
                }
                None => card.lane_id = None,
            }
            affected.push(card.id);
        }
        affected
    }

    pub(crate) fn replace_sprint_id(&mut self, from: SprintId, to: SprintId) {
        for card in &mut self.cards {
            if card.start_sprint == from {
                card.start_sprint = to;
            }
            if card.end_sprint == from {
                card.end_sprint = to;
            }
        }
    }

    pub(crate) fn replace_lane_id(&mut self, from: LaneId, to: LaneId) {
        for card in self.cards.iter_mut().filter(|c| c.lane_id == Some(from)) {
            card.lane_id = Some(to);
        }
    }
}

fn push_member<'a>(cell: &mut Cell<'a>, card: &'a Card, start: usize, end: usize) {
    if end > start {
        cell.multi.push(card);
    } else {
        cell.single.push(card);
    }
}

fn sort_cell(cell: &mut Cell<'_>) {
    cell.single.sort_by(|a, b| cell_order(a, b));
    cell.multi.sort_by(|a, b| cell_order(a, b));
}

/// Swap a card's sprints if they are given end first.
pub(crate) fn normalize(card: &mut Card, timeline: &Timeline) {
    if let Some((start, end)) = card.indices(timeline) {
        if start > end {
            std::mem::swap(&mut card.start_sprint, &mut card.end_sprint);
        }
    }
}
