use chrono::{DateTime, Duration, NaiveDate, Utc};
use egui::Color32;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::card::{Card, CardId};
use super::lane::{Lane, LaneId, Lanes};
use super::placement::{normalize, Placement};
use super::sprint::{Sprint, SprintId, Timeline};
use crate::error::ModelError;

/// A roadmap: the timeline, its lanes and the cards placed on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoardFile")]
pub struct Board {
    pub name: String,
    pub timeline: Timeline,
    pub lanes: Lanes,
    pub cards: Placement,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// A board as read from disk, before its card spans are checked.
#[derive(Deserialize)]
struct BoardFile {
    name: String,
    timeline: Timeline,
    lanes: Lanes,
    cards: Placement,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl From<BoardFile> for Board {
    fn from(file: BoardFile) -> Self {
        let mut board = Board {
            name: file.name,
            timeline: file.timeline,
            lanes: file.lanes,
            cards: file.cards,
            created: file.created,
            modified: file.modified,
        };
        let fixed = board.cards.normalize_spans(&board.timeline);
        if fixed > 0 {
            warn!(fixed, "cards stored end first were turned around");
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self {
            name: "Untitled Roadmap".to_string(),
            timeline: Timeline::default(),
            lanes: Lanes::default(),
            cards: Placement::default(),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Remove a sprint and move its cards to the adjacent sprint. Returns
    /// the reassignment target and the cards that moved.
    pub fn remove_sprint(
        &mut self,
        id: SprintId,
    ) -> Result<(Option<SprintId>, Vec<CardId>), ModelError> {
        let target = self.timeline.remove_sprint(id)?;
        let affected = self.cards.reassign_sprint(id, target, &self.timeline);
        self.touch();
        Ok((target, affected))
    }

    /// Remove a lane; its cards fall into the unassigned pool.
    pub fn remove_lane(&mut self, id: LaneId) -> Result<Vec<CardId>, ModelError> {
        self.lanes.remove(id)?;
        let affected = self.cards.unassign_lane(id);
        info!(%id, unassigned = affected.len(), "lane cards moved to pool");
        self.touch();
        Ok(affected)
    }

    /// Add a card at the bottom of the cell it starts in.
    pub fn add_card(&mut self, mut card: Card) -> CardId {
        normalize(&mut card, &self.timeline);
        if let Some(lane) = card.lane_id {
            card.order = self.cards.next_order(lane, card.start_sprint);
        }
        let id = card.id;
        self.cards.insert(card);
        self.touch();
        id
    }

    /// Place a card in a lane and sprint range. A card arriving in a new
    /// cell goes to the bottom of it.
    pub fn move_card(
        &mut self,
        id: CardId,
        lane: LaneId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    ) -> Result<(), ModelError> {
        self.lanes.find(lane).ok_or(ModelError::UnknownLane(lane))?;
        for sprint in [start_sprint, end_sprint] {
            self.timeline
                .find(sprint)
                .ok_or(ModelError::UnknownSprint(sprint))?;
        }
        let card = self.cards.get(id).ok_or(ModelError::UnknownCard(id))?;
        let same_cell = card.lane_id == Some(lane) && card.start_sprint == start_sprint;
        let order = self.cards.next_order(lane, start_sprint);
        self.cards
            .place(id, Some(lane), start_sprint, end_sprint, &self.timeline)?;
        if !same_cell {
            self.cards.set_order(id, order)?;
        }
        self.touch();
        Ok(())
    }

    /// Replace a locally created sprint with the store's copy, re-pointing
    /// cards if the store assigned a different id.
    pub fn adopt_sprint(&mut self, provisional: SprintId, sprint: Sprint) {
        if sprint.id != provisional {
            self.cards.replace_sprint_id(provisional, sprint.id);
        }
        self.timeline.adopt(provisional, sprint);
    }

    pub fn adopt_lane(&mut self, provisional: LaneId, lane: Lane) {
        if lane.id != provisional {
            self.cards.replace_lane_id(provisional, lane.id);
        }
        self.lanes.adopt(provisional, lane);
    }

    /// Generate a sample roadmap for demonstration.
    pub fn sample(today: NaiveDate) -> Self {
        let mut board = Board::new("Sample Roadmap");
        board.timeline = Timeline::with_cadence(today - Duration::days(7), 6, 14);

        let platform = board.lanes.append("Platform", Color32::from_rgb(66, 133, 244));
        let mobile = board.lanes.append("Mobile", Color32::from_rgb(52, 168, 83));
        let growth = board.lanes.append("Growth", Color32::from_rgb(171, 71, 188));

        let s = |i: usize| board.timeline.id_at(i).unwrap_or_default();
        let cards = vec![
            Card::new("Auth service", Some(platform), s(0), s(1)),
            Card::new("Rate limiting", Some(platform), s(0), s(0)),
            Card::new("Billing API", Some(platform), s(2), s(4)),
            Card::new("Offline mode", Some(mobile), s(1), s(3)),
            Card::new("Push settings", Some(mobile), s(1), s(1)),
            Card::new("Dark theme", Some(mobile), s(1), s(1)),
            Card::new("Referral program", Some(growth), s(3), s(5)),
            Card::new("Onboarding emails", Some(growth), s(2), s(2)),
            Card::new("Pricing experiment", None, s(0), s(0)),
        ];
        for card in cards {
            board.add_card(card);
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn removing_last_sprint_pools_cards() {
        let mut board = Board::new("solo");
        let only = board.timeline.append_sprint("S1", 14, today());
        let lane = board.lanes.append("L", Color32::GRAY);
        let id = board.add_card(Card::new("c", Some(lane), only, only));

        let (target, affected) = board.remove_sprint(only).unwrap();
        assert_eq!(target, None);
        assert_eq!(affected, vec![id]);
        assert_eq!(board.cards.get(id).unwrap().lane_id, None);
    }

    #[test]
    fn added_card_is_turned_around() {
        let mut board = Board::sample(today());
        let lane = board.lanes.ids()[0];
        let (s1, s4) = (board.timeline.id_at(1).unwrap(), board.timeline.id_at(4).unwrap());
        let id = board.add_card(Card::new("late", Some(lane), s4, s1));
        let card = board.cards.get(id).unwrap();
        assert_eq!((card.start_sprint, card.end_sprint), (s1, s4));
    }

    #[test]
    fn adopting_a_sprint_repoints_cards() {
        let mut board = Board::sample(today());
        let provisional = board.timeline.append_sprint("S7", 14, today());
        let lane = board.lanes.ids()[0];
        let card = board.add_card(Card::new("late", Some(lane), provisional, provisional));

        let mut stored = board.timeline.find(provisional).unwrap().clone();
        stored.id = uuid::Uuid::new_v4();
        board.adopt_sprint(provisional, stored.clone());

        assert!(board.timeline.find(provisional).is_none());
        assert_eq!(board.cards.get(card).unwrap().start_sprint, stored.id);
        board.timeline.check_contiguity().unwrap();
    }

    #[test]
    fn new_cards_go_to_cell_bottom() {
        let mut board = Board::sample(today());
        let lane = board.lanes.ids()[1];
        let s1 = board.timeline.id_at(1).unwrap();
        let id = board.add_card(Card::new("tail", Some(lane), s1, s1));
        let cell = board.cards.cell(lane, 1, &board.timeline);
        assert_eq!(cell.single.last().unwrap().id, id);
    }

    #[test]
    fn moved_card_lands_at_bottom_of_new_cell() {
        let mut board = Board::sample(today());
        let mobile = board.lanes.ids()[1];
        let s0 = board.timeline.id_at(0).unwrap();
        let s1 = board.timeline.id_at(1).unwrap();
        let rate = board
            .cards
            .cards()
            .iter()
            .find(|c| c.name == "Rate limiting")
            .unwrap()
            .id;

        board.move_card(rate, mobile, s1, s1).unwrap();
        let cell = board.cards.cell(mobile, 1, &board.timeline);
        assert_eq!(cell.single.last().unwrap().id, rate);

        // Stretching within the same cell keeps the order.
        let order = board.cards.get(rate).unwrap().order;
        board.move_card(rate, mobile, s1, board.timeline.id_at(2).unwrap()).unwrap();
        assert_eq!(board.cards.get(rate).unwrap().order, order);

        let ghost = uuid::Uuid::new_v4();
        assert_eq!(
            board.move_card(rate, ghost, s0, s0),
            Err(ModelError::UnknownLane(ghost))
        );
        assert_eq!(board.cards.get(rate).unwrap().lane_id, Some(mobile));
    }
}
