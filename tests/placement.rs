use chrono::NaiveDate;
use egui::{Color32, Pos2};
use roadmap_grid::geometry::{GridGeometry, GridMetrics, SizeOverrides};
use roadmap_grid::model::{Board, Card, CardId, LaneId, Timeline};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

struct Fixture {
    board: Board,
    lanes: Vec<LaneId>,
}

fn fixture() -> Fixture {
    let mut board = Board::new("test");
    board.timeline = Timeline::with_cadence(start(), 4, 14);
    let lanes = vec![
        board.lanes.append("Backend", Color32::BLUE),
        board.lanes.append("Frontend", Color32::GREEN),
    ];
    Fixture { board, lanes }
}

impl Fixture {
    fn add(&mut self, name: &str, lane: usize, from: usize, to: usize) -> CardId {
        let t = &self.board.timeline;
        let card = Card::new(name, Some(self.lanes[lane]), t.id_at(from).unwrap(), t.id_at(to).unwrap());
        self.board.add_card(card)
    }
}

#[test]
fn deleting_a_lane_pools_its_cards() {
    let mut f = fixture();
    let a = f.add("a", 0, 0, 1);
    let b = f.add("b", 0, 2, 2);
    let c = f.add("c", 1, 0, 0);

    let moved = f.board.remove_lane(f.lanes[0]).unwrap();

    assert_eq!(moved.len(), 2);
    let pool: Vec<CardId> = f.board.cards.unassigned().iter().map(|c| c.id).collect();
    assert!(pool.contains(&a) && pool.contains(&b));
    assert_eq!(f.board.cards.get(c).unwrap().lane_id, Some(f.lanes[1]));
    // Sprint references survive so the card can be placed again.
    assert_eq!(f.board.cards.get(a).unwrap().span(&f.board.timeline), Some(2));
}

#[test]
fn removed_sprint_hands_cards_to_the_following_one() {
    let mut f = fixture();
    let s1 = f.board.timeline.id_at(1).unwrap();
    let s2 = f.board.timeline.id_at(2).unwrap();
    let s3 = f.board.timeline.id_at(3).unwrap();
    let inside = f.add("inside", 0, 1, 1);
    let ending = f.add("ending", 1, 0, 1);
    let last = f.add("last", 0, 3, 3);

    let (target, affected) = f.board.remove_sprint(s1).unwrap();
    assert_eq!(target, Some(s2));
    assert_eq!(affected.len(), 2);
    let card = f.board.cards.get(inside).unwrap();
    assert_eq!((card.start_sprint, card.end_sprint), (s2, s2));
    assert_eq!(f.board.cards.get(ending).unwrap().end_sprint, s2);

    // With nothing after it, the last sprint falls back to the previous.
    let (target, _) = f.board.remove_sprint(s3).unwrap();
    assert_eq!(target, Some(s2));
    assert_eq!(f.board.cards.get(last).unwrap().start_sprint, s2);
}

#[test]
fn stacking_is_deterministic() {
    let mut f = fixture();
    let wide = f.add("wide", 0, 0, 2);
    let first = f.add("first", 0, 0, 0);
    let second = f.add("second", 0, 0, 0);

    let overrides = SizeOverrides::default();
    let metrics = GridMetrics::default();
    let geo = GridGeometry::new(&f.board, &overrides, &metrics, Pos2::ZERO);
    let cell = f.board.cards.cell(f.lanes[0], 0, &f.board.timeline);
    assert_eq!(cell.multi.len(), 1);
    assert_eq!(
        cell.single.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![first, second]
    );

    let w = geo.card_rect(wide).unwrap();
    let a = geo.card_rect(first).unwrap();
    let b = geo.card_rect(second).unwrap();
    assert!(w.bottom() <= a.top());
    assert!(a.bottom() < b.top());
    assert_eq!(a.top() - w.top(), metrics.multi_span_offset);
    assert_eq!(b.top() - a.top(), metrics.card_height + metrics.card_gap);
    // Multi-sprint cards stretch across their sprints.
    assert!((w.width() - (3.0 * metrics.sprint_width - 2.0 * metrics.cell_padding)).abs() < 0.01);

    // Same board, same layout.
    let again = GridGeometry::new(&f.board, &overrides, &metrics, Pos2::ZERO);
    assert_eq!(again.card_rect(second), Some(b));
}

#[test]
fn moved_card_goes_to_bottom_of_target_cell() {
    let mut f = fixture();
    let resident = f.add("resident", 1, 2, 2);
    let mover = f.add("mover", 0, 0, 0);
    let s2 = f.board.timeline.id_at(2).unwrap();

    f.board.move_card(mover, f.lanes[1], s2, s2).unwrap();

    let cell = f.board.cards.cell(f.lanes[1], 2, &f.board.timeline);
    assert_eq!(cell.ordered_ids(), vec![resident, mover]);
    assert!(f.board.cards.cell(f.lanes[0], 0, &f.board.timeline).is_empty());
}

#[test]
fn reorder_renumbers_only_the_cell() {
    let mut f = fixture();
    let a = f.add("a", 0, 1, 1);
    let b = f.add("b", 0, 1, 1);
    let c = f.add("c", 0, 1, 1);
    let elsewhere = f.add("elsewhere", 1, 1, 1);
    let before = f.board.cards.get(elsewhere).unwrap().order;

    let changed = f.board.cards.reorder_in_cell(c, 0, &f.board.timeline).unwrap();

    assert_eq!(changed.len(), 3);
    let cell = f.board.cards.cell(f.lanes[0], 1, &f.board.timeline);
    assert_eq!(cell.ordered_ids(), vec![c, a, b]);
    assert_eq!(f.board.cards.get(elsewhere).unwrap().order, before);
}
