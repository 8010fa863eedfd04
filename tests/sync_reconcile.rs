use std::time::{Duration, Instant};

use chrono::NaiveDate;
use egui::{Color32, Vec2};
use roadmap_grid::config::Config;
use roadmap_grid::error::SyncError;
use roadmap_grid::io;
use roadmap_grid::model::{Board, CardId};
use roadmap_grid::sync::{LocalStore, MutationIntent, SyncClient, SyncResponse};
use roadmap_grid::{Planner, SyncEvent};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

fn planner() -> Planner {
    Planner::new(Board::sample(today()), &Config::default())
}

fn card_named(p: &Planner, name: &str) -> CardId {
    p.board()
        .cards
        .cards()
        .iter()
        .find(|c| c.name == name)
        .unwrap()
        .id
}

fn drain(p: &mut Planner, want: usize) -> Vec<SyncEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while events.len() < want && Instant::now() < deadline {
        events.extend(p.poll_sync());
        std::thread::sleep(Duration::from_millis(5));
    }
    events
}

#[test]
fn refused_move_is_rolled_back() {
    let mut p = planner();
    p.attach(SyncClient::spawn(
        |intent: &MutationIntent| -> Result<SyncResponse, SyncError> {
            match intent {
                MutationIntent::MoveCard { .. } => Err(SyncError::Rejected("locked".into())),
                _ => Ok(SyncResponse::Ack),
            }
        },
    ));
    let card = card_named(&p, "Billing API");
    let before = p.board().cards.get(card).unwrap().clone();
    let from = p.resolve_card_rect(card).unwrap().center();
    let lane = p.board().lanes.ids()[2];
    let to = p
        .resolve_cell_rect(lane, p.board().timeline.id_at(0).unwrap())
        .unwrap()
        .center();

    assert_eq!(p.pointer_down(from), Ok(true));
    p.pointer_move(from + Vec2::new(30.0, 0.0));
    p.pointer_up(to).unwrap();
    assert_eq!(p.board().cards.get(card).unwrap().lane_id, Some(lane));
    assert_eq!(p.pending_count(), 1);

    let events = drain(&mut p, 1);
    assert_eq!(
        events,
        vec![SyncEvent::Failed {
            seq: 1,
            label: "move card",
            error: SyncError::Rejected("locked".into()),
        }]
    );
    assert_eq!(p.board().cards.get(card).unwrap(), &before);
    assert_eq!(p.pending_count(), 0);
}

#[test]
fn stale_timeline_is_not_applied() {
    let mut p = planner();
    let mut calls = 0;
    p.attach(SyncClient::spawn(
        move |_: &MutationIntent| -> Result<SyncResponse, SyncError> {
            calls += 1;
            if calls == 1 {
                // Whatever the store thought after the first edit is outdated
                // by the time it arrives.
                Ok(SyncResponse::Sprints(Vec::new()))
            } else {
                Ok(SyncResponse::Ack)
            }
        },
    ));
    let first = p.board().timeline.id_at(0).unwrap();
    p.resize_sprint(first, 2).unwrap();
    p.resize_sprint(first, 1).unwrap();

    let events = drain(&mut p, 2);
    assert_eq!(
        events,
        vec![
            SyncEvent::Stale { seq: 1, label: "resize sprint" },
            SyncEvent::Confirmed { seq: 2, label: "resize sprint" },
        ]
    );
    assert_eq!(p.board().timeline.len(), 6);
    assert_eq!(p.board().timeline.get(0).unwrap().duration_days, 17);
}

#[test]
fn later_edit_survives_an_earlier_failure() {
    let mut p = planner();
    p.attach(SyncClient::spawn(
        |intent: &MutationIntent| -> Result<SyncResponse, SyncError> {
            match intent {
                MutationIntent::RenameLane { name, .. } if name == "Core" => {
                    Err(SyncError::Rejected("taken".into()))
                }
                _ => Ok(SyncResponse::Ack),
            }
        },
    ));
    let lane = p.board().lanes.ids()[0];
    p.rename_lane(lane, "Core").unwrap();
    p.rename_lane(lane, "Infra").unwrap();

    let events = drain(&mut p, 2);
    assert!(matches!(events[0], SyncEvent::Failed { seq: 1, .. }));
    assert_eq!(events[1], SyncEvent::Confirmed { seq: 2, label: "rename lane" });
    assert_eq!(p.board().lanes.find(lane).unwrap().name, "Infra");
}

#[test]
fn refused_lane_does_not_survive_a_later_accepted_edit() {
    let mut p = planner();
    p.attach(SyncClient::spawn(
        |intent: &MutationIntent| -> Result<SyncResponse, SyncError> {
            match intent {
                MutationIntent::CreateLane { .. } => Err(SyncError::Rejected("lane limit".into())),
                _ => Ok(SyncResponse::Ack),
            }
        },
    ));
    let first = p.board().lanes.ids()[0];
    let phantom = p.add_lane("Phantom", Color32::GOLD);
    p.rename_lane(first, "Core").unwrap();
    assert_eq!(p.board().lanes.len(), 4);

    let events = drain(&mut p, 2);
    assert!(matches!(events[0], SyncEvent::Failed { seq: 1, label: "create lane", .. }));
    assert_eq!(events[1], SyncEvent::Confirmed { seq: 2, label: "rename lane" });
    assert!(p.board().lanes.find(phantom).is_none());
    assert_eq!(p.board().lanes.len(), 3);
    assert_eq!(p.board().lanes.find(first).unwrap().name, "Core");
    assert_eq!(p.pending_count(), 0);
}

#[test]
fn refused_timeline_edit_is_undone_under_a_later_one() {
    let mut p = planner();
    p.attach(SyncClient::spawn(
        |intent: &MutationIntent| -> Result<SyncResponse, SyncError> {
            match intent {
                MutationIntent::CreateSprint { .. } => Err(SyncError::Rejected("frozen".into())),
                _ => Ok(SyncResponse::Ack),
            }
        },
    ));
    let first = p.board().timeline.id_at(0).unwrap();
    let extra = p.add_sprint(Some("Extra".into()), today());
    p.rename_sprint(first, "Kickoff").unwrap();

    drain(&mut p, 2);

    assert!(p.board().timeline.find(extra).is_none());
    assert_eq!(p.board().timeline.len(), 6);
    assert_eq!(p.board().timeline.get(0).unwrap().name, "Kickoff");
    p.board().timeline.check_contiguity().unwrap();
}

#[test]
fn store_assigned_lane_id_is_adopted() {
    let mut p = planner();
    let assigned = uuid::Uuid::new_v4();
    p.attach(SyncClient::spawn(
        move |intent: &MutationIntent| -> Result<SyncResponse, SyncError> {
            match intent {
                MutationIntent::CreateLane { name, color, .. } => {
                    let mut lane = roadmap_grid::model::Lane::new(name.clone(), *color);
                    lane.id = assigned;
                    lane.sort_index = 3;
                    Ok(SyncResponse::Lane(lane))
                }
                _ => Ok(SyncResponse::Ack),
            }
        },
    ));
    let provisional = p.add_lane("Data", Color32::GOLD);
    let sprint = p.board().timeline.id_at(1).unwrap();
    let card = p.add_card("Warehouse", Some(provisional), sprint).unwrap();

    drain(&mut p, 2);

    assert!(p.board().lanes.find(provisional).is_none());
    assert_eq!(p.board().lanes.find(assigned).unwrap().name, "Data");
    assert_eq!(p.board().cards.get(card).unwrap().lane_id, Some(assigned));
}

#[test]
fn local_store_persists_accepted_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.roadmap.json");
    let mut p = planner();
    io::save_board(p.board(), &path).unwrap();
    p.attach(SyncClient::spawn(LocalStore::with_path(p.board().clone(), path.clone())));

    let card = card_named(&p, "Onboarding emails");
    p.rename_card(card, "Welcome series").unwrap();
    let removed = p.board().timeline.id_at(5).unwrap();
    p.remove_sprint(removed).unwrap();

    let events = drain(&mut p, 2);
    assert!(events.iter().all(|e| matches!(e, SyncEvent::Confirmed { .. })), "{events:?}");

    let saved = io::load_board(&path).unwrap();
    assert_eq!(saved.cards.get(card).unwrap().name, "Welcome series");
    assert_eq!(saved.timeline.len(), 5);
    assert_eq!(saved.timeline, p.board().timeline);
}

#[test]
fn local_store_rejects_unknown_entities() {
    let mut p = planner();
    let mut store_board = p.board().clone();
    let lane = store_board.lanes.ids()[1];
    store_board.remove_lane(lane).unwrap();
    p.attach(SyncClient::spawn(LocalStore::new(store_board)));

    p.rename_lane(lane, "Apps").unwrap();

    let events = drain(&mut p, 1);
    assert!(matches!(events[0], SyncEvent::Failed { error: SyncError::Model(_), .. }));
    assert_eq!(p.board().lanes.find(lane).unwrap().name, "Mobile");
}
