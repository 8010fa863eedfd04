use chrono::{Duration, NaiveDate};
use egui::Color32;
use tracing::warn;

use crate::error::{ModelError, SyncError};
use crate::model::{Board, Card, CardId, DateField, Lane, LaneId, Sprint, SprintId};

/// One committed change, as sent to the store of record.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    MoveCard {
        card: CardId,
        lane: LaneId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    },
    ResizeCardSpan {
        card: CardId,
        start_sprint: SprintId,
        end_sprint: SprintId,
    },
    ReorderCard {
        card: CardId,
        order: i64,
    },
    ResizeSprint {
        sprint: SprintId,
        duration_days: i64,
    },
    SetSprintDate {
        sprint: SprintId,
        field: DateField,
        value: NaiveDate,
    },
    CreateSprint {
        /// Provisional id used locally until the store answers.
        sprint: SprintId,
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    RemoveSprint {
        sprint: SprintId,
        reassign_to: Option<SprintId>,
    },
    RenameSprint {
        sprint: SprintId,
        name: String,
    },
    CreateLane {
        lane: LaneId,
        name: String,
        color: Color32,
    },
    RenameLane {
        lane: LaneId,
        name: String,
    },
    RemoveLane {
        lane: LaneId,
    },
    ReorderLanes {
        order: Vec<LaneId>,
    },
    CreateCard {
        card: Card,
    },
    RenameCard {
        card: CardId,
        name: String,
    },
    DeleteCard {
        card: CardId,
    },
}

impl MutationIntent {
    /// Short name for logs and status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MoveCard { .. } => "move card",
            Self::ResizeCardSpan { .. } => "resize card",
            Self::ReorderCard { .. } => "reorder card",
            Self::ResizeSprint { .. } => "resize sprint",
            Self::SetSprintDate { .. } => "set sprint date",
            Self::CreateSprint { .. } => "create sprint",
            Self::RemoveSprint { .. } => "remove sprint",
            Self::RenameSprint { .. } => "rename sprint",
            Self::CreateLane { .. } => "create lane",
            Self::RenameLane { .. } => "rename lane",
            Self::RemoveLane { .. } => "remove lane",
            Self::ReorderLanes { .. } => "reorder lanes",
            Self::CreateCard { .. } => "create card",
            Self::RenameCard { .. } => "rename card",
            Self::DeleteCard { .. } => "delete card",
        }
    }

    /// Apply this change to `board` the way a store of record would,
    /// validating it first.
    pub fn apply_to(&self, board: &mut Board) -> Result<SyncResponse, SyncError> {
        let response = match self {
            Self::MoveCard {
                card,
                lane,
                start_sprint,
                end_sprint,
            } => {
                board.move_card(*card, *lane, *start_sprint, *end_sprint)?;
                SyncResponse::Ack
            }
            Self::ResizeCardSpan {
                card,
                start_sprint,
                end_sprint,
            } => {
                let lane = board
                    .cards
                    .get(*card)
                    .ok_or(ModelError::UnknownCard(*card))?
                    .lane_id;
                board
                    .cards
                    .place(*card, lane, *start_sprint, *end_sprint, &board.timeline)?;
                SyncResponse::Ack
            }
            Self::ReorderCard { card, order } => {
                board.cards.set_order(*card, *order)?;
                SyncResponse::Ack
            }
            Self::ResizeSprint {
                sprint,
                duration_days,
            } => {
                let current = board
                    .timeline
                    .find(*sprint)
                    .ok_or(ModelError::UnknownSprint(*sprint))?
                    .duration_days;
                board.timeline.resize_sprint(*sprint, duration_days - current);
                SyncResponse::Sprints(board.timeline.sprints().to_vec())
            }
            Self::SetSprintDate {
                sprint,
                field,
                value,
            } => {
                board.timeline.set_sprint_date(*sprint, *field, *value)?;
                SyncResponse::Sprints(board.timeline.sprints().to_vec())
            }
            Self::CreateSprint {
                sprint,
                name,
                start,
                end,
            } => {
                let days = (*end - *start).num_days() + 1;
                if days < 1 {
                    return Err(ModelError::InvalidDuration { days }.into());
                }
                let last = board.timeline.sprints().last();
                if let Some(last) = last {
                    if *start != last.end + Duration::days(1) {
                        return Err(SyncError::Rejected(format!(
                            "sprint must start on {}",
                            last.end + Duration::days(1)
                        )));
                    }
                }
                let mut created = Sprint::new(name.clone(), *start, days);
                created.id = *sprint;
                created.sort_index = last.map_or(0, |l| l.sort_index + 1);
                board.timeline.insert(created.clone());
                SyncResponse::Sprint(created)
            }
            Self::RemoveSprint {
                sprint,
                reassign_to,
            } => {
                let (target, _) = board.remove_sprint(*sprint)?;
                if target != *reassign_to {
                    warn!(%sprint, ?target, ?reassign_to, "store picked a different reassignment target");
                }
                SyncResponse::Sprints(board.timeline.sprints().to_vec())
            }
            Self::RenameSprint { sprint, name } => {
                board.timeline.rename(*sprint, name.clone())?;
                SyncResponse::Ack
            }
            Self::CreateLane { lane, name, color } => {
                let mut created = Lane::new(name.clone(), *color);
                created.id = *lane;
                created.sort_index = board.lanes.lanes().last().map_or(0, |l| l.sort_index + 1);
                board.lanes.insert(created.clone());
                SyncResponse::Lane(created)
            }
            Self::RenameLane { lane, name } => {
                board.lanes.rename(*lane, name.clone())?;
                SyncResponse::Ack
            }
            Self::RemoveLane { lane } => {
                board.remove_lane(*lane)?;
                SyncResponse::Ack
            }
            Self::ReorderLanes { order } => {
                board.lanes.reorder(order)?;
                SyncResponse::Ack
            }
            Self::CreateCard { card } => {
                board.cards.insert(card.clone());
                SyncResponse::Ack
            }
            Self::RenameCard { card, name } => {
                board
                    .cards
                    .get_mut(*card)
                    .ok_or(ModelError::UnknownCard(*card))?
                    .name = name.clone();
                SyncResponse::Ack
            }
            Self::DeleteCard { card } => {
                board
                    .cards
                    .remove(*card)
                    .ok_or(ModelError::UnknownCard(*card))?;
                SyncResponse::Ack
            }
        };
        Ok(response)
    }
}

/// The store's answer to an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResponse {
    Ack,
    /// Full authoritative sprint list; timeline edits can touch every
    /// later sprint.
    Sprints(Vec<Sprint>),
    Sprint(Sprint),
    Lane(Lane),
}
