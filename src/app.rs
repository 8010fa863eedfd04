use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use roadmap_grid::config::{self, Config, Paths};
use roadmap_grid::interaction::{Commit, Outcome};
use roadmap_grid::io;
use roadmap_grid::model::{Board, CardId, LaneId, SprintId};
use roadmap_grid::sync::{LocalStore, SyncClient};
use roadmap_grid::{Planner, SyncEvent};

use crate::ui;
use crate::ui::dialogs::{CardEditor, LaneEditor, SprintEditor};

const BOARD_FILTER: (&str, &[&str]) = ("Roadmap Board", &["roadmap.json", "json"]);

/// Main application state.
pub struct RoadmapApp {
    pub planner: Planner,
    pub paths: Paths,
    pub file_path: Option<PathBuf>,
    pub selected_card: Option<CardId>,
    /// Target of "Add Card": the last empty cell clicked.
    pub selected_cell: Option<(LaneId, SprintId)>,

    // Dialog state
    pub sprint_editor: Option<SprintEditor>,
    pub lane_editor: Option<LaneEditor>,
    pub card_editor: Option<CardEditor>,
    pub show_about: bool,

    // Status message
    pub status_message: String,

    ctx: egui::Context,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl RoadmapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, paths: Paths) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let mut status_message = "Ready".to_string();
        let (board, file_path) = match &config.board_path {
            Some(path) => match io::load_board(path) {
                Ok(board) => (board, Some(path.clone())),
                Err(e) => {
                    warn!(%e, path = %path.display(), "could not open configured board");
                    status_message = format!("Error loading: {}", e);
                    (Board::sample(today()), None)
                }
            },
            None => (Board::sample(today()), None),
        };

        let mut planner = Planner::new(board, &config);
        planner.set_overrides(config::load_overrides(&paths.view_file));

        let mut app = Self {
            planner,
            paths,
            file_path,
            selected_card: None,
            selected_cell: None,
            sprint_editor: None,
            lane_editor: None,
            card_editor: None,
            show_about: false,
            status_message,
            ctx: cc.egui_ctx.clone(),
        };
        app.attach_store();
        app
    }

    /// Give the planner a store for the current board, backed by the board
    /// file when there is one.
    fn attach_store(&mut self) {
        let board = self.planner.board().clone();
        let store = match &self.file_path {
            Some(path) => LocalStore::with_path(board, path.clone()),
            None => LocalStore::new(board),
        };
        let ctx = self.ctx.clone();
        let client = SyncClient::spawn_with_notify(store, Box::new(move || ctx.request_repaint()));
        self.planner.attach(client);
    }

    fn load(&mut self, board: Board, file_path: Option<PathBuf>) {
        self.planner.replace_board(board);
        self.file_path = file_path;
        self.selected_card = None;
        self.selected_cell = None;
        self.sprint_editor = None;
        self.lane_editor = None;
        self.card_editor = None;
        self.attach_store();
    }

    /// Drop the current drag and close any edit popover unapplied.
    fn on_escape(&mut self) {
        let closed = self.sprint_editor.take().is_some()
            | self.lane_editor.take().is_some()
            | self.card_editor.take().is_some();
        self.show_about = false;
        if let Outcome::Cancelled = self.planner.cancel() {
            self.status_message = "Drag cancelled".to_string();
        } else if closed {
            self.status_message = "Edit discarded".to_string();
        }
    }

    // --- File operations ---

    pub fn new_board(&mut self) {
        let mut board = Board::default();
        board.timeline.append_sprint("Sprint 1", 14, today());
        self.load(board, None);
        self.status_message = "New board created".to_string();
    }

    pub fn open_board(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter(BOARD_FILTER.0, BOARD_FILTER.1)
            .pick_file()
        {
            match io::load_board(&path) {
                Ok(board) => {
                    info!(path = %path.display(), "board opened");
                    self.load(board, Some(path));
                    self.status_message = "Board loaded".to_string();
                }
                Err(e) => {
                    self.status_message = format!("Error loading: {}", e);
                }
            }
        }
    }

    pub fn save_board(&mut self) {
        if let Some(path) = self.file_path.clone() {
            self.write_board(path);
        } else {
            self.save_board_as();
        }
    }

    pub fn save_board_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter(BOARD_FILTER.0, BOARD_FILTER.1)
            .set_file_name(format!("{}.roadmap.json", self.planner.board().name))
            .save_file()
        {
            self.write_board(path);
        }
    }

    fn write_board(&mut self, path: PathBuf) {
        match io::save_board(self.planner.board(), &path) {
            Ok(()) => {
                self.status_message = "Board saved".to_string();
                if self.file_path.as_ref() != Some(&path) {
                    // Later edits go straight to the new file.
                    let board = self.planner.board().clone();
                    self.load(board, Some(path));
                }
            }
            Err(e) => self.status_message = format!("Error saving: {}", e),
        }
    }

    // --- Board operations ---

    pub fn add_sprint(&mut self) {
        let id = self.planner.add_sprint(None, today());
        if let Some(sprint) = self.planner.board().timeline.find(id) {
            self.status_message = format!(
                "Added '{}' ({} → {})",
                sprint.name,
                sprint.start.format("%Y-%m-%d"),
                sprint.end.format("%Y-%m-%d")
            );
        }
    }

    pub fn add_lane(&mut self) {
        let count = self.planner.board().lanes.len();
        self.planner
            .add_lane(format!("Lane {}", count + 1), ui::theme::lane_color(count));
        self.status_message = "Lane added".to_string();
    }

    pub fn add_card(&mut self) {
        let board = self.planner.board();
        let target = self.selected_cell.or_else(|| {
            let lane = board.lanes.lanes().first()?.id;
            Some((lane, board.timeline.id_at(0)?))
        });
        let Some((lane, sprint)) = target else {
            self.status_message = "Add a lane and a sprint first".to_string();
            return;
        };
        match self.planner.add_card("New Card", Some(lane), sprint) {
            Ok(id) => {
                self.selected_card = Some(id);
                self.card_editor = Some(CardEditor {
                    card: id,
                    name: "New Card".to_string(),
                });
                self.status_message = "Card added".to_string();
            }
            Err(e) => self.status_message = format!("Cannot add card: {}", e),
        }
    }

    pub fn apply_sprint_edit(&mut self, editor: &SprintEditor) -> bool {
        let Some(sprint) = self.planner.board().timeline.find(editor.sprint).cloned() else {
            return true;
        };
        if editor.name != sprint.name {
            if let Err(e) = self.planner.rename_sprint(sprint.id, editor.name.clone()) {
                self.status_message = format!("Cannot rename sprint: {}", e);
                return false;
            }
        }
        for (field, value) in ui::dialogs::changed_dates(editor, sprint.start, sprint.end) {
            if let Err(e) = self.planner.set_sprint_date(sprint.id, field, value) {
                self.status_message = format!("Cannot change dates: {}", e);
                return false;
            }
        }
        self.status_message = format!("Updated '{}'", editor.name);
        true
    }

    pub fn remove_sprint(&mut self, sprint: SprintId) {
        match self.planner.remove_sprint(sprint) {
            Ok(Some(target)) => {
                let name = self
                    .planner
                    .board()
                    .timeline
                    .find(target)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                self.status_message = format!("Sprint removed; cards moved to '{}'", name);
            }
            Ok(None) => self.status_message = "Sprint removed; cards moved to the pool".to_string(),
            Err(e) => self.status_message = format!("Cannot remove sprint: {}", e),
        }
    }

    pub fn rename_lane(&mut self, lane: LaneId, name: &str) {
        match self.planner.rename_lane(lane, name) {
            Ok(()) => self.status_message = "Lane renamed".to_string(),
            Err(e) => self.status_message = format!("Cannot rename lane: {}", e),
        }
    }

    pub fn remove_lane(&mut self, lane: LaneId) {
        match self.planner.remove_lane(lane) {
            Ok(moved) => {
                if self.selected_cell.map_or(false, |(l, _)| l == lane) {
                    self.selected_cell = None;
                }
                self.status_message = format!("Lane removed; {} card(s) moved to the pool", moved.len());
            }
            Err(e) => self.status_message = format!("Cannot remove lane: {}", e),
        }
    }

    pub fn rename_card(&mut self, card: CardId, name: &str) {
        match self.planner.rename_card(card, name) {
            Ok(()) => self.status_message = "Card updated".to_string(),
            Err(e) => self.status_message = format!("Cannot rename card: {}", e),
        }
    }

    pub fn delete_card(&mut self, card: CardId) {
        match self.planner.delete_card(card) {
            Ok(removed) => {
                if self.selected_card == Some(card) {
                    self.selected_card = None;
                }
                self.status_message = format!("Deleted '{}'", removed.name);
            }
            Err(e) => self.status_message = format!("Cannot delete card: {}", e),
        }
    }

    pub fn reset_sizes(&mut self) {
        self.planner.set_overrides(Default::default());
        self.save_view_prefs();
        self.status_message = "Sizes reset".to_string();
    }

    fn save_view_prefs(&mut self) {
        if let Err(e) = config::save_overrides(&self.paths.view_file, self.planner.overrides()) {
            warn!(%e, "could not save view preferences");
        }
    }

    // --- Canvas outcomes ---

    fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::None => {}
            Outcome::Cancelled => self.status_message = "Drop cancelled".to_string(),
            Outcome::Clicked(card) => {
                self.selected_card = Some(card);
                if let Some(c) = self.planner.board().cards.get(card) {
                    self.card_editor = Some(CardEditor {
                        card,
                        name: c.name.clone(),
                    });
                }
            }
            Outcome::CellClicked(hit) => {
                self.selected_card = None;
                self.selected_cell = self
                    .planner
                    .board()
                    .timeline
                    .id_at(hit.sprint_idx)
                    .map(|sprint| (hit.lane_id, sprint));
            }
            Outcome::SprintClicked(sprint) => {
                if let Some(s) = self.planner.board().timeline.find(sprint) {
                    self.sprint_editor = Some(SprintEditor {
                        sprint,
                        name: s.name.clone(),
                        start: s.start,
                        end: s.end,
                    });
                }
            }
            Outcome::LaneClicked(lane) => {
                if let Some(l) = self.planner.board().lanes.find(lane) {
                    self.lane_editor = Some(LaneEditor {
                        lane,
                        name: l.name.clone(),
                    });
                }
            }
            Outcome::Commit(commit) => {
                if commit.is_view_only() {
                    self.save_view_prefs();
                }
                self.status_message = self.describe(&commit);
            }
        }
    }

    fn describe(&self, commit: &Commit) -> String {
        let board = self.planner.board();
        let card_name = |id: CardId| board.cards.get(id).map(|c| c.name.clone()).unwrap_or_default();
        let sprint_name = |id: SprintId| board.timeline.find(id).map(|s| s.name.clone()).unwrap_or_default();
        match commit {
            Commit::MoveCard {
                card, start_sprint, ..
            } => format!("Moved '{}' to {}", card_name(*card), sprint_name(*start_sprint)),
            Commit::ResizeSpan {
                card,
                start_sprint,
                end_sprint,
            } => format!(
                "'{}' now spans {} → {}",
                card_name(*card),
                sprint_name(*start_sprint),
                sprint_name(*end_sprint)
            ),
            Commit::ReorderCard { card, .. } => format!("Reordered '{}'", card_name(*card)),
            Commit::ReorderLanes(_) => "Lanes reordered".to_string(),
            Commit::ResizeSprintDuration { sprint, .. } => match board.timeline.find(*sprint) {
                Some(s) => format!("'{}' now lasts {} days", s.name, s.duration_days),
                None => "Sprint resized".to_string(),
            },
            Commit::SprintWidth { .. } | Commit::LaneHeight { .. } | Commit::LaneHeaderWidth(_) => {
                "Layout updated".to_string()
            }
        }
    }

    fn handle_sync_events(&mut self) {
        for event in self.planner.poll_sync() {
            match event {
                SyncEvent::Failed { label, error, .. } => {
                    self.status_message = format!("Could not {}: {} (reverted)", label, error);
                }
                SyncEvent::Confirmed { .. } | SyncEvent::Stale { .. } => {}
            }
        }
    }
}

impl eframe::App for RoadmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);
        self.handle_sync_events();

        // Handle keyboard shortcuts outside closures to avoid borrow issues
        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        let unfocused = ctx.input(|i| i.viewport().focused == Some(false));
        if should_save {
            self.save_board();
        }
        if escape {
            self.on_escape();
        } else if unfocused {
            if let Outcome::Cancelled = self.planner.cancel() {
                self.status_message = "Drag cancelled".to_string();
            }
        }

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let board = self.planner.board();
                        ui.label(
                            egui::RichText::new(format!(
                                "Sprints: {} · Lanes: {} · Cards: {}",
                                board.timeline.len(),
                                board.lanes.len(),
                                board.cards.cards().len()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                        let pending = self.planner.pending_count();
                        if pending > 0 {
                            ui.label(
                                egui::RichText::new(format!("Syncing {} · ", pending))
                                    .size(10.5)
                                    .color(ui::theme::TEXT_DIM),
                            );
                        }
                    });
                });
            });

        // Left panel: unassigned pool
        let mut pool_error = None;
        egui::SidePanel::left("pool_panel")
            .default_width(ui::theme::POOL_PANEL_WIDTH)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                pool_error = ui::pool::show_pool(&mut self.planner, self.selected_card, ui);
            });
        if let Some(e) = pool_error {
            self.status_message = e;
        }

        // Central panel: planning grid
        let canvas_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let canvas = egui::CentralPanel::default()
            .frame(canvas_frame)
            .show(ctx, |ui| {
                ui::board_canvas::show_board_canvas(&mut self.planner, self.selected_card, today(), ui)
            })
            .inner;
        if let Some(e) = canvas.error {
            self.status_message = e;
        }
        if let Some(outcome) = canvas.outcome {
            self.handle_outcome(outcome);
        }

        // Dialogs
        ui::dialogs::show_sprint_popover(self, ctx);
        ui::dialogs::show_lane_popover(self, ctx);
        ui::dialogs::show_card_window(self, ctx);
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_grid::interaction::Gesture;

    fn app() -> RoadmapApp {
        RoadmapApp {
            planner: Planner::new(Board::sample(today()), &Config::default()),
            paths: Paths::local(),
            file_path: None,
            selected_card: None,
            selected_cell: None,
            sprint_editor: None,
            lane_editor: None,
            card_editor: None,
            show_about: false,
            status_message: String::new(),
            ctx: egui::Context::default(),
        }
    }

    #[test]
    fn escape_discards_open_edits() {
        let mut app = app();
        let board = app.planner.board().clone();
        let sprint = board.timeline.sprints()[0].clone();
        let lane = board.lanes.ids()[0];
        let card = board.cards.cards()[0].id;
        app.sprint_editor = Some(SprintEditor {
            sprint: sprint.id,
            name: "Edited".into(),
            start: sprint.start,
            end: sprint.end,
        });
        app.lane_editor = Some(LaneEditor {
            lane,
            name: "Edited".into(),
        });
        app.card_editor = Some(CardEditor {
            card,
            name: "Edited".into(),
        });

        app.on_escape();

        assert!(app.sprint_editor.is_none());
        assert!(app.lane_editor.is_none());
        assert!(app.card_editor.is_none());
        assert_eq!(app.planner.board(), &board);
        assert_eq!(app.status_message, "Edit discarded");
    }

    #[test]
    fn escape_cancels_a_drag() {
        let mut app = app();
        let card = app.planner.board().cards.cards()[0].id;
        let from = app.planner.resolve_card_rect(card).unwrap().center();
        app.planner.pointer_down(from).unwrap();
        app.planner.pointer_move(from + egui::Vec2::new(40.0, 0.0));
        assert!(matches!(app.planner.gesture(), Some(Gesture::Relocate { .. })));

        app.on_escape();

        assert!(app.planner.session().is_none());
        assert_eq!(app.status_message, "Drag cancelled");
    }
}
