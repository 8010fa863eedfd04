use chrono::NaiveDate;
use egui::{Color32, Context, RichText, Window};
use egui_phosphor::regular as icons;

use roadmap_grid::model::{CardId, DateField, LaneId, SprintId};

use crate::app::RoadmapApp;
use crate::ui::theme;

/// Open sprint popover and its unsaved field values.
#[derive(Debug, Clone)]
pub struct SprintEditor {
    pub sprint: SprintId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct LaneEditor {
    pub lane: LaneId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CardEditor {
    pub card: CardId,
    pub name: String,
}

enum Action {
    None,
    Apply,
    Remove,
    Close,
}

fn primary_button(label: &str) -> egui::Button<'static> {
    egui::Button::new(RichText::new(label.to_string()).color(Color32::WHITE))
        .fill(theme::ACCENT)
        .rounding(egui::Rounding::same(4.0))
}

fn danger_button(label: &str) -> egui::Button<'static> {
    egui::Button::new(RichText::new(label.to_string()).color(Color32::WHITE))
        .fill(theme::DANGER)
        .rounding(egui::Rounding::same(4.0))
}

/// Render the sprint popover: name, start and end dates, removal.
pub fn show_sprint_popover(app: &mut RoadmapApp, ctx: &Context) {
    let Some(editor) = app.sprint_editor.as_mut() else {
        return;
    };
    let mut action = Action::None;
    let mut open = true;
    Window::new(RichText::new(format!("{} Sprint", icons::CALENDAR)).strong().size(14.0))
        .id(egui::Id::new("sprint_popover"))
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([theme::DIALOG_WIDTH, 0.0])
        .show(ctx, |ui| {
            ui.visuals_mut().extreme_bg_color = theme::BG_FIELD;
            ui.add_space(4.0);
            egui::Grid::new("sprint_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Name").color(theme::TEXT_SECONDARY));
                    ui.add_sized(
                        [200.0, 24.0],
                        egui::TextEdit::singleline(&mut editor.name).hint_text("Sprint name..."),
                    );
                    ui.end_row();

                    ui.label(RichText::new("Start").color(theme::TEXT_SECONDARY));
                    ui.add(egui_extras::DatePickerButton::new(&mut editor.start).id_salt("sprint_dp_start"));
                    ui.end_row();

                    ui.label(RichText::new("End").color(theme::TEXT_SECONDARY));
                    ui.add(egui_extras::DatePickerButton::new(&mut editor.end).id_salt("sprint_dp_end"));
                    ui.end_row();
                });
            ui.label(
                RichText::new("Later sprints move with the end date.")
                    .font(theme::font_small())
                    .color(theme::TEXT_DIM),
            );

            ui.add_space(6.0);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.add_sized([80.0, 28.0], primary_button("Apply")).clicked() {
                    action = Action::Apply;
                }
                if ui.add_sized([80.0, 28.0], danger_button("Remove")).clicked() {
                    action = Action::Remove;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                    action = Action::Close;
                }
            });
        });
    if !open {
        action = Action::Close;
    }

    let editor = editor.clone();
    match action {
        Action::None => {}
        Action::Close => app.sprint_editor = None,
        Action::Remove => {
            app.remove_sprint(editor.sprint);
            app.sprint_editor = None;
        }
        Action::Apply => {
            if app.apply_sprint_edit(&editor) {
                app.sprint_editor = None;
            }
        }
    }
}

/// Render the lane popover: rename and removal.
pub fn show_lane_popover(app: &mut RoadmapApp, ctx: &Context) {
    let Some(editor) = app.lane_editor.as_mut() else {
        return;
    };
    let mut action = Action::None;
    let mut open = true;
    Window::new(RichText::new(format!("{} Lane", icons::ROWS)).strong().size(14.0))
        .id(egui::Id::new("lane_popover"))
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([theme::DIALOG_WIDTH, 0.0])
        .show(ctx, |ui| {
            ui.visuals_mut().extreme_bg_color = theme::BG_FIELD;
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label(RichText::new("Name").color(theme::TEXT_SECONDARY));
                let edit = ui.add_sized(
                    [220.0, 24.0],
                    egui::TextEdit::singleline(&mut editor.name).hint_text("Lane name..."),
                );
                if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    action = Action::Apply;
                }
            });
            ui.label(
                RichText::new("Removing a lane moves its cards to the unassigned pool.")
                    .font(theme::font_small())
                    .color(theme::TEXT_DIM),
            );
            ui.add_space(6.0);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.add_sized([80.0, 28.0], primary_button("Rename")).clicked() {
                    action = Action::Apply;
                }
                if ui.add_sized([80.0, 28.0], danger_button("Remove")).clicked() {
                    action = Action::Remove;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                    action = Action::Close;
                }
            });
        });
    if !open {
        action = Action::Close;
    }

    let editor = editor.clone();
    match action {
        Action::None => {}
        Action::Close => app.lane_editor = None,
        Action::Remove => {
            app.remove_lane(editor.lane);
            app.lane_editor = None;
        }
        Action::Apply => {
            app.rename_lane(editor.lane, &editor.name);
            app.lane_editor = None;
        }
    }
}

/// Render the card detail window.
pub fn show_card_window(app: &mut RoadmapApp, ctx: &Context) {
    let Some(editor) = app.card_editor.as_mut() else {
        return;
    };
    let board = app.planner.board();
    let Some(card) = board.cards.get(editor.card) else {
        app.card_editor = None;
        return;
    };
    let lane = card
        .lane_id
        .and_then(|id| board.lanes.find(id))
        .map_or_else(|| "Unassigned".to_string(), |l| l.name.clone());
    let span = match (
        board.timeline.find(card.start_sprint),
        board.timeline.find(card.end_sprint),
    ) {
        (Some(s), Some(e)) if s.id == e.id => s.name.clone(),
        (Some(s), Some(e)) => format!("{} → {}", s.name, e.name),
        _ => "No sprint".to_string(),
    };
    let metadata: Vec<(String, String)> = card
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();

    let mut action = Action::None;
    let mut open = true;
    Window::new(RichText::new(format!("{} Card", icons::PENCIL_SIMPLE)).strong().size(14.0))
        .id(egui::Id::new("card_window"))
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .default_pos([320.0, 160.0])
        .fixed_size([theme::DIALOG_WIDTH, 0.0])
        .show(ctx, |ui| {
            ui.visuals_mut().extreme_bg_color = theme::BG_FIELD;
            ui.add_space(4.0);
            egui::Grid::new("card_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Name").color(theme::TEXT_SECONDARY));
                    ui.add_sized([220.0, 24.0], egui::TextEdit::singleline(&mut editor.name));
                    ui.end_row();

                    ui.label(RichText::new("Lane").color(theme::TEXT_SECONDARY));
                    ui.label(&lane);
                    ui.end_row();

                    ui.label(RichText::new("Sprints").color(theme::TEXT_SECONDARY));
                    ui.label(&span);
                    ui.end_row();

                    for (key, value) in &metadata {
                        ui.label(RichText::new(key).color(theme::TEXT_DIM));
                        ui.label(value);
                        ui.end_row();
                    }
                });
            ui.add_space(6.0);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.add_sized([80.0, 28.0], primary_button("Save")).clicked() {
                    action = Action::Apply;
                }
                if ui
                    .add_sized([80.0, 28.0], danger_button(&format!("{} Delete", icons::TRASH)))
                    .clicked()
                {
                    action = Action::Remove;
                }
            });
        });
    if !open {
        action = Action::Close;
    }

    let editor = editor.clone();
    match action {
        Action::None => {}
        Action::Close => app.card_editor = None,
        Action::Remove => {
            app.delete_card(editor.card);
            app.card_editor = None;
        }
        Action::Apply => {
            app.rename_card(editor.card, &editor.name);
            app.card_editor = None;
        }
    }
}

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut RoadmapApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 180.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Roadmap Grid").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Sprints across, lanes down,");
                ui.label("cards where they meet.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close {
        app.show_about = false;
    }
}

/// Date edits to apply for a sprint currently spanning `start..=end`, ordered
/// so the intermediate sprint never ends before it starts.
pub fn changed_dates(editor: &SprintEditor, start: NaiveDate, end: NaiveDate) -> Vec<(DateField, NaiveDate)> {
    let mut changes = Vec::new();
    if editor.start != start {
        changes.push((DateField::Start, editor.start));
    }
    if editor.end != end {
        changes.push((DateField::End, editor.end));
    }
    if editor.end > end {
        changes.reverse();
    }
    changes
}
