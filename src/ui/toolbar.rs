use crate::app::RoadmapApp;
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icons;

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut RoadmapApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  New Board", icons::FILE)).clicked() {
                app.new_board();
                ui.close_menu();
            }
            if ui.button(format!("{}  Open...", icons::FOLDER_OPEN)).clicked() {
                app.open_board();
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Save          Ctrl+S", icons::FLOPPY_DISK)).clicked() {
                app.save_board();
                ui.close_menu();
            }
            if ui.button("    Save As...").clicked() {
                app.save_board_as();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Board  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  Add Sprint", icons::CALENDAR)).clicked() {
                app.add_sprint();
                ui.close_menu();
            }
            if ui.button(format!("{}  Add Lane", icons::ROWS)).clicked() {
                app.add_lane();
                ui.close_menu();
            }
            if ui.button(format!("{}  Add Card", icons::PLUS)).clicked() {
                app.add_card();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            if ui.button("  Reset Column & Row Sizes").clicked() {
                app.reset_sizes();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  About", icons::INFO)).clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();
        if ui.button(format!("{} Sprint", icons::PLUS)).clicked() {
            app.add_sprint();
        }
        if ui.button(format!("{} Lane", icons::PLUS)).clicked() {
            app.add_lane();
        }
        if ui.button(format!("{} Card", icons::PLUS)).clicked() {
            app.add_card();
        }

        // Right-aligned board name
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let modified = if app.file_path.is_some() { "" } else { " (unsaved)" };
            ui.label(
                RichText::new(format!("{}{}", app.planner.board().name, modified))
                    .size(11.0)
                    .weak(),
            );
        });
    });
}
