use egui::{RichText, Sense, Ui, Vec2};

use roadmap_grid::model::CardId;
use roadmap_grid::Planner;

use crate::ui::board_canvas::paint_card;
use crate::ui::theme;

/// Render the unassigned pool. Pressing a card starts a relocation drag
/// that the canvas finishes when the pointer is released over a cell.
pub fn show_pool(planner: &mut Planner, selected: Option<CardId>, ui: &mut Ui) -> Option<String> {
    ui.label(
        RichText::new(format!("{} Unassigned", egui_phosphor::regular::TRAY))
            .font(theme::font_header())
            .color(theme::TEXT_PRIMARY),
    );
    ui.add_space(4.0);

    let pressed = ui.input(|i| i.pointer.primary_pressed());
    let mut grabbed = None;
    {
        let geo = planner.geometry();
        let pool = geo.board().cards.unassigned();
        if pool.is_empty() {
            ui.label(
                RichText::new("Cards from removed lanes land here.")
                    .font(theme::font_small())
                    .color(theme::TEXT_DIM),
            );
        }
        let height = geo.metrics().card_height;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for card in pool {
                let (rect, response) =
                    ui.allocate_exact_size(Vec2::new(ui.available_width(), height), Sense::click_and_drag());
                paint_card(ui.painter(), rect, card, &geo, selected == Some(card.id), 255);
                if pressed && response.hovered() {
                    if let Some(pos) = response.hover_pos() {
                        grabbed = Some((card.id, pos));
                    }
                }
                response.on_hover_text("Drag onto the grid to place");
                ui.add_space(4.0);
            }
        });
    }

    let (card, pos) = grabbed?;
    planner.begin_pool_drag(card, pos).err().map(|e| e.to_string())
}
