use chrono::NaiveDate;
use egui::{Align2, Color32, CursorIcon, Painter, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};

use roadmap_grid::geometry::{CardZone, GridGeometry, PressTarget};
use roadmap_grid::interaction::{Gesture, Outcome, Session};
use roadmap_grid::model::{Card, CardId};
use roadmap_grid::Planner;

use crate::ui::theme;

const CANVAS_MARGIN: f32 = 40.0;

/// What happened on the canvas this frame.
#[derive(Debug, Default)]
pub struct CanvasResponse {
    pub outcome: Option<Outcome>,
    pub error: Option<String>,
}

/// Render the planning grid and feed raw pointer input to the planner.
pub fn show_board_canvas(
    planner: &mut Planner,
    selected: Option<CardId>,
    today: NaiveDate,
    ui: &mut Ui,
) -> CanvasResponse {
    let mut out = CanvasResponse::default();

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let available = ui.available_size();
            let content = planner.geometry().total_size() + Vec2::splat(CANVAS_MARGIN);
            let (response, painter) =
                ui.allocate_painter(content.max(available), Sense::click_and_drag());
            planner.set_origin(response.rect.min);

            handle_pointer(planner, &response, &mut out, ui);

            // Lay out from the live preview so reordered lanes and cards move
            // while they are dragged.
            let shown = planner.preview_board();
            let geo = GridGeometry::new(&shown, planner.overrides(), planner.metrics(), response.rect.min);
            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
            draw_lane_rows(&painter, &geo);
            draw_sprint_headers(&painter, &geo);
            draw_lane_headers(&painter, &geo);
            draw_today_line(&painter, &geo, today);

            let dragged = planner.gesture().and_then(|g| match g {
                Gesture::Relocate { card, .. } => Some(*card),
                _ => None,
            });
            let rects = geo.card_rects();
            for card in geo.board().cards.cards() {
                let Some(&rect) = rects.get(&card.id) else {
                    continue;
                };
                let alpha = if dragged == Some(card.id) { 90 } else { 255 };
                paint_card(&painter, rect, card, &geo, selected == Some(card.id), alpha);
            }

            if let Some(session) = planner.session() {
                if session.is_active() {
                    draw_preview(&painter, &geo, session);
                }
            }
            update_cursor(ui, &response, &geo, planner.session());
        });

    out
}

fn handle_pointer(planner: &mut Planner, response: &egui::Response, out: &mut CanvasResponse, ui: &Ui) {
    let (pressed, released, pos) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
        )
    });
    let Some(pos) = pos else {
        return;
    };

    if pressed && planner.session().is_none() && response.hovered() {
        if let Err(err) = planner.pointer_down(pos) {
            out.error = Some(err.to_string());
        }
    }
    if planner.session().is_none() {
        return;
    }
    if released {
        match planner.pointer_up(pos) {
            Ok(outcome) => out.outcome = Some(outcome),
            Err(err) => out.error = Some(err.to_string()),
        }
    } else {
        planner.pointer_move(pos);
    }
}

fn update_cursor(ui: &Ui, response: &egui::Response, geo: &GridGeometry<'_>, session: Option<&Session>) {
    let target = match session {
        Some(session) => Some(session.press),
        None if response.hovered() => response.hover_pos().and_then(|p| geo.press_target(p)),
        None => None,
    };
    let icon = match target {
        Some(PressTarget::SprintWidthEdge(_))
        | Some(PressTarget::SprintDurationEdge(_))
        | Some(PressTarget::LaneHeaderEdge) => CursorIcon::ResizeHorizontal,
        Some(PressTarget::Card {
            zone: CardZone::LeftEdge | CardZone::RightEdge,
            ..
        }) => CursorIcon::ResizeHorizontal,
        Some(PressTarget::LaneHeightEdge(_)) => CursorIcon::ResizeVertical,
        Some(PressTarget::LaneGrip(_)) => {
            if session.is_some() {
                CursorIcon::Grabbing
            } else {
                CursorIcon::Grab
            }
        }
        Some(PressTarget::Card { .. }) if session.map_or(false, |s| s.is_active()) => CursorIcon::Grabbing,
        _ => return,
    };
    ui.ctx().set_cursor_icon(icon);
}

fn draw_sprint_headers(painter: &Painter, geo: &GridGeometry<'_>) {
    let board = geo.board();
    let bottom = geo.origin().y + geo.total_size().y;
    for (idx, sprint) in board.timeline.sprints().iter().enumerate() {
        let Some(rect) = geo.sprint_header_rect(idx) else {
            continue;
        };
        painter.rect_filled(rect, 0.0, theme::BG_HEADER);
        let clipped = painter.with_clip_rect(rect.shrink(2.0));
        clipped.text(
            Pos2::new(rect.left() + 8.0, rect.top() + 14.0),
            Align2::LEFT_CENTER,
            &sprint.name,
            theme::font_header(),
            theme::TEXT_PRIMARY,
        );
        clipped.text(
            Pos2::new(rect.left() + 8.0, rect.top() + rect.height() * 0.72),
            Align2::LEFT_CENTER,
            format!(
                "{} → {} · {}d",
                sprint.start.format("%d %b"),
                sprint.end.format("%d %b"),
                sprint.duration_days
            ),
            theme::font_sub(),
            theme::TEXT_SECONDARY,
        );

        // Column separator, then the two edge grips: width above, duration below.
        let x = rect.right();
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, bottom)],
            Stroke::new(0.5, theme::GRID_LINE),
        );
        let mid = rect.center().y;
        painter.line_segment(
            [Pos2::new(x, rect.top() + 6.0), Pos2::new(x, mid - 3.0)],
            Stroke::new(2.0, theme::GRIP_COLOR),
        );
        painter.line_segment(
            [Pos2::new(x, mid + 3.0), Pos2::new(x, rect.bottom() - 6.0)],
            Stroke::new(2.0, theme::ACCENT),
        );
    }

    let origin = geo.origin();
    let header_bottom = origin.y + geo.metrics().header_height;
    painter.line_segment(
        [
            Pos2::new(origin.x, header_bottom),
            Pos2::new(origin.x + geo.total_size().x, header_bottom),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );
}

fn draw_lane_rows(painter: &Painter, geo: &GridGeometry<'_>) {
    for (i, lane) in geo.board().lanes.lanes().iter().enumerate() {
        let Some(rect) = geo.lane_rect(lane.id) else {
            continue;
        };
        let fill = if i % 2 == 0 {
            theme::BG_DARK
        } else {
            theme::BG_LANE_ALT
        };
        painter.rect_filled(rect, 0.0, fill);
        painter.line_segment(
            [rect.left_bottom(), rect.right_bottom()],
            Stroke::new(0.5, theme::BORDER_SUBTLE),
        );
    }
}

fn draw_lane_headers(painter: &Painter, geo: &GridGeometry<'_>) {
    let m = geo.metrics();
    for lane in geo.board().lanes.lanes() {
        let Some(rect) = geo.lane_header_rect(lane.id) else {
            continue;
        };
        painter.rect_filled(rect, 0.0, theme::BG_HEADER);

        // Grip dots
        let grip_x = rect.left() + m.lane_grip_width / 2.0;
        for row in -1..=1 {
            for col in [-2.5, 2.5] {
                painter.circle_filled(
                    Pos2::new(grip_x + col, rect.center().y + row as f32 * 5.0),
                    1.3,
                    theme::GRIP_COLOR,
                );
            }
        }

        let stripe = Rect::from_min_size(
            Pos2::new(rect.left() + m.lane_grip_width, rect.top() + 4.0),
            Vec2::new(3.0, rect.height() - 8.0),
        );
        painter.rect_filled(stripe, Rounding::same(1.5), lane.color);

        let clipped = painter.with_clip_rect(rect.shrink(2.0));
        clipped.text(
            Pos2::new(stripe.right() + 8.0, rect.top() + 16.0),
            Align2::LEFT_CENTER,
            &lane.name,
            theme::font_header(),
            theme::TEXT_PRIMARY,
        );
        let count = geo.board().cards.in_lane(lane.id).count();
        clipped.text(
            Pos2::new(stripe.right() + 8.0, rect.top() + 32.0),
            Align2::LEFT_CENTER,
            format!("{count} cards"),
            theme::font_small(),
            theme::TEXT_DIM,
        );
        painter.line_segment(
            [rect.left_bottom(), rect.right_bottom()],
            Stroke::new(1.0, theme::BORDER_SUBTLE),
        );
    }

    let origin = geo.origin();
    let x = origin.x + geo.lane_header_width();
    painter.line_segment(
        [Pos2::new(x, origin.y), Pos2::new(x, origin.y + geo.total_size().y)],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );
}

fn draw_today_line(painter: &Painter, geo: &GridGeometry<'_>, today: NaiveDate) {
    let sprints = geo.board().timeline.sprints();
    let Some(idx) = sprints.iter().position(|s| s.start <= today && today <= s.end) else {
        return;
    };
    let (Some(rect), Some(sprint)) = (geo.sprint_rect(idx), sprints.get(idx)) else {
        return;
    };
    let day = (today - sprint.start).num_days() as f32 + 0.5;
    let x = rect.left() + rect.width() * day / sprint.duration_days.max(1) as f32;
    let top = rect.top() + geo.metrics().header_height;

    painter.line_segment(
        [Pos2::new(x, top), Pos2::new(x, rect.bottom())],
        Stroke::new(1.5, theme::TODAY_LINE),
    );
    let badge = Rect::from_min_size(Pos2::new(x - 21.0, top - 1.0), Vec2::new(42.0, 14.0));
    painter.rect_filled(badge, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge.center(),
        Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

/// Paint one card. Shared by the grid and the unassigned pool.
pub fn paint_card(
    painter: &Painter,
    rect: Rect,
    card: &Card,
    geo: &GridGeometry<'_>,
    is_selected: bool,
    alpha: u8,
) {
    let lane_color = card
        .lane_id
        .and_then(|id| geo.board().lanes.find(id))
        .map_or(theme::TEXT_DIM, |l| l.color);
    let fill = theme::card_fill(lane_color);
    let fill = Color32::from_rgba_unmultiplied(fill.r(), fill.g(), fill.b(), alpha);
    let rounding = Rounding::same(theme::CARD_ROUNDING);

    painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(rect, rounding, fill);

    if is_selected {
        painter.rect_stroke(
            rect.expand(1.5),
            Rounding::same(theme::CARD_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if rect.width() > 24.0 {
        let galley = painter.layout_no_wrap(card.name.clone(), theme::font_card(), theme::TEXT_ON_CARD);
        let text_y = rect.top() + (rect.height() - galley.size().y) / 2.0;
        painter
            .with_clip_rect(rect.shrink(2.0))
            .galley(Pos2::new(rect.left() + 6.0, text_y), galley, Color32::TRANSPARENT);
    }
}

fn draw_preview(painter: &Painter, geo: &GridGeometry<'_>, session: &Session) {
    let Some(gesture) = session.gesture.as_ref() else {
        return;
    };
    let board = geo.board();
    let m = geo.metrics();
    let origin = geo.origin();
    let accent = Stroke::new(2.0, theme::ACCENT);
    let full_height = geo.total_size().y;

    match gesture {
        Gesture::Relocate { card, target } => {
            if let Some(hit) = target {
                if let Some(cell) = geo.cell_rect(hit.lane_id, hit.sprint_idx) {
                    painter.rect_filled(cell, 0.0, theme::BG_DROP_TARGET);
                    painter.rect_stroke(cell.shrink(1.0), 0.0, accent);
                }
            }
            let Some(c) = board.cards.get(*card) else {
                return;
            };
            let ghost = match geo.card_rect(*card) {
                Some(rect) => rect.translate(session.delta()),
                None => Rect::from_min_size(
                    session.pointer - Vec2::new(12.0, m.card_height / 2.0),
                    Vec2::new(m.sprint_width - 2.0 * m.cell_padding, m.card_height),
                ),
            };
            paint_card(painter, ghost, c, geo, true, 200);
        }
        Gesture::ResizeSpan { card, preview, .. } => {
            let Some(lane) = board.cards.get(*card).and_then(|c| c.lane_id) else {
                return;
            };
            let (Some(first), Some(last), Some(rect)) = (
                geo.cell_rect(lane, preview.0),
                geo.cell_rect(lane, preview.1),
                geo.card_rect(*card),
            ) else {
                return;
            };
            let outline = Rect::from_min_max(
                Pos2::new(first.left() + m.cell_padding, rect.top()),
                Pos2::new(last.right() - m.cell_padding, rect.bottom()),
            );
            painter.rect_stroke(outline, Rounding::same(theme::CARD_ROUNDING), accent);
        }
        Gesture::ReorderInCell { card, .. } => {
            if let Some(rect) = geo.card_rect(*card) {
                painter.rect_stroke(rect.expand(1.5), Rounding::same(theme::CARD_ROUNDING + 1.5), accent);
            }
        }
        Gesture::ResizeSprintWidth { sprint, width, .. } => {
            let Some(rect) = board.timeline.index_of(*sprint).and_then(|i| geo.sprint_rect(i)) else {
                return;
            };
            let x = rect.left() + width;
            painter.line_segment([Pos2::new(x, origin.y), Pos2::new(x, origin.y + full_height)], accent);
        }
        Gesture::ResizeLaneHeight { lane, height, .. } => {
            let Some(rect) = geo.lane_rect(*lane) else {
                return;
            };
            let y = rect.top() + height;
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], accent);
        }
        Gesture::ResizeLaneHeaderWidth { width, .. } => {
            let x = origin.x + width;
            painter.line_segment([Pos2::new(x, origin.y), Pos2::new(x, origin.y + full_height)], accent);
        }
        Gesture::ReorderLanes { lane, .. } => {
            if let Some(header) = geo.lane_header_rect(*lane) {
                painter.rect_filled(header, 0.0, theme::BG_SELECTED);
            }
            if let Some(row) = geo.lane_rect(*lane) {
                let row = Rect::from_min_max(Pos2::new(origin.x, row.top()), row.max);
                painter.rect_stroke(row.shrink(1.0), 0.0, Stroke::new(2.0, theme::ACCENT));
            }
        }
        Gesture::ResizeSprintDuration { sprint, day_delta } => {
            let Some(idx) = board.timeline.index_of(*sprint) else {
                return;
            };
            let (Some(rect), Some(s)) = (geo.sprint_header_rect(idx), board.timeline.get(idx)) else {
                return;
            };
            let days = (s.duration_days + day_delta).max(1);
            let label = format!("{:+}d → {}d", days - s.duration_days, days);
            let galley = painter.layout_no_wrap(label, theme::font_sub(), Color32::WHITE);
            let badge = Rect::from_min_size(
                Pos2::new(rect.right() - galley.size().x - 14.0, rect.bottom() + 4.0),
                galley.size() + Vec2::new(12.0, 4.0),
            );
            painter.rect_filled(badge, Rounding::same(3.0), theme::ACCENT);
            painter.galley(badge.min + Vec2::new(6.0, 2.0), galley, Color32::WHITE);
        }
    }
}
