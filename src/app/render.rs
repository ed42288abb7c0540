use eframe::egui;
use flowboard::coords::{CLAMP_MAX, CLAMP_MIN, to_screen};
use flowboard::curve::EdgeCurve;
use flowboard::drag::{DragState, Grab};
use flowboard::layout::{StepKind, SwimlaneLayout};
use flowboard::model::{LineStyle, Point, Rgba};
use flowboard::settings::{Settings, SwimlaneSettings};
use flowboard::store::EntityStore;

const PARTICIPANT_RADIUS: f32 = 22.0;
const HANDLE_RADIUS: f32 = 5.0;
const CURVE_SAMPLES: usize = 24;

fn color(rgba: Rgba) -> egui::Color32 {
    rgba.to_color32()
}

fn text_color(painter: &egui::Painter) -> egui::Color32 {
    painter.ctx().style().visuals.text_color()
}

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect) {
    let bg = painter.ctx().style().visuals.extreme_bg_color;
    painter.rect_filled(rect, 0.0, bg);
    let grid_color = egui::Color32::from_gray(50);
    for i in 1..10 {
        let t = i as f32 * 10.0;
        let x = to_screen(Point::new(t, 0.0), rect).x;
        let y = to_screen(Point::new(0.0, t), rect).y;
        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            egui::Stroke::new(1.0, grid_color),
        );
        painter.line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(1.0, grid_color),
        );
    }
    let safe = egui::Rect::from_min_max(
        to_screen(Point::new(CLAMP_MIN, CLAMP_MIN), rect),
        to_screen(Point::new(CLAMP_MAX, CLAMP_MAX), rect),
    );
    draw_styled_polyline(
        painter,
        &[
            safe.left_top(),
            safe.right_top(),
            safe.right_bottom(),
            safe.left_bottom(),
            safe.left_top(),
        ],
        egui::Stroke::new(1.0, egui::Color32::from_gray(80)),
        LineStyle::Dotted,
    );
}

pub(super) fn draw_board(
    painter: &egui::Painter,
    rect: egui::Rect,
    store: &EntityStore,
    settings: &Settings,
    curves: &[EdgeCurve],
    drag: &DragState,
) {
    let screen = |p: Point| to_screen(p, rect);
    let ink = text_color(painter);

    for curve in curves {
        let from_color = store
            .participants
            .get(&curve.key.from)
            .map(|p| color(p.color))
            .unwrap_or(ink);
        let stroke = egui::Stroke::new(2.0, from_color);
        let points: Vec<egui::Pos2> = (0..=CURVE_SAMPLES)
            .map(|i| screen(curve.point_at(i as f32 / CURVE_SAMPLES as f32)))
            .collect();
        let style = if curve.key.to.is_none() {
            LineStyle::Dashed
        } else {
            LineStyle::Solid
        };
        draw_styled_polyline(painter, &points, stroke, style);
        let dir = curve.end_direction();
        let end = screen(curve.end);
        let along = egui::vec2(dir.x * rect.width(), dir.y * rect.height()) / 100.0;
        draw_arrowhead(painter, end - along, end, stroke);
        let handle = screen(curve.handle());
        painter.circle_filled(handle, HANDLE_RADIUS, from_color);
        if let Some(group) = store.group(&curve.key) {
            let label = match group.count() {
                1 => group.cards[0].label.clone(),
                n => format!("{} ×{n}", group.cards[0].label),
            };
            painter.text(
                handle + egui::vec2(0.0, -10.0),
                egui::Align2::CENTER_BOTTOM,
                label,
                egui::FontId::proportional(12.0),
                ink,
            );
        }
        if curve.key.to.is_none() {
            painter.circle_stroke(screen(curve.end), HANDLE_RADIUS + 2.0, stroke);
        }
    }

    for line in store.free_lines.iter() {
        let (start, end) = store.free_line_points(line);
        let stroke = egui::Stroke::new(line.thickness, color(line.color));
        draw_styled_line(painter, screen(start), screen(end), stroke, line.style);
        for (p, docked) in [
            (start, line.start_participant.is_some()),
            (end, line.end_participant.is_some()),
        ] {
            draw_endpoint(painter, screen(p), docked, stroke.color);
        }
    }

    for line in store.decision_lines.iter() {
        let points = store.decision_line_points(line);
        let stroke = egui::Stroke::new(2.0, color(line.color));
        let hub = screen(points.hub);
        painter.line_segment([screen(points.start), hub], stroke);
        draw_endpoint(painter, screen(points.start), line.start_participant.is_some(), stroke.color);
        for i in 0..2 {
            let end = screen(points.options[i]);
            draw_arrowhead(painter, hub, end, stroke);
            painter.line_segment([hub, end], stroke);
            draw_endpoint(painter, end, line.option_participants[i].is_some(), stroke.color);
            painter.text(
                hub + (end - hub) * 0.5,
                egui::Align2::CENTER_BOTTOM,
                &line.labels[i],
                egui::FontId::proportional(11.0),
                ink,
            );
        }
        draw_diamond(painter, hub, 10.0, stroke.color);
        if !line.question.is_empty() {
            painter.text(
                hub + egui::vec2(0.0, -14.0),
                egui::Align2::CENTER_BOTTOM,
                &line.question,
                egui::FontId::proportional(12.0),
                ink,
            );
        }
    }

    for node in store.decision_nodes.iter() {
        let p = screen(store.decision_node_position(node, settings.decision_dock_offset));
        draw_diamond(painter, p, 14.0, egui::Color32::from_rgb(200, 140, 40));
        painter.text(
            p + egui::vec2(18.0, 0.0),
            egui::Align2::LEFT_CENTER,
            &node.question,
            egui::FontId::proportional(12.0),
            ink,
        );
    }

    for participant in store.participants.iter() {
        let Some(p) = participant.position() else {
            continue;
        };
        draw_participant(painter, screen(p), &participant.name, &participant.role, color(participant.color));
    }

    for object in store.process_objects.iter() {
        let Some(p) = object.position else {
            continue;
        };
        let r = egui::Rect::from_center_size(screen(p), egui::vec2(16.0, 12.0));
        painter.rect_filled(r, 2.0, color(object.color));
        painter.text(
            r.right_center() + egui::vec2(4.0, 0.0),
            egui::Align2::LEFT_CENTER,
            &object.name,
            egui::FontId::proportional(11.0),
            ink,
        );
    }

    if let Some(active) = drag.active() {
        if let (Grab::Staged, Some(preview)) = (&active.grab, active.preview) {
            let ghost = egui::Color32::from_rgba_unmultiplied(120, 160, 255, 90);
            painter.circle_filled(screen(preview), PARTICIPANT_RADIUS, ghost);
        }
    }
}

fn draw_participant(painter: &egui::Painter, center: egui::Pos2, name: &str, role: &str, fill: egui::Color32) {
    painter.circle_filled(center, PARTICIPANT_RADIUS, fill);
    painter.circle_stroke(
        center,
        PARTICIPANT_RADIUS,
        egui::Stroke::new(1.5, egui::Color32::from_gray(230)),
    );
    let initial: String = name.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        initial,
        egui::FontId::proportional(16.0),
        egui::Color32::WHITE,
    );
    let ink = text_color(painter);
    painter.text(
        center + egui::vec2(0.0, PARTICIPANT_RADIUS + 4.0),
        egui::Align2::CENTER_TOP,
        name,
        egui::FontId::proportional(13.0),
        ink,
    );
    if !role.is_empty() {
        painter.text(
            center + egui::vec2(0.0, PARTICIPANT_RADIUS + 20.0),
            egui::Align2::CENTER_TOP,
            role,
            egui::FontId::proportional(11.0),
            egui::Color32::from_gray(150),
        );
    }
}

fn draw_endpoint(painter: &egui::Painter, p: egui::Pos2, docked: bool, c: egui::Color32) {
    if docked {
        painter.circle_filled(p, HANDLE_RADIUS, c);
    } else {
        painter.circle_stroke(p, HANDLE_RADIUS, egui::Stroke::new(1.5, c));
    }
}

fn draw_diamond(painter: &egui::Painter, center: egui::Pos2, r: f32, fill: egui::Color32) {
    painter.add(egui::Shape::convex_polygon(
        vec![
            center + egui::vec2(0.0, -r),
            center + egui::vec2(r, 0.0),
            center + egui::vec2(0.0, r),
            center + egui::vec2(-r, 0.0),
        ],
        fill,
        egui::Stroke::new(1.0, egui::Color32::from_gray(230)),
    ));
}

pub(super) fn draw_swimlane(
    painter: &egui::Painter,
    origin: egui::Pos2,
    layout: &SwimlaneLayout,
    settings: &SwimlaneSettings,
) {
    let ink = text_color(painter);
    let at = |p: egui::Pos2| origin + p.to_vec2();
    let half_h = settings.lane_height * 0.25;

    for (i, lane) in layout.lanes.iter().enumerate() {
        let top = at(egui::pos2(0.0, lane.y - settings.lane_height * 0.5));
        let band = egui::Rect::from_min_size(top, egui::vec2(layout.width, settings.lane_height));
        let shade = if i % 2 == 0 { 28 } else { 36 };
        painter.rect_filled(band, 0.0, egui::Color32::from_gray(shade));
        let header = egui::Rect::from_min_size(top, egui::vec2(settings.header_width, settings.lane_height));
        painter.rect_filled(header.shrink(6.0), 4.0, color(lane.color));
        painter.text(
            header.center(),
            egui::Align2::CENTER_CENTER,
            &lane.name,
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );
    }

    for step in &layout.steps {
        let c = at(step.center);
        match &step.kind {
            StepKind::Edge { .. } => {
                let stroke = egui::Stroke::new(1.5, ink);
                if let Some(target) = step.target_lane.and_then(|l| layout.lanes.get(l)) {
                    if target.y != step.center.y {
                        let end = at(egui::pos2(step.center.x, target.y));
                        let dir = if end.y > c.y { 1.0 } else { -1.0 };
                        let start = c + egui::vec2(0.0, dir * half_h);
                        painter.line_segment([start, end], stroke);
                        draw_arrowhead(painter, start, end, stroke);
                    }
                }
                let r = egui::Rect::from_center_size(
                    c,
                    egui::vec2(settings.step_half_width * 2.0, half_h * 2.0),
                );
                painter.rect_filled(r, 6.0, egui::Color32::from_rgb(50, 80, 140));
                painter.text(
                    c,
                    egui::Align2::CENTER_CENTER,
                    &step.label,
                    egui::FontId::proportional(12.0),
                    egui::Color32::WHITE,
                );
            }
            StepKind::Decision { .. } => {
                draw_diamond(painter, c, half_h, egui::Color32::from_rgb(200, 140, 40));
                painter.text(
                    c + egui::vec2(0.0, half_h + 4.0),
                    egui::Align2::CENTER_TOP,
                    &step.label,
                    egui::FontId::proportional(12.0),
                    ink,
                );
            }
        }
    }

    for path in &layout.option_paths {
        let points: Vec<egui::Pos2> = path.polyline(CURVE_SAMPLES).into_iter().map(at).collect();
        let stroke = egui::Stroke::new(1.5, color(path.color));
        let style = if path.is_backward() {
            LineStyle::Dashed
        } else {
            LineStyle::Solid
        };
        draw_styled_polyline(painter, &points, stroke, style);
        if let [.., before, end] = points.as_slice() {
            draw_arrowhead(painter, *before, *end, stroke);
        }
        if let Some(mid) = points.get(points.len() / 2) {
            painter.text(
                *mid + egui::vec2(0.0, -4.0),
                egui::Align2::CENTER_BOTTOM,
                &path.label,
                egui::FontId::proportional(11.0),
                ink,
            );
        }
    }
}

fn draw_styled_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    line_style: LineStyle,
) {
    match line_style {
        LineStyle::Solid => {
            painter.line_segment([a, b], stroke);
        }
        LineStyle::Dashed => {
            draw_dashed_line(painter, a, b, stroke, 10.0, 5.0);
        }
        LineStyle::Dotted => {
            draw_dashed_line(painter, a, b, stroke, 2.0, 4.0);
        }
    }
}

fn draw_styled_polyline(
    painter: &egui::Painter,
    points: &[egui::Pos2],
    stroke: egui::Stroke,
    line_style: LineStyle,
) {
    if points.len() < 2 {
        return;
    }
    match line_style {
        LineStyle::Solid => {
            painter.add(egui::Shape::line(points.to_vec(), stroke));
        }
        LineStyle::Dashed | LineStyle::Dotted => {
            let (dash, gap) = if line_style == LineStyle::Dashed {
                (10.0, 5.0)
            } else {
                (2.0, 4.0)
            };
            for pair in points.windows(2) {
                draw_dashed_line(painter, pair[0], pair[1], stroke, dash, gap);
            }
        }
    }
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let v = b - a;
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = v / len;
    let mut pos = 0.0;
    let mut drawing = true;
    while pos < len {
        let seg_len = if drawing { dash_len } else { gap_len };
        let next_pos = (pos + seg_len).min(len);
        if drawing {
            painter.line_segment([a + dir * pos, a + dir * next_pos], stroke);
        }
        pos = next_pos;
        drawing = !drawing;
    }
}

fn draw_arrowhead(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, stroke: egui::Stroke) {
    let v = b - a;
    if v.length_sq() <= f32::EPSILON {
        return;
    }
    let dir = v.normalized();
    let size = 10.0;
    let perp = egui::vec2(-dir.y, dir.x);
    let base = b - dir * size;
    painter.add(egui::Shape::convex_polygon(
        vec![b, base + perp * (size * 0.6), base - perp * (size * 0.6)],
        stroke.color,
        egui::Stroke::NONE,
    ));
}
