use crate::model::Point;
use eframe::egui;

pub const CLAMP_MIN: f32 = 8.0;
pub const CLAMP_MAX: f32 = 92.0;

/// The result is not clamped; a pointer outside the canvas maps outside 0..100.
pub fn to_percent(pointer: egui::Pos2, canvas: egui::Rect) -> Point {
    let w = canvas.width();
    let h = canvas.height();
    if w <= f32::EPSILON || h <= f32::EPSILON {
        return Point::new(50.0, 50.0);
    }
    Point::new(
        (pointer.x - canvas.min.x) / w * 100.0,
        (pointer.y - canvas.min.y) / h * 100.0,
    )
}

pub fn to_screen(p: Point, canvas: egui::Rect) -> egui::Pos2 {
    egui::pos2(
        canvas.min.x + p.x / 100.0 * canvas.width(),
        canvas.min.y + p.y / 100.0 * canvas.height(),
    )
}

pub fn clamp_to(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

pub fn clamp(value: f32) -> f32 {
    clamp_to(value, CLAMP_MIN, CLAMP_MAX)
}

pub fn clamp_point(p: Point) -> Point {
    Point::new(clamp(p.x), clamp(p.y))
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn pixel_distance(a: Point, b: Point, canvas_size: egui::Vec2) -> f32 {
    let dx = (b.x - a.x) / 100.0 * canvas_size.x;
    let dy = (b.y - a.y) / 100.0 * canvas_size.y;
    (dx * dx + dy * dy).sqrt()
}
