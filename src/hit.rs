use crate::coords::to_screen;
use crate::curve::{CurveParams, edge_curves};
use crate::drag::{DecisionLineHandle, DragTarget, FreeLineHandle};
use crate::model::Point;
use crate::settings::Settings;
use crate::store::EntityStore;
use eframe::egui;

struct Nearest {
    pointer: egui::Pos2,
    best: Option<(f32, DragTarget)>,
}

impl Nearest {
    fn new(pointer: egui::Pos2) -> Self {
        Self { pointer, best: None }
    }

    fn offer(&mut self, at: egui::Pos2, radius: f32, target: impl FnOnce() -> DragTarget) {
        let d = at.distance(self.pointer);
        if d > radius {
            return;
        }
        if self.best.as_ref().is_none_or(|(b, _)| d < *b) {
            self.best = Some((d, target()));
        }
    }

    fn finish(self) -> Option<DragTarget> {
        self.best.map(|(_, t)| t)
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

/// Picks what a pointer-down at `pointer` grabs.
///
/// Small handles sit on top of large shapes, so candidates are tried in
/// layers: process-object markers, line endpoint handles and decision
/// boxes, open ends, decision nodes, edge handles, participants and
/// finally the middle of free lines. Within a layer the closest one wins.
pub fn pick(
    store: &EntityStore,
    pointer: egui::Pos2,
    canvas: egui::Rect,
    settings: &Settings,
) -> Option<DragTarget> {
    let screen = |p: Point| to_screen(p, canvas);
    let handle = settings.handle_hit_px;

    let mut layer = Nearest::new(pointer);
    for object in store.process_objects.iter() {
        if let Some(p) = object.position {
            layer.offer(screen(p), handle * 1.5, || DragTarget::ProcessObject {
                id: object.id.clone(),
            });
        }
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    for line in store.free_lines.iter() {
        let (start, end) = store.free_line_points(line);
        for (p, h) in [(start, FreeLineHandle::Start), (end, FreeLineHandle::End)] {
            layer.offer(screen(p), handle, || DragTarget::FreeLine {
                id: line.id.clone(),
                handle: h,
            });
        }
    }
    for line in store.decision_lines.iter() {
        let points = store.decision_line_points(line);
        let handles = [
            (points.start, DecisionLineHandle::Start),
            (points.options[0], DecisionLineHandle::Option1),
            (points.options[1], DecisionLineHandle::Option2),
            (points.hub, DecisionLineHandle::Box),
        ];
        for (p, h) in handles {
            layer.offer(screen(p), handle, || DragTarget::DecisionLine {
                id: line.id.clone(),
                handle: h,
            });
        }
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    let mut seen: Vec<&str> = Vec::new();
    for c in store.connections.iter().filter(|c| c.is_open()) {
        if seen.contains(&c.from.as_str()) {
            continue;
        }
        seen.push(&c.from);
        if let Some(end) = store.open_end_position(&c.from, settings.open_end_offset) {
            layer.offer(screen(end), handle, || DragTarget::OpenEnd {
                from: c.from.clone(),
            });
        }
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    for node in store.decision_nodes.iter() {
        let p = store.decision_node_position(node, settings.decision_dock_offset);
        layer.offer(screen(p), handle * 2.0, || DragTarget::DecisionNode {
            id: node.id.clone(),
        });
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    for curve in edge_curves(store, &CurveParams::from_settings(settings)) {
        let key = curve.key.clone();
        layer.offer(screen(curve.handle()), handle, || DragTarget::Edge { key });
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    for participant in store.participants.iter() {
        if let Some(p) = participant.position() {
            layer.offer(screen(p), settings.participant_hit_px, || {
                DragTarget::Participant {
                    id: participant.id.clone(),
                }
            });
        }
    }
    if let Some(t) = layer.finish() {
        return Some(t);
    }

    let mut layer = Nearest::new(pointer);
    for line in store.free_lines.iter() {
        let (start, end) = store.free_line_points(line);
        layer.offer(screen(midpoint(start, end)), handle * 1.5, || {
            DragTarget::FreeLine {
                id: line.id.clone(),
                handle: FreeLineHandle::Middle,
            }
        });
    }
    layer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, FreeLine, Participant, ProcessObject};
    use crate::store::EdgeKey;

    fn canvas() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 500.0))
    }

    fn store() -> EntityStore {
        let mut s = EntityStore::new();
        s.participants
            .insert(Participant::with_id("a", "A").at(Point::new(20.0, 50.0)));
        s.participants
            .insert(Participant::with_id("b", "B").at(Point::new(80.0, 50.0)));
        s
    }

    #[test]
    fn participant_under_pointer() {
        let s = store();
        let t = pick(&s, egui::pos2(205.0, 252.0), canvas(), &Settings::default());
        assert_eq!(t, Some(DragTarget::Participant { id: "a".into() }));
        assert_eq!(pick(&s, egui::pos2(500.0, 100.0), canvas(), &Settings::default()), None);
    }

    #[test]
    fn endpoint_handle_beats_participant() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(20.0, 50.0), Point::new(50.0, 10.0));
        line.id = "f1".into();
        line.start_participant = Some("a".into());
        s.free_lines.insert(line);
        let t = pick(&s, egui::pos2(201.0, 250.0), canvas(), &Settings::default());
        assert_eq!(
            t,
            Some(DragTarget::FreeLine {
                id: "f1".into(),
                handle: FreeLineHandle::Start
            })
        );
    }

    #[test]
    fn edge_handle_sits_on_curve_midpoint() {
        let mut s = store();
        s.connections
            .insert(Connection::with_id("c1", "a", Some("b".into()), "send"));
        let settings = Settings::default();
        let curve = edge_curves(&s, &CurveParams::from_settings(&settings))
            .pop()
            .expect("curve");
        let at = to_screen(curve.handle(), canvas());
        assert_eq!(
            pick(&s, at, canvas(), &settings),
            Some(DragTarget::Edge {
                key: EdgeKey::new("a", Some("b".into()))
            })
        );
    }

    #[test]
    fn open_end_and_markers() {
        let mut s = store();
        s.connections.insert(Connection::with_id("o1", "a", None, "ask"));
        let mut object = ProcessObject::new("Form");
        object.id = "p1".into();
        object.position = Some(Point::new(50.0, 80.0));
        s.process_objects.insert(object);
        let settings = Settings::default();
        // Default open end is 12% to the right of "a".
        assert_eq!(
            pick(&s, egui::pos2(320.0, 250.0), canvas(), &settings),
            Some(DragTarget::OpenEnd { from: "a".into() })
        );
        assert_eq!(
            pick(&s, egui::pos2(505.0, 400.0), canvas(), &settings),
            Some(DragTarget::ProcessObject { id: "p1".into() })
        );
    }

    #[test]
    fn free_line_middle_is_last_resort() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(40.0, 10.0), Point::new(60.0, 10.0));
        line.id = "f1".into();
        s.free_lines.insert(line);
        assert_eq!(
            pick(&s, egui::pos2(500.0, 52.0), canvas(), &Settings::default()),
            Some(DragTarget::FreeLine {
                id: "f1".into(),
                handle: FreeLineHandle::Middle
            })
        );
    }
}
