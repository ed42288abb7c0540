use crate::coords::pixel_distance;
use crate::model::{DecisionLinePatch, EntityId, FreeLinePatch, Participant, Point};
use crate::store::EntityStore;
use crate::sync::Mutation;
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEnd {
    Start,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionEnd {
    Start,
    Option(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    FreeLine { id: EntityId, end: LineEnd },
    DecisionLine { id: EntityId, end: DecisionEnd },
}

#[derive(Clone, Copy, Debug)]
pub struct SnapHit<'a> {
    pub participant: &'a Participant,
    pub position: Point,
    pub distance_px: f32,
}

// Every pixel distance is zero on an empty canvas.
fn has_area(canvas_size: egui::Vec2) -> bool {
    canvas_size.x > 0.0 && canvas_size.y > 0.0
}

pub fn nearest_participant<'a>(
    store: &'a EntityStore,
    point: Point,
    canvas_size: egui::Vec2,
    radius_px: f32,
    exclude: Option<&str>,
) -> Option<SnapHit<'a>> {
    if !has_area(canvas_size) {
        return None;
    }
    let mut best: Option<SnapHit<'a>> = None;
    for participant in store.participants.iter() {
        if exclude == Some(participant.id.as_str()) {
            continue;
        }
        let Some(position) = participant.position() else {
            continue;
        };
        let distance_px = pixel_distance(point, position, canvas_size);
        if distance_px >= radius_px {
            continue;
        }
        if best.is_none_or(|b| distance_px < b.distance_px) {
            best = Some(SnapHit {
                participant,
                position,
                distance_px,
            });
        }
    }
    best
}

#[derive(Clone, Debug, PartialEq)]
pub enum Dock {
    Bind {
        participant_id: EntityId,
        position: Point,
    },
    /// Nothing close enough; the endpoint stays where it was dropped and any
    /// previous binding is cleared.
    Free(Point),
}

impl Dock {
    pub fn position(&self) -> Point {
        match self {
            Dock::Bind { position, .. } | Dock::Free(position) => *position,
        }
    }

    pub fn participant(&self) -> Option<EntityId> {
        match self {
            Dock::Bind { participant_id, .. } => Some(participant_id.clone()),
            Dock::Free(_) => None,
        }
    }
}

pub fn dock_point(
    store: &EntityStore,
    point: Point,
    canvas_size: egui::Vec2,
    radius_px: f32,
    exclude: Option<&str>,
) -> Dock {
    match nearest_participant(store, point, canvas_size, radius_px, exclude) {
        Some(hit) => Dock::Bind {
            participant_id: hit.participant.id.clone(),
            position: hit.position,
        },
        None => Dock::Free(point),
    }
}

pub fn endpoint_mutation(endpoint: &Endpoint, dock: &Dock) -> Mutation {
    let position = dock.position();
    let participant = dock.participant();
    match endpoint {
        Endpoint::FreeLine { id, end } => {
            let patch = match end {
                LineEnd::Start => FreeLinePatch {
                    start: Some(position),
                    start_participant: Some(participant),
                    ..Default::default()
                },
                LineEnd::End => FreeLinePatch {
                    end: Some(position),
                    end_participant: Some(participant),
                    ..Default::default()
                },
            };
            Mutation::free_line(id.clone(), patch)
        }
        Endpoint::DecisionLine { id, end } => {
            let mut patch = DecisionLinePatch::default();
            match end {
                DecisionEnd::Start => {
                    patch.start = Some(position);
                    patch.start_participant = Some(participant);
                }
                DecisionEnd::Option(i) => {
                    patch.set_option(*i, position);
                    patch.set_option_participant(*i, participant);
                }
            }
            Mutation::decision_line(id.clone(), patch)
        }
    }
}

pub fn loose_endpoint_near(
    store: &EntityStore,
    point: Point,
    canvas_size: egui::Vec2,
    radius_px: f32,
) -> Option<Endpoint> {
    if !has_area(canvas_size) {
        return None;
    }
    let near = |p: Point| pixel_distance(point, p, canvas_size) < radius_px;
    for line in store.free_lines.iter() {
        if line.start_participant.is_none() && near(line.start) {
            return Some(Endpoint::FreeLine {
                id: line.id.clone(),
                end: LineEnd::Start,
            });
        }
        if line.end_participant.is_none() && near(line.end) {
            return Some(Endpoint::FreeLine {
                id: line.id.clone(),
                end: LineEnd::End,
            });
        }
    }
    for line in store.decision_lines.iter() {
        if line.start_participant.is_none() && near(line.start) {
            return Some(Endpoint::DecisionLine {
                id: line.id.clone(),
                end: DecisionEnd::Start,
            });
        }
        for i in 0..2 {
            if line.option_participants[i].is_none() && near(line.options[i]) {
                return Some(Endpoint::DecisionLine {
                    id: line.id.clone(),
                    end: DecisionEnd::Option(i),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionLine, FreeLine};

    const CANVAS: egui::Vec2 = egui::vec2(1000.0, 500.0);

    fn store() -> EntityStore {
        let mut s = EntityStore::new();
        s.participants
            .insert(Participant::with_id("a", "A").at(Point::new(20.0, 20.0)));
        s.participants
            .insert(Participant::with_id("b", "B").at(Point::new(25.0, 20.0)));
        s.participants.insert(Participant::with_id("staged", "S"));
        s
    }

    #[test]
    fn nearest_placed_participant_wins() {
        let s = store();
        // 3% of 1000px = 30px from "a", 2% = 20px from "b".
        let hit = nearest_participant(&s, Point::new(23.0, 20.0), CANVAS, 70.0, None)
            .expect("hit");
        assert_eq!(hit.participant.id, "b");
        assert!((hit.distance_px - 20.0).abs() < 1e-3);
        let hit = nearest_participant(&s, Point::new(23.0, 20.0), CANVAS, 70.0, Some("b"))
            .expect("hit");
        assert_eq!(hit.participant.id, "a");
    }

    #[test]
    fn radius_is_measured_in_pixels() {
        let s = store();
        // 10% of the height is only 50px, 10% of the width is 100px.
        assert!(nearest_participant(&s, Point::new(20.0, 30.0), CANVAS, 70.0, Some("b")).is_some());
        assert!(nearest_participant(&s, Point::new(10.0, 20.0), CANVAS, 70.0, Some("b")).is_none());
    }

    #[test]
    fn empty_canvas_never_docks() {
        let mut s = store();
        s.free_lines
            .insert(FreeLine::new(Point::new(20.0, 20.0), Point::new(60.0, 60.0)));
        for size in [egui::Vec2::ZERO, egui::vec2(1000.0, 0.0)] {
            assert!(nearest_participant(&s, Point::new(90.0, 90.0), size, 70.0, None).is_none());
            assert!(loose_endpoint_near(&s, Point::new(90.0, 90.0), size, 120.0).is_none());
            assert_eq!(
                dock_point(&s, Point::new(90.0, 90.0), size, 70.0, None),
                Dock::Free(Point::new(90.0, 90.0))
            );
        }
    }

    #[test]
    fn free_dock_clears_participant() {
        let s = store();
        let dock = dock_point(&s, Point::new(80.0, 80.0), CANVAS, 70.0, None);
        assert_eq!(dock, Dock::Free(Point::new(80.0, 80.0)));
        let m = endpoint_mutation(
            &Endpoint::FreeLine {
                id: "l1".into(),
                end: LineEnd::End,
            },
            &dock,
        );
        let Mutation::FreeLine(crate::sync::Change::Update { patch, .. }) = m else {
            panic!("unexpected mutation");
        };
        assert_eq!(patch.end, Some(Point::new(80.0, 80.0)));
        assert_eq!(patch.end_participant, Some(None));
        assert_eq!(patch.start, None);
    }

    #[test]
    fn free_lines_are_checked_before_decision_lines() {
        let mut s = store();
        let mut decision = DecisionLine::new(
            Point::new(60.0, 60.0),
            Point::new(70.0, 60.0),
            [Point::new(80.0, 50.0), Point::new(80.0, 70.0)],
        );
        decision.id = "d1".into();
        s.decision_lines.insert(decision);
        let mut free = FreeLine::new(Point::new(10.0, 90.0), Point::new(61.0, 61.0));
        free.id = "f1".into();
        s.free_lines.insert(free);

        let hit = loose_endpoint_near(&s, Point::new(60.5, 60.5), CANVAS, 120.0);
        assert_eq!(
            hit,
            Some(Endpoint::FreeLine {
                id: "f1".into(),
                end: LineEnd::End
            })
        );
    }

    #[test]
    fn docked_endpoints_are_not_loose() {
        let mut s = store();
        let mut decision = DecisionLine::new(
            Point::new(60.0, 60.0),
            Point::new(70.0, 60.0),
            [Point::new(80.0, 50.0), Point::new(80.0, 70.0)],
        );
        decision.id = "d1".into();
        decision.start_participant = Some("a".into());
        s.decision_lines.insert(decision);
        let hit = loose_endpoint_near(&s, Point::new(79.0, 69.0), CANVAS, 50.0);
        assert_eq!(
            hit,
            Some(Endpoint::DecisionLine {
                id: "d1".into(),
                end: DecisionEnd::Option(1)
            })
        );
        assert_eq!(loose_endpoint_near(&s, Point::new(60.0, 60.0), CANVAS, 20.0), None);
    }
}
