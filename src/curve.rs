use crate::model::{Offset, Point};
use crate::settings::Settings;
use crate::store::{ConnectionGroup, EdgeKey, EntityStore};
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveParams {
    pub default_bow: f32,
    pub reciprocal_bow: f32,
    pub canvas_center: Point,
    pub port_inset: f32,
    pub self_loop_height: f32,
    pub self_loop_spread: f32,
    pub open_end_offset: Offset,
}

impl CurveParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            default_bow: settings.default_bow,
            reciprocal_bow: settings.reciprocal_bow,
            canvas_center: settings.canvas_center,
            port_inset: settings.port_inset,
            self_loop_height: settings.self_loop_height,
            self_loop_spread: settings.self_loop_spread,
            open_end_offset: settings.open_end_offset,
        }
    }
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Control point of the edge `from -> to` before any manual offset.
///
/// Reciprocal edges bow further and always to opposite sides: the side is
/// derived from the id order, so it does not matter which of the two edges
/// is computed first. A lone edge bows away from the canvas center.
/// Coincident endpoints return the shared point.
pub fn control_point(
    from: Point,
    to: Point,
    from_id: &str,
    to_id: &str,
    reciprocal: bool,
    params: &CurveParams,
) -> Point {
    let a = from.to_pos2();
    let d = to.to_pos2() - a;
    let len = d.length();
    if len <= f32::EPSILON {
        return from;
    }
    let mid = a + d * 0.5;
    if reciprocal {
        let sign = if from_id <= to_id { 1.0 } else { -1.0 };
        // Perpendicular of the canonical (lower id -> higher id) direction.
        let canonical = d * sign;
        let perp = egui::vec2(-canonical.y, canonical.x) / len;
        return Point::from_pos2(mid + perp * sign * len * params.reciprocal_bow);
    }
    let perp = egui::vec2(-d.y, d.x) / len;
    let outward = mid - params.canvas_center.to_pos2();
    let side = if perp.dot(outward) >= (-perp).dot(outward) {
        perp
    } else {
        -perp
    };
    Point::from_pos2(mid + side * len * params.default_bow)
}

pub fn port_position(center: Point, toward: Point, inset: f32) -> Point {
    let c = center.to_pos2();
    let d = toward.to_pos2() - c;
    let len = d.length();
    if len <= f32::EPSILON {
        return center;
    }
    let step = inset.min(len * 0.5);
    Point::from_pos2(c + d / len * step)
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeCurve {
    pub key: EdgeKey,
    pub start: Point,
    pub control: Point,
    pub end: Point,
    pub count: usize,
}

impl EdgeCurve {
    pub fn point_at(&self, t: f32) -> Point {
        let s = self.start.to_pos2().to_vec2();
        let c = self.control.to_pos2().to_vec2();
        let e = self.end.to_pos2().to_vec2();
        let u = 1.0 - t;
        let p = s * (u * u) + c * (2.0 * u * t) + e * (t * t);
        Point::new(p.x, p.y)
    }

    pub fn handle(&self) -> Point {
        self.point_at(0.5)
    }

    pub fn end_direction(&self) -> egui::Vec2 {
        let e = self.end.to_pos2();
        let d = e - self.control.to_pos2();
        if d.length() > f32::EPSILON {
            return d.normalized();
        }
        let d = e - self.start.to_pos2();
        if d.length() > f32::EPSILON {
            d.normalized()
        } else {
            egui::Vec2::X
        }
    }
}

pub fn self_loop(center: Point, params: &CurveParams) -> (Point, Point, Point) {
    let start = Point::new(center.x - params.self_loop_spread, center.y - params.port_inset);
    let end = Point::new(center.x + params.self_loop_spread, center.y - params.port_inset);
    let control = Point::new(center.x, center.y - params.self_loop_height);
    (start, control, end)
}

pub fn base_control_point(store: &EntityStore, key: &EdgeKey, params: &CurveParams) -> Option<Point> {
    let from = store.participant_position(&key.from)?;
    match key.to.as_deref() {
        None => {
            let end = store.open_end_position(&key.from, params.open_end_offset)?;
            Some(control_point(from, end, &key.from, "", false, params))
        }
        Some(to) if to == key.from => Some(self_loop(from, params).1),
        Some(to) => {
            let to_pos = store.participant_position(to)?;
            let reciprocal = store.has_edge(to, &key.from);
            Some(control_point(from, to_pos, &key.from, to, reciprocal, params))
        }
    }
}

pub fn edge_curve(
    store: &EntityStore,
    group: &ConnectionGroup<'_>,
    params: &CurveParams,
) -> Option<EdgeCurve> {
    let key = group.key();
    let from = store.participant_position(group.from)?;
    let base = base_control_point(store, &key, params)?;
    let control = base.translated(group.offset());
    let (start, end) = match group.to {
        None => {
            let end = store.open_end_position(group.from, params.open_end_offset)?;
            (port_position(from, end, params.port_inset), end)
        }
        Some(to) if to == group.from => {
            let (start, _, end) = self_loop(from, params);
            (start, end)
        }
        Some(to) => {
            let to_pos = store.participant_position(to)?;
            (
                port_position(from, to_pos, params.port_inset),
                port_position(to_pos, from, params.port_inset),
            )
        }
    };
    Some(EdgeCurve {
        key,
        start,
        control,
        end,
        count: group.count(),
    })
}

pub fn edge_curves(store: &EntityStore, params: &CurveParams) -> Vec<EdgeCurve> {
    store
        .grouped_connections()
        .iter()
        .filter_map(|g| edge_curve(store, g, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, ConnectionPatch, Participant};
    use crate::sync::Mutation;

    fn cross(a: Point, b: Point, p: Point) -> f32 {
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn reciprocal_edges_bow_to_opposite_sides() {
        let params = CurveParams::default();
        let pairs = [
            (Point::new(20.0, 30.0), Point::new(70.0, 60.0)),
            (Point::new(80.0, 10.0), Point::new(15.0, 85.0)),
            (Point::new(50.0, 20.0), Point::new(50.0, 80.0)),
        ];
        for (a, b) in pairs {
            for (ida, idb) in [("alpha", "beta"), ("zeta", "eta")] {
                let ab = control_point(a, b, ida, idb, true, &params);
                let ba = control_point(b, a, idb, ida, true, &params);
                let sa = cross(a, b, ab);
                let sb = cross(a, b, ba);
                assert!(sa * sb < 0.0, "{ida}->{idb}: {sa} vs {sb}");
                // Bow is 0.4 of the length on each side.
                let len = crate::coords::distance(a, b);
                let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
                assert!((crate::coords::distance(mid, ab) - len * 0.4).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn reciprocal_side_depends_only_on_identities() {
        let params = CurveParams::default();
        let a = Point::new(30.0, 40.0);
        let b = Point::new(60.0, 45.0);
        let first = control_point(a, b, "a", "b", true, &params);
        // Compute the reverse first; the forward answer must not change.
        let _ = control_point(b, a, "b", "a", true, &params);
        let again = control_point(a, b, "a", "b", true, &params);
        assert_eq!(first, again);
        // Swapping which id is "smaller" flips the side of the same geometry.
        let renamed = control_point(a, b, "z", "b", true, &params);
        assert!(cross(a, b, first) * cross(a, b, renamed) < 0.0);
    }

    #[test]
    fn lone_edges_bow_away_from_center() {
        let params = CurveParams::default();
        let center = params.canvas_center;
        let edges = [
            (Point::new(10.0, 10.0), Point::new(90.0, 12.0)),
            (Point::new(90.0, 90.0), Point::new(12.0, 85.0)),
            (Point::new(15.0, 80.0), Point::new(20.0, 20.0)),
            (Point::new(70.0, 30.0), Point::new(75.0, 70.0)),
            (Point::new(30.0, 30.0), Point::new(70.0, 70.0)),
        ];
        for (a, b) in edges {
            let c = control_point(a, b, "x", "y", false, &params);
            let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            let bow = mid.offset_to(c);
            let out = center.offset_to(mid);
            assert!(bow.x * out.x + bow.y * out.y >= -1e-4, "{a:?}->{b:?}");
            let len = crate::coords::distance(a, b);
            assert!((crate::coords::distance(mid, c) - len * 0.2).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_length_edge_returns_shared_point() {
        let params = CurveParams::default();
        let p = Point::new(40.0, 40.0);
        assert_eq!(control_point(p, p, "a", "b", false, &params), p);
        assert_eq!(control_point(p, p, "a", "b", true, &params), p);
        assert_eq!(port_position(p, p, 4.0), p);
    }

    #[test]
    fn ports_sit_off_center_along_the_edge() {
        let port = port_position(Point::new(20.0, 50.0), Point::new(80.0, 50.0), 4.0);
        assert!(close(port, Point::new(24.0, 50.0)));
        // Never past the middle of a very short edge.
        let port = port_position(Point::new(20.0, 50.0), Point::new(22.0, 50.0), 4.0);
        assert!(close(port, Point::new(21.0, 50.0)));
    }

    fn two_party_store() -> EntityStore {
        let mut s = EntityStore::new();
        s.participants
            .insert(Participant::with_id("a", "A").at(Point::new(20.0, 50.0)));
        s.participants
            .insert(Participant::with_id("b", "B").at(Point::new(80.0, 50.0)));
        s.connections
            .insert(Connection::with_id("c1", "a", Some("b".into()), "ask"));
        s
    }

    #[test]
    fn stored_offset_translates_control_point() {
        let params = CurveParams::default();
        let mut s = two_party_store();
        let key = EdgeKey::new("a", Some("b".into()));
        let base = base_control_point(&s, &key, &params).expect("base");
        s.apply(&Mutation::connection(
            "c1",
            ConnectionPatch::curve_offset(Offset::new(2.0, -3.0)),
        ))
        .expect("patch");
        let curves = edge_curves(&s, &params);
        assert_eq!(curves.len(), 1);
        assert!(close(curves[0].control, Point::new(base.x + 2.0, base.y - 3.0)));
        assert!(close(curves[0].start, Point::new(24.0, 50.0)));
        assert!(close(curves[0].end, Point::new(76.0, 50.0)));
    }

    #[test]
    fn adding_reverse_edge_changes_bow() {
        let params = CurveParams::default();
        let mut s = two_party_store();
        let key = EdgeKey::new("a", Some("b".into()));
        let lone = base_control_point(&s, &key, &params).expect("lone");
        s.connections
            .insert(Connection::with_id("c2", "b", Some("a".into()), "reply"));
        let paired = base_control_point(&s, &key, &params).expect("paired");
        assert!((crate::coords::distance(Point::new(50.0, 50.0), lone) - 12.0).abs() < 1e-3);
        assert!((crate::coords::distance(Point::new(50.0, 50.0), paired) - 24.0).abs() < 1e-3);
    }

    #[test]
    fn self_loop_rises_above_participant() {
        let params = CurveParams::default();
        let mut s = two_party_store();
        s.connections
            .insert(Connection::with_id("c9", "a", Some("a".into()), "think"));
        let curves = edge_curves(&s, &params);
        let loop_curve = curves
            .iter()
            .find(|c| c.key.is_self_loop())
            .expect("self loop");
        assert!(loop_curve.control.y < 50.0);
        assert!(loop_curve.start.x < loop_curve.end.x);
        assert!(loop_curve.handle().y < 50.0);
    }

    #[test]
    fn dangling_and_staged_edges_are_skipped() {
        let params = CurveParams::default();
        let mut s = two_party_store();
        s.participants.insert(Participant::with_id("staged", "S"));
        s.connections
            .insert(Connection::with_id("c2", "a", Some("ghost".into()), "lost"));
        s.connections
            .insert(Connection::with_id("c3", "staged", Some("a".into()), "wait"));
        assert_eq!(edge_curves(&s, &params).len(), 1);
    }

    #[test]
    fn open_edge_ends_at_default_offset() {
        let params = CurveParams::default();
        let mut s = two_party_store();
        s.connections.insert(Connection::with_id("c2", "a", None, "pending"));
        let curves = edge_curves(&s, &params);
        let open = curves.iter().find(|c| c.key.to.is_none()).expect("open");
        assert!(close(open.end, Point::new(32.0, 50.0)));
    }

    #[test]
    fn handle_is_curve_midpoint() {
        let curve = EdgeCurve {
            key: EdgeKey::new("a", Some("b".into())),
            start: Point::new(0.0, 0.0),
            control: Point::new(50.0, 100.0),
            end: Point::new(100.0, 0.0),
            count: 1,
        };
        assert!(close(curve.handle(), Point::new(50.0, 50.0)));
        assert!(close(curve.point_at(0.0), curve.start));
        assert!(close(curve.point_at(1.0), curve.end));
        let dir = curve.end_direction();
        assert!(dir.x > 0.0 && dir.y < 0.0);
    }
}
