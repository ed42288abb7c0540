use crate::coords::{clamp_point, to_percent};
use crate::curve::{CurveParams, base_control_point};
use crate::model::{
    Connection, ConnectionPatch, DecisionLine, DecisionLinePatch, DecisionNode, DecisionNodePatch,
    EntityId, FreeLine, FreeLinePatch, Offset, ParticipantPatch, Placement, Point, ProcessObject,
    ProcessObjectPatch,
};
use crate::settings::Settings;
use crate::snap::{
    DecisionEnd, Dock, Endpoint, LineEnd, dock_point, endpoint_mutation, loose_endpoint_near,
    nearest_participant,
};
use crate::store::{DecisionLinePoints, EdgeKey, EntityStore};
use crate::sync::Mutation;
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeLineHandle {
    Start,
    End,
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionLineHandle {
    Start,
    Option1,
    Option2,
    Box,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragTarget {
    Participant { id: EntityId },
    FreeLine { id: EntityId, handle: FreeLineHandle },
    DecisionLine { id: EntityId, handle: DecisionLineHandle },
    DecisionNode { id: EntityId },
    Edge { key: EdgeKey },
    OpenEnd { from: EntityId },
    ProcessObject { id: EntityId },
}

/// Entity state captured at pointer-down. Every move is computed as
/// "grabbed state + total pointer travel", so moves overwrite and only the
/// commit accumulates.
#[derive(Clone, Debug, PartialEq)]
pub enum Grab {
    Placed(Point),
    Staged,
    Edge {
        offset: Option<Offset>,
        cards: Vec<EntityId>,
    },
    FreeLine {
        line: FreeLine,
        start: Point,
        end: Point,
    },
    DecisionLine {
        line: DecisionLine,
        points: DecisionLinePoints,
    },
    DecisionNode {
        node: DecisionNode,
        position: Point,
    },
    OpenEnd {
        cards: Vec<(EntityId, Option<Point>)>,
        end: Point,
    },
    ProcessObject {
        object: ProcessObject,
        start: Point,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveDrag {
    pub target: DragTarget,
    pub origin: Point,
    pub pointer: Point,
    pub grab: Grab,
    /// Live position of the dragged handle. For a staged participant this
    /// is the only place the drop position exists until commit.
    pub preview: Option<Point>,
}

impl ActiveDrag {
    pub fn travel(&self) -> Offset {
        self.origin.offset_to(self.pointer)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match self {
            DragState::Dragging(drag) => Some(drag),
            DragState::Idle => None,
        }
    }

    pub fn target(&self) -> Option<&DragTarget> {
        self.active().map(|d| &d.target)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerPhase {
    Down(DragTarget),
    Move,
    Up,
    Cancel,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: egui::Pos2,
    pub canvas: egui::Rect,
}

impl PointerEvent {
    pub fn down(target: DragTarget, position: egui::Pos2, canvas: egui::Rect) -> Self {
        Self {
            phase: PointerPhase::Down(target),
            position,
            canvas,
        }
    }

    pub fn moved(position: egui::Pos2, canvas: egui::Rect) -> Self {
        Self {
            phase: PointerPhase::Move,
            position,
            canvas,
        }
    }

    pub fn up(position: egui::Pos2, canvas: egui::Rect) -> Self {
        Self {
            phase: PointerPhase::Up,
            position,
            canvas,
        }
    }

    pub fn cancel(position: egui::Pos2, canvas: egui::Rect) -> Self {
        Self {
            phase: PointerPhase::Cancel,
            position,
            canvas,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub next: DragState,
    pub mutations: Vec<Mutation>,
    pub commit: bool,
}

impl Transition {
    fn stay(state: &DragState) -> Self {
        Self {
            next: state.clone(),
            mutations: Vec::new(),
            commit: false,
        }
    }

    fn idle(mutations: Vec<Mutation>, commit: bool) -> Self {
        Self {
            next: DragState::Idle,
            mutations,
            commit,
        }
    }
}

pub fn step(
    state: &DragState,
    event: &PointerEvent,
    store: &EntityStore,
    settings: &Settings,
) -> Transition {
    let pointer = to_percent(event.position, event.canvas);
    match (state, &event.phase) {
        (DragState::Idle, PointerPhase::Down(target)) => {
            let Some(grab) = grab(store, target, settings) else {
                log::debug!("drag target vanished before pointer-down: {target:?}");
                return Transition::idle(Vec::new(), false);
            };
            let preview = match grab {
                Grab::Staged => Some(clamp_point(pointer)),
                _ => None,
            };
            log::debug!("drag start: {target:?}");
            Transition {
                next: DragState::Dragging(ActiveDrag {
                    target: target.clone(),
                    origin: pointer,
                    pointer,
                    grab,
                    preview,
                }),
                mutations: Vec::new(),
                commit: false,
            }
        }
        (DragState::Dragging(_), PointerPhase::Down(_)) => Transition::stay(state),
        (DragState::Idle, _) => Transition::stay(state),
        (DragState::Dragging(drag), PointerPhase::Move) => {
            if !target_exists(store, &drag.target) {
                return Transition::stay(state);
            }
            let mut drag = drag.clone();
            drag.pointer = pointer;
            let mutations = live_mutations(&mut drag, store, settings);
            Transition {
                next: DragState::Dragging(drag),
                mutations,
                commit: false,
            }
        }
        (DragState::Dragging(drag), PointerPhase::Up) => {
            if !target_exists(store, &drag.target) {
                log::debug!("drag target deleted mid-drag, dropping commit: {:?}", drag.target);
                return Transition::idle(Vec::new(), false);
            }
            let mut drag = drag.clone();
            drag.pointer = pointer;
            let inside = event.canvas.contains(event.position);
            let mutations = commit_mutations(&mut drag, store, settings, event.canvas.size(), inside);
            log::debug!("drag commit: {:?} ({} mutations)", drag.target, mutations.len());
            Transition::idle(mutations, true)
        }
        (DragState::Dragging(drag), PointerPhase::Cancel) => {
            log::debug!("drag cancelled: {:?}", drag.target);
            let mutations = if target_exists(store, &drag.target) {
                restore_mutations(drag)
            } else {
                Vec::new()
            };
            Transition::idle(mutations, false)
        }
    }
}

fn target_exists(store: &EntityStore, target: &DragTarget) -> bool {
    match target {
        DragTarget::Participant { id } => store.participants.contains(id),
        DragTarget::FreeLine { id, .. } => store.free_lines.contains(id),
        DragTarget::DecisionLine { id, .. } => store.decision_lines.contains(id),
        DragTarget::DecisionNode { id } => store.decision_nodes.contains(id),
        DragTarget::Edge { key } => store.group(key).is_some(),
        DragTarget::OpenEnd { from } => store
            .connections
            .iter()
            .any(|c| c.from == *from && c.to.is_none()),
        DragTarget::ProcessObject { id } => store.process_objects.contains(id),
    }
}

fn grab(store: &EntityStore, target: &DragTarget, settings: &Settings) -> Option<Grab> {
    match target {
        DragTarget::Participant { id } => {
            let participant = store.participants.get(id)?;
            Some(match participant.placement {
                Placement::Board(p) => Grab::Placed(p),
                Placement::Staging => Grab::Staged,
            })
        }
        DragTarget::Edge { key } => {
            let group = store.group(key)?;
            Some(Grab::Edge {
                offset: group.cards.iter().find_map(|c| c.curve_offset),
                cards: group.cards.iter().map(|c| c.id.clone()).collect(),
            })
        }
        DragTarget::FreeLine { id, .. } => {
            let line = store.free_lines.get(id)?;
            let (start, end) = store.free_line_points(line);
            Some(Grab::FreeLine {
                line: line.clone(),
                start,
                end,
            })
        }
        DragTarget::DecisionLine { id, .. } => {
            let line = store.decision_lines.get(id)?;
            Some(Grab::DecisionLine {
                line: line.clone(),
                points: store.decision_line_points(line),
            })
        }
        DragTarget::DecisionNode { id } => {
            let node = store.decision_nodes.get(id)?;
            Some(Grab::DecisionNode {
                node: node.clone(),
                position: store.decision_node_position(node, settings.decision_dock_offset),
            })
        }
        DragTarget::OpenEnd { from } => {
            let end = store.open_end_position(from, settings.open_end_offset)?;
            let cards: Vec<(EntityId, Option<Point>)> = store
                .connections
                .iter()
                .filter(|c| c.from == *from && c.to.is_none())
                .map(|c: &Connection| (c.id.clone(), c.open_end_position))
                .collect();
            if cards.is_empty() {
                return None;
            }
            Some(Grab::OpenEnd { cards, end })
        }
        DragTarget::ProcessObject { id } => {
            let object = store.process_objects.get(id)?;
            let start = object.position.unwrap_or(settings.canvas_center);
            Some(Grab::ProcessObject {
                object: object.clone(),
                start,
            })
        }
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

fn decision_handle_end(handle: DecisionLineHandle) -> Option<DecisionEnd> {
    match handle {
        DecisionLineHandle::Start => Some(DecisionEnd::Start),
        DecisionLineHandle::Option1 => Some(DecisionEnd::Option(0)),
        DecisionLineHandle::Option2 => Some(DecisionEnd::Option(1)),
        DecisionLineHandle::Box => None,
    }
}

fn free_line_end(handle: FreeLineHandle) -> Option<LineEnd> {
    match handle {
        FreeLineHandle::Start => Some(LineEnd::Start),
        FreeLineHandle::End => Some(LineEnd::End),
        FreeLineHandle::Middle => None,
    }
}

/// Mutations for the current pointer position, without any docking.
/// Dragged endpoints are released from their participant for the duration
/// of the drag; the commit decides where they end up.
fn live_mutations(drag: &mut ActiveDrag, store: &EntityStore, settings: &Settings) -> Vec<Mutation> {
    let travel = drag.travel();
    match (&drag.target, &drag.grab) {
        (DragTarget::Participant { id }, Grab::Placed(p)) => {
            let position = clamp_point(p.translated(travel));
            drag.preview = Some(position);
            vec![Mutation::participant(
                id.clone(),
                ParticipantPatch::placement(Placement::Board(position)),
            )]
        }
        (DragTarget::Participant { .. }, Grab::Staged) => {
            drag.preview = Some(clamp_point(drag.pointer));
            Vec::new()
        }
        (DragTarget::Edge { key }, Grab::Edge { offset, cards }) => {
            let params = CurveParams::from_settings(settings);
            let Some(base) = base_control_point(store, key, &params) else {
                return Vec::new();
            };
            // The handle sits at the curve midpoint, which moves half as far
            // as the control point.
            let live = offset.unwrap_or(Offset::ZERO) + travel.scaled(2.0);
            drag.preview = Some(base.translated(live));
            cards
                .iter()
                .map(|id| Mutation::connection(id.clone(), ConnectionPatch::curve_offset(live)))
                .collect()
        }
        (DragTarget::FreeLine { id, handle }, Grab::FreeLine { line, start, end }) => {
            let patch = match handle {
                FreeLineHandle::Start => {
                    let p = clamp_point(start.translated(travel));
                    drag.preview = Some(p);
                    FreeLinePatch {
                        start: Some(p),
                        start_participant: Some(None),
                        ..Default::default()
                    }
                }
                FreeLineHandle::End => {
                    let p = clamp_point(end.translated(travel));
                    drag.preview = Some(p);
                    FreeLinePatch {
                        end: Some(p),
                        end_participant: Some(None),
                        ..Default::default()
                    }
                }
                FreeLineHandle::Middle => {
                    let old_mid = midpoint(*start, *end);
                    let new_mid = clamp_point(old_mid.translated(travel));
                    let delta = old_mid.offset_to(new_mid);
                    drag.preview = Some(new_mid);
                    // Docked ends stay with their participants.
                    FreeLinePatch {
                        start: line
                            .start_participant
                            .is_none()
                            .then(|| clamp_point(start.translated(delta))),
                        end: line
                            .end_participant
                            .is_none()
                            .then(|| clamp_point(end.translated(delta))),
                        ..Default::default()
                    }
                }
            };
            vec![Mutation::free_line(id.clone(), patch)]
        }
        (DragTarget::DecisionLine { id, handle }, Grab::DecisionLine { line, points }) => {
            let mut patch = DecisionLinePatch::default();
            match handle {
                DecisionLineHandle::Start => {
                    let p = clamp_point(points.start.translated(travel));
                    drag.preview = Some(p);
                    patch.start = Some(p);
                    patch.start_participant = Some(None);
                }
                DecisionLineHandle::Option1 | DecisionLineHandle::Option2 => {
                    let i = usize::from(*handle == DecisionLineHandle::Option2);
                    let p = clamp_point(points.options[i].translated(travel));
                    drag.preview = Some(p);
                    patch.set_option(i, p);
                    patch.set_option_participant(i, None);
                }
                DecisionLineHandle::Box => {
                    let hub = clamp_point(points.hub.translated(travel));
                    let delta = points.hub.offset_to(hub);
                    drag.preview = Some(hub);
                    patch.hub = Some(hub);
                    if line.start_participant.is_none() {
                        patch.start = Some(clamp_point(points.start.translated(delta)));
                    }
                    for i in 0..2 {
                        if line.option_participants[i].is_none() {
                            patch.set_option(i, clamp_point(points.options[i].translated(delta)));
                        }
                    }
                }
            }
            vec![Mutation::decision_line(id.clone(), patch)]
        }
        (DragTarget::DecisionNode { id }, Grab::DecisionNode { position, .. }) => {
            let p = clamp_point(position.translated(travel));
            drag.preview = Some(p);
            vec![Mutation::decision_node(
                id.clone(),
                DecisionNodePatch {
                    position: Some(p),
                    docked_to: Some(None),
                    ..Default::default()
                },
            )]
        }
        (DragTarget::OpenEnd { .. }, Grab::OpenEnd { cards, end }) => {
            let p = clamp_point(end.translated(travel));
            drag.preview = Some(p);
            cards
                .iter()
                .map(|(id, _)| {
                    Mutation::connection(
                        id.clone(),
                        ConnectionPatch {
                            open_end_position: Some(Some(p)),
                            ..Default::default()
                        },
                    )
                })
                .collect()
        }
        (DragTarget::ProcessObject { id }, Grab::ProcessObject { start, .. }) => {
            let p = clamp_point(start.translated(travel));
            drag.preview = Some(p);
            vec![Mutation::process_object(
                id.clone(),
                ProcessObjectPatch {
                    position: Some(Some(p)),
                    ..Default::default()
                },
            )]
        }
        (target, grab) => {
            log::debug!("drag target {target:?} does not match grab {grab:?}");
            Vec::new()
        }
    }
}

fn commit_mutations(
    drag: &mut ActiveDrag,
    store: &EntityStore,
    settings: &Settings,
    canvas_size: egui::Vec2,
    released_inside: bool,
) -> Vec<Mutation> {
    let mut mutations = live_mutations(drag, store, settings);
    let Some(final_point) = drag.preview else {
        return mutations;
    };
    let radius = settings.endpoint_snap_px;
    match (&drag.target, &drag.grab) {
        (DragTarget::Participant { id }, Grab::Staged) => {
            if !released_inside {
                return Vec::new();
            }
            mutations.push(Mutation::participant(
                id.clone(),
                ParticipantPatch::placement(Placement::Board(final_point)),
            ));
            let placement_radius = settings.placement_snap_fraction * canvas_size.x;
            if let Some(endpoint) = loose_endpoint_near(store, final_point, canvas_size, placement_radius) {
                mutations.push(endpoint_mutation(
                    &endpoint,
                    &Dock::Bind {
                        participant_id: id.clone(),
                        position: final_point,
                    },
                ));
            }
        }
        (DragTarget::FreeLine { id, handle }, _) => {
            if let Some(end) = free_line_end(*handle) {
                let dock = dock_point(store, final_point, canvas_size, radius, None);
                mutations = vec![endpoint_mutation(
                    &Endpoint::FreeLine { id: id.clone(), end },
                    &dock,
                )];
            }
        }
        (DragTarget::DecisionLine { id, handle }, _) => {
            if let Some(end) = decision_handle_end(*handle) {
                let dock = dock_point(store, final_point, canvas_size, radius, None);
                mutations = vec![endpoint_mutation(
                    &Endpoint::DecisionLine { id: id.clone(), end },
                    &dock,
                )];
            }
        }
        (DragTarget::DecisionNode { id }, _) => {
            let patch = match nearest_participant(store, final_point, canvas_size, radius, None) {
                Some(hit) => DecisionNodePatch {
                    position: Some(hit.position.translated(settings.decision_dock_offset)),
                    docked_to: Some(Some(hit.participant.id.clone())),
                    ..Default::default()
                },
                None => DecisionNodePatch {
                    position: Some(final_point),
                    docked_to: Some(None),
                    ..Default::default()
                },
            };
            mutations = vec![Mutation::decision_node(id.clone(), patch)];
        }
        (DragTarget::OpenEnd { from }, Grab::OpenEnd { cards, .. }) => {
            if let Some(hit) = nearest_participant(store, final_point, canvas_size, radius, Some(from)) {
                let receiver = hit.participant.id.clone();
                mutations = cards
                    .iter()
                    .map(|(id, _)| {
                        Mutation::connection(
                            id.clone(),
                            ConnectionPatch {
                                to: Some(Some(receiver.clone())),
                                open_end_position: Some(None),
                                ..Default::default()
                            },
                        )
                    })
                    .collect();
            }
        }
        _ => {}
    }
    mutations
}

fn restore_mutations(drag: &ActiveDrag) -> Vec<Mutation> {
    match (&drag.target, &drag.grab) {
        (DragTarget::Participant { id }, Grab::Placed(p)) => vec![Mutation::participant(
            id.clone(),
            ParticipantPatch::placement(Placement::Board(*p)),
        )],
        (_, Grab::Edge { offset, cards }) => cards
            .iter()
            .map(|id| {
                Mutation::connection(
                    id.clone(),
                    ConnectionPatch {
                        curve_offset: Some(*offset),
                        ..Default::default()
                    },
                )
            })
            .collect(),
        (_, Grab::FreeLine { line, .. }) => vec![Mutation::free_line(
            line.id.clone(),
            FreeLinePatch {
                start: Some(line.start),
                end: Some(line.end),
                start_participant: Some(line.start_participant.clone()),
                end_participant: Some(line.end_participant.clone()),
                ..Default::default()
            },
        )],
        (_, Grab::DecisionLine { line, .. }) => vec![Mutation::decision_line(
            line.id.clone(),
            DecisionLinePatch {
                start: Some(line.start),
                hub: Some(line.hub),
                option_a: Some(line.options[0]),
                option_b: Some(line.options[1]),
                start_participant: Some(line.start_participant.clone()),
                option_a_participant: Some(line.option_participants[0].clone()),
                option_b_participant: Some(line.option_participants[1].clone()),
                ..Default::default()
            },
        )],
        (_, Grab::DecisionNode { node, .. }) => vec![Mutation::decision_node(
            node.id.clone(),
            DecisionNodePatch {
                position: Some(node.position),
                docked_to: Some(node.docked_to.clone()),
                ..Default::default()
            },
        )],
        (_, Grab::OpenEnd { cards, .. }) => cards
            .iter()
            .map(|(id, stored)| {
                Mutation::connection(
                    id.clone(),
                    ConnectionPatch {
                        open_end_position: Some(*stored),
                        ..Default::default()
                    },
                )
            })
            .collect(),
        (_, Grab::ProcessObject { object, .. }) => vec![Mutation::process_object(
            object.id.clone(),
            ProcessObjectPatch {
                position: Some(object.position),
                ..Default::default()
            },
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, Participant};
    use crate::sync::Change;

    fn canvas() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 500.0))
    }

    fn at(x: f32, y: f32) -> egui::Pos2 {
        egui::pos2(x * 10.0, y * 5.0)
    }

    fn store() -> EntityStore {
        let mut s = EntityStore::new();
        s.participants
            .insert(Participant::with_id("a", "A").at(Point::new(20.0, 50.0)));
        s.participants
            .insert(Participant::with_id("b", "B").at(Point::new(80.0, 50.0)));
        s.participants.insert(Participant::with_id("new", "N"));
        s.connections
            .insert(Connection::with_id("c1", "a", Some("b".into()), "one"));
        s.connections
            .insert(Connection::with_id("c2", "a", Some("b".into()), "two"));
        s
    }

    fn assert_near(actual: Option<Point>, expected: Point) {
        let p = actual.expect("position");
        assert!(
            (p.x - expected.x).abs() < 1e-3 && (p.y - expected.y).abs() < 1e-3,
            "{p:?} != {expected:?}"
        );
    }

    fn apply_all(store: &mut EntityStore, t: &Transition) {
        for m in &t.mutations {
            store.apply(m).expect("mutation applies");
        }
    }

    fn run(
        store: &mut EntityStore,
        target: DragTarget,
        path: &[egui::Pos2],
    ) -> (DragState, Vec<Transition>) {
        let settings = Settings::default();
        let mut state = DragState::Idle;
        let mut transitions = Vec::new();
        let (first, rest) = path.split_first().expect("path");
        let t = step(&state, &PointerEvent::down(target, *first, canvas()), store, &settings);
        state = t.next.clone();
        transitions.push(t);
        let (last, moves) = rest.split_last().expect("path end");
        for p in moves {
            let t = step(&state, &PointerEvent::moved(*p, canvas()), store, &settings);
            apply_all(store, &t);
            state = t.next.clone();
            transitions.push(t);
        }
        let t = step(&state, &PointerEvent::up(*last, canvas()), store, &settings);
        apply_all(store, &t);
        state = t.next.clone();
        transitions.push(t);
        (state, transitions)
    }

    #[test]
    fn move_while_idle_is_a_noop() {
        let s = store();
        let t = step(
            &DragState::Idle,
            &PointerEvent::moved(at(10.0, 10.0), canvas()),
            &s,
            &Settings::default(),
        );
        assert!(t.next.is_idle());
        assert!(t.mutations.is_empty());
    }

    #[test]
    fn placed_participant_follows_pointer_and_clamps() {
        let mut s = store();
        let (state, transitions) = run(
            &mut s,
            DragTarget::Participant { id: "a".into() },
            &[at(20.0, 50.0), at(30.0, 40.0), at(-50.0, 140.0)],
        );
        assert!(state.is_idle());
        assert!(!transitions[1].commit);
        assert!(transitions[2].commit);
        assert_eq!(s.participant_position("a"), Some(Point::new(8.0, 92.0)));
    }

    #[test]
    fn second_pointer_down_is_ignored() {
        let s = store();
        let settings = Settings::default();
        let t = step(
            &DragState::Idle,
            &PointerEvent::down(DragTarget::Participant { id: "a".into() }, at(20.0, 50.0), canvas()),
            &s,
            &settings,
        );
        let again = step(
            &t.next,
            &PointerEvent::down(DragTarget::Participant { id: "b".into() }, at(80.0, 50.0), canvas()),
            &s,
            &settings,
        );
        assert_eq!(again.next.target(), Some(&DragTarget::Participant { id: "a".into() }));
    }

    #[test]
    fn staged_participant_only_previews_until_drop() {
        let mut s = store();
        let settings = Settings::default();
        let target = DragTarget::Participant { id: "new".into() };
        let down = step(
            &DragState::Idle,
            &PointerEvent::down(target, egui::pos2(-40.0, 100.0), canvas()),
            &s,
            &settings,
        );
        let mv = step(&down.next, &PointerEvent::moved(at(40.0, 40.0), canvas()), &s, &settings);
        assert!(mv.mutations.is_empty());
        assert_near(mv.next.active().and_then(|d| d.preview), Point::new(40.0, 40.0));
        let up = step(&mv.next, &PointerEvent::up(at(40.0, 40.0), canvas()), &s, &settings);
        apply_all(&mut s, &up);
        assert_near(s.participant_position("new"), Point::new(40.0, 40.0));
    }

    #[test]
    fn staged_participant_dropped_outside_stays_staged() {
        let mut s = store();
        let (_, transitions) = run(
            &mut s,
            DragTarget::Participant { id: "new".into() },
            &[egui::pos2(-40.0, 100.0), at(40.0, 40.0), egui::pos2(-20.0, 80.0)],
        );
        assert!(transitions.last().expect("up").mutations.is_empty());
        assert_eq!(s.participant_position("new"), None);
    }

    #[test]
    fn staged_drop_binds_one_loose_endpoint() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(41.0, 41.0), Point::new(60.0, 80.0));
        line.id = "f1".into();
        s.free_lines.insert(line);
        let mut decision = DecisionLine::new(
            Point::new(42.0, 40.0),
            Point::new(50.0, 30.0),
            [Point::new(60.0, 20.0), Point::new(60.0, 40.0)],
        );
        decision.id = "d1".into();
        s.decision_lines.insert(decision);

        run(
            &mut s,
            DragTarget::Participant { id: "new".into() },
            &[egui::pos2(-40.0, 100.0), at(40.0, 40.0)],
        );
        let line = s.free_lines.get("f1").expect("f1");
        assert_eq!(line.start_participant.as_deref(), Some("new"));
        let decision = s.decision_lines.get("d1").expect("d1");
        assert_eq!(decision.start_participant, None);
    }

    #[test]
    fn edge_drag_overwrites_live_and_accumulates_on_commit() {
        let mut s = store();
        let key = EdgeKey::new("a", Some("b".into()));
        let target = DragTarget::Edge { key: key.clone() };
        let (_, transitions) = run(
            &mut s,
            target.clone(),
            &[at(50.0, 40.0), at(51.0, 40.0), at(52.0, 40.0), at(53.0, 41.0)],
        );
        // Each live frame writes the full offset, never an increment.
        let live: Vec<Point> = transitions[1..3]
            .iter()
            .map(|t| match &t.mutations[0] {
                Mutation::Connection(Change::Update { patch, .. }) => {
                    let o = patch.curve_offset.flatten().expect("offset");
                    Point::new(o.x, o.y)
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_near(live.first().copied(), Point::new(2.0, 0.0));
        assert_near(live.get(1).copied(), Point::new(4.0, 0.0));
        let first = s.group(&key).expect("edge").stored_curve_offset();
        assert_near(Some(Point::new(first.x, first.y)), Point::new(6.0, 2.0));

        run(&mut s, target, &[at(10.0, 10.0), at(9.0, 12.5)]);
        let group = s.group(&key).expect("edge");
        for card in &group.cards {
            let o = card.curve_offset.expect("offset");
            assert!((o.x - 4.0).abs() < 1e-4 && (o.y - 7.0).abs() < 1e-4, "{o:?}");
        }
    }

    #[test]
    fn free_line_endpoint_docks_and_undocks() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(40.0, 20.0), Point::new(60.0, 20.0));
        line.id = "f1".into();
        s.free_lines.insert(line);
        let target = DragTarget::FreeLine {
            id: "f1".into(),
            handle: FreeLineHandle::End,
        };

        run(&mut s, target.clone(), &[at(60.0, 20.0), at(78.0, 48.0)]);
        let line = s.free_lines.get("f1").expect("f1").clone();
        assert_eq!(line.end_participant.as_deref(), Some("b"));
        assert_eq!(s.free_line_points(&line).1, Point::new(80.0, 50.0));

        run(&mut s, target, &[at(80.0, 50.0), at(50.0, 80.0)]);
        let line = s.free_lines.get("f1").expect("f1");
        assert_eq!(line.end_participant, None);
        assert_near(Some(line.end), Point::new(50.0, 80.0));
    }

    #[test]
    fn collapsed_canvas_does_not_dock_line_ends() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(40.0, 20.0), Point::new(79.0, 50.0));
        line.id = "f1".into();
        s.free_lines.insert(line);
        let settings = Settings::default();
        let empty = egui::Rect::from_min_size(egui::pos2(10.0, 10.0), egui::Vec2::ZERO);
        let target = DragTarget::FreeLine {
            id: "f1".into(),
            handle: FreeLineHandle::End,
        };
        let down = step(&DragState::Idle, &PointerEvent::down(target, egui::pos2(10.0, 10.0), empty), &s, &settings);
        let up = step(&down.next, &PointerEvent::up(egui::pos2(10.0, 10.0), empty), &s, &settings);
        apply_all(&mut s, &up);
        let line = s.free_lines.get("f1").expect("f1");
        assert_eq!(line.end_participant, None);
        assert_eq!(line.end, Point::new(79.0, 50.0));
    }

    #[test]
    fn free_line_middle_translates_both_ends() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(30.0, 20.0), Point::new(50.0, 30.0));
        line.id = "f1".into();
        s.free_lines.insert(line);
        run(
            &mut s,
            DragTarget::FreeLine {
                id: "f1".into(),
                handle: FreeLineHandle::Middle,
            },
            &[at(40.0, 25.0), at(45.0, 35.0)],
        );
        let line = s.free_lines.get("f1").expect("f1");
        assert_near(Some(line.start), Point::new(35.0, 30.0));
        assert_near(Some(line.end), Point::new(55.0, 40.0));
    }

    #[test]
    fn free_line_middle_keeps_docked_ends() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(20.0, 50.0), Point::new(80.0, 50.0));
        line.id = "f1".into();
        line.start_participant = Some("a".into());
        line.end_participant = Some("b".into());
        s.free_lines.insert(line);
        run(
            &mut s,
            DragTarget::FreeLine {
                id: "f1".into(),
                handle: FreeLineHandle::Middle,
            },
            &[at(50.0, 50.0), at(51.0, 50.0)],
        );
        let line = s.free_lines.get("f1").expect("f1");
        assert_eq!(line.start_participant.as_deref(), Some("a"));
        assert_eq!(line.end_participant.as_deref(), Some("b"));
        assert_eq!(
            s.free_line_points(line),
            (Point::new(20.0, 50.0), Point::new(80.0, 50.0))
        );
    }

    #[test]
    fn free_line_middle_moves_only_the_loose_end() {
        let mut s = store();
        let mut line = FreeLine::new(Point::new(20.0, 50.0), Point::new(50.0, 20.0));
        line.id = "f1".into();
        line.start_participant = Some("a".into());
        s.free_lines.insert(line);
        run(
            &mut s,
            DragTarget::FreeLine {
                id: "f1".into(),
                handle: FreeLineHandle::Middle,
            },
            &[at(35.0, 35.0), at(40.0, 30.0)],
        );
        let line = s.free_lines.get("f1").expect("f1");
        assert_eq!(line.start_participant.as_deref(), Some("a"));
        assert_eq!(line.start, Point::new(20.0, 50.0));
        assert_near(Some(line.end), Point::new(55.0, 15.0));
    }

    #[test]
    fn decision_box_keeps_docked_endpoints() {
        let mut s = store();
        let mut line = DecisionLine::new(
            Point::new(20.0, 50.0),
            Point::new(40.0, 50.0),
            [Point::new(60.0, 30.0), Point::new(60.0, 70.0)],
        );
        line.id = "d1".into();
        line.start_participant = Some("a".into());
        s.decision_lines.insert(line);
        run(
            &mut s,
            DragTarget::DecisionLine {
                id: "d1".into(),
                handle: DecisionLineHandle::Box,
            },
            &[at(40.0, 50.0), at(45.0, 55.0)],
        );
        let line = s.decision_lines.get("d1").expect("d1");
        assert_near(Some(line.hub), Point::new(45.0, 55.0));
        assert_eq!(line.start_participant.as_deref(), Some("a"));
        assert_eq!(line.start, Point::new(20.0, 50.0));
        assert_near(Some(line.options[0]), Point::new(65.0, 35.0));
        assert_near(Some(line.options[1]), Point::new(65.0, 75.0));
    }

    #[test]
    fn decision_node_redocks_at_commit() {
        let mut s = store();
        let mut node = DecisionNode::new("a", "Approve?", Point::new(50.0, 20.0));
        node.id = "n1".into();
        node.docked_to = Some("a".into());
        s.decision_nodes.insert(node);
        let settings = Settings::default();
        let target = DragTarget::DecisionNode { id: "n1".into() };

        run(&mut s, target.clone(), &[at(20.0, 59.0), at(50.0, 20.0)]);
        let node = s.decision_nodes.get("n1").expect("n1").clone();
        assert_eq!(node.docked_to, None);
        assert_near(Some(node.position), Point::new(50.0, 20.0));

        run(&mut s, target, &[at(50.0, 20.0), at(79.0, 51.0)]);
        let node = s.decision_nodes.get("n1").expect("n1");
        assert_eq!(node.docked_to.as_deref(), Some("b"));
        assert_eq!(
            s.decision_node_position(node, settings.decision_dock_offset),
            Point::new(80.0, 59.0)
        );
    }

    #[test]
    fn open_end_binds_every_open_card_to_receiver() {
        let mut s = store();
        s.connections.insert(Connection::with_id("o1", "a", None, "ask"));
        s.connections.insert(Connection::with_id("o2", "a", None, "ask again"));
        run(
            &mut s,
            DragTarget::OpenEnd { from: "a".into() },
            &[at(32.0, 50.0), at(60.0, 50.0), at(79.0, 50.0)],
        );
        for id in ["o1", "o2"] {
            let c = s.connections.get(id).expect("card");
            assert_eq!(c.to.as_deref(), Some("b"));
            assert_eq!(c.open_end_position, None);
        }
    }

    #[test]
    fn open_end_dropped_in_empty_space_stays_open() {
        let mut s = store();
        s.connections.insert(Connection::with_id("o1", "a", None, "ask"));
        run(
            &mut s,
            DragTarget::OpenEnd { from: "a".into() },
            &[at(32.0, 50.0), at(40.0, 20.0)],
        );
        let c = s.connections.get("o1").expect("card");
        assert_eq!(c.to, None);
        assert_near(c.open_end_position, Point::new(40.0, 20.0));
    }

    #[test]
    fn commit_after_deletion_is_a_noop() {
        let mut s = store();
        let settings = Settings::default();
        let target = DragTarget::Participant { id: "a".into() };
        let down = step(&DragState::Idle, &PointerEvent::down(target, at(20.0, 50.0), canvas()), &s, &settings);
        s.participants.remove("a").expect("remove");
        let up = step(&down.next, &PointerEvent::up(at(30.0, 30.0), canvas()), &s, &settings);
        assert!(up.next.is_idle());
        assert!(up.mutations.is_empty());
    }

    #[test]
    fn cancel_restores_grabbed_state() {
        let mut s = store();
        let settings = Settings::default();
        let target = DragTarget::Participant { id: "a".into() };
        let down = step(&DragState::Idle, &PointerEvent::down(target, at(20.0, 50.0), canvas()), &s, &settings);
        let mv = step(&down.next, &PointerEvent::moved(at(60.0, 60.0), canvas()), &s, &settings);
        apply_all(&mut s, &mv);
        assert_near(s.participant_position("a"), Point::new(60.0, 60.0));
        let cancel = step(&mv.next, &PointerEvent::cancel(at(60.0, 60.0), canvas()), &s, &settings);
        assert!(!cancel.commit);
        apply_all(&mut s, &cancel);
        assert!(cancel.next.is_idle());
        assert_eq!(s.participant_position("a"), Some(Point::new(20.0, 50.0)));
    }

    #[test]
    fn process_object_marker_moves_from_its_position() {
        let mut s = store();
        let mut object = ProcessObject::new("Invoice");
        object.id = "p1".into();
        object.position = Some(Point::new(30.0, 30.0));
        s.process_objects.insert(object);
        run(
            &mut s,
            DragTarget::ProcessObject { id: "p1".into() },
            &[at(30.0, 30.0), at(35.0, 32.0)],
        );
        assert_near(
            s.process_objects.get("p1").and_then(|o| o.position),
            Point::new(35.0, 32.0),
        );
    }
}
