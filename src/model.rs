use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntityId = String;

pub fn new_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }

    pub fn translated(self, offset: Offset) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y)
    }

    pub fn offset_to(self, other: Point) -> Offset {
        Offset::new(other.x - self.x, other.y - self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_premultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_array();
        Self { r, g, b, a }
    }
}

const DEFAULT_INK: Rgba = Rgba::rgb(30, 30, 30);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Participant,
    Connection,
    ProcessObject,
    FreeLine,
    DecisionLine,
    DecisionNode,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Participant => "participant",
            EntityKind::Connection => "connection",
            EntityKind::ProcessObject => "process object",
            EntityKind::FreeLine => "free line",
            EntityKind::DecisionLine => "decision line",
            EntityKind::DecisionNode => "decision node",
        };
        f.write_str(s)
    }
}

pub trait Entity: Clone {
    type Patch: Clone + fmt::Debug;
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn apply(&mut self, patch: &Self::Patch);

    fn patch_is_valid(_patch: &Self::Patch) -> bool {
        true
    }
}

fn opt_point_finite(p: &Option<Point>) -> bool {
    p.is_none_or(|p| p.is_finite())
}

fn nested_point_finite(p: &Option<Option<Point>>) -> bool {
    p.as_ref().is_none_or(opt_point_finite)
}

fn nested_offset_finite(o: &Option<Option<Offset>>) -> bool {
    o.as_ref().is_none_or(|o| o.is_none_or(|o| o.is_finite()))
}

/// Serde for `Option<Option<T>>` patch fields: an absent key keeps the
/// stored value, `null` clears it.
mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Participants

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum Placement {
    #[default]
    Staging,
    Board(Point),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_participant_color")]
    pub color: Rgba,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub placement: Placement,
}

fn default_participant_color() -> Rgba {
    Rgba::rgb(40, 90, 200)
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(new_id(), name)
    }

    pub fn with_id(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: String::new(),
            color: default_participant_color(),
            icon: String::new(),
            placement: Placement::Staging,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.placement = Placement::Board(position);
        self
    }

    pub fn is_placed(&self) -> bool {
        matches!(self.placement, Placement::Board(_))
    }

    pub fn position(&self) -> Option<Point> {
        match self.placement {
            Placement::Board(p) => Some(p),
            Placement::Staging => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParticipantPatch {
    pub name: Option<String>,
    pub role: Option<String>,
    pub color: Option<Rgba>,
    pub icon: Option<String>,
    pub placement: Option<Placement>,
}

impl ParticipantPatch {
    pub fn placement(placement: Placement) -> Self {
        Self {
            placement: Some(placement),
            ..Default::default()
        }
    }
}

impl Entity for Participant {
    type Patch = ParticipantPatch;
    const KIND: EntityKind = EntityKind::Participant;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &ParticipantPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(placement) = patch.placement {
            self.placement = placement;
        }
    }

    fn patch_is_valid(patch: &ParticipantPatch) -> bool {
        match patch.placement {
            Some(Placement::Board(p)) => p.is_finite(),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Connections

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: EntityId,
    pub from: EntityId,
    /// `None` while the step is still waiting for a receiver.
    #[serde(default)]
    pub to: Option<EntityId>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub connection_offset: Option<Offset>,
    #[serde(default)]
    pub curve_offset: Option<Offset>,
    #[serde(default)]
    pub open_end_position: Option<Point>,
    #[serde(default)]
    pub process_object_ids: Vec<EntityId>,
}

impl Connection {
    pub fn new(from: impl Into<EntityId>, to: Option<EntityId>, label: impl Into<String>) -> Self {
        Self::with_id(new_id(), from, to, label)
    }

    pub fn with_id(
        id: impl Into<EntityId>,
        from: impl Into<EntityId>,
        to: Option<EntityId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to,
            label: label.into(),
            medium: None,
            duration: None,
            description: None,
            round: 0,
            timestamp: now_millis(),
            connection_offset: None,
            curve_offset: None,
            open_end_position: None,
            process_object_ids: Vec::new(),
        }
    }

    pub fn at_time(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_open(&self) -> bool {
        self.to.is_none()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub to: Option<Option<EntityId>>,
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub medium: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub duration: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub description: Option<Option<String>>,
    pub round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub connection_offset: Option<Option<Offset>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub curve_offset: Option<Option<Offset>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub open_end_position: Option<Option<Point>>,
    pub process_object_ids: Option<Vec<EntityId>>,
}

impl ConnectionPatch {
    pub fn curve_offset(offset: Offset) -> Self {
        Self {
            curve_offset: Some(Some(offset)),
            ..Default::default()
        }
    }
}

impl Entity for Connection {
    type Patch = ConnectionPatch;
    const KIND: EntityKind = EntityKind::Connection;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &ConnectionPatch) {
        if let Some(to) = &patch.to {
            self.to = to.clone();
        }
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(medium) = &patch.medium {
            self.medium = medium.clone();
        }
        if let Some(duration) = &patch.duration {
            self.duration = duration.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(round) = patch.round {
            self.round = round;
        }
        if let Some(offset) = patch.connection_offset {
            self.connection_offset = offset;
        }
        if let Some(offset) = patch.curve_offset {
            self.curve_offset = offset;
        }
        if let Some(p) = patch.open_end_position {
            self.open_end_position = p;
        }
        if let Some(ids) = &patch.process_object_ids {
            self.process_object_ids = ids.clone();
        }
    }

    fn patch_is_valid(patch: &ConnectionPatch) -> bool {
        nested_offset_finite(&patch.connection_offset)
            && nested_offset_finite(&patch.curve_offset)
            && nested_point_finite(&patch.open_end_position)
    }
}

// ---------------------------------------------------------------------------
// Communication objects

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessObject {
    pub id: EntityId,
    #[serde(default)]
    pub connection_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_object_color")]
    pub color: Rgba,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub created_at: u64,
}

fn default_object_color() -> Rgba {
    Rgba::rgb(200, 140, 40)
}

impl ProcessObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            connection_id: None,
            name: name.into(),
            icon: String::new(),
            color: default_object_color(),
            position: None,
            created_at: now_millis(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessObjectPatch {
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub connection_id: Option<Option<EntityId>>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub position: Option<Option<Point>>,
}

impl Entity for ProcessObject {
    type Patch = ProcessObjectPatch;
    const KIND: EntityKind = EntityKind::ProcessObject;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &ProcessObjectPatch) {
        if let Some(connection_id) = &patch.connection_id {
            self.connection_id = connection_id.clone();
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }

    fn patch_is_valid(patch: &ProcessObjectPatch) -> bool {
        nested_point_finite(&patch.position)
    }
}

// ---------------------------------------------------------------------------
// Decision nodes

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionKind {
    #[default]
    Binary,
    Multiple,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionOption {
    pub label: String,
    #[serde(default)]
    pub target: Option<EntityId>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Rgba,
}

impl DecisionOption {
    pub fn new(label: impl Into<String>, target: Option<EntityId>) -> Self {
        Self {
            label: label.into(),
            target,
            description: String::new(),
            color: DEFAULT_INK,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionNode {
    pub id: EntityId,
    pub question: String,
    pub from: EntityId,
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    /// Last committed position. Ignored while `docked_to` resolves; read
    /// through `EntityStore::decision_node_position`.
    pub position: Point,
    #[serde(default)]
    pub docked_to: Option<EntityId>,
    #[serde(default)]
    pub kind: DecisionKind,
    #[serde(default)]
    pub timestamp: u64,
}

impl DecisionNode {
    pub fn new(from: impl Into<EntityId>, question: impl Into<String>, position: Point) -> Self {
        Self {
            id: new_id(),
            question: question.into(),
            from: from.into(),
            options: Vec::new(),
            position,
            docked_to: None,
            kind: DecisionKind::Binary,
            timestamp: now_millis(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionNodePatch {
    pub question: Option<String>,
    pub from: Option<EntityId>,
    pub options: Option<Vec<DecisionOption>>,
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub docked_to: Option<Option<EntityId>>,
    pub kind: Option<DecisionKind>,
}

impl Entity for DecisionNode {
    type Patch = DecisionNodePatch;
    const KIND: EntityKind = EntityKind::DecisionNode;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &DecisionNodePatch) {
        if let Some(question) = &patch.question {
            self.question = question.clone();
        }
        if let Some(from) = &patch.from {
            self.from = from.clone();
        }
        if let Some(options) = &patch.options {
            self.options = options.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(docked_to) = &patch.docked_to {
            self.docked_to = docked_to.clone();
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
    }

    fn patch_is_valid(patch: &DecisionNodePatch) -> bool {
        opt_point_finite(&patch.position)
    }
}

// ---------------------------------------------------------------------------
// Annotation lines

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FreeLine {
    pub id: EntityId,
    /// Last committed start. Superseded by `start_participant` while docked.
    pub start: Point,
    /// Last committed end. Superseded by `end_participant` while docked.
    pub end: Point,
    #[serde(default)]
    pub start_participant: Option<EntityId>,
    #[serde(default)]
    pub end_participant: Option<EntityId>,
    #[serde(default = "default_ink")]
    pub color: Rgba,
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default)]
    pub created_at: u64,
}

fn default_ink() -> Rgba {
    DEFAULT_INK
}

fn default_thickness() -> f32 {
    2.0
}

impl FreeLine {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: new_id(),
            start,
            end,
            start_participant: None,
            end_participant: None,
            color: DEFAULT_INK,
            thickness: default_thickness(),
            style: LineStyle::Solid,
            created_at: now_millis(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FreeLinePatch {
    pub start: Option<Point>,
    pub end: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub start_participant: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub end_participant: Option<Option<EntityId>>,
    pub color: Option<Rgba>,
    pub thickness: Option<f32>,
    pub style: Option<LineStyle>,
}

impl Entity for FreeLine {
    type Patch = FreeLinePatch;
    const KIND: EntityKind = EntityKind::FreeLine;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &FreeLinePatch) {
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(p) = &patch.start_participant {
            self.start_participant = p.clone();
        }
        if let Some(p) = &patch.end_participant {
            self.end_participant = p.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(thickness) = patch.thickness {
            self.thickness = thickness;
        }
        if let Some(style) = patch.style {
            self.style = style;
        }
    }

    fn patch_is_valid(patch: &FreeLinePatch) -> bool {
        opt_point_finite(&patch.start) && opt_point_finite(&patch.end)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionLine {
    pub id: EntityId,
    pub start: Point,
    pub hub: Point,
    pub options: [Point; 2],
    #[serde(default)]
    pub start_participant: Option<EntityId>,
    #[serde(default)]
    pub option_participants: [Option<EntityId>; 2],
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub labels: [String; 2],
    #[serde(default = "default_ink")]
    pub color: Rgba,
    #[serde(default)]
    pub created_at: u64,
}

impl DecisionLine {
    pub fn new(start: Point, hub: Point, options: [Point; 2]) -> Self {
        Self {
            id: new_id(),
            start,
            hub,
            options,
            start_participant: None,
            option_participants: [None, None],
            question: String::new(),
            labels: ["Yes".to_string(), "No".to_string()],
            color: DEFAULT_INK,
            created_at: now_millis(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionLinePatch {
    pub start: Option<Point>,
    pub hub: Option<Point>,
    pub option_a: Option<Point>,
    pub option_b: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub start_participant: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub option_a_participant: Option<Option<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "nullable")]
    pub option_b_participant: Option<Option<EntityId>>,
    pub question: Option<String>,
    pub labels: Option<[String; 2]>,
    pub color: Option<Rgba>,
}

impl DecisionLinePatch {
    pub fn set_option(&mut self, index: usize, point: Point) {
        if index == 0 {
            self.option_a = Some(point);
        } else {
            self.option_b = Some(point);
        }
    }

    pub fn set_option_participant(&mut self, index: usize, participant: Option<EntityId>) {
        if index == 0 {
            self.option_a_participant = Some(participant);
        } else {
            self.option_b_participant = Some(participant);
        }
    }
}

impl Entity for DecisionLine {
    type Patch = DecisionLinePatch;
    const KIND: EntityKind = EntityKind::DecisionLine;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: &DecisionLinePatch) {
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(hub) = patch.hub {
            self.hub = hub;
        }
        if let Some(p) = patch.option_a {
            self.options[0] = p;
        }
        if let Some(p) = patch.option_b {
            self.options[1] = p;
        }
        if let Some(p) = &patch.start_participant {
            self.start_participant = p.clone();
        }
        if let Some(p) = &patch.option_a_participant {
            self.option_participants[0] = p.clone();
        }
        if let Some(p) = &patch.option_b_participant {
            self.option_participants[1] = p.clone();
        }
        if let Some(question) = &patch.question {
            self.question = question.clone();
        }
        if let Some(labels) = &patch.labels {
            self.labels = labels.clone();
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }

    fn patch_is_valid(patch: &DecisionLinePatch) -> bool {
        opt_point_finite(&patch.start)
            && opt_point_finite(&patch.hub)
            && opt_point_finite(&patch.option_a)
            && opt_point_finite(&patch.option_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_patch_merges_only_touched_fields() {
        let mut p = Participant::with_id("a", "Alice");
        p.role = "Clerk".to_string();
        p.apply(&ParticipantPatch {
            name: Some("Alicia".to_string()),
            ..Default::default()
        });
        assert_eq!(p.name, "Alicia");
        assert_eq!(p.role, "Clerk");
        assert!(!p.is_placed());
    }

    #[test]
    fn staging_placement_has_no_position() {
        let mut p = Participant::with_id("a", "Alice").at(Point::new(20.0, 30.0));
        assert_eq!(p.position(), Some(Point::new(20.0, 30.0)));
        p.apply(&ParticipantPatch::placement(Placement::Staging));
        assert_eq!(p.position(), None);
    }

    #[test]
    fn nested_option_clears_field() {
        let mut c = Connection::with_id("c1", "a", Some("b".into()), "send");
        c.curve_offset = Some(Offset::new(3.0, 4.0));
        c.apply(&ConnectionPatch {
            curve_offset: Some(None),
            ..Default::default()
        });
        assert_eq!(c.curve_offset, None);
        assert_eq!(c.to.as_deref(), Some("b"));
    }

    #[test]
    fn non_finite_patch_is_rejected() {
        let patch = FreeLinePatch {
            start: Some(Point::new(f32::NAN, 1.0)),
            ..Default::default()
        };
        assert!(!FreeLine::patch_is_valid(&patch));
        let patch = ParticipantPatch::placement(Placement::Board(Point::new(1.0, f32::INFINITY)));
        assert!(!Participant::patch_is_valid(&patch));
    }

    #[test]
    fn decision_line_option_patch_targets_index() {
        let mut line = DecisionLine::new(
            Point::new(10.0, 10.0),
            Point::new(20.0, 20.0),
            [Point::new(30.0, 10.0), Point::new(30.0, 30.0)],
        );
        let mut patch = DecisionLinePatch::default();
        patch.set_option(1, Point::new(40.0, 40.0));
        patch.set_option_participant(1, Some("b".into()));
        line.apply(&patch);
        assert_eq!(line.options[0], Point::new(30.0, 10.0));
        assert_eq!(line.options[1], Point::new(40.0, 40.0));
        assert_eq!(line.option_participants[1].as_deref(), Some("b"));
    }
}
