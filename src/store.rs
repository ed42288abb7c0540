use crate::error::StoreError;
use crate::model::{
    Connection, DecisionLine, DecisionNode, Entity, EntityId, FreeLine, Offset, Participant,
    Point, ProcessObject,
};
use crate::sync::{Change, Mutation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Table<E> {
    rows: Vec<E>,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<E: Entity> Table<E> {
    pub fn get(&self, id: &str) -> Option<&E> {
        self.rows.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, entity: E) {
        match self.rows.iter().position(|e| e.id() == entity.id()) {
            Some(idx) => self.rows[idx] = entity,
            None => self.rows.push(entity),
        }
    }

    pub fn update(&mut self, id: &str, patch: &E::Patch) -> Result<(), StoreError> {
        if !E::patch_is_valid(patch) {
            return Err(StoreError::InvalidPosition {
                kind: E::KIND,
                id: id.to_string(),
            });
        }
        let entity = self
            .rows
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            })?;
        entity.apply(patch);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<E, StoreError> {
        let idx = self
            .rows
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            })?;
        Ok(self.rows.remove(idx))
    }

    fn apply_change(&mut self, change: &Change<E, E::Patch>) -> Result<(), StoreError> {
        match change {
            Change::Add(entity) => {
                self.insert(entity.clone());
                Ok(())
            }
            Change::Update { id, patch } => self.update(id, patch),
            Change::Remove { id } => self.remove(id).map(|_| ()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub from: EntityId,
    pub to: Option<EntityId>,
}

impl EdgeKey {
    pub fn new(from: impl Into<EntityId>, to: Option<EntityId>) -> Self {
        Self {
            from: from.into(),
            to,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.to.as_deref() == Some(self.from.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionGroup<'a> {
    pub from: &'a str,
    pub to: Option<&'a str>,
    pub cards: Vec<&'a Connection>,
}

impl ConnectionGroup<'_> {
    pub fn count(&self) -> usize {
        self.cards.len()
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from, self.to.map(str::to_string))
    }

    pub fn earliest_timestamp(&self) -> u64 {
        self.cards.iter().map(|c| c.timestamp).min().unwrap_or(0)
    }

    /// Accumulated manual translation of the control point. All cards of an
    /// edge carry the same offset; the first one that has it wins.
    pub fn offset(&self) -> Offset {
        let curve = self
            .cards
            .iter()
            .find_map(|c| c.curve_offset)
            .unwrap_or(Offset::ZERO);
        let legacy = self
            .cards
            .iter()
            .find_map(|c| c.connection_offset)
            .unwrap_or(Offset::ZERO);
        curve + legacy
    }

    pub fn stored_curve_offset(&self) -> Offset {
        self.cards
            .iter()
            .find_map(|c| c.curve_offset)
            .unwrap_or(Offset::ZERO)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionLinePoints {
    pub start: Point,
    pub hub: Point,
    pub options: [Point; 2],
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EntityStore {
    pub participants: Table<Participant>,
    pub connections: Table<Connection>,
    pub process_objects: Table<ProcessObject>,
    pub free_lines: Table<FreeLine>,
    pub decision_lines: Table<DecisionLine>,
    pub decision_nodes: Table<DecisionNode>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::Participant(c) => self.participants.apply_change(c),
            Mutation::Connection(c) => self.connections.apply_change(c),
            Mutation::ProcessObject(c) => self.process_objects.apply_change(c),
            Mutation::FreeLine(c) => self.free_lines.apply_change(c),
            Mutation::DecisionLine(c) => self.decision_lines.apply_change(c),
            Mutation::DecisionNode(c) => self.decision_nodes.apply_change(c),
        }
    }

    pub fn grouped_connections(&self) -> Vec<ConnectionGroup<'_>> {
        let mut index: HashMap<(&str, Option<&str>), usize> = HashMap::new();
        let mut groups: Vec<ConnectionGroup<'_>> = Vec::new();
        for c in self.connections.iter() {
            let key = (c.from.as_str(), c.to.as_deref());
            match index.get(&key) {
                Some(&i) => groups[i].cards.push(c),
                None => {
                    index.insert(key, groups.len());
                    groups.push(ConnectionGroup {
                        from: key.0,
                        to: key.1,
                        cards: vec![c],
                    });
                }
            }
        }
        groups
    }

    pub fn group(&self, key: &EdgeKey) -> Option<ConnectionGroup<'_>> {
        let cards: Vec<&Connection> = self
            .connections
            .iter()
            .filter(|c| c.from == key.from && c.to == key.to)
            .collect();
        let first = cards.first()?;
        Some(ConnectionGroup {
            from: first.from.as_str(),
            to: first.to.as_deref(),
            cards,
        })
    }

    pub fn edge_curve_offset(&self, key: &EdgeKey) -> Offset {
        self.group(key).map(|g| g.offset()).unwrap_or(Offset::ZERO)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.from == from && c.to.as_deref() == Some(to))
    }

    pub fn participant_position(&self, id: &str) -> Option<Point> {
        self.participants.get(id).and_then(Participant::position)
    }

    fn anchored(&self, anchor: Option<&str>, stored: Point) -> Point {
        anchor
            .and_then(|id| self.participant_position(id))
            .unwrap_or(stored)
    }

    pub fn free_line_points(&self, line: &FreeLine) -> (Point, Point) {
        (
            self.anchored(line.start_participant.as_deref(), line.start),
            self.anchored(line.end_participant.as_deref(), line.end),
        )
    }

    pub fn decision_line_points(&self, line: &DecisionLine) -> DecisionLinePoints {
        DecisionLinePoints {
            start: self.anchored(line.start_participant.as_deref(), line.start),
            hub: line.hub,
            options: [
                self.anchored(line.option_participants[0].as_deref(), line.options[0]),
                self.anchored(line.option_participants[1].as_deref(), line.options[1]),
            ],
        }
    }

    pub fn decision_node_position(&self, node: &DecisionNode, dock_offset: Offset) -> Point {
        node.docked_to
            .as_deref()
            .and_then(|id| self.participant_position(id))
            .map(|p| p.translated(dock_offset))
            .unwrap_or(node.position)
    }

    /// Where the open edge of `from` ends. `None` when `from` is not on the
    /// board.
    pub fn open_end_position(&self, from: &str, default_offset: Offset) -> Option<Point> {
        let origin = self.participant_position(from)?;
        let stored = self
            .connections
            .iter()
            .filter(|c| c.from == from && c.to.is_none())
            .find_map(|c| c.open_end_position);
        Some(stored.unwrap_or_else(|| origin.translated(default_offset)))
    }
}
