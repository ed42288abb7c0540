use crate::coords::clamp_point;
use crate::curve::{CurveParams, EdgeCurve, edge_curves};
use crate::drag::{DragState, DragTarget, PointerEvent, step};
use crate::error::{StoreError, SyncError};
use crate::hit;
use crate::layout::{RadialSlot, SwimlaneLayout, radial_layout, swimlane_layout};
use crate::model::{
    Connection, ConnectionPatch, DecisionLine, DecisionLinePatch, DecisionNode, DecisionNodePatch,
    Entity, EntityId, FreeLine, FreeLinePatch, Participant, ParticipantPatch, Placement,
    ProcessObject, ProcessObjectPatch,
};
use crate::settings::Settings;
use crate::store::EntityStore;
use crate::sync::{Change, Mutation, NullSync, SyncSink};
use eframe::egui;

pub struct Engine<S: SyncSink = NullSync> {
    store: EntityStore,
    drag: DragState,
    settings: Settings,
    sink: S,
    sync_failures: Vec<SyncError>,
}

impl Engine<NullSync> {
    pub fn local(settings: Settings) -> Self {
        Self::new(settings, NullSync)
    }
}

impl<S: SyncSink> Engine<S> {
    pub fn new(settings: Settings, sink: S) -> Self {
        Self::with_store(EntityStore::new(), settings, sink)
    }

    pub fn with_store(store: EntityStore, settings: Settings, sink: S) -> Self {
        Self {
            store,
            drag: DragState::Idle,
            settings,
            sink,
            sync_failures: Vec::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn replace_store(&mut self, store: EntityStore) {
        self.store = store;
        self.drag = DragState::Idle;
    }

    pub fn drain_sync_failures(&mut self) -> Vec<SyncError> {
        std::mem::take(&mut self.sync_failures)
    }

    fn forward(&mut self, mutation: &Mutation) {
        if let Err(err) = self.sink.submit(mutation) {
            log::warn!("sync write for {} {} failed: {err}", mutation.kind(), mutation.id());
            self.sync_failures.push(err);
        }
    }

    fn commit(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        self.store.apply(&mutation)?;
        self.forward(&mutation);
        Ok(())
    }

    fn add<E: Entity>(&mut self, entity: E, wrap: fn(Change<E, E::Patch>) -> Mutation) -> EntityId {
        let id = entity.id().to_string();
        log::debug!("add {} {id}", E::KIND);
        if let Err(err) = self.commit(wrap(Change::Add(entity))) {
            log::debug!("add {} {id} rejected: {err}", E::KIND);
        }
        id
    }

    fn remove<E: Entity>(
        &mut self,
        id: &str,
        wrap: fn(Change<E, E::Patch>) -> Mutation,
    ) -> Result<(), StoreError> {
        log::debug!("remove {} {id}", E::KIND);
        self.commit(wrap(Change::Remove { id: id.to_string() }))
    }

    // Participants

    pub fn add_participant(&mut self, participant: Participant) -> EntityId {
        let participant = match participant.placement {
            Placement::Board(p) => participant.at(clamp_point(p)),
            Placement::Staging => participant,
        };
        self.add(participant, Mutation::Participant)
    }

    pub fn remove_participant(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::Participant)
    }

    pub fn update_participant(&mut self, id: &str, patch: ParticipantPatch) -> Result<(), StoreError> {
        self.commit(Mutation::participant(id, patch))
    }

    pub fn update_participant_position(
        &mut self,
        id: &str,
        placement: Placement,
    ) -> Result<(), StoreError> {
        let placement = match placement {
            Placement::Board(p) => Placement::Board(clamp_point(p)),
            Placement::Staging => Placement::Staging,
        };
        self.commit(Mutation::participant(id, ParticipantPatch::placement(placement)))
    }

    // Connections

    pub fn add_connection(&mut self, connection: Connection) -> EntityId {
        self.add(connection, Mutation::Connection)
    }

    pub fn update_connection(&mut self, id: &str, patch: ConnectionPatch) -> Result<(), StoreError> {
        self.commit(Mutation::connection(id, patch))
    }

    pub fn remove_connection(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::Connection)
    }

    // Process objects

    pub fn add_process_object(&mut self, object: ProcessObject) -> EntityId {
        self.add(object, Mutation::ProcessObject)
    }

    pub fn update_process_object(
        &mut self,
        id: &str,
        patch: ProcessObjectPatch,
    ) -> Result<(), StoreError> {
        self.commit(Mutation::process_object(id, patch))
    }

    pub fn remove_process_object(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::ProcessObject)
    }

    // Free lines

    pub fn add_free_line(&mut self, line: FreeLine) -> EntityId {
        self.add(line, Mutation::FreeLine)
    }

    pub fn update_free_line(&mut self, id: &str, patch: FreeLinePatch) -> Result<(), StoreError> {
        self.commit(Mutation::free_line(id, patch))
    }

    pub fn remove_free_line(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::FreeLine)
    }

    // Decision lines

    pub fn add_decision_line(&mut self, line: DecisionLine) -> EntityId {
        self.add(line, Mutation::DecisionLine)
    }

    pub fn update_decision_line(
        &mut self,
        id: &str,
        patch: DecisionLinePatch,
    ) -> Result<(), StoreError> {
        self.commit(Mutation::decision_line(id, patch))
    }

    pub fn remove_decision_line(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::DecisionLine)
    }

    // Decision nodes

    pub fn add_decision_node(&mut self, node: DecisionNode) -> EntityId {
        self.add(node, Mutation::DecisionNode)
    }

    pub fn update_decision_node(
        &mut self,
        id: &str,
        patch: DecisionNodePatch,
    ) -> Result<(), StoreError> {
        self.commit(Mutation::decision_node(id, patch))
    }

    pub fn remove_decision_node(&mut self, id: &str) -> Result<(), StoreError> {
        self.remove(id, Mutation::DecisionNode)
    }

    // Interaction

    pub fn pick(&self, pointer: egui::Pos2, canvas: egui::Rect) -> Option<DragTarget> {
        hit::pick(&self.store, pointer, canvas, &self.settings)
    }

    pub fn pointer(&mut self, event: &PointerEvent) {
        let transition = step(&self.drag, event, &self.store, &self.settings);
        for mutation in &transition.mutations {
            if let Err(err) = self.store.apply(mutation) {
                log::debug!("skipping drag mutation: {err}");
                continue;
            }
            if transition.commit {
                self.forward(mutation);
            }
        }
        self.drag = transition.next;
    }

    /// Applies a change that arrived from the sync layer. It is not sent
    /// back. Updates and removes for ids this store does not know are
    /// dropped.
    pub fn apply_remote(&mut self, mutation: &Mutation) {
        match self.store.apply(mutation) {
            Ok(()) => {}
            Err(StoreError::NotFound { kind, id }) => {
                log::debug!("ignoring remote change for unknown {kind} {id}");
            }
            Err(err) => log::warn!("rejected remote change: {err}"),
        }
    }

    // Derived views

    pub fn edge_curves(&self) -> Vec<EdgeCurve> {
        edge_curves(&self.store, &CurveParams::from_settings(&self.settings))
    }

    pub fn apply_radial_layout(&mut self) -> Vec<RadialSlot> {
        let slots = radial_layout(&self.store, self.settings.radial_radius);
        log::debug!("radial layout over {} participants", slots.len());
        for slot in &slots {
            if let Err(err) = self.commit(Mutation::participant(
                slot.participant_id.clone(),
                ParticipantPatch::placement(Placement::Board(slot.position)),
            )) {
                log::debug!("radial layout skipped {}: {err}", slot.participant_id);
            }
        }
        slots
    }

    pub fn swimlane(&self) -> SwimlaneLayout {
        swimlane_layout(&self.store, &self.settings.swimlane)
    }
}
