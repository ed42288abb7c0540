use crate::error::SyncError;
use crate::model::{
    Connection, ConnectionPatch, DecisionLine, DecisionLinePatch, DecisionNode,
    DecisionNodePatch, Entity, EntityId, EntityKind, FreeLine, FreeLinePatch, Participant,
    ParticipantPatch, ProcessObject, ProcessObjectPatch,
};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Change<E, P> {
    Add(E),
    Update { id: EntityId, patch: P },
    Remove { id: EntityId },
}

impl<E: Entity> Change<E, E::Patch> {
    pub fn id(&self) -> &str {
        match self {
            Change::Add(e) => e.id(),
            Change::Update { id, .. } | Change::Remove { id } => id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    Participant(Change<Participant, ParticipantPatch>),
    Connection(Change<Connection, ConnectionPatch>),
    ProcessObject(Change<ProcessObject, ProcessObjectPatch>),
    FreeLine(Change<FreeLine, FreeLinePatch>),
    DecisionLine(Change<DecisionLine, DecisionLinePatch>),
    DecisionNode(Change<DecisionNode, DecisionNodePatch>),
}

impl Mutation {
    pub fn kind(&self) -> EntityKind {
        match self {
            Mutation::Participant(_) => EntityKind::Participant,
            Mutation::Connection(_) => EntityKind::Connection,
            Mutation::ProcessObject(_) => EntityKind::ProcessObject,
            Mutation::FreeLine(_) => EntityKind::FreeLine,
            Mutation::DecisionLine(_) => EntityKind::DecisionLine,
            Mutation::DecisionNode(_) => EntityKind::DecisionNode,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Mutation::Participant(c) => c.id(),
            Mutation::Connection(c) => c.id(),
            Mutation::ProcessObject(c) => c.id(),
            Mutation::FreeLine(c) => c.id(),
            Mutation::DecisionLine(c) => c.id(),
            Mutation::DecisionNode(c) => c.id(),
        }
    }

    pub fn participant(id: impl Into<EntityId>, patch: ParticipantPatch) -> Self {
        Mutation::Participant(Change::Update { id: id.into(), patch })
    }

    pub fn connection(id: impl Into<EntityId>, patch: ConnectionPatch) -> Self {
        Mutation::Connection(Change::Update { id: id.into(), patch })
    }

    pub fn process_object(id: impl Into<EntityId>, patch: ProcessObjectPatch) -> Self {
        Mutation::ProcessObject(Change::Update { id: id.into(), patch })
    }

    pub fn free_line(id: impl Into<EntityId>, patch: FreeLinePatch) -> Self {
        Mutation::FreeLine(Change::Update { id: id.into(), patch })
    }

    pub fn decision_line(id: impl Into<EntityId>, patch: DecisionLinePatch) -> Self {
        Mutation::DecisionLine(Change::Update { id: id.into(), patch })
    }

    pub fn decision_node(id: impl Into<EntityId>, patch: DecisionNodePatch) -> Self {
        Mutation::DecisionNode(Change::Update { id: id.into(), patch })
    }
}

/// Receives committed local mutations. Implementations must not block: the
/// pointer loop calls this synchronously and never waits for the remote
/// write to finish.
pub trait SyncSink {
    fn submit(&mut self, mutation: &Mutation) -> Result<(), SyncError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSync;

impl SyncSink for NullSync {
    fn submit(&mut self, _mutation: &Mutation) -> Result<(), SyncError> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub entries: Vec<Mutation>,
    reject: bool,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rejecting(&mut self, reject: bool) {
        self.reject = reject;
    }

    pub fn take(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.entries)
    }
}

impl SyncSink for Journal {
    fn submit(&mut self, mutation: &Mutation) -> Result<(), SyncError> {
        if self.reject {
            return Err(SyncError::Rejected {
                collection: mutation.kind(),
                id: mutation.id().to_string(),
                reason: "journal is rejecting writes".to_string(),
            });
        }
        self.entries.push(mutation.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct ChannelSync {
    tx: mpsc::Sender<Mutation>,
}

impl ChannelSync {
    pub fn new() -> (Self, mpsc::Receiver<Mutation>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl SyncSink for ChannelSync {
    fn submit(&mut self, mutation: &Mutation) -> Result<(), SyncError> {
        self.tx
            .send(mutation.clone())
            .map_err(|_| SyncError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    #[test]
    fn mutation_reports_kind_and_id() {
        let m = Mutation::Participant(Change::Add(Participant::with_id("p1", "Ann")));
        assert_eq!(m.kind(), EntityKind::Participant);
        assert_eq!(m.id(), "p1");
        let m = Mutation::free_line("l1", FreeLinePatch::default());
        assert_eq!(m.kind(), EntityKind::FreeLine);
        assert_eq!(m.id(), "l1");
    }

    #[test]
    fn journal_records_and_rejects() {
        let mut journal = Journal::new();
        let m = Mutation::FreeLine(Change::Add(FreeLine::new(
            Point::new(10.0, 10.0),
            Point::new(20.0, 20.0),
        )));
        journal.submit(&m).expect("accepted");
        journal.set_rejecting(true);
        let err = journal.submit(&m).unwrap_err();
        assert!(matches!(err, SyncError::Rejected { collection: EntityKind::FreeLine, .. }));
        assert_eq!(journal.take().len(), 1);
        assert!(journal.entries.is_empty());
    }

    #[test]
    fn channel_sync_forwards_until_receiver_drops() {
        let (mut sink, rx) = ChannelSync::new();
        let m = Mutation::Participant(Change::Remove { id: "p1".into() });
        sink.submit(&m).expect("sent");
        assert_eq!(rx.try_recv().ok(), Some(m.clone()));
        drop(rx);
        assert_eq!(sink.submit(&m), Err(SyncError::Disconnected));
    }

    #[test]
    fn mutation_survives_json() {
        let m = Mutation::connection(
            "c1",
            ConnectionPatch::curve_offset(crate::model::Offset::new(1.5, -2.0)),
        );
        let json = serde_json::to_string(&m).expect("serialize");
        let back: Mutation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, m);
    }

    #[test]
    fn clearing_patches_survive_json() {
        let unbind = Mutation::free_line(
            "l1",
            FreeLinePatch {
                end_participant: Some(None),
                ..Default::default()
            },
        );
        let reopen = Mutation::connection(
            "c1",
            ConnectionPatch {
                to: Some(None),
                open_end_position: Some(None),
                ..Default::default()
            },
        );
        for m in [unbind, reopen] {
            let json = serde_json::to_string(&m).expect("serialize");
            let back: Mutation = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, m, "{json}");
        }

        // Absent keys leave the stored value alone.
        let back: Mutation =
            serde_json::from_str(r#"{"FreeLine":{"Update":{"id":"l1","patch":{}}}}"#)
                .expect("deserialize");
        assert_eq!(back, Mutation::free_line("l1", FreeLinePatch::default()));
    }
}
