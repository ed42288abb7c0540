use crate::model::{EntityId, EntityKind};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },
    #[error("{kind} {id}: patch carries a non-finite position")]
    InvalidPosition { kind: EntityKind, id: EntityId },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SyncError {
    #[error("persistence channel is disconnected")]
    Disconnected,
    #[error("persistence rejected {collection} {id}: {reason}")]
    Rejected {
        collection: EntityKind,
        id: EntityId,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to write TOML settings: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
}
