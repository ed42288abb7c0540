pub mod coords;
pub mod curve;
pub mod drag;
pub mod engine;
pub mod error;
pub mod hit;
pub mod layout;
pub mod model;
pub mod settings;
pub mod snap;
pub mod store;
pub mod sync;

pub use drag::{DragState, DragTarget, PointerEvent};
pub use engine::Engine;
pub use error::{SettingsError, StoreError, SyncError};
pub use settings::Settings;
pub use store::EntityStore;
pub use sync::{Mutation, SyncSink};
