pub mod radial;
pub mod swimlane;

pub use radial::{RadialSlot, radial_layout};
pub use swimlane::{
    Lane, OptionPath, OptionRoute, Step, StepKind, SwimlaneLayout, swimlane_layout,
};
