//! Sequence coordination: the "preview all" state machine and its controls

pub mod controls;
pub mod coordinator;

pub use controls::{Progress, SequenceControls, ToggleAction};
pub use coordinator::{SequenceCoordinator, SequencePhase, SequenceSnapshot, Turn};
