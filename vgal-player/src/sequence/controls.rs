//! Sequence controls view model
//!
//! What a presentation layer needs to draw the "preview all" controls: the
//! start/stop toggle, the progress indicator and the reset affordance.

use super::coordinator::{SequenceCoordinator, SequenceSnapshot};

/// Action bound to the start/stop toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Start,
    Stop,
}

impl ToggleAction {
    pub fn label(self) -> &'static str {
        match self {
            ToggleAction::Start => "PREVIEW ALL",
            ToggleAction::Stop => "STOP PREVIEW",
        }
    }
}

/// Progress through an active walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 1-based position of the current item
    pub position: usize,
    pub total: usize,
}

impl Progress {
    /// Share of the walk reached, in (0, 1]
    pub fn fraction(&self) -> f64 {
        self.position as f64 / self.total as f64
    }

    pub fn label(&self) -> String {
        format!("VIDEO {} OF {}", self.position, self.total)
    }
}

/// Render state of the sequence controls
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceControls {
    pub toggle: ToggleAction,
    /// Present only while a walk is in progress
    pub progress: Option<Progress>,
    /// Reset button, shown only when idle away from the initial sentinel
    pub show_reset: bool,
}

impl SequenceControls {
    pub fn from_snapshot(snapshot: &SequenceSnapshot) -> Self {
        let active = snapshot.is_active();
        let progress = snapshot.current_index().map(|index| Progress {
            position: index + 1,
            total: snapshot.total_items(),
        });

        Self {
            toggle: if active {
                ToggleAction::Stop
            } else {
                ToggleAction::Start
            },
            progress,
            show_reset: !active && snapshot.display_index() != -1,
        }
    }

    /// Forward a toggle press to the coordinator
    pub fn press_toggle(&self, coordinator: &SequenceCoordinator) {
        match self.toggle {
            ToggleAction::Start => coordinator.start(),
            ToggleAction::Stop => coordinator.reset(),
        }
    }

    /// Forward a reset press to the coordinator
    pub fn press_reset(&self, coordinator: &SequenceCoordinator) {
        coordinator.reset();
    }
}
