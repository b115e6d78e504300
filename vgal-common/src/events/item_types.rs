//! Per-item type definitions
//!
//! Supporting types for the media lifecycle of a single gallery item.

use serde::{Deserialize, Serialize};

/// Media lifecycle phase of one gallery item
///
/// `Unloaded → Loading → Ready → Starting → {Playing, Paused} → Ended`, with
/// `Failed` terminal for the item's media (no automatic retry).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemPhase {
    /// Media source not assigned yet (item never came near the viewport)
    #[default]
    Unloaded,
    /// Source assigned, waiting for the first frame
    Loading,
    /// First frame available, not playing
    Ready,
    /// Playback requested, waiting for the backend to grant it
    Starting,
    /// Playing
    Playing,
    /// Paused after having played
    Paused,
    /// Reached the end of the media
    Ended,
    /// Media failed to load
    Failed,
}

impl ItemPhase {
    /// Whether a play request can be issued from this phase
    pub fn is_playable(self) -> bool {
        matches!(self, ItemPhase::Ready | ItemPhase::Paused | ItemPhase::Ended)
    }

    /// Whether the item is waiting on the media backend (spinner)
    pub fn is_busy(self) -> bool {
        matches!(self, ItemPhase::Loading | ItemPhase::Starting)
    }

    pub fn is_playing(self) -> bool {
        self == ItemPhase::Playing
    }

    /// Whether the media has been assigned a source
    pub fn is_activated(self) -> bool {
        self != ItemPhase::Unloaded
    }
}

impl std::fmt::Display for ItemPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemPhase::Unloaded => write!(f, "unloaded"),
            ItemPhase::Loading => write!(f, "loading"),
            ItemPhase::Ready => write!(f, "ready"),
            ItemPhase::Starting => write!(f, "starting"),
            ItemPhase::Playing => write!(f, "playing"),
            ItemPhase::Paused => write!(f, "paused"),
            ItemPhase::Ended => write!(f, "ended"),
            ItemPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Why a participant asked the coordinator to move on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceReason {
    /// Media played to its end
    Ended,
    /// Backend refused to start playback
    PlaybackRejected,
    /// Media never became playable
    LoadFailed,
}

impl AdvanceReason {
    /// Whether the advance follows a failure (paced by the error delay)
    pub fn is_failure(self) -> bool {
        !matches!(self, AdvanceReason::Ended)
    }
}

impl std::fmt::Display for AdvanceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvanceReason::Ended => write!(f, "ended"),
            AdvanceReason::PlaybackRejected => write!(f, "playback_rejected"),
            AdvanceReason::LoadFailed => write!(f, "load_failed"),
        }
    }
}
