//! Error types for vgal-player
//!
//! Media failures are never fatal to the gallery: they end the current attempt
//! for one item, and the sequence skips ahead. These types exist so that the
//! failure reason can be logged and forwarded on the event bus.

use thiserror::Error;

/// Failure reported by a media backend
///
/// Load failures arrive asynchronously as [`MediaEvent::Error`](crate::MediaEvent);
/// play refusals are the outcome of [`MediaElement::play`](crate::MediaElement).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Media never became playable
    #[error("Media failed to load: {0}")]
    LoadFailed(String),

    /// Backend refused or aborted a play request
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// Play requested before a source was assigned
    #[error("Media not ready")]
    NotReady,
}

/// Main error type for vgal-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] vgal_common::Error),

    /// Item index outside the gallery
    #[error("No item at index {index} (gallery has {total} items)")]
    UnknownItem { index: usize, total: usize },

    /// Participant task has stopped and no longer accepts input
    #[error("Participant {0} is no longer running")]
    ParticipantStopped(usize),
}

/// Convenience Result type using vgal-player Error
pub type Result<T> = std::result::Result<T, Error>;
