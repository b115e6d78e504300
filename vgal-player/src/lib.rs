//! # Video Gallery Player Library (vgal-player)
//!
//! Sequence coordination for a gallery of video thumbnails.
//!
//! **Purpose:** Walk the gallery item by item ("preview all"), autoplaying each
//! item in turn and skipping ahead on completion or failure, while every item
//! stays individually playable.
//!
//! **Architecture:** One [`SequenceCoordinator`] owns the walk state and
//! publishes it through a watch channel. One [`PlaybackParticipant`] task per
//! item observes it, drives its own media element, and requests advances.
//! Media backends plug in through the [`MediaElement`] trait.

pub mod error;
pub mod gallery;
pub mod participant;
pub mod sequence;
pub mod sim;

pub use error::{Error, MediaError, Result};
pub use gallery::Gallery;
pub use participant::{
    FullscreenHub, ItemView, MediaElement, MediaEvent, MediaEventSink, ParticipantHandle,
    PlaybackParticipant, Rect, ViewportSample,
};
pub use sequence::{SequenceControls, SequenceCoordinator, SequenceSnapshot, Turn};
