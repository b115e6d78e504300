//! Media backend seam
//!
//! A participant drives its media element through [`MediaElement`] and learns
//! about progress from [`MediaEvent`]s that the backend pushes through a
//! [`MediaEventSink`]. Requests (`load`, `pause`, `seek`) return immediately;
//! `play` is the only request whose outcome is awaited.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::ParticipantInput;
use crate::error::MediaError;

/// Lifecycle notifications from a media backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Fetch started
    LoadStart,
    /// Duration and dimensions known
    LoadedMetadata,
    /// First frame available
    LoadedData,
    /// Enough data to start playing
    CanPlay,
    /// Playback started (including by means outside the participant)
    Play,
    /// Playback paused (including by means outside the participant)
    Pause,
    /// Playback reached the end of the media
    Ended,
    /// Media failed to load
    Error(MediaError),
}

/// Capability set of one media element
///
/// Implementations are owned exclusively by one participant.
#[async_trait]
pub trait MediaElement: Send + 'static {
    /// Assign the source and begin fetching
    ///
    /// Progress is reported asynchronously through [`MediaEvent`]s.
    fn load(&mut self, src: &str);

    /// Request playback
    ///
    /// Resolves once the backend has granted or refused the request.
    async fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn current_time(&self) -> Duration;

    fn set_looping(&mut self, looping: bool);
}

/// Channel through which a backend reports [`MediaEvent`]s to its participant
#[derive(Debug, Clone)]
pub struct MediaEventSink {
    index: usize,
    tx: mpsc::UnboundedSender<ParticipantInput>,
}

impl MediaEventSink {
    pub(crate) fn new(index: usize, tx: mpsc::UnboundedSender<ParticipantInput>) -> Self {
        Self { index, tx }
    }

    /// Index of the item this sink reports for
    pub fn index(&self) -> usize {
        self.index
    }

    /// Deliver an event; returns false once the participant has stopped
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.tx.send(ParticipantInput::Media(event)).is_ok()
    }
}
