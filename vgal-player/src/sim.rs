//! Simulated media backend
//!
//! Stand-in for a real decoder/player, driven entirely by tokio timers so it
//! runs the same under a paused test clock as in the demo binary. Each element
//! follows a scripted [`SimBehavior`] and records every request it receives in
//! a shared [`MediaProbe`].
//!
//! The simulation reports load progress and end-of-media through its
//! [`MediaEventSink`]. It does not echo play/pause requests back as events:
//! the participant tracks its own requests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::MediaError;
use crate::participant::{MediaElement, MediaEvent, MediaEventSink};

/// Scripted outcome for one simulated element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimBehavior {
    /// Loads and plays for `duration`
    Plays { duration: Duration },
    /// Loading fails with the given reason
    FailsToLoad(String),
    /// Loads, but every play request is refused
    RejectsPlay(String),
}

/// Request received by a simulated element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Load(String),
    Play,
    Pause,
    Seek(Duration),
    SetLooping(bool),
}

/// Shared record of the requests an element received
#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    calls: Arc<Mutex<Vec<MediaCall>>>,
}

impl MediaProbe {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: MediaCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    /// All requests, oldest first
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, call: &MediaCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn play_count(&self) -> usize {
        self.count(&MediaCall::Play)
    }

    pub fn was_loaded(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, MediaCall::Load(_)))
    }

    /// Seek requests, in order
    pub fn seeks(&self) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MediaCall::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }
}

/// Timer-driven media element
pub struct SimulatedMedia {
    behavior: SimBehavior,
    load_latency: Duration,
    play_latency: Duration,
    sink: MediaEventSink,
    probe: MediaProbe,

    /// Set once the load timer has been started
    ready_at: Option<Instant>,
    /// Position when playback last started or was paused
    position: Duration,
    /// Start of the current playback stretch
    playing_since: Option<Instant>,
    looping: bool,

    end_timer: Option<CancellationToken>,
    shutdown: CancellationToken,
}

impl SimulatedMedia {
    pub fn new(behavior: SimBehavior, sink: MediaEventSink) -> Self {
        Self {
            behavior,
            load_latency: Duration::from_millis(50),
            play_latency: Duration::ZERO,
            sink,
            probe: MediaProbe::new(),
            ready_at: None,
            position: Duration::ZERO,
            playing_since: None,
            looping: false,
            end_timer: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Time between `load` and the first data being available
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Time the backend takes to grant or refuse a play request
    pub fn with_play_latency(mut self, latency: Duration) -> Self {
        self.play_latency = latency;
        self
    }

    /// Record requests into an existing probe
    pub fn with_probe(mut self, probe: MediaProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn probe(&self) -> MediaProbe {
        self.probe.clone()
    }

    fn duration(&self) -> Option<Duration> {
        match &self.behavior {
            SimBehavior::Plays { duration } => Some(*duration),
            SimBehavior::RejectsPlay(_) => Some(Duration::from_secs(30)),
            SimBehavior::FailsToLoad(_) => None,
        }
    }

    fn is_ready(&self) -> bool {
        self.duration().is_some() && self.ready_at.is_some_and(|at| Instant::now() >= at)
    }

    fn position_now(&self) -> Duration {
        let Some(duration) = self.duration() else {
            return Duration::ZERO;
        };
        let Some(since) = self.playing_since else {
            return self.position;
        };

        let raw = self.position + since.elapsed();
        if !self.looping {
            return raw.min(duration);
        }
        if duration.is_zero() {
            return Duration::ZERO;
        }
        let nanos = raw.as_nanos() % duration.as_nanos();
        Duration::from_nanos(nanos as u64)
    }

    /// Freeze the playback position so a new stretch can start from here
    ///
    /// Playback that already ran past the end (not looping) stops there.
    fn settle(&mut self) {
        let position = self.position_now();
        let finished = !self.looping && self.duration().is_some_and(|d| position >= d);

        self.position = position;
        if finished {
            self.playing_since = None;
        } else if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn cancel_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.cancel();
        }
    }

    /// (Re)arm the end-of-media timer for the current playback stretch
    fn arm_end_timer(&mut self) {
        self.cancel_end_timer();
        if self.playing_since.is_none() || self.looping {
            return;
        }
        let Some(duration) = self.duration() else {
            return;
        };

        let remaining = duration.saturating_sub(self.position);
        let timer = self.shutdown.child_token();
        let sink = self.sink.clone();
        let cancelled = timer.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(remaining) => {
                    sink.emit(MediaEvent::Ended);
                }
            }
        });
        self.end_timer = Some(timer);
    }
}

#[async_trait]
impl MediaElement for SimulatedMedia {
    fn load(&mut self, src: &str) {
        self.probe.record(MediaCall::Load(src.to_string()));
        debug!("Simulated load of item {}: {}", self.sink.index(), src);

        self.ready_at = Some(Instant::now() + self.load_latency);
        self.sink.emit(MediaEvent::LoadStart);

        let sink = self.sink.clone();
        let latency = self.load_latency;
        let behavior = self.behavior.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(latency) => match behavior {
                    SimBehavior::FailsToLoad(reason) => {
                        sink.emit(MediaEvent::Error(MediaError::LoadFailed(reason)));
                    }
                    _ => {
                        sink.emit(MediaEvent::LoadedMetadata);
                        sink.emit(MediaEvent::LoadedData);
                        sink.emit(MediaEvent::CanPlay);
                    }
                },
            }
        });
    }

    async fn play(&mut self) -> Result<(), MediaError> {
        self.probe.record(MediaCall::Play);
        if !self.play_latency.is_zero() {
            tokio::time::sleep(self.play_latency).await;
        }

        if let SimBehavior::RejectsPlay(reason) = &self.behavior {
            return Err(MediaError::PlaybackRejected(reason.clone()));
        }
        if !self.is_ready() {
            return Err(MediaError::NotReady);
        }
        self.settle();
        if self.playing_since.is_some() {
            return Ok(());
        }

        // Playing again after the end starts over
        if self.duration().is_some_and(|d| self.position >= d) {
            self.position = Duration::ZERO;
        }
        self.playing_since = Some(Instant::now());
        self.arm_end_timer();
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.record(MediaCall::Pause);
        self.position = self.position_now();
        self.playing_since = None;
        self.cancel_end_timer();
    }

    fn seek(&mut self, position: Duration) {
        self.probe.record(MediaCall::Seek(position));
        self.settle();
        let limit = self.duration().unwrap_or_default();
        self.position = position.min(limit);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
            self.arm_end_timer();
        }
    }

    fn current_time(&self) -> Duration {
        self.position_now()
    }

    fn set_looping(&mut self, looping: bool) {
        self.probe.record(MediaCall::SetLooping(looping));
        self.settle();
        self.looping = looping;
        self.arm_end_timer();
    }
}

impl Drop for SimulatedMedia {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
