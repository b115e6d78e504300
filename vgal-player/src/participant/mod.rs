//! Playback participant
//!
//! One participant task per gallery item. It owns the item's media element,
//! follows the coordinator's published state, and decides on its own whether
//! it holds the turn:
//!
//! - gaining the turn loads the media if needed and attempts playback once
//! - end of media during the turn requests an advance after the end delay
//! - a load failure or rejected playback during the turn requests an advance
//!   after the (shorter) error delay
//! - losing the turn aborts any pending delayed advance
//!
//! Delayed advances carry the [`Turn`] they were scheduled for. The coordinator
//! re-checks it when the timer fires, so an aborted-too-late timer is harmless.
//!
//! User intents (click, fullscreen toggle) and backend notifications arrive
//! through one input channel and are handled in order on the participant task.

pub mod fullscreen;
pub mod lifecycle;
pub mod media;
pub mod view;
pub mod viewport;

pub use fullscreen::FullscreenHub;
pub use media::{MediaElement, MediaEvent, MediaEventSink};
pub use view::{ItemView, OverlayIcon};
pub use viewport::{LazyActivation, ProximityRule, Rect, ViewportSample};

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vgal_common::config::{ItemConfig, SequenceTiming};
use vgal_common::events::{AdvanceReason, GalleryEvent, ItemPhase};

use crate::error::{Error, Result};
use crate::sequence::{SequenceCoordinator, SequenceSnapshot, Turn};

/// Input delivered to a participant task
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantInput {
    /// Item region moved relative to the viewport
    Viewport(ViewportSample),
    /// Notification from the item's media backend
    Media(MediaEvent),
    /// User clicked the item (toggle play/pause)
    Click,
    /// User toggled fullscreen on the item
    ToggleFullscreen,
}

/// Collaborators shared by every participant of a gallery
#[derive(Clone)]
pub struct ParticipantContext {
    pub coordinator: SequenceCoordinator,
    pub fullscreen: FullscreenHub,
    pub timing: SequenceTiming,
    pub proximity: ProximityRule,
}

/// Delayed advance waiting to fire
struct PendingAdvance {
    turn: Turn,
    task: JoinHandle<()>,
}

/// Per-item playback state machine
pub struct PlaybackParticipant<M: MediaElement> {
    index: usize,
    item: ItemConfig,
    media: M,
    context: ParticipantContext,
    activation: LazyActivation,

    phase: ItemPhase,
    interacted: bool,
    fullscreen_active: bool,
    /// Play as soon as the media is ready (click on an unloaded item)
    play_on_ready: bool,

    /// Turn as last observed from the coordinator
    turn: Option<Turn>,
    /// Turn for which autoplay was already attempted
    attempted_turn: Option<Turn>,
    pending_advance: Option<PendingAdvance>,

    view_tx: watch::Sender<ItemView>,
}

impl<M: MediaElement> PlaybackParticipant<M> {
    pub fn new(index: usize, item: ItemConfig, mut media: M, context: ParticipantContext) -> Self {
        media.set_looping(item.looping);
        let (view_tx, _) = watch::channel(ItemView::new(index, item.title.clone()));
        let activation = LazyActivation::new(context.proximity);

        Self {
            index,
            item,
            media,
            context,
            activation,
            phase: ItemPhase::Unloaded,
            interacted: false,
            fullscreen_active: false,
            play_on_ready: false,
            turn: None,
            attempted_turn: None,
            pending_advance: None,
            view_tx,
        }
    }

    /// Observe the item's display state
    pub fn subscribe_view(&self) -> watch::Receiver<ItemView> {
        self.view_tx.subscribe()
    }

    /// Participant task body; returns when `cancel` fires
    ///
    /// The media element keeps a sender to `inputs` alive, so the input channel
    /// never closes while the participant runs.
    pub async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<ParticipantInput>,
        cancel: CancellationToken,
    ) {
        debug!("Participant {} started", self.index);

        let mut sequence_rx = self.context.coordinator.subscribe();
        let mut fullscreen_rx = self.context.fullscreen.subscribe();

        // A walk may already be in progress when the task starts
        let snapshot = *sequence_rx.borrow_and_update();
        self.on_sequence_changed(&snapshot).await;
        let active = *fullscreen_rx.borrow_and_update();
        self.on_fullscreen_changed(active);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Ok(()) = sequence_rx.changed() => {
                    let snapshot = *sequence_rx.borrow_and_update();
                    self.on_sequence_changed(&snapshot).await;
                }

                Ok(()) = fullscreen_rx.changed() => {
                    let active = *fullscreen_rx.borrow_and_update();
                    self.on_fullscreen_changed(active);
                }

                Some(input) = inputs.recv() => self.on_input(input).await,
            }
        }

        self.cancel_pending_advance();
        debug!("Participant {} stopped", self.index);
    }

    async fn on_input(&mut self, input: ParticipantInput) {
        match input {
            ParticipantInput::Viewport(sample) => self.on_viewport(&sample),
            ParticipantInput::Media(event) => self.on_media_event(event).await,
            ParticipantInput::Click => self.on_click().await,
            ParticipantInput::ToggleFullscreen => self.on_toggle_fullscreen(),
        }
    }

    // ========================================================================
    // Sequence turn
    // ========================================================================

    async fn on_sequence_changed(&mut self, snapshot: &SequenceSnapshot) {
        let turn = snapshot.turn_of(self.index);
        if turn == self.turn {
            return;
        }

        if let Some(lost) = self.turn.take() {
            self.release_turn(lost);
        }
        if let Some(gained) = turn {
            self.take_turn(gained).await;
        }
        self.publish_view();
    }

    fn release_turn(&mut self, lost: Turn) {
        debug!("Item {} lost the turn (run {})", self.index, lost.run_id);

        if self.pending_advance.as_ref().is_some_and(|p| p.turn == lost) {
            self.cancel_pending_advance();
        }
        if self.item.looping {
            self.media.set_looping(true);
        }
    }

    async fn take_turn(&mut self, turn: Turn) {
        info!("Item {} has the turn ({})", self.index, self.phase);
        self.turn = Some(turn);
        self.play_on_ready = false;

        // A looping item would never report its end
        if self.item.looping {
            self.media.set_looping(false);
        }

        match self.phase {
            ItemPhase::Unloaded => self.activate(),
            ItemPhase::Failed => self.schedule_advance(turn, AdvanceReason::LoadFailed),
            phase if phase.is_playable() => self.autoplay(turn).await,
            // Loading: autoplay once ready. Starting/Playing: already on its way.
            _ => {}
        }
    }

    /// Turn held by this item, confirmed against the coordinator's current state
    fn held_turn(&self) -> Option<Turn> {
        self.turn
            .filter(|turn| self.context.coordinator.snapshot().turn() == Some(*turn))
    }

    /// Attempt playback for `turn`; at most once per turn
    async fn autoplay(&mut self, turn: Turn) {
        if self.attempted_turn == Some(turn) {
            return;
        }
        self.attempted_turn = Some(turn);

        // A walk shows each item from the start, not from its preview frame
        if self.phase == ItemPhase::Ready && !self.media.current_time().is_zero() {
            self.media.seek(Duration::ZERO);
        }

        let previous = self.phase;
        self.set_phase(ItemPhase::Starting);

        let outcome = self.media.play().await;
        match outcome {
            Ok(()) if self.context.coordinator.snapshot().turn() == Some(turn) => {
                self.set_phase(ItemPhase::Playing);
            }
            Ok(()) => {
                debug!("Item {} lost the turn while starting, pausing", self.index);
                self.media.pause();
                self.set_phase(ItemPhase::Paused);
            }
            Err(e) => {
                warn!("Item {} autoplay rejected: {}", self.index, e);
                let still_held = self.context.coordinator.snapshot().turn() == Some(turn);
                self.set_phase(previous);
                self.emit(GalleryEvent::ItemPlaybackRejected {
                    index: self.index,
                    reason: e.to_string(),
                    during_turn: still_held,
                    timestamp: Utc::now(),
                });

                if still_held {
                    self.schedule_advance(turn, AdvanceReason::PlaybackRejected);
                }
            }
        }
    }

    /// Request an advance for `turn` once the reason's delay has elapsed
    ///
    /// Only one delayed advance exists per turn; the first reason wins.
    fn schedule_advance(&mut self, turn: Turn, reason: AdvanceReason) {
        if let Some(pending) = &self.pending_advance {
            if pending.turn == turn {
                debug!(
                    "Item {} already has an advance pending, ignoring {}",
                    self.index, reason
                );
                return;
            }
        }
        self.cancel_pending_advance();

        let delay = self.advance_delay(reason);
        info!(
            "Item {} requesting advance in {}ms ({})",
            self.index,
            delay.as_millis(),
            reason
        );
        self.emit(GalleryEvent::AdvanceRequested {
            run_id: turn.run_id,
            index: turn.index,
            reason,
            delay_ms: delay.as_millis() as u64,
            timestamp: Utc::now(),
        });

        let coordinator = self.context.coordinator.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.advance_turn(turn);
        });
        self.pending_advance = Some(PendingAdvance { turn, task });
    }

    fn advance_delay(&self, reason: AdvanceReason) -> Duration {
        if reason.is_failure() {
            self.context.timing.error_advance_delay()
        } else {
            self.context.timing.end_advance_delay()
        }
    }

    fn cancel_pending_advance(&mut self) {
        if let Some(pending) = self.pending_advance.take() {
            pending.task.abort();
        }
    }

    // ========================================================================
    // Activation and media lifecycle
    // ========================================================================

    fn on_viewport(&mut self, sample: &ViewportSample) {
        if self.activation.observe(sample) {
            debug!("Item {} is near the viewport", self.index);
            self.begin_load();
        }
    }

    /// Load without waiting for the viewport
    fn activate(&mut self) {
        if self.activation.force() {
            self.begin_load();
        }
    }

    fn begin_load(&mut self) {
        info!("Loading item {}: {}", self.index, self.item.src);
        self.media.load(&self.item.src);
        self.set_phase(ItemPhase::Loading);
    }

    async fn on_media_event(&mut self, event: MediaEvent) {
        let old_phase = self.phase;
        self.set_phase(lifecycle::next_phase(old_phase, &event));

        match event {
            MediaEvent::LoadedMetadata => self.seek_preview_frame(),
            MediaEvent::LoadedData | MediaEvent::CanPlay if self.phase.is_playable() => {
                if let Some(turn) = self.held_turn() {
                    self.autoplay(turn).await;
                } else if std::mem::take(&mut self.play_on_ready) {
                    self.manual_play().await;
                }
            }
            MediaEvent::Ended => {
                if let Some(turn) = self.held_turn() {
                    self.schedule_advance(turn, AdvanceReason::Ended);
                }
            }
            MediaEvent::Error(e) => {
                let turn = self.held_turn();
                if old_phase != ItemPhase::Failed {
                    error!("Item {} ({}): {}", self.index, self.item.src, e);
                    self.play_on_ready = false;
                    self.emit(GalleryEvent::ItemLoadFailed {
                        index: self.index,
                        src: self.item.src.clone(),
                        reason: e.to_string(),
                        during_turn: turn.is_some(),
                        timestamp: Utc::now(),
                    });
                }
                if let Some(turn) = turn {
                    self.schedule_advance(turn, AdvanceReason::LoadFailed);
                }
            }
            _ => {}
        }
    }

    /// Show a representative frame on idle thumbnails
    fn seek_preview_frame(&mut self) {
        if self.interacted || self.context.coordinator.is_active() {
            return;
        }
        let position = self.context.timing.preview_frame();
        debug!("Item {} seeking to preview frame at {:?}", self.index, position);
        self.media.seek(position);
    }

    // ========================================================================
    // User intents
    // ========================================================================

    async fn on_click(&mut self) {
        self.interacted = true;

        match self.phase {
            ItemPhase::Playing => {
                self.media.pause();
                self.set_phase(ItemPhase::Paused);
            }
            ItemPhase::Unloaded => {
                self.play_on_ready = true;
                self.activate();
            }
            ItemPhase::Loading => self.play_on_ready = true,
            phase if phase.is_playable() => self.manual_play().await,
            phase => debug!("Item {} ignoring click while {}", self.index, phase),
        }
        self.publish_view();
    }

    /// User-requested playback; a rejection never moves the walk
    async fn manual_play(&mut self) {
        let previous = self.phase;
        self.set_phase(ItemPhase::Starting);

        let outcome = self.media.play().await;
        match outcome {
            Ok(()) => self.set_phase(ItemPhase::Playing),
            Err(e) => {
                warn!("Item {} playback rejected: {}", self.index, e);
                self.set_phase(previous);
                self.emit(GalleryEvent::ItemPlaybackRejected {
                    index: self.index,
                    reason: e.to_string(),
                    during_turn: self.held_turn().is_some(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn on_toggle_fullscreen(&mut self) {
        if self.fullscreen_active {
            self.context.fullscreen.exit();
        } else {
            self.context.fullscreen.request(self.index);
        }
    }

    fn on_fullscreen_changed(&mut self, active: Option<usize>) {
        let fullscreen = active == Some(self.index);
        if fullscreen != self.fullscreen_active {
            self.fullscreen_active = fullscreen;
            self.publish_view();
        }
    }

    // ========================================================================
    // Publication
    // ========================================================================

    fn set_phase(&mut self, new_phase: ItemPhase) {
        if new_phase == self.phase {
            return;
        }
        let old_phase = std::mem::replace(&mut self.phase, new_phase);
        debug!("Item {} phase: {} -> {}", self.index, old_phase, new_phase);

        self.emit(GalleryEvent::ItemPhaseChanged {
            index: self.index,
            old_phase,
            new_phase,
            timestamp: Utc::now(),
        });
        self.publish_view();
    }

    fn publish_view(&self) {
        let next = ItemView {
            index: self.index,
            title: self.item.title.clone(),
            phase: self.phase,
            is_turn: self.turn.is_some(),
            fullscreen: self.fullscreen_active,
            interacted: self.interacted,
        };
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                return false;
            }
            *view = next;
            true
        });
    }

    fn emit(&self, event: GalleryEvent) {
        self.context.coordinator.event_bus().emit_lossy(event);
    }
}

/// Sending side of a running participant
#[derive(Clone)]
pub struct ParticipantHandle {
    index: usize,
    tx: mpsc::UnboundedSender<ParticipantInput>,
    view: watch::Receiver<ItemView>,
}

impl ParticipantHandle {
    pub fn send(&self, input: ParticipantInput) -> Result<()> {
        self.tx
            .send(input)
            .map_err(|_| Error::ParticipantStopped(self.index))
    }

    pub fn viewport(&self, sample: ViewportSample) -> Result<()> {
        self.send(ParticipantInput::Viewport(sample))
    }

    pub fn media_event(&self, event: MediaEvent) -> Result<()> {
        self.send(ParticipantInput::Media(event))
    }

    pub fn click(&self) -> Result<()> {
        self.send(ParticipantInput::Click)
    }

    pub fn toggle_fullscreen(&self) -> Result<()> {
        self.send(ParticipantInput::ToggleFullscreen)
    }

    /// Latest display state
    pub fn view(&self) -> ItemView {
        self.view.borrow().clone()
    }

    /// Wait until the display state satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<ItemView>
    where
        F: FnMut(&ItemView) -> bool,
    {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| Error::ParticipantStopped(self.index))?;
        Ok(view.clone())
    }
}

/// Spawn the participant task for item `index`
///
/// `make_media` receives the sink through which the media backend reports its
/// events to this participant.
pub fn spawn_participant<M, F>(
    index: usize,
    item: ItemConfig,
    context: ParticipantContext,
    make_media: F,
    cancel: CancellationToken,
) -> (ParticipantHandle, JoinHandle<()>)
where
    M: MediaElement,
    F: FnOnce(MediaEventSink) -> M,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let media = make_media(MediaEventSink::new(index, tx.clone()));
    let participant = PlaybackParticipant::new(index, item, media, context);
    let view = participant.subscribe_view();

    let task = tokio::spawn(participant.run(rx, cancel));
    (ParticipantHandle { index, tx, view }, task)
}
