//! Gallery assembly
//!
//! Wires one coordinator, one fullscreen hub and one participant task per
//! configured item over a shared event bus, and tears them down together.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vgal_common::config::{GalleryConfig, ItemConfig};
use vgal_common::events::{EventBus, GalleryEvent};

use crate::error::{Error, Result};
use crate::participant::{
    spawn_participant, FullscreenHub, MediaElement, MediaEventSink, ParticipantContext,
    ParticipantHandle, ProximityRule, Rect, ViewportSample,
};
use crate::sequence::{SequenceControls, SequenceCoordinator};

/// Event bus capacity per item (phase changes dominate the traffic)
const EVENTS_PER_ITEM: usize = 32;
const MIN_EVENT_CAPACITY: usize = 256;

/// Running gallery
pub struct Gallery {
    coordinator: SequenceCoordinator,
    fullscreen: FullscreenHub,
    participants: Vec<ParticipantHandle>,
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Gallery {
    /// Build the gallery and spawn its participant tasks
    ///
    /// `make_media` is called once per item, in order, with the sink through
    /// which that item's media element reports its events.
    pub fn spawn<M, F>(config: &GalleryConfig, mut make_media: F) -> Result<Self>
    where
        M: MediaElement,
        F: FnMut(usize, &ItemConfig, MediaEventSink) -> M,
    {
        config.validate()?;

        let total_items = config.total_items();
        let events = EventBus::new(MIN_EVENT_CAPACITY.max(total_items * EVENTS_PER_ITEM));
        let coordinator = SequenceCoordinator::with_event_bus(total_items, events.clone());
        let fullscreen = FullscreenHub::new(events);
        let context = ParticipantContext {
            coordinator: coordinator.clone(),
            fullscreen: fullscreen.clone(),
            timing: config.sequence,
            proximity: ProximityRule::from(&config.viewport),
        };

        let cancel = CancellationToken::new();
        let mut participants = Vec::with_capacity(total_items);
        let mut tasks = Vec::with_capacity(total_items);

        for (index, item) in config.items.iter().enumerate() {
            let (handle, task) = spawn_participant(
                index,
                item.clone(),
                context.clone(),
                |sink| make_media(index, item, sink),
                cancel.child_token(),
            );
            participants.push(handle);
            tasks.push(task);
        }

        info!(
            "Gallery ready: {} items (end delay {}ms, error delay {}ms)",
            total_items, config.sequence.end_advance_delay_ms, config.sequence.error_advance_delay_ms
        );

        Ok(Self {
            coordinator,
            fullscreen,
            participants,
            tasks,
            cancel,
        })
    }

    pub fn coordinator(&self) -> &SequenceCoordinator {
        &self.coordinator
    }

    pub fn fullscreen(&self) -> &FullscreenHub {
        &self.fullscreen
    }

    pub fn total_items(&self) -> usize {
        self.participants.len()
    }

    pub fn participant(&self, index: usize) -> Result<&ParticipantHandle> {
        self.participants.get(index).ok_or(Error::UnknownItem {
            index,
            total: self.participants.len(),
        })
    }

    pub fn participants(&self) -> &[ParticipantHandle] {
        &self.participants
    }

    /// Current state of the "preview all" controls
    pub fn controls(&self) -> SequenceControls {
        SequenceControls::from_snapshot(&self.coordinator.snapshot())
    }

    /// Subscribe to sequence, item and fullscreen events
    pub fn events(&self) -> broadcast::Receiver<GalleryEvent> {
        self.coordinator.events()
    }

    /// Report each item's layout position against `viewport`
    ///
    /// `layout[i]` is the region of item `i`; extra entries are ignored.
    pub fn update_viewport(&self, viewport: Rect, layout: &[Rect]) -> Result<()> {
        for (participant, element) in self.participants.iter().zip(layout) {
            participant.viewport(ViewportSample::new(*element, viewport))?;
        }
        Ok(())
    }

    /// Stop every participant task and wait for them to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Participant task panicked: {}", e);
                }
            }
        }
        info!("Gallery shut down");
    }
}

impl Drop for Gallery {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
