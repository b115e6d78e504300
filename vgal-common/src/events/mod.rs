//! Event types for the gallery event system
//!
//! Provides the shared event definitions and the EventBus used by the
//! sequence coordinator and the playback participants.

mod item_types;

pub use item_types::{AdvanceReason, ItemPhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Gallery event types
///
/// Events are broadcast via EventBus and can be serialized (one JSON object per
/// event, tagged with `type`) for logging or forwarding to a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GalleryEvent {
    /// A "preview all" walk began at index 0
    SequenceStarted {
        /// Identifier of this walk (fresh on every start)
        run_id: Uuid,
        /// Number of items in the gallery
        total_items: usize,
        timestamp: DateTime<Utc>,
    },

    /// The walk moved to the next item
    SequenceAdvanced {
        run_id: Uuid,
        /// Index that held the turn
        from_index: usize,
        /// Index that holds the turn now
        to_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// The walk ran past the last item and returned to idle
    SequenceCompleted {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The walk was stopped by the user
    SequenceReset {
        run_id: Uuid,
        /// Index that held the turn when the walk was stopped
        at_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// A participant scheduled a delayed advance for its turn
    AdvanceRequested {
        run_id: Uuid,
        index: usize,
        reason: AdvanceReason,
        /// Delay before the advance is submitted
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An advance request arrived for a turn that is no longer current
    ///
    /// Expected under rapid reset/restart; not an error.
    StaleAdvanceIgnored {
        run_id: Uuid,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// Item media lifecycle phase changed
    ItemPhaseChanged {
        index: usize,
        old_phase: ItemPhase,
        new_phase: ItemPhase,
        timestamp: DateTime<Utc>,
    },

    /// Item media failed to load
    ItemLoadFailed {
        index: usize,
        /// Media source that failed
        src: String,
        reason: String,
        /// Whether the item held the sequence turn at the time
        during_turn: bool,
        timestamp: DateTime<Utc>,
    },

    /// Backend refused to start playback of an item
    ItemPlaybackRejected {
        index: usize,
        reason: String,
        during_turn: bool,
        timestamp: DateTime<Utc>,
    },

    /// The fullscreen element changed (None = no element is fullscreen)
    FullscreenChanged {
        index: Option<usize>,
        timestamp: DateTime<Utc>,
    },
}

impl GalleryEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            GalleryEvent::SequenceStarted { .. } => "SequenceStarted",
            GalleryEvent::SequenceAdvanced { .. } => "SequenceAdvanced",
            GalleryEvent::SequenceCompleted { .. } => "SequenceCompleted",
            GalleryEvent::SequenceReset { .. } => "SequenceReset",
            GalleryEvent::AdvanceRequested { .. } => "AdvanceRequested",
            GalleryEvent::StaleAdvanceIgnored { .. } => "StaleAdvanceIgnored",
            GalleryEvent::ItemPhaseChanged { .. } => "ItemPhaseChanged",
            GalleryEvent::ItemLoadFailed { .. } => "ItemLoadFailed",
            GalleryEvent::ItemPlaybackRejected { .. } => "ItemPlaybackRejected",
            GalleryEvent::FullscreenChanged { .. } => "FullscreenChanged",
        }
    }
}

/// Broadcast bus for gallery events
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GalleryEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers start
    ///   missing old events
    ///
    /// # Examples
    ///
    /// ```
    /// use vgal_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// let _rx = event_bus.subscribe();
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GalleryEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_emit_reaches_every_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit_lossy(GalleryEvent::SequenceStarted {
            run_id: Uuid::new_v4(),
            total_items: 3,
            timestamp: Utc::now(),
        });

        assert_eq!(rx.try_recv().unwrap().event_type(), "SequenceStarted");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "SequenceStarted");
    }

    #[test]
    fn test_eventbus_emit_without_subscribers() {
        let bus = EventBus::new(10);
        // Nobody listening: dropped silently
        bus.emit_lossy(GalleryEvent::FullscreenChanged {
            index: None,
            timestamp: Utc::now(),
        });

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err(), "earlier events are not replayed");
    }

    #[test]
    fn test_eventbus_emit_lossy_full_channel() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe(); // Subscribed, but not receiving yet

        for index in 0..10 {
            bus.emit_lossy(GalleryEvent::ItemPhaseChanged {
                index,
                old_phase: ItemPhase::Unloaded,
                new_phase: ItemPhase::Loading,
                timestamp: Utc::now(),
            });
        }

        // The slow subscriber lost the oldest events
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(8))
        ));
    }

    #[test]
    fn test_eventbus_clone_shares_channel() {
        let bus = EventBus::new(10);
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        clone.emit_lossy(GalleryEvent::SequenceCompleted {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });

        assert_eq!(rx.try_recv().unwrap().event_type(), "SequenceCompleted");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = GalleryEvent::AdvanceRequested {
            run_id: Uuid::nil(),
            index: 1,
            reason: AdvanceReason::LoadFailed,
            delay_ms: 1000,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "AdvanceRequested");
        assert_eq!(value["reason"], "load_failed");
        assert_eq!(value["delay_ms"], 1000);

        let back: GalleryEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back.event_type(), "AdvanceRequested");
    }
}
