//! Sequence coordinator
//!
//! Single source of truth for the "preview all" walk: which item holds the
//! turn, whether a walk is in progress, and how many items there are.
//!
//! State is published through a `tokio::sync::watch` channel. Every transition
//! replaces the whole snapshot in one step, so observers never see a torn
//! `(current index, active)` pair. Transitions are synchronous and never wait.
//!
//! ```text
//! Idle ──start──▶ Active(0) ──advance──▶ Active(1) ──▶ … ──advance──▶ Idle
//!                     │                                 (past last item)
//!                     └────────────reset (any i)───────────▶ Idle
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vgal_common::events::{EventBus, GalleryEvent};

/// Default EventBus capacity for a gallery
const EVENT_CAPACITY: usize = 256;

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// No walk in progress, no current item
    Idle,
    /// Walk `run_id` in progress, `index` holds the turn
    Active { run_id: Uuid, index: usize },
}

/// One item's turn within one walk
///
/// Carried by delayed callbacks so they can verify, when they fire, that the
/// turn they were scheduled for is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Turn {
    pub run_id: Uuid,
    pub index: usize,
}

/// Consistent view of the coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSnapshot {
    phase: SequencePhase,
    total_items: usize,
}

impl SequenceSnapshot {
    fn idle(total_items: usize) -> Self {
        Self {
            phase: SequencePhase::Idle,
            total_items,
        }
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SequencePhase::Active { .. })
    }

    /// Index holding the turn, None when idle
    pub fn current_index(&self) -> Option<usize> {
        self.turn().map(|t| t.index)
    }

    /// Current index with `-1` as the "no selection" sentinel
    pub fn display_index(&self) -> i64 {
        self.current_index().map(|i| i as i64).unwrap_or(-1)
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.turn().map(|t| t.run_id)
    }

    /// The current turn, if a walk is in progress
    pub fn turn(&self) -> Option<Turn> {
        match self.phase {
            SequencePhase::Idle => None,
            SequencePhase::Active { run_id, index } => Some(Turn { run_id, index }),
        }
    }

    /// The current turn if it belongs to `index`
    pub fn turn_of(&self, index: usize) -> Option<Turn> {
        self.turn().filter(|t| t.index == index)
    }

    /// `isActive && currentIndex == index`
    pub fn is_turn_of(&self, index: usize) -> bool {
        self.turn_of(index).is_some()
    }
}

/// Result of stepping an active walk forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advanced { run_id: Uuid, from: usize, to: usize },
    Completed { run_id: Uuid, from: usize },
}

/// Apply `advance` to an active snapshot; None if idle
fn step(state: &mut SequenceSnapshot) -> Option<Step> {
    let SequencePhase::Active { run_id, index } = state.phase else {
        return None;
    };

    let next = index + 1;
    if next >= state.total_items {
        state.phase = SequencePhase::Idle;
        Some(Step::Completed { run_id, from: index })
    } else {
        state.phase = SequencePhase::Active { run_id, index: next };
        Some(Step::Advanced { run_id, from: index, to: next })
    }
}

/// Owner of the sequence state
///
/// Cheap to clone; all clones share the same state. Participants hold a clone
/// and request transitions through it, they never write the state directly.
#[derive(Clone)]
pub struct SequenceCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    state_tx: watch::Sender<SequenceSnapshot>,
    events: EventBus,
}

impl SequenceCoordinator {
    /// Create an idle coordinator for a gallery of `total_items` items
    pub fn new(total_items: usize) -> Self {
        Self::with_event_bus(total_items, EventBus::new(EVENT_CAPACITY))
    }

    /// Create an idle coordinator publishing on an existing bus
    pub fn with_event_bus(total_items: usize, events: EventBus) -> Self {
        let (state_tx, _) = watch::channel(SequenceSnapshot::idle(total_items));
        Self {
            inner: Arc::new(Inner { state_tx, events }),
        }
    }

    /// Begin a walk at index 0
    ///
    /// Restarting while a walk is in progress abandons it and starts a fresh
    /// one (new run id). With an empty gallery there is no valid index, so the
    /// call is ignored.
    pub fn start(&self) {
        let total_items = self.total_items();
        if total_items == 0 {
            warn!("Ignoring sequence start: gallery has no items");
            return;
        }

        let run_id = Uuid::new_v4();
        let mut abandoned = None;
        self.inner.state_tx.send_modify(|state| {
            abandoned = state.current_index();
            state.phase = SequencePhase::Active { run_id, index: 0 };
        });

        match abandoned {
            Some(index) => info!(
                "Sequence restarted at index 0 (abandoned index {}), run {}",
                index, run_id
            ),
            None => info!("Sequence started: {} items, run {}", total_items, run_id),
        }

        self.inner.events.emit_lossy(GalleryEvent::SequenceStarted {
            run_id,
            total_items,
            timestamp: Utc::now(),
        });
    }

    /// Move the turn to the next item, or finish the walk after the last one
    ///
    /// No-op while idle (a late callback after a reset is expected).
    /// Returns true if the state changed.
    pub fn advance(&self) -> bool {
        let mut outcome = None;
        self.inner.state_tx.send_if_modified(|state| {
            outcome = step(state);
            outcome.is_some()
        });

        match outcome {
            Some(step) => {
                self.announce(step);
                true
            }
            None => {
                debug!("Ignoring advance: no sequence in progress");
                false
            }
        }
    }

    /// Advance only if `turn` is still the current turn
    ///
    /// Used by participants: a request tied to a turn that was reset,
    /// restarted or already advanced past is ignored. The first accepted
    /// request for a turn wins; any later one for the same turn is stale.
    pub fn advance_turn(&self, turn: Turn) -> bool {
        let mut outcome = None;
        self.inner.state_tx.send_if_modified(|state| {
            if state.turn() != Some(turn) {
                return false;
            }
            outcome = step(state);
            outcome.is_some()
        });

        match outcome {
            Some(step) => {
                self.announce(step);
                true
            }
            None => {
                debug!(
                    "Ignoring stale advance for index {} (run {})",
                    turn.index, turn.run_id
                );
                self.inner.events.emit_lossy(GalleryEvent::StaleAdvanceIgnored {
                    run_id: turn.run_id,
                    index: turn.index,
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }

    /// Stop any walk and return to idle
    ///
    /// Callable at any time; idle → idle publishes nothing.
    pub fn reset(&self) {
        let mut stopped = None;
        self.inner.state_tx.send_if_modified(|state| {
            stopped = state.turn();
            state.phase = SequencePhase::Idle;
            stopped.is_some()
        });

        if let Some(turn) = stopped {
            info!("Sequence reset at index {} (run {})", turn.index, turn.run_id);
            self.inner.events.emit_lossy(GalleryEvent::SequenceReset {
                run_id: turn.run_id,
                at_index: turn.index,
                timestamp: Utc::now(),
            });
        }
    }

    /// Current state
    pub fn snapshot(&self) -> SequenceSnapshot {
        *self.inner.state_tx.borrow()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SequenceSnapshot> {
        self.inner.state_tx.subscribe()
    }

    pub fn total_items(&self) -> usize {
        self.inner.state_tx.borrow().total_items
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().is_active()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.snapshot().current_index()
    }

    /// Bus carrying sequence and item events
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to sequence and item events
    pub fn events(&self) -> broadcast::Receiver<GalleryEvent> {
        self.inner.events.subscribe()
    }

    fn announce(&self, step: Step) {
        let timestamp = Utc::now();
        match step {
            Step::Advanced { run_id, from, to } => {
                info!("Sequence advanced: {} -> {}", from, to);
                self.inner.events.emit_lossy(GalleryEvent::SequenceAdvanced {
                    run_id,
                    from_index: from,
                    to_index: to,
                    timestamp,
                });
            }
            Step::Completed { run_id, from } => {
                info!("Sequence completed after index {} (run {})", from, run_id);
                self.inner
                    .events
                    .emit_lossy(GalleryEvent::SequenceCompleted { run_id, timestamp });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_coordinator_is_idle() {
        let coordinator = SequenceCoordinator::new(3);
        let snapshot = coordinator.snapshot();

        assert_eq!(snapshot.phase(), SequencePhase::Idle);
        assert_eq!(snapshot.display_index(), -1);
        assert_eq!(snapshot.total_items(), 3);
        assert!(!snapshot.is_active());
    }

    #[test]
    fn test_start_enters_first_item() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();

        assert!(coordinator.is_active());
        assert_eq!(coordinator.current_index(), Some(0));
        assert!(coordinator.snapshot().is_turn_of(0));
        assert!(!coordinator.snapshot().is_turn_of(1));
    }

    #[test]
    fn test_full_walk_returns_to_idle_for_every_size() {
        for total in 1..=8 {
            let coordinator = SequenceCoordinator::new(total);
            coordinator.start();

            for _ in 0..total {
                assert!(coordinator.advance());
            }

            let snapshot = coordinator.snapshot();
            assert!(!snapshot.is_active(), "total={}", total);
            assert_eq!(snapshot.display_index(), -1, "total={}", total);
        }
    }

    #[test]
    fn test_advance_is_monotonic_while_active() {
        let coordinator = SequenceCoordinator::new(5);
        coordinator.start();

        let mut previous = coordinator.current_index().unwrap();
        while coordinator.advance() {
            match coordinator.current_index() {
                Some(index) => {
                    assert_eq!(index, previous + 1);
                    previous = index;
                }
                None => {
                    assert_eq!(previous, 4, "only the last item may finish the walk");
                    break;
                }
            }
        }
    }

    #[test]
    fn test_reset_from_any_index_is_idle() {
        for target in 0..4 {
            let coordinator = SequenceCoordinator::new(4);
            coordinator.start();
            for _ in 0..target {
                coordinator.advance();
            }
            assert_eq!(coordinator.current_index(), Some(target));

            coordinator.reset();
            assert_eq!(coordinator.snapshot().phase(), SequencePhase::Idle);
        }
    }

    #[test]
    fn test_advance_while_idle_is_noop() {
        let coordinator = SequenceCoordinator::new(3);
        let before = coordinator.snapshot();

        assert!(!coordinator.advance());
        assert!(!coordinator.advance());
        assert_eq!(coordinator.snapshot(), before);
    }

    #[test]
    fn test_reset_while_idle_publishes_nothing() {
        let coordinator = SequenceCoordinator::new(2);
        let mut rx = coordinator.subscribe();

        coordinator.reset();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_start_with_empty_gallery_is_ignored() {
        let coordinator = SequenceCoordinator::new(0);
        coordinator.start();

        assert!(!coordinator.is_active());
        assert_eq!(coordinator.current_index(), None);
    }

    #[test]
    fn test_restart_mid_walk_is_fresh_run() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();
        let first_run = coordinator.snapshot().run_id().unwrap();
        coordinator.advance();

        coordinator.start();
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.current_index(), Some(0));
        assert_ne!(snapshot.run_id().unwrap(), first_run);
    }

    #[test]
    fn test_advance_turn_accepts_current_turn_once() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();
        let turn = coordinator.snapshot().turn().unwrap();

        assert!(coordinator.advance_turn(turn));
        assert_eq!(coordinator.current_index(), Some(1));

        // Second request for the same turn (e.g. error then end) is stale
        assert!(!coordinator.advance_turn(turn));
        assert_eq!(coordinator.current_index(), Some(1));
    }

    #[test]
    fn test_advance_turn_rejects_other_index() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();
        let run_id = coordinator.snapshot().run_id().unwrap();

        assert!(!coordinator.advance_turn(Turn { run_id, index: 2 }));
        assert_eq!(coordinator.current_index(), Some(0));
    }

    #[test]
    fn test_advance_turn_rejects_previous_run() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();
        let stale = coordinator.snapshot().turn().unwrap();

        coordinator.reset();
        coordinator.start();

        // Same index, different walk
        assert!(!coordinator.advance_turn(stale));
        assert_eq!(coordinator.current_index(), Some(0));
        assert_ne!(coordinator.snapshot().run_id(), Some(stale.run_id));
    }

    #[test]
    fn test_advance_turn_after_reset_is_noop() {
        let coordinator = SequenceCoordinator::new(3);
        coordinator.start();
        let turn = coordinator.snapshot().turn().unwrap();
        coordinator.reset();

        assert!(!coordinator.advance_turn(turn));
        assert!(!coordinator.is_active());
    }

    #[test]
    fn test_transitions_emit_events() {
        let coordinator = SequenceCoordinator::new(2);
        let mut rx = coordinator.events();

        coordinator.start();
        coordinator.advance();
        coordinator.advance();
        coordinator.start();
        coordinator.reset();

        let types: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "SequenceStarted",
                "SequenceAdvanced",
                "SequenceCompleted",
                "SequenceStarted",
                "SequenceReset",
            ]
        );
    }

    #[test]
    fn test_stale_advance_emits_event() {
        let coordinator = SequenceCoordinator::new(2);
        coordinator.start();
        let turn = coordinator.snapshot().turn().unwrap();
        coordinator.reset();

        let mut rx = coordinator.events();
        coordinator.advance_turn(turn);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type(), "StaleAdvanceIgnored");
    }

    #[tokio::test]
    async fn test_observer_sees_each_transition() {
        let coordinator = SequenceCoordinator::new(2);
        let mut rx = coordinator.subscribe();

        coordinator.start();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().current_index(), Some(0));

        coordinator.advance();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().current_index(), Some(1));

        coordinator.advance();
        rx.changed().await.unwrap();
        let snapshot = *rx.borrow_and_update();
        assert!(!snapshot.is_active());
        assert_eq!(snapshot.display_index(), -1);
    }
}
