//! System-wide fullscreen state
//!
//! At most one item is fullscreen at a time. Participants request entering or
//! leaving fullscreen here and follow the published notification; the
//! sequence state is never involved.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::info;
use vgal_common::events::{EventBus, GalleryEvent};

/// Single-active-element fullscreen source
#[derive(Clone)]
pub struct FullscreenHub {
    tx: Arc<watch::Sender<Option<usize>>>,
    events: EventBus,
}

impl FullscreenHub {
    pub fn new(events: EventBus) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            events,
        }
    }

    /// Make `index` the fullscreen element, replacing any other
    pub fn request(&self, index: usize) {
        self.set(Some(index));
    }

    /// Leave fullscreen, whichever element holds it
    pub fn exit(&self) {
        self.set(None);
    }

    /// Element currently fullscreen
    pub fn current(&self) -> Option<usize> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<usize>> {
        self.tx.subscribe()
    }

    fn set(&self, index: Option<usize>) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == index {
                return false;
            }
            *current = index;
            true
        });

        if changed {
            match index {
                Some(i) => info!("Item {} entered fullscreen", i),
                None => info!("Fullscreen exited"),
            }
            self.events.emit_lossy(GalleryEvent::FullscreenChanged {
                index,
                timestamp: Utc::now(),
            });
        }
    }
}
