//! Test helpers for vgal-player integration tests
//!
//! Provides a gallery builder over simulated media plus wait helpers that run
//! against tokio's paused clock:
//! - GalleryBuilder: describe items and their scripted media behavior
//! - TestGallery: the running gallery, its media probes and an event receiver

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};
use vgal_common::config::{GalleryConfig, ItemConfig, SequenceTiming};
use vgal_common::events::{GalleryEvent, ItemPhase};
use vgal_player::sim::{MediaProbe, SimBehavior, SimulatedMedia};
use vgal_player::{Gallery, ItemView, ParticipantHandle, Rect, SequenceCoordinator};

pub const END_DELAY: Duration = Duration::from_millis(500);
pub const ERROR_DELAY: Duration = Duration::from_millis(250);
pub const LOAD_LATENCY: Duration = Duration::from_millis(50);
pub const PREVIEW_FRAME: Duration = Duration::from_millis(1000);

/// Upper bound for any single wait; virtual time, so it costs nothing
const WAIT_LIMIT: Duration = Duration::from_secs(120);

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

pub fn timing() -> SequenceTiming {
    SequenceTiming {
        end_advance_delay_ms: END_DELAY.as_millis() as u64,
        error_advance_delay_ms: ERROR_DELAY.as_millis() as u64,
        preview_frame_ms: PREVIEW_FRAME.as_millis() as u64,
    }
}

/// Describes a gallery item by item
#[derive(Default)]
pub struct GalleryBuilder {
    items: Vec<(ItemConfig, SimBehavior)>,
    play_latency: Duration,
}

impl GalleryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, looping: bool, behavior: SimBehavior) -> Self {
        let n = self.items.len();
        let mut item = ItemConfig::new(format!("media/clip-{}.mp4", n), format!("Clip {}", n));
        item.looping = looping;
        self.items.push((item, behavior));
        self
    }

    pub fn plays(self, duration: Duration) -> Self {
        self.push(false, SimBehavior::Plays { duration })
    }

    pub fn looping(self, duration: Duration) -> Self {
        self.push(true, SimBehavior::Plays { duration })
    }

    pub fn fails_to_load(self) -> Self {
        self.push(false, SimBehavior::FailsToLoad("404 Not Found".to_string()))
    }

    pub fn rejects_play(self) -> Self {
        self.push(false, SimBehavior::RejectsPlay("autoplay blocked".to_string()))
    }

    /// Every item takes `latency` to grant or refuse a play request
    pub fn with_play_latency(mut self, latency: Duration) -> Self {
        self.play_latency = latency;
        self
    }

    pub fn build(self) -> TestGallery {
        let play_latency = self.play_latency;
        let (items, behaviors): (Vec<_>, Vec<_>) = self.items.into_iter().unzip();
        let config = GalleryConfig {
            sequence: timing(),
            items,
            ..Default::default()
        };

        let probes: Vec<MediaProbe> = behaviors.iter().map(|_| MediaProbe::new()).collect();
        let gallery = Gallery::spawn(&config, |index, _item, sink| {
            SimulatedMedia::new(behaviors[index].clone(), sink)
                .with_load_latency(LOAD_LATENCY)
                .with_play_latency(play_latency)
                .with_probe(probes[index].clone())
        })
        .expect("gallery should build");
        let events = gallery.events();

        TestGallery {
            gallery,
            probes,
            events,
        }
    }
}

pub struct TestGallery {
    pub gallery: Gallery,
    pub probes: Vec<MediaProbe>,
    pub events: broadcast::Receiver<GalleryEvent>,
}

impl TestGallery {
    pub fn coordinator(&self) -> &SequenceCoordinator {
        self.gallery.coordinator()
    }

    pub fn item(&self, index: usize) -> &ParticipantHandle {
        self.gallery.participant(index).expect("item exists")
    }

    pub fn probe(&self, index: usize) -> &MediaProbe {
        &self.probes[index]
    }

    /// Scroll so that every item is well inside the viewport
    pub fn reveal_all(&self) {
        let layout: Vec<Rect> = (0..self.gallery.total_items())
            .map(|i| Rect::new(24.0, 24.0 + i as f64 * 200.0, 320.0, 180.0))
            .collect();
        let viewport = Rect::new(0.0, 0.0, 1280.0, 200.0 * layout.len() as f64 + 100.0);
        self.gallery
            .update_viewport(viewport, &layout)
            .expect("participants running");
    }

    /// Reveal every item and wait until each has finished loading (or failed)
    pub async fn preload(&self) {
        self.reveal_all();
        for participant in self.gallery.participants() {
            timeout(
                WAIT_LIMIT,
                participant.wait_for(|view| view.phase.is_activated() && !view.phase.is_busy()),
            )
            .await
            .expect("item should finish loading")
            .expect("participant running");
        }
    }

    /// Wait until the coordinator's current index is `expected`; returns when
    pub async fn wait_for_index(&self, expected: Option<usize>) -> Instant {
        let mut rx = self.coordinator().subscribe();
        timeout(WAIT_LIMIT, rx.wait_for(|s| s.current_index() == expected))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for index {:?}", expected))
            .expect("coordinator alive");
        Instant::now()
    }

    pub async fn wait_for_phase(&self, index: usize, phase: ItemPhase) -> ItemView {
        timeout(WAIT_LIMIT, self.item(index).wait_for(|view| view.phase == phase))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for item {} to be {}", index, phase))
            .expect("participant running")
    }

    /// Events received so far
    pub fn drain_events(&mut self) -> Vec<GalleryEvent> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }

    /// Let spawned tasks react to the latest changes
    pub async fn settle(&self) {
        tokio::time::sleep(ms(1)).await;
    }
}

/// Assert that `elapsed` is `expected`, allowing for timer granularity
pub fn assert_elapsed(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed <= expected + ms(5),
        "expected ~{:?}, got {:?}",
        expected,
        elapsed
    );
}

pub fn count_events(events: &[GalleryEvent], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}
