//! Video gallery player (vgal-player) - Main entry point
//!
//! Runs a "preview all" walk over a gallery of simulated media elements and
//! logs the sequence as it progresses. Items come from the configuration file,
//! or are synthesized when the configuration lists none.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vgal_common::config::{AspectRatio, ConfigResolver, ItemConfig, LoggingConfig};
use vgal_common::events::GalleryEvent;
use vgal_player::sim::{SimBehavior, SimulatedMedia};
use vgal_player::{Gallery, ItemView, Rect};

const VIEWPORT_WIDTH: f64 = 1280.0;
const THUMB_WIDTH: f64 = 320.0;
const THUMB_GAP: f64 = 24.0;

/// Command-line arguments for vgal-player
#[derive(Parser, Debug)]
#[command(name = "vgal-player")]
#[command(about = "Preview-all sequencer for a video gallery (simulated media)")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of synthetic items when the configuration lists none
    #[arg(long, default_value = "5")]
    items: usize,

    /// Items whose media fails to load (comma-separated indexes)
    #[arg(long, value_delimiter = ',')]
    fail_load: Vec<usize>,

    /// Items whose playback is refused (comma-separated indexes)
    #[arg(long, value_delimiter = ',')]
    reject_play: Vec<usize>,

    /// Length of each simulated clip in milliseconds
    #[arg(long, default_value = "3000")]
    clip_ms: u64,

    /// Height of the simulated viewport in pixels
    #[arg(long, default_value = "720")]
    viewport_height: f64,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, env = "VGAL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print gallery events as JSON lines on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration first: it carries the logging settings
    let (mut config, source) = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    init_tracing(&config.logging, args.log_level.as_deref())?;

    info!("Starting vgal-player v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);

    if config.items.is_empty() {
        info!("No items configured, synthesizing {}", args.items);
        config.items = synthetic_items(args.items);
    }
    if config.items.is_empty() {
        bail!("Gallery has no items");
    }

    let behaviors: Vec<SimBehavior> = (0..config.total_items())
        .map(|index| behavior_for(index, &args))
        .collect();
    let gallery = Gallery::spawn(&config, |index, _item, sink| {
        SimulatedMedia::new(behaviors[index].clone(), sink)
    })
    .context("Failed to build gallery")?;

    let layout = column_layout(&config.items);
    let viewport = Rect::new(0.0, 0.0, VIEWPORT_WIDTH, args.viewport_height);
    gallery
        .update_viewport(viewport, &layout)
        .context("Failed to report initial viewport")?;

    let mut events = gallery.events();
    let controls = gallery.controls();
    info!("Pressing {}", controls.toggle.label());
    controls.press_toggle(gallery.coordinator());

    let completed = tokio::select! {
        result = follow_walk(&gallery, &mut events, &layout, viewport, args.json) => result?,
        _ = shutdown_signal() => {
            gallery.coordinator().reset();
            false
        }
    };

    let views: Vec<ItemView> = gallery.participants().iter().map(|p| p.view()).collect();
    gallery.shutdown().await;

    if completed {
        info!("Preview finished");
    } else {
        info!("Preview stopped before the last item");
    }
    print_summary(&views);

    Ok(())
}

/// Set up the tracing subscriber from the logging config
///
/// `RUST_LOG` wins over the configured level; `override_level` wins over both.
fn init_tracing(logging: &LoggingConfig, override_level: Option<&str>) -> Result<()> {
    let filter = match override_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid log level")?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&logging.level))
            .context("Invalid log level in configuration")?,
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = logging
        .file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn synthetic_items(count: usize) -> Vec<ItemConfig> {
    (0..count)
        .map(|i| {
            let mut item = ItemConfig::new(
                format!("media/clip-{:02}.mp4", i + 1),
                format!("Clip {}", i + 1),
            );
            if i % 3 == 2 {
                item.aspect = AspectRatio::Vertical;
            }
            // The first item is the showreel
            item.looping = i == 0;
            item
        })
        .collect()
}

fn behavior_for(index: usize, args: &Args) -> SimBehavior {
    if args.fail_load.contains(&index) {
        SimBehavior::FailsToLoad(format!("simulated load failure for item {}", index))
    } else if args.reject_play.contains(&index) {
        SimBehavior::RejectsPlay("simulated autoplay block".to_string())
    } else {
        SimBehavior::Plays {
            duration: Duration::from_millis(args.clip_ms),
        }
    }
}

/// Single-column layout of thumbnails, top to bottom
fn column_layout(items: &[ItemConfig]) -> Vec<Rect> {
    let mut y = THUMB_GAP;
    items
        .iter()
        .map(|item| {
            let height = match item.aspect {
                AspectRatio::Video => THUMB_WIDTH * 9.0 / 16.0,
                AspectRatio::Vertical => THUMB_WIDTH * 16.0 / 9.0,
            };
            let rect = Rect::new(THUMB_GAP, y, THUMB_WIDTH, height);
            y += height + THUMB_GAP;
            rect
        })
        .collect()
}

/// Log the walk until it completes (true) or is stopped (false)
///
/// The viewport follows the item holding the turn, as a page would scroll.
async fn follow_walk(
    gallery: &Gallery,
    events: &mut broadcast::Receiver<GalleryEvent>,
    layout: &[Rect],
    mut viewport: Rect,
    json: bool,
) -> Result<bool> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log lagged, {} events skipped", skipped);
                // The end of the walk may be among the skipped events. Only
                // the shutdown path resets the walk, so idle means completed.
                if !gallery.coordinator().is_active() {
                    info!("Walk finished while the event log lagged");
                    return Ok(true);
                }
                continue;
            }
            Err(RecvError::Closed) => return Ok(false),
        };

        if json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match &event {
            GalleryEvent::SequenceAdvanced { to_index, .. } => {
                if let Some(region) = layout.get(*to_index) {
                    viewport.y = (region.y - THUMB_GAP).max(0.0);
                    gallery.update_viewport(viewport, layout)?;
                }
                let progress = gallery.controls().progress.map(|p| p.label());
                info!("{}", progress.unwrap_or_default());
            }
            GalleryEvent::SequenceCompleted { .. } => return Ok(true),
            GalleryEvent::SequenceReset { .. } => return Ok(false),
            _ => {}
        }
    }
}

fn print_summary(views: &[ItemView]) {
    println!("{:>5}  {:<24} {}", "ITEM", "TITLE", "STATE");
    for view in views {
        println!("{:>5}  {:<24} {}", view.index, view.title, view.phase);
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping preview");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping preview");
        },
    }
}
