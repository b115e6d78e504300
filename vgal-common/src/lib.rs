//! # Video Gallery Common Library
//!
//! Shared code for the gallery sequencer crates:
//! - Error type
//! - Event types (GalleryEvent enum) and the EventBus
//! - Configuration loading (TOML bootstrap file)

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
