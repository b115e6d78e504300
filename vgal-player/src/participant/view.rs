//! Per-item display state published to the presentation layer

use vgal_common::events::ItemPhase;

/// Icon shown in the centre of a thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayIcon {
    Spinner,
    Play,
    Pause,
}

/// Snapshot of one item for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub index: usize,
    pub title: String,
    pub phase: ItemPhase,
    /// Item holds the sequence turn ("NOW PLAYING")
    pub is_turn: bool,
    pub fullscreen: bool,
    pub interacted: bool,
}

impl ItemView {
    pub fn new(index: usize, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            phase: ItemPhase::Unloaded,
            is_turn: false,
            fullscreen: false,
            interacted: false,
        }
    }

    pub fn overlay(&self) -> OverlayIcon {
        if self.phase.is_busy() {
            OverlayIcon::Spinner
        } else if self.phase.is_playing() {
            OverlayIcon::Pause
        } else {
            OverlayIcon::Play
        }
    }

    /// Overlay fades out while the item plays on its own (outside a turn)
    pub fn overlay_hidden_until_hover(&self) -> bool {
        self.phase.is_playing() && !self.is_turn
    }

    /// Placeholder shown until the first frame is available
    pub fn shows_placeholder(&self) -> bool {
        matches!(
            self.phase,
            ItemPhase::Unloaded | ItemPhase::Loading | ItemPhase::Failed
        )
    }
}
