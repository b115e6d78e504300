//! Media event → item phase mapping
//!
//! Pure transition table for [`ItemPhase`]. Participant-initiated transitions
//! (Starting, and Playing/Paused from its own requests) are applied by the
//! participant itself; this table covers what the media backend reports.

use vgal_common::events::ItemPhase;

use super::media::MediaEvent;

/// Phase after the backend reports `event` in phase `current`
///
/// `Failed` absorbs everything: a failed load is never retried.
pub fn next_phase(current: ItemPhase, event: &MediaEvent) -> ItemPhase {
    use ItemPhase::*;

    if current == Failed {
        return Failed;
    }

    match event {
        MediaEvent::Error(_) => Failed,
        MediaEvent::LoadStart => match current {
            Unloaded => Loading,
            other => other,
        },
        MediaEvent::LoadedMetadata => current,
        MediaEvent::LoadedData | MediaEvent::CanPlay => match current {
            Unloaded | Loading => Ready,
            other => other,
        },
        MediaEvent::Play => match current {
            Unloaded | Loading => current,
            _ => Playing,
        },
        MediaEvent::Pause => match current {
            Playing | Starting => Paused,
            other => other,
        },
        MediaEvent::Ended => match current {
            Unloaded | Loading => current,
            _ => Ended,
        },
    }
}
