//! Viewport proximity and one-shot lazy activation
//!
//! An item is "near" the viewport when the share of its area that falls
//! inside the viewport, grown by a margin on every side, reaches a threshold.
//! The activation observer fires once and then stops observing.

use vgal_common::config::ViewportConfig;

/// Axis-aligned rectangle in layout pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Overlap with `other`; edge contact yields a zero-area rectangle
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Position of an item's region relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    pub element: Rect,
    pub viewport: Rect,
}

impl ViewportSample {
    pub fn new(element: Rect, viewport: Rect) -> Self {
        Self { element, viewport }
    }
}

/// Margin + threshold rule deciding whether an item is near the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityRule {
    pub margin_px: f64,
    pub threshold: f64,
}

impl ProximityRule {
    pub fn is_near(&self, sample: &ViewportSample) -> bool {
        let root = sample.viewport.expand(self.margin_px);
        let Some(overlap) = sample.element.intersection(&root) else {
            return false;
        };

        let area = sample.element.area();
        if area == 0.0 || self.threshold == 0.0 {
            // Degenerate element or "any contact" rule
            return true;
        }
        overlap.area() / area >= self.threshold
    }
}

impl From<&ViewportConfig> for ProximityRule {
    fn from(config: &ViewportConfig) -> Self {
        Self {
            margin_px: config.margin_px,
            threshold: config.threshold,
        }
    }
}

impl Default for ProximityRule {
    fn default() -> Self {
        Self::from(&ViewportConfig::default())
    }
}

/// One-shot observer: triggers on the first near sample, then disconnects
#[derive(Debug, Clone)]
pub struct LazyActivation {
    rule: ProximityRule,
    triggered: bool,
}

impl LazyActivation {
    pub fn new(rule: ProximityRule) -> Self {
        Self {
            rule,
            triggered: false,
        }
    }

    /// Feed a sample; returns true only for the sample that triggers activation
    pub fn observe(&mut self, sample: &ViewportSample) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = self.rule.is_near(sample);
        self.triggered
    }

    /// Trigger without a sample; returns true if this call triggered it
    pub fn force(&mut self) -> bool {
        !std::mem::replace(&mut self.triggered, true)
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}
