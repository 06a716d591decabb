//! Scale and scroll arithmetic shared by every zoom trigger.
//!
//! Everything here is pure; the controller owns the state and decides when to
//! apply the results.

use crate::geometry::{Point, ScrollOffset, Size};

/// Fraction of the exact-fit scale used as the baseline, so page edges never
/// sit flush against the container.
pub const DEFAULT_FIT_MARGIN: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f32,
    pub baseline_scale: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            baseline_scale: 1.0,
        }
    }
}

impl ViewportState {
    pub fn with_baseline(baseline_scale: f32) -> Self {
        Self {
            scale: baseline_scale,
            baseline_scale,
        }
    }

    /// Current scale relative to the baseline, as shown on the toolbar.
    pub fn zoom_percent(&self) -> u32 {
        if self.baseline_scale > 0.0 {
            (self.scale / self.baseline_scale * 100.0).round().max(0.0) as u32
        } else {
            100
        }
    }
}

/// Zoom bounds and step, expressed as fractions of the baseline scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub step_fraction: f32,
    pub min_fraction: f32,
    pub max_fraction: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            step_fraction: 0.1,
            min_fraction: 0.1,
            max_fraction: 10.0,
        }
    }
}

impl ZoomLimits {
    pub fn step(&self, baseline_scale: f32) -> f32 {
        baseline_scale * self.step_fraction
    }

    pub fn floor(&self, baseline_scale: f32) -> f32 {
        baseline_scale * self.min_fraction
    }

    pub fn ceiling(&self, baseline_scale: f32) -> f32 {
        baseline_scale * self.max_fraction
    }

    pub fn clamp(&self, scale: f32, baseline_scale: f32) -> f32 {
        let floor = self.floor(baseline_scale);
        if !scale.is_finite() {
            return floor;
        }
        scale.clamp(floor, self.ceiling(baseline_scale).max(floor))
    }
}

/// Default step: a tenth of the baseline scale.
pub fn step_size(baseline_scale: f32) -> f32 {
    ZoomLimits::default().step(baseline_scale)
}

/// Keeps the content point under `anchor` (container-relative) fixed while the
/// scale changes from `old_scale` to `new_scale`.
pub fn zoom_at(anchor: Point, old_scale: f32, new_scale: f32, old_scroll: ScrollOffset) -> ScrollOffset {
    if !(old_scale > 0.0) || !new_scale.is_finite() {
        return old_scroll;
    }
    let ratio = new_scale / old_scale;
    ScrollOffset {
        left: (old_scroll.left + anchor.x) * ratio - anchor.x,
        top: (old_scroll.top + anchor.y) * ratio - anchor.y,
    }
}

pub fn max_scroll(content: Size, container: Size) -> ScrollOffset {
    ScrollOffset {
        left: (content.width - container.width).max(0.0),
        top: (content.height - container.height).max(0.0),
    }
}

pub fn clamp_scroll(scroll: ScrollOffset, max: ScrollOffset) -> ScrollOffset {
    ScrollOffset {
        left: clamp_axis(scroll.left, max.left),
        top: clamp_axis(scroll.top, max.top),
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

/// Scale at which `page` fits inside `container`, shrunk by `margin`.
/// Falls back to 1.0 when either size is unknown.
pub fn fit_scale(page: Size, container: Size, margin: f32) -> f32 {
    if page.is_empty() || container.is_empty() {
        return 1.0;
    }
    let fit = (container.width / page.width).min(container.height / page.height);
    let scaled = fit * margin;
    if scaled.is_finite() && scaled > 0.0 {
        scaled
    } else {
        1.0
    }
}

pub fn container_center(container: Size) -> Point {
    Point::new(container.width / 2.0, container.height / 2.0)
}
