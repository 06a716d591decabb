use std::time::{Duration, Instant};

use crate::geometry::{ScrollOffset, Size};

/// The scrollable container the viewer drives.
///
/// Offsets handed to a surface are already clamped by the caller. Smooth
/// scrolling is frame-scheduled: the host calls [`ScrollSurface::advance`]
/// once per frame and feeds any movement back as a scroll event.
pub trait ScrollSurface {
    fn container_size(&self) -> Size;
    fn resize(&mut self, container: Size);
    fn scroll_offset(&self) -> ScrollOffset;
    /// Jumps immediately, cancelling any animation in flight.
    fn scroll_to(&mut self, offset: ScrollOffset);
    /// Starts (or retargets) an animated scroll.
    fn smooth_scroll_to(&mut self, target: ScrollOffset, now: Instant);
    /// Steps the animation; returns true if the offset moved.
    fn advance(&mut self, now: Instant) -> bool;
    fn is_animating(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct SmoothScroll {
    from: ScrollOffset,
    to: ScrollOffset,
    started: Instant,
    duration: Duration,
}

impl SmoothScroll {
    fn sample(&self, now: Instant) -> (ScrollOffset, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        let eased = ease_out_cubic(t);
        let offset = ScrollOffset {
            left: self.from.left + (self.to.left - self.from.left) * eased,
            top: self.from.top + (self.to.top - self.from.top) * eased,
        };
        (offset, false)
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// In-memory scroll container with ease-out smooth scrolling.
#[derive(Debug, Clone)]
pub struct ScrollPort {
    container: Size,
    offset: ScrollOffset,
    animation: Option<SmoothScroll>,
    smooth_duration: Duration,
}

impl ScrollPort {
    pub const DEFAULT_SMOOTH_DURATION: Duration = Duration::from_millis(400);

    pub fn new(container: Size) -> Self {
        Self::with_smooth_duration(container, Self::DEFAULT_SMOOTH_DURATION)
    }

    pub fn with_smooth_duration(container: Size, smooth_duration: Duration) -> Self {
        Self {
            container,
            offset: ScrollOffset::ORIGIN,
            animation: None,
            smooth_duration,
        }
    }

    pub fn animation_target(&self) -> Option<ScrollOffset> {
        self.animation.map(|animation| animation.to)
    }
}

impl ScrollSurface for ScrollPort {
    fn container_size(&self) -> Size {
        self.container
    }

    fn resize(&mut self, container: Size) {
        self.container = container;
    }

    fn scroll_offset(&self) -> ScrollOffset {
        self.offset
    }

    fn scroll_to(&mut self, offset: ScrollOffset) {
        self.animation = None;
        self.offset = offset;
    }

    fn smooth_scroll_to(&mut self, target: ScrollOffset, now: Instant) {
        if target == self.offset {
            self.animation = None;
            return;
        }
        self.animation = Some(SmoothScroll {
            from: self.offset,
            to: target,
            started: now,
            duration: self.smooth_duration,
        });
    }

    fn advance(&mut self, now: Instant) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        let (offset, done) = animation.sample(now);
        if done {
            self.animation = None;
        }
        let moved = offset != self.offset;
        self.offset = offset;
        moved
    }

    fn is_animating(&self) -> bool {
        self.animation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_scroll_reaches_target_after_duration() {
        let start = Instant::now();
        let mut port = ScrollPort::new(Size::new(400.0, 600.0));
        port.smooth_scroll_to(ScrollOffset::new(0.0, 1000.0), start);
        assert!(port.is_animating());

        assert!(port.advance(start + Duration::from_millis(100)));
        let midway = port.scroll_offset().top;
        assert!(midway > 0.0 && midway < 1000.0);

        assert!(port.advance(start + Duration::from_millis(400)));
        assert_eq!(port.scroll_offset(), ScrollOffset::new(0.0, 1000.0));
        assert!(!port.is_animating());
        assert!(!port.advance(start + Duration::from_millis(500)));
    }

    #[test]
    fn immediate_scroll_cancels_animation() {
        let start = Instant::now();
        let mut port = ScrollPort::new(Size::new(400.0, 600.0));
        port.smooth_scroll_to(ScrollOffset::new(0.0, 1000.0), start);
        port.scroll_to(ScrollOffset::new(0.0, 50.0));
        assert!(!port.is_animating());
        assert!(!port.advance(start + Duration::from_millis(200)));
        assert_eq!(port.scroll_offset().top, 50.0);
    }

    #[test]
    fn easing_is_monotonic() {
        let mut last = 0.0;
        for step in 0..=10 {
            let value = ease_out_cubic(step as f32 / 10.0);
            assert!(value >= last);
            last = value;
        }
        assert_eq!(ease_out_cubic(1.0), 1.0);
    }
}
