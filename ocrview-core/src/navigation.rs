use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    /// A programmatic scroll is in flight; passive page detection is ignored
    /// until `deadline`.
    NavigatingProgrammatically { target_page: usize, deadline: Instant },
}

/// Owns the current page number and the suppression window that keeps
/// scroll-driven detection from overriding explicit navigation.
#[derive(Debug, Clone)]
pub struct NavigationController {
    state: NavigationState,
    current_page: usize,
    page_count: usize,
    window: Duration,
}

impl NavigationController {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

    pub fn new(window: Duration) -> Self {
        Self {
            state: NavigationState::Idle,
            current_page: 1,
            page_count: 0,
            window,
        }
    }

    /// Starts over for a document of `page_count` pages, on page 1.
    pub fn reset(&mut self, page_count: usize) {
        self.state = NavigationState::Idle;
        self.current_page = 1;
        self.page_count = page_count;
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.page_count.max(1))
    }

    /// Moves to `page` (clamped), arming the suppression window.
    /// Returns the new page, or `None` when it is already current.
    pub fn request_page(&mut self, page: usize, now: Instant) -> Option<usize> {
        if self.page_count == 0 {
            return None;
        }
        let target = self.clamp_page(page);
        if target == self.current_page {
            return None;
        }
        self.current_page = target;
        self.arm(target, now);
        Some(target)
    }

    /// Arms the window for a programmatic scroll that stays on the current page.
    pub fn suppress(&mut self, now: Instant) {
        let target = self.current_page;
        self.arm(target, now);
    }

    fn arm(&mut self, target_page: usize, now: Instant) {
        let deadline = now + self.window;
        debug!(target_page, ?deadline, "navigation suppression armed");
        self.state = NavigationState::NavigatingProgrammatically {
            target_page,
            deadline,
        };
    }

    pub fn next(&mut self, count: usize, now: Instant) -> Option<usize> {
        if !self.can_go_next() {
            return None;
        }
        self.request_page(self.current_page.saturating_add(count.max(1)), now)
    }

    pub fn prev(&mut self, count: usize, now: Instant) -> Option<usize> {
        if !self.can_go_prev() {
            return None;
        }
        self.request_page(self.current_page.saturating_sub(count.max(1)), now)
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.page_count
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        match self.state {
            NavigationState::Idle => false,
            NavigationState::NavigatingProgrammatically { deadline, .. } => now < deadline,
        }
    }

    /// Lifts the suppression once the current deadline has passed. A deadline
    /// replaced by a newer navigation is never consulted. Returns true on the
    /// transition back to idle.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            NavigationState::NavigatingProgrammatically {
                target_page,
                deadline,
            } if now >= deadline => {
                debug!(target_page, "navigation suppression lifted");
                self.state = NavigationState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Applies a page detected from passive scrolling. Ignored while a
    /// programmatic navigation is in flight.
    pub fn observe_page(&mut self, page: usize, now: Instant) -> bool {
        if self.is_suppressed(now) || self.page_count == 0 {
            return false;
        }
        let page = self.clamp_page(page);
        if page == self.current_page {
            return false;
        }
        self.current_page = page;
        true
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
