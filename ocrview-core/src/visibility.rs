use std::time::{Duration, Instant};

use crate::geometry::PageBox;

/// Picks the page that should be reported as current for a viewport spanning
/// `[scroll_top, scroll_top + container_height]`.
///
/// The page containing the viewport's vertical center wins; failing that, the
/// page with the largest overlap (lowest page number on ties); failing that,
/// `previous` is kept. `pages` must be ordered by page number.
pub fn determine_current_page(
    scroll_top: f32,
    container_height: f32,
    pages: &[PageBox],
    previous: usize,
) -> usize {
    let view_top = scroll_top;
    let view_bottom = scroll_top + container_height;
    let center = scroll_top + container_height / 2.0;

    if let Some(page) = pages
        .iter()
        .find(|page| center >= page.top && center <= page.bottom())
    {
        return page.page_number;
    }

    let mut best_overlap = 0.0;
    let mut best = previous;
    for page in pages {
        let overlap = view_bottom.min(page.bottom()) - view_top.max(page.top);
        if overlap > best_overlap {
            best_overlap = overlap;
            best = page.page_number;
        }
    }
    best
}

/// Debounce timer for the scroll-driven page recomputation.
///
/// Only one deadline is ever pending; each scroll pushes it back.
#[derive(Debug, Clone)]
pub struct PageVisibilityTracker {
    debounce: Duration,
    pending: Option<Instant>,
}

impl PageVisibilityTracker {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.pending = Some(now + self.debounce);
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns true once the scroll activity has been quiet for the debounce
    /// interval; the pending deadline is consumed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for PageVisibilityTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked(heights: &[f32], gap: f32) -> Vec<PageBox> {
        let mut top = gap;
        heights
            .iter()
            .enumerate()
            .map(|(idx, height)| {
                let page = PageBox {
                    page_number: idx + 1,
                    left: 0.0,
                    top,
                    width: 500.0,
                    height: *height,
                };
                top += height + gap;
                page
            })
            .collect()
    }

    #[test]
    fn center_page_wins() {
        let pages = stacked(&[1000.0, 1000.0, 1000.0], 16.0);
        // viewport 600 tall, center at 1300 -> page 2 (1032..2032)
        assert_eq!(determine_current_page(1000.0, 600.0, &pages, 1), 2);
    }

    #[test]
    fn center_in_gap_falls_back_to_largest_overlap() {
        let pages = stacked(&[1000.0, 1000.0], 16.0);
        // center at 1024 sits in the gap between 1016 and 1032
        let current = determine_current_page(724.0, 600.0, &pages, 2);
        assert_eq!(current, 1);
    }

    #[test]
    fn ties_go_to_lowest_page() {
        let pages = vec![
            PageBox {
                page_number: 1,
                left: 0.0,
                top: 0.0,
                width: 10.0,
                height: 100.0,
            },
            PageBox {
                page_number: 2,
                left: 0.0,
                top: 120.0,
                width: 10.0,
                height: 100.0,
            },
        ];
        // view 50..170: center 110 in the gap, overlaps are 50 and 50
        assert_eq!(determine_current_page(50.0, 120.0, &pages, 2), 1);
    }

    #[test]
    fn no_overlap_keeps_previous() {
        let pages = stacked(&[100.0], 0.0);
        assert_eq!(determine_current_page(5000.0, 100.0, &pages, 3), 3);
        assert_eq!(determine_current_page(0.0, 100.0, &[], 4), 4);
    }

    #[test]
    fn determination_is_repeatable() {
        let pages = stacked(&[800.0, 1200.0, 900.0], 16.0);
        let first = determine_current_page(1500.0, 700.0, &pages, 1);
        for _ in 0..5 {
            assert_eq!(determine_current_page(1500.0, 700.0, &pages, 1), first);
        }
    }

    #[test]
    fn tracker_debounces_until_quiet() {
        let start = Instant::now();
        let mut tracker = PageVisibilityTracker::default();
        tracker.schedule(start);
        tracker.schedule(start + Duration::from_millis(60));
        assert!(!tracker.poll(start + Duration::from_millis(120)));
        assert!(tracker.poll(start + Duration::from_millis(160)));
        assert!(!tracker.poll(start + Duration::from_millis(400)));
    }

    #[test]
    fn cancelled_tracker_never_fires() {
        let start = Instant::now();
        let mut tracker = PageVisibilityTracker::default();
        tracker.schedule(start);
        tracker.cancel();
        assert!(!tracker.is_pending());
        assert!(!tracker.poll(start + Duration::from_secs(1)));
    }
}
