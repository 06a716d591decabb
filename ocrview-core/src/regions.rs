//! Mapping between normalized field boxes and page/content pixel space.

use std::collections::BTreeMap;

use crate::geometry::{NormalizedBox, PageBox, PageDims, PixelRect, Point, ScrollOffset, Size};
use crate::viewport::clamp_scroll;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionEntry {
    pub dims: PageDims,
    pub scale: f32,
}

/// Rendered dimensions per page number, last write wins.
///
/// Entries are stamped with the scale they were rendered at; an entry recorded
/// at a different scale than the current one is stale but kept until the next
/// document load.
#[derive(Debug, Clone, Default)]
pub struct PageDimensionTable {
    entries: BTreeMap<usize, DimensionEntry>,
}

impl PageDimensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, page_number: usize, dims: PageDims, scale: f32) {
        self.entries
            .insert(page_number, DimensionEntry { dims, scale });
    }

    pub fn latest(&self, page_number: usize) -> Option<PageDims> {
        self.entries.get(&page_number).map(|entry| entry.dims)
    }

    /// Dimensions only if they were recorded at `scale`.
    pub fn at_scale(&self, page_number: usize, scale: f32) -> Option<PageDims> {
        self.entries
            .get(&page_number)
            .filter(|entry| same_scale(entry.scale, scale))
            .map(|entry| entry.dims)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

fn same_scale(a: f32, b: f32) -> bool {
    (a - b).abs() <= f32::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Page-local pixel rect for `bbox` on a page rendered at `dims`.
/// Out-of-range input is clamped, never rejected.
pub fn to_pixel_rect(bbox: &NormalizedBox, dims: PageDims) -> PixelRect {
    let bbox = bbox.clamped();
    let width = dims.width.max(0.0);
    let height = dims.height.max(0.0);
    PixelRect {
        left: bbox.left * width,
        top: bbox.top * height,
        width: bbox.width * width,
        height: bbox.height * height,
    }
}

/// Inverse of [`to_pixel_rect`]; a zero-sized page yields an empty box.
pub fn to_normalized(rect: &PixelRect, dims: PageDims) -> NormalizedBox {
    if dims.is_empty() {
        return NormalizedBox::default();
    }
    NormalizedBox {
        left: rect.left / dims.width,
        top: rect.top / dims.height,
        width: rect.width / dims.width,
        height: rect.height / dims.height,
    }
    .clamped()
}

/// Center of a page-local rect, translated into content-space.
pub fn center_of(rect: &PixelRect, page_offset: Point) -> Point {
    let center = rect.center();
    Point::new(center.x + page_offset.x, center.y + page_offset.y)
}

/// Scroll offset that centers `bbox` within a `container` sized viewport.
pub fn scroll_target_for(
    bbox: &NormalizedBox,
    page: &PageBox,
    container: Size,
    max_scroll: ScrollOffset,
) -> ScrollOffset {
    let rect = to_pixel_rect(bbox, page.dims());
    let center = center_of(&rect, page.origin());
    clamp_scroll(
        ScrollOffset {
            left: center.x - container.width / 2.0,
            top: center.y - container.height / 2.0,
        },
        max_scroll,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::max_scroll;

    #[test]
    fn later_records_overwrite_per_page() {
        let mut table = PageDimensionTable::new();
        let dims_a = Size::new(100.0, 200.0);
        let dims_b = Size::new(300.0, 400.0);
        let dims_c = Size::new(500.0, 600.0);
        table.record(3, dims_a, 1.0);
        table.record(1, dims_b, 1.0);
        table.record(3, dims_c, 1.0);
        assert_eq!(table.latest(1), Some(dims_b));
        assert_eq!(table.latest(3), Some(dims_c));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn stale_scale_entries_are_hidden() {
        let mut table = PageDimensionTable::new();
        table.record(1, Size::new(10.0, 10.0), 1.0);
        assert!(table.at_scale(1, 1.0).is_some());
        assert!(table.at_scale(1, 1.1).is_none());
        assert!(table.latest(1).is_some());
    }

    #[test]
    fn pixel_rect_scales_by_page_dims() {
        let rect = to_pixel_rect(
            &NormalizedBox::new(0.5, 0.5, 0.1, 0.05),
            Size::new(800.0, 1000.0),
        );
        assert_eq!(rect, PixelRect::new(400.0, 500.0, 80.0, 50.0));
        let back = to_normalized(&rect, Size::new(800.0, 1000.0));
        assert!((back.width - 0.1).abs() < 1e-6);
    }

    #[test]
    fn extreme_boxes_still_map() {
        let dims = Size::new(800.0, 1000.0);
        let zero = to_pixel_rect(&NormalizedBox::new(0.0, 0.0, 0.0, 0.0), dims);
        assert_eq!(zero, PixelRect::default());
        let full = to_pixel_rect(&NormalizedBox::new(1.0, 1.0, 1.0, 1.0), dims);
        assert_eq!(full, PixelRect::new(800.0, 1000.0, 0.0, 0.0));
        let wild = to_pixel_rect(&NormalizedBox::new(-3.0, 7.0, 2.0, f32::NAN), dims);
        assert_eq!(wild, PixelRect::new(0.0, 1000.0, 800.0, 0.0));
    }

    #[test]
    fn scroll_target_centers_field() {
        let page = PageBox {
            page_number: 1,
            left: 0.0,
            top: 16.0,
            width: 800.0,
            height: 1000.0,
        };
        let container = Size::new(400.0, 600.0);
        let content = Size::new(800.0, 1032.0);
        let bbox = NormalizedBox::new(0.5, 0.5, 0.1, 0.05);
        let target = scroll_target_for(&bbox, &page, container, max_scroll(content, container));

        let center = center_of(&to_pixel_rect(&bbox, page.dims()), page.origin());
        let in_view_x = center.x - target.left;
        let in_view_y = center.y - target.top;
        assert!((in_view_x - 200.0).abs() <= 1.0);
        assert!((in_view_y - 300.0).abs() <= 1.0);
    }

    #[test]
    fn scroll_target_is_clamped_near_edges() {
        let page = PageBox {
            page_number: 1,
            left: 0.0,
            top: 0.0,
            width: 800.0,
            height: 1000.0,
        };
        let container = Size::new(400.0, 600.0);
        let target = scroll_target_for(
            &NormalizedBox::new(0.0, 0.0, 0.01, 0.01),
            &page,
            container,
            max_scroll(page.dims(), container),
        );
        assert_eq!(target, ScrollOffset::ORIGIN);
    }
}
