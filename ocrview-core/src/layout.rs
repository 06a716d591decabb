use crate::geometry::{PageBox, ScrollOffset, Size};
use crate::regions::PageDimensionTable;

/// Vertical margin above and below every page, collapsed between neighbours.
pub const DEFAULT_PAGE_GAP: f32 = 16.0;

/// Pages stacked top to bottom, each centred horizontally in the content area.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pages: Vec<PageBox>,
    content: Size,
}

impl PageLayout {
    /// Lays out `natural_sizes.len()` pages. Pages with dimensions rendered at
    /// `scale` use them; the rest are estimated from their natural size.
    pub fn compute(
        natural_sizes: &[Size],
        dims: &PageDimensionTable,
        scale: f32,
        container_width: f32,
        gap: f32,
    ) -> Self {
        let sizes: Vec<Size> = natural_sizes
            .iter()
            .enumerate()
            .map(|(idx, natural)| {
                dims.at_scale(idx + 1, scale)
                    .unwrap_or_else(|| natural.scaled(scale))
            })
            .collect();

        let widest = sizes.iter().map(|size| size.width).fold(0.0_f32, f32::max);
        let content_width = widest.max(container_width).max(0.0);

        let mut top = gap;
        let mut pages = Vec::with_capacity(sizes.len());
        for (idx, size) in sizes.iter().enumerate() {
            pages.push(PageBox {
                page_number: idx + 1,
                left: ((content_width - size.width) / 2.0).max(0.0),
                top,
                width: size.width,
                height: size.height,
            });
            top += size.height + gap;
        }

        let content_height = if pages.is_empty() { 0.0 } else { top };
        Self {
            pages,
            content: Size::new(content_width, content_height),
        }
    }

    pub fn pages(&self) -> &[PageBox] {
        &self.pages
    }

    pub fn page(&self, page_number: usize) -> Option<&PageBox> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
    }

    pub fn content_size(&self) -> Size {
        self.content
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages intersecting the viewport at `scroll`.
    pub fn visible<'a>(
        &'a self,
        scroll: ScrollOffset,
        container: Size,
    ) -> impl Iterator<Item = &'a PageBox> + 'a {
        let top = scroll.top;
        let bottom = scroll.top + container.height;
        self.pages
            .iter()
            .filter(move |page| page.bottom() > top && page.top < bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_stack_with_collapsed_gaps() {
        let natural = vec![Size::new(600.0, 800.0), Size::new(600.0, 800.0)];
        let layout = PageLayout::compute(&natural, &PageDimensionTable::new(), 0.5, 1000.0, 16.0);
        let first = layout.page(1).unwrap();
        let second = layout.page(2).unwrap();
        assert_eq!(first.top, 16.0);
        assert_eq!(second.top, 16.0 + 400.0 + 16.0);
        assert_eq!(first.left, 350.0);
        assert_eq!(layout.content_size(), Size::new(1000.0, 16.0 + 416.0 * 2.0));
    }

    #[test]
    fn rendered_dims_override_estimates_at_same_scale() {
        let natural = vec![Size::new(100.0, 100.0)];
        let mut dims = PageDimensionTable::new();
        dims.record(1, Size::new(210.0, 190.0), 2.0);
        let layout = PageLayout::compute(&natural, &dims, 2.0, 50.0, 0.0);
        assert_eq!(layout.page(1).unwrap().dims(), Size::new(210.0, 190.0));

        let rescaled = PageLayout::compute(&natural, &dims, 3.0, 50.0, 0.0);
        assert_eq!(rescaled.page(1).unwrap().dims(), Size::new(300.0, 300.0));
    }

    #[test]
    fn wide_pages_widen_content() {
        let natural = vec![Size::new(900.0, 100.0), Size::new(300.0, 100.0)];
        let layout = PageLayout::compute(&natural, &PageDimensionTable::new(), 1.0, 400.0, 10.0);
        assert_eq!(layout.content_size().width, 900.0);
        assert_eq!(layout.page(1).unwrap().left, 0.0);
        assert_eq!(layout.page(2).unwrap().left, 300.0);
        assert!(layout.page(0).is_none());
        assert!(layout.page(3).is_none());
    }

    #[test]
    fn visible_filters_by_viewport() {
        let natural = vec![Size::new(100.0, 100.0); 5];
        let layout = PageLayout::compute(&natural, &PageDimensionTable::new(), 1.0, 100.0, 0.0);
        let visible: Vec<usize> = layout
            .visible(ScrollOffset::new(0.0, 150.0), Size::new(100.0, 100.0))
            .map(|page| page.page_number)
            .collect();
        assert_eq!(visible, vec![2, 3]);
    }
}
