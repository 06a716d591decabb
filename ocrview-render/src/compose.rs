//! Assembles the visible part of the page stack, with field highlights, into
//! one RGBA frame the size of the container.

use ocrview_core::{HighlightRegion, OverlayLayer, PageBox, PixelRect, RenderImage, ScrollOffset};
use rayon::prelude::*;

pub const BACKGROUND: [u8; 3] = [0x2a, 0x2a, 0x2e];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    pub color: [u8; 3],
    pub fill_alpha: f32,
    pub border_width: u32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            fill_alpha: 0.2,
            border_width: 2,
        }
    }
}

/// A rendered bitmap and the box it occupies in content-space.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPage<'a> {
    pub frame: PageBox,
    pub image: &'a RenderImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn blank(width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&[BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn into_image(self) -> RenderImage {
        RenderImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}

/// Frame-space span covered by a content-space rect, clipped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Span {
    fn project(rect: PixelRect, scroll: ScrollOffset, width: u32, height: u32) -> Option<Self> {
        let clip = |value: f32, max: u32| value.clamp(0.0, max as f32) as u32;
        let x0 = clip((rect.left - scroll.left).floor(), width);
        let x1 = clip((rect.right() - scroll.left).ceil(), width);
        let y0 = clip((rect.top - scroll.top).floor(), height);
        let y1 = clip((rect.bottom() - scroll.top).ceil(), height);
        (x1 > x0 && y1 > y0).then_some(Span { x0, y0, x1, y1 })
    }
}

struct Highlight {
    outer: Span,
    /// Unclipped frame-space edges, so borders stay put when partly scrolled off.
    edges: (f32, f32, f32, f32),
}

pub fn compose_frame(
    width: u32,
    height: u32,
    scroll: ScrollOffset,
    pages: &[PlacedPage<'_>],
    overlays: &[OverlayLayer<Vec<HighlightRegion>>],
    style: &HighlightStyle,
) -> Frame {
    let mut frame = Frame::blank(width, height);
    if width == 0 || height == 0 {
        return frame;
    }

    let highlights: Vec<Highlight> = overlays
        .iter()
        .flat_map(|layer| {
            layer
                .content
                .iter()
                .filter(|region| region.hovered)
                .map(move |region| region.rect.translate(layer.frame.left, layer.frame.top))
        })
        .filter_map(|rect| {
            Span::project(rect, scroll, width, height).map(|outer| Highlight {
                outer,
                edges: (
                    rect.left - scroll.left,
                    rect.top - scroll.top,
                    rect.right() - scroll.left,
                    rect.bottom() - scroll.top,
                ),
            })
        })
        .collect();

    let stride = width as usize * 4;
    frame
        .pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            for page in pages {
                copy_page_row(row, y, width, scroll, page);
            }
            for highlight in &highlights {
                paint_highlight_row(row, y, highlight, style);
            }
        });
    frame
}

fn copy_page_row(row: &mut [u8], y: u32, width: u32, scroll: ScrollOffset, page: &PlacedPage<'_>) {
    let image = page.image;
    if image.width == 0 || image.height == 0 {
        return;
    }
    let src_y = (y as f32 + scroll.top - page.frame.top).floor();
    if src_y < 0.0 || src_y >= image.height as f32 {
        return;
    }
    let src_y = src_y as usize;

    let origin_x = (page.frame.left - scroll.left).round() as i64;
    let dest_start = origin_x.max(0);
    let dest_end = (origin_x + image.width as i64).min(width as i64);
    if dest_end <= dest_start {
        return;
    }
    let src_start = (dest_start - origin_x) as usize;
    let len = (dest_end - dest_start) as usize;

    let src_row = src_y * image.width as usize * 4;
    let src = &image.pixels[src_row + src_start * 4..src_row + (src_start + len) * 4];
    let dest = &mut row[dest_start as usize * 4..(dest_start as usize + len) * 4];
    dest.copy_from_slice(src);
}

fn paint_highlight_row(row: &mut [u8], y: u32, highlight: &Highlight, style: &HighlightStyle) {
    let span = highlight.outer;
    if y < span.y0 || y >= span.y1 {
        return;
    }
    let (left, top, right, bottom) = highlight.edges;
    let border = style.border_width as f32;
    let yf = y as f32;
    let horizontal_edge = yf < top + border || yf >= bottom - border;

    for x in span.x0..span.x1 {
        let xf = x as f32;
        let on_border = horizontal_edge || xf < left + border || xf >= right - border;
        let alpha = if on_border { 1.0 } else { style.fill_alpha };
        let idx = x as usize * 4;
        blend_pixel(&mut row[idx..idx + 4], style.color, alpha);
    }
}

fn blend_pixel(pixel: &mut [u8], color: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - alpha;
    for (channel, target) in pixel.iter_mut().zip(color) {
        *channel = (*channel as f32 * inv + target as f32 * alpha)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RenderImage {
        RenderImage {
            width,
            height,
            pixels: rgba.repeat((width * height) as usize),
        }
    }

    fn page_box(page_number: usize, left: f32, top: f32, width: f32, height: f32) -> PageBox {
        PageBox {
            page_number,
            left,
            top,
            width,
            height,
        }
    }

    #[test]
    fn empty_stack_is_background() {
        let frame = compose_frame(4, 3, ScrollOffset::ORIGIN, &[], &[], &HighlightStyle::default());
        assert_eq!(frame.pixels.len(), 4 * 3 * 4);
        assert_eq!(frame.pixel(3, 2), Some([0x2a, 0x2a, 0x2e, 255]));
    }

    #[test]
    fn pages_are_placed_relative_to_scroll() {
        let white = solid(10, 10, [255, 255, 255, 255]);
        let pages = [PlacedPage {
            frame: page_box(1, 5.0, 16.0, 10.0, 10.0),
            image: &white,
        }];
        let frame = compose_frame(
            20,
            20,
            ScrollOffset::new(0.0, 10.0),
            &pages,
            &[],
            &HighlightStyle::default(),
        );
        assert_eq!(frame.pixel(5, 6), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(14, 15), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(4, 6), Some([0x2a, 0x2a, 0x2e, 255]));
        assert_eq!(frame.pixel(5, 5), Some([0x2a, 0x2a, 0x2e, 255]));
        assert_eq!(frame.pixel(5, 16), Some([0x2a, 0x2a, 0x2e, 255]));
    }

    #[test]
    fn only_hovered_regions_are_painted() {
        let white = solid(40, 40, [255, 255, 255, 255]);
        let frame_box = page_box(1, 0.0, 0.0, 40.0, 40.0);
        let pages = [PlacedPage {
            frame: frame_box,
            image: &white,
        }];
        let overlays = [OverlayLayer {
            page_number: 1,
            frame: frame_box.rect(),
            content: vec![
                HighlightRegion {
                    field_index: 0,
                    rect: PixelRect::new(10.0, 10.0, 20.0, 20.0),
                    hovered: true,
                },
                HighlightRegion {
                    field_index: 1,
                    rect: PixelRect::new(0.0, 0.0, 5.0, 5.0),
                    hovered: false,
                },
            ],
        }];
        let frame = compose_frame(
            40,
            40,
            ScrollOffset::ORIGIN,
            &pages,
            &overlays,
            &HighlightStyle::default(),
        );

        // border
        assert_eq!(frame.pixel(10, 15), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(29, 15), Some([255, 0, 0, 255]));
        // fill: 255*0.8 + 0*0.2
        assert_eq!(frame.pixel(20, 20), Some([255, 204, 204, 255]));
        // untouched
        assert_eq!(frame.pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(35, 35), Some([255, 255, 255, 255]));
    }
}
