use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Rendered pixel dimensions of a page at some scale.
pub type PageDims = Size;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Scroll position of the container in content-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub left: f32,
    pub top: f32,
}

impl ScrollOffset {
    pub const ORIGIN: ScrollOffset = ScrollOffset { left: 0.0, top: 0.0 };

    pub const fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }
}

/// Rectangle whose components are fractions of a page's width/height.
///
/// Field extraction results carry these with capitalised keys, so the serde
/// names follow that shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedBox {
    #[serde(rename = "Left")]
    pub left: f32,
    #[serde(rename = "Top")]
    pub top: f32,
    #[serde(rename = "Width")]
    pub width: f32,
    #[serde(rename = "Height")]
    pub height: f32,
}

impl NormalizedBox {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Pulls every component into `[0, 1]` and keeps the box inside the page.
    /// Non-finite components collapse to zero.
    pub fn clamped(&self) -> Self {
        let left = unit(self.left);
        let top = unit(self.top);
        Self {
            left,
            top,
            width: unit(self.width).min(1.0 - left),
            height: unit(self.height).min(1.0 - top),
        }
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }
}

/// Layout box of one page inside the scrollable content area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub page_number: usize,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn dims(&self) -> PageDims {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.left, self.top, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_box_stays_inside_page() {
        let clamped = NormalizedBox::new(0.9, -0.2, 0.5, 1.4).clamped();
        assert_eq!(clamped.left, 0.9);
        assert_eq!(clamped.top, 0.0);
        assert!((clamped.width - 0.1).abs() < 1e-6);
        assert_eq!(clamped.height, 1.0);
    }

    #[test]
    fn clamped_box_drops_nan() {
        let clamped = NormalizedBox::new(f32::NAN, 0.5, f32::INFINITY, 0.25).clamped();
        assert_eq!(clamped.left, 0.0);
        assert_eq!(clamped.width, 0.0);
        assert_eq!(clamped.top, 0.5);
        assert_eq!(clamped.height, 0.25);
    }

    #[test]
    fn normalized_box_reads_extraction_shape() {
        let parsed: NormalizedBox =
            serde_json::from_str(r#"{"Left":0.1,"Top":0.2,"Width":0.3,"Height":0.4}"#).unwrap();
        assert_eq!(parsed, NormalizedBox::new(0.1, 0.2, 0.3, 0.4));
    }
}
