//! Geometry and pixel types shared by every compositing stage.
//!
//! A frame is rendered on an RGBA [`Canvas`] that is owned by exactly one
//! stage at a time. Stages hand back immutable [`RgbaLayer`]s or [`Mask`]s
//! which the composer blends onto the canvas.

use image::{GrayImage, RgbaImage};
use palette::Srgb;

/// The working surface of a render: 8-bit RGBA, straight alpha.
pub type Canvas = RgbaImage;

/// A layer produced by a compositing stage. Colour and alpha are stored
/// together but are independent (straight, not premultiplied).
pub type RgbaLayer = RgbaImage;

/// Single-channel 0-255 coverage buffer with the same dimensions as the
/// layer it gates.
pub type Mask = GrayImage;

/// An opaque RGB colour.
pub type Color = Srgb<u8>;

/// Builds a [`Color`] from its channels.
pub const fn rgb(red: u8, green: u8, blue: u8) -> Color {
    Srgb::new(red, green, blue)
}

/// A rectangle defined in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the canvas
    pub x: u32,
    /// Y offset from the top edge of the canvas
    pub y: u32,
    /// Width of the rectangle
    pub width: u32,
    /// Height of the rectangle
    pub height: u32,
}

impl RectPx {
    /// Creates a new rectangle with the given position and dimensions.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Returns the size of the rectangle.
    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }

    /// Shrinks the rectangle so that it lies within `size`.
    pub fn clamp_to(&self, size: SizePx) -> Self {
        let x = self.x.min(size.width);
        let y = self.y.min(size.height);
        Self {
            x,
            y,
            width: self.width.min(size.width - x),
            height: self.height.min(size.height - y),
        }
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the dimensions of an image.
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Converts a [`Color`] and an alpha value into a raw RGBA quadruple.
pub fn with_alpha(color: Color, alpha: u8) -> [u8; 4] {
    [color.red, color.green, color.blue, alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_px_new() {
        let rect = RectPx::new(10, 20, 100, 200);
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, 20);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, 200);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 220);
        assert_eq!(rect.size(), SizePx::new(100, 200));
    }

    #[test]
    fn rect_px_clamp_to_canvas() {
        let rect = RectPx::new(90, 10, 50, 500).clamp_to(SizePx::new(100, 100));
        assert_eq!(rect, RectPx::new(90, 10, 10, 90));

        let outside = RectPx::new(200, 200, 5, 5).clamp_to(SizePx::new(100, 100));
        assert_eq!(outside.width, 0);
        assert_eq!(outside.height, 0);
    }

    #[test]
    fn size_px_is_square() {
        assert!(SizePx::new(100, 100).is_square());
        assert!(!SizePx::new(100, 200).is_square());
        assert!(SizePx::new(0, 10).is_empty());
    }

    #[test]
    fn color_with_alpha() {
        assert_eq!(with_alpha(rgb(70, 84, 154), 12), [70, 84, 154, 12]);
    }
}
