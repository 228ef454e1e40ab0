//! Decorative line grid confined to the bottom gradient band.

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::{GradientBand, LayerEffect, RenderContext};
use crate::error::RenderResult;
use crate::frame::{RgbaLayer, SizePx};
use crate::layer::raster::composite_over;

// ============================================================================
// GridStyle
// ============================================================================

/// Geometry and opacity of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStyle {
    /// Distance between consecutive lines, in pixels.
    pub square_size: u32,
    /// Width of each line, in pixels.
    pub line_thickness: u32,
    /// Fraction of the gradient's alpha given to the lines (0.0-1.0).
    pub opacity_ratio: f64,
    /// Extra downward shift of the horizontal lines, in pixels.
    pub vertical_offset: u32,
}

impl GridStyle {
    /// First vertical line, centring the pattern across the full width.
    /// A zero `square_size` starts at the left edge.
    pub fn start_x(&self, canvas_width: u32) -> u32 {
        canvas_width.checked_rem(self.square_size).unwrap_or(0) / 2
    }

    /// First horizontal line, centring the pattern within the band.
    /// A zero `square_size` starts at the band top plus the offset.
    pub fn start_y(&self, canvas_height: u32, band_top: u32) -> u32 {
        let band = canvas_height.saturating_sub(band_top);
        let centring = band
            .checked_rem(self.square_size)
            .map_or(0, |rest| (self.square_size - rest) / 2);
        band_top
            .saturating_add(centring)
            .saturating_add(self.vertical_offset)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders white grid lines over the rows `gradient_top..canvas.height`.
///
/// `gradient` is the bottom gradient (any width, one row per band row). A line
/// pixel on row `y` gets `trunc(alpha(y - gradient_top) * opacity_ratio)`,
/// so the grid fades with the gradient and never exceeds it. Crossing points
/// hold a single value, they are not blended twice.
pub fn render_grid(
    canvas: SizePx,
    gradient: &RgbaLayer,
    gradient_top: u32,
    style: &GridStyle,
) -> RgbaLayer {
    let (width, height) = (canvas.width, canvas.height);
    let mut overlay = RgbaImage::new(width, height);
    if style.square_size == 0 || style.line_thickness == 0 || gradient_top >= height {
        return overlay;
    }

    let ratio = style.opacity_ratio.clamp(0.0, 1.0);
    let row_alpha: Vec<u8> = (gradient_top..height)
        .map(|y| {
            let row = y - gradient_top;
            let alpha = if gradient.width() > 0 && row < gradient.height() {
                gradient.get_pixel(0, row)[3]
            } else {
                0
            };
            (f64::from(alpha) * ratio) as u8
        })
        .collect();
    let line = |alpha: u8| Rgba([255, 255, 255, alpha]);

    let step = style.square_size as usize;
    for x in (style.start_x(width)..width).step_by(step) {
        for cx in (x..x.saturating_add(style.line_thickness)).take_while(|&cx| cx < width) {
            for y in gradient_top..height {
                overlay.put_pixel(cx, y, line(row_alpha[(y - gradient_top) as usize]));
            }
        }
    }

    for y in (style.start_y(height, gradient_top)..height).step_by(step) {
        for ry in (y..y.saturating_add(style.line_thickness)).take_while(|&ry| ry < height) {
            let pixel = line(row_alpha[(ry - gradient_top) as usize]);
            for x in 0..width {
                overlay.put_pixel(x, ry, pixel);
            }
        }
    }

    overlay
}

impl LayerEffect for GridStyle {
    fn name(&self) -> &'static str {
        "grid"
    }

    /// Consumes [`GradientBand`]; without one there is nothing to draw.
    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let overlay = match ctx.get::<GradientBand>() {
            Some(band) => render_grid(SizePx::of(&ctx.canvas), &band.ramp, band.top, self),
            None => {
                debug!("no gradient band, skipping grid");
                return Ok(());
            }
        };
        composite_over(&mut ctx.canvas, &overlay, 0, 0);
        Ok(())
    }
}
