//! Top-right corner decorations: the triangular gradient accent and the logo.

use image::RgbaImage;
use tracing::debug;

use super::{LayerEffect, PlacedLayer, RenderContext};
use crate::error::RenderResult;
use crate::frame::{Color, RgbaLayer, SizePx};
use crate::layer::gradient::{GradientEngine, row_pixel};
use crate::layer::raster::{apply_mask, polygon_mask};

/// Builds the `size x size` accent flush with the top-right corner.
///
/// A vertical gradient from `start` to `end` is masked by the triangle
/// (size, 0), (size, size), (0, 0): the half of the square above its
/// top-left to bottom-right diagonal. The mask replaces the gradient's own
/// alpha, so the accent is opaque inside the triangle.
///
/// Only the part of the square inside the canvas is built; an accent larger
/// than the canvas keeps its geometry and colours but is cut to the visible
/// corner.
pub fn build_triangle(
    engine: &GradientEngine,
    canvas: SizePx,
    size: u32,
    start: Color,
    end: Color,
) -> RenderResult<PlacedLayer> {
    let width = size.min(canvas.width);
    let height = size.min(canvas.height);
    let mut layer = if width == size && height == size {
        engine.generate(size, size, start, end, false)
    } else {
        debug!(size, width, height, "accent larger than the canvas, clipping");
        RgbaImage::from_fn(width, height, |_, y| row_pixel(y, size, start, end, false))
    };

    // square column of the layer's left edge
    let left = (size - width) as f32;
    let s = size as f32;
    let mask = polygon_mask(width, height, &[(s - left, 0.0), (s - left, s), (-left, 0.0)]);
    apply_mask(&mut layer, &mask)?;

    Ok(PlacedLayer {
        layer,
        x: (canvas.width - width) as i32,
        y: 0,
    })
}

/// Paints the triangle accent.
#[derive(Debug, Clone, Copy)]
pub struct AccentStage {
    pub engine: GradientEngine,
    pub size: u32,
    pub start: Color,
    pub end: Color,
}

impl LayerEffect for AccentStage {
    fn name(&self) -> &'static str {
        "accent"
    }

    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        if self.size == 0 {
            return Ok(());
        }
        let canvas = SizePx::of(&ctx.canvas);
        build_triangle(&self.engine, canvas, self.size, self.start, self.end)?
            .composite_onto(&mut ctx.canvas);
        Ok(())
    }
}

/// Places the logo `margin` pixels from the top and right edges.
pub struct LogoStage<'a> {
    /// Logo already at its final size.
    pub logo: &'a RgbaLayer,
    pub margin: u32,
}

impl LogoStage<'_> {
    /// Top-left corner of the logo on a canvas `canvas_width` wide.
    pub fn origin(&self, canvas_width: u32) -> (i32, i32) {
        let x = canvas_width as i32 - self.logo.width() as i32 - self.margin as i32;
        (x, self.margin as i32)
    }
}

impl LayerEffect for LogoStage<'_> {
    fn name(&self) -> &'static str {
        "logo"
    }

    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let (x, y) = self.origin(ctx.canvas.width());
        if x < 0 {
            debug!(x, "logo wider than the canvas, clipping on the left");
        }
        PlacedLayer {
            layer: self.logo.clone(),
            x,
            y,
        }
        .composite_onto(&mut ctx.canvas);
        Ok(())
    }
}
