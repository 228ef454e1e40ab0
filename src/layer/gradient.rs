//! Vertical two-colour gradient ramps.
//!
//! Row `i` of an `h`-row gradient uses `t = i / h` (or `1 - i / h` when
//! reversed). Each colour channel is `start + (end - start) * t` and alpha is
//! `255 * t`, all truncated toward zero. Every pixel in a row is identical.

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use super::{GradientBand, LayerEffect, RenderContext};
use crate::error::RenderResult;
use crate::frame::{Color, RgbaLayer, rgb};
use crate::layer::raster::composite_over;

// ============================================================================
// GradientPath
// ============================================================================

/// Strategy used to fill a gradient buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientPath {
    /// Computes each row's pixel once and copies it across the row slice.
    Fast,
    /// Computes and writes every pixel individually.
    Reference,
}

// ============================================================================
// GradientEngine
// ============================================================================

/// Generates gradient layers with a strategy picked once at construction.
#[derive(Debug, Clone, Copy)]
pub struct GradientEngine {
    path: GradientPath,
}

impl Default for GradientEngine {
    fn default() -> Self {
        Self::detect()
    }
}

impl GradientEngine {
    /// Creates an engine that always uses `path`.
    pub fn with_path(path: GradientPath) -> Self {
        Self { path }
    }

    /// Probes the fast path against the reference path on a small sample and
    /// keeps it only if both produce the same bytes.
    pub fn detect() -> Self {
        let start = rgb(70, 84, 154);
        let end = rgb(42, 48, 80);
        let agrees = [false, true].into_iter().all(|reverse| {
            let fast = fill(GradientPath::Fast, 5, 67, start, end, reverse);
            let reference = fill(GradientPath::Reference, 5, 67, start, end, reverse);
            fast.is_some() && fast == reference
        });

        if agrees {
            debug!("gradient engine: fast path selected");
            Self::with_path(GradientPath::Fast)
        } else {
            warn!("gradient engine: fast path disagrees with reference, falling back");
            Self::with_path(GradientPath::Reference)
        }
    }

    /// Returns the strategy this engine uses.
    pub fn path(&self) -> GradientPath {
        self.path
    }

    /// Generates a `width x height` gradient from `start` to `end`.
    ///
    /// This never fails: if the fast path cannot allocate or fill the buffer
    /// the reference path is used instead, which produces identical output.
    pub fn generate(
        &self,
        width: u32,
        height: u32,
        start: Color,
        end: Color,
        reverse: bool,
    ) -> RgbaLayer {
        if self.path == GradientPath::Fast {
            if let Some(layer) = fill(GradientPath::Fast, width, height, start, end, reverse) {
                return layer;
            }
            debug!(width, height, "gradient fast path unavailable for this size");
        }
        reference_fill(width, height, start, end, reverse)
    }
}

/// The colour and alpha of gradient row `row`.
pub fn row_pixel(row: u32, height: u32, start: Color, end: Color, reverse: bool) -> Rgba<u8> {
    let ratio = row as f64 / height as f64;
    let t = if reverse { 1.0 - ratio } else { ratio };
    let lerp = |s: u8, e: u8| -> u8 { (s as f64 + (e as f64 - s as f64) * t) as u8 };
    Rgba([
        lerp(start.red, end.red),
        lerp(start.green, end.green),
        lerp(start.blue, end.blue),
        (255.0 * t) as u8,
    ])
}

fn fill(
    path: GradientPath,
    width: u32,
    height: u32,
    start: Color,
    end: Color,
    reverse: bool,
) -> Option<RgbaLayer> {
    match path {
        GradientPath::Fast => fast_fill(width, height, start, end, reverse),
        GradientPath::Reference => Some(reference_fill(width, height, start, end, reverse)),
    }
}

fn fast_fill(width: u32, height: u32, start: Color, end: Color, reverse: bool) -> Option<RgbaLayer> {
    let row_len = (width as usize).checked_mul(4)?;
    let total = row_len.checked_mul(height as usize)?;
    let mut buf = vec![0u8; total];

    if row_len > 0 {
        for (row, bytes) in buf.chunks_exact_mut(row_len).enumerate() {
            let pixel = row_pixel(row as u32, height, start, end, reverse).0;
            for px in bytes.chunks_exact_mut(4) {
                px.copy_from_slice(&pixel);
            }
        }
    }

    RgbaImage::from_raw(width, height, buf)
}

fn reference_fill(width: u32, height: u32, start: Color, end: Color, reverse: bool) -> RgbaLayer {
    let mut layer = RgbaImage::new(width, height);
    for y in 0..height {
        let pixel = row_pixel(y, height, start, end, reverse);
        for x in 0..width {
            layer.put_pixel(x, y, pixel);
        }
    }
    layer
}

// ============================================================================
// BottomGradient
// ============================================================================

/// Paints a gradient over the bottom `height_ratio` of the canvas and
/// publishes it as a [`GradientBand`].
#[derive(Debug, Clone, Copy)]
pub struct BottomGradient {
    pub engine: GradientEngine,
    pub height_ratio: f64,
    pub start: Color,
    pub end: Color,
}

impl BottomGradient {
    /// Height of the band on a canvas `canvas_height` rows tall.
    pub fn band_height(&self, canvas_height: u32) -> u32 {
        let ratio = self.height_ratio.clamp(0.0, 1.0);
        ((f64::from(canvas_height) * ratio) as u32).min(canvas_height)
    }
}

impl LayerEffect for BottomGradient {
    fn name(&self) -> &'static str {
        "bottom-gradient"
    }

    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let (width, height) = ctx.canvas.dimensions();
        let band = self.band_height(height);
        let layer = self.engine.generate(width, band, self.start, self.end, false);
        composite_over(&mut ctx.canvas, &layer, 0, (height - band) as i32);
        Ok(())
    }

    fn emit(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let height = ctx.canvas.height();
        let band = self.band_height(height);
        ctx.set(GradientBand {
            top: height - band,
            ramp: self.engine.generate(1, band, self.start, self.end, false),
        });
        Ok(())
    }
}
