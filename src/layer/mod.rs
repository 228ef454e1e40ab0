//! Compositing layers for promotional frames.
//!
//! Every paint step of a frame is a [`LayerEffect`]. The composer threads a
//! single [`RenderContext`] through the effects in a fixed order; each effect
//! paints onto `ctx.canvas` in [`transform`](LayerEffect::transform) and may
//! publish typed properties for later effects in [`emit`](LayerEffect::emit).
//!
//! # Property flow
//!
//! ```text
//! BottomGradient ──► GradientBand ──► GridStyle
//! CaptionStage   ──► CaptionLayout ─► PanelStage ──► PanelPlacement ──► StrokeStage
//! ```
//!
//! Effects never hold references to each other, they only agree on the
//! property types defined here.

pub mod accent;
pub mod gradient;
pub mod grid;
pub mod panel;
pub mod raster;
pub mod text;

pub use accent::{AccentStage, LogoStage, build_triangle};
pub use gradient::{BottomGradient, GradientEngine, GradientPath};
pub use grid::{GridStyle, render_grid};
pub use panel::{
    Byline, BylineStyle, CaptionStage, PanelGeometry, PanelStage, PanelStyle, StrokeStage,
    build_panel, stroke_outline,
};
pub use text::{ELLIPSIS, FontProvider, TextMeasure, TextRenderer, WrappedText, wrap};

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::trace;

use crate::error::RenderResult;
use crate::frame::{Canvas, RectPx, RgbaLayer};

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the compositing pipeline.
///
/// Effects read properties set by earlier effects and emit new ones for
/// later effects.
///
/// # Example
///
/// ```ignore
/// // the gradient effect publishes its band
/// ctx.set(GradientBand { top, ramp });
///
/// // the grid reads it back
/// if let Some(band) = ctx.get::<GradientBand>() {
///     // ...
/// }
/// ```
pub struct RenderContext {
    /// The frame being painted. Owned by the context for the whole render.
    pub canvas: Canvas,

    /// Typed property bag for inter-layer communication.
    properties: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RenderContext {
    /// Creates a context around an already cropped canvas.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            properties: HashMap::new(),
        }
    }

    /// Sets a typed property that later effects can read.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.properties.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed property set by an earlier effect.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.properties
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    /// Checks if a property has been set.
    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.properties.contains_key(&TypeId::of::<T>())
    }

    /// Consumes the context and returns the painted canvas.
    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

// ============================================================================
// Common Properties
// ============================================================================

/// The bottom gradient band, emitted by [`BottomGradient`].
#[derive(Debug, Clone)]
pub struct GradientBand {
    /// First canvas row covered by the gradient.
    pub top: u32,
    /// One-pixel-wide copy of the gradient, one row per band row.
    pub ramp: RgbaLayer,
}

/// Wrapped caption and its metrics, emitted by [`CaptionStage`].
#[derive(Debug, Clone)]
pub struct CaptionLayout {
    pub lines: WrappedText,
    pub line_height: u32,
    pub line_spacing: u32,
    /// Panel rectangle in canvas coordinates.
    pub rect: RectPx,
    /// Caption glyphs already drawn in the panel's own coordinate space.
    pub glyphs: RgbaLayer,
}

/// Where the caption panel was pasted, emitted by [`PanelStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelPlacement {
    pub rect: RectPx,
}

/// A finished layer together with its canvas offset.
///
/// Offsets are signed because layers may overhang the top or left edge.
#[derive(Debug, Clone)]
pub struct PlacedLayer {
    pub layer: RgbaLayer,
    pub x: i32,
    pub y: i32,
}

impl PlacedLayer {
    pub fn composite_onto(&self, canvas: &mut Canvas) {
        raster::composite_over(canvas, &self.layer, self.x, self.y);
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// A self-contained paint step.
///
/// The separation of [`transform`](Self::transform) and [`emit`](Self::emit)
/// gives property emission a canonical place and keeps the data flow
/// explicit.
pub trait LayerEffect: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Paints onto `ctx.canvas`, reading whatever properties it needs.
    ///
    /// Property emission happens in [`emit`](Self::emit), not here.
    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()>;

    /// Publishes properties for later effects. Called after
    /// [`transform`](Self::transform); the default emits nothing.
    fn emit(&self, _ctx: &mut RenderContext) -> RenderResult<()> {
        Ok(())
    }
}

/// Applies one effect: transform, then emit.
pub fn apply<E: LayerEffect + ?Sized>(effect: &E, ctx: &mut RenderContext) -> RenderResult<()> {
    trace!(layer = effect.name(), "applying layer");
    effect.transform(ctx)?;
    effect.emit(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::raster::solid;

    struct Fill([u8; 4]);

    impl LayerEffect for Fill {
        fn name(&self) -> &'static str {
            "fill"
        }

        fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
            let (w, h) = ctx.canvas.dimensions();
            raster::composite_over(&mut ctx.canvas, &solid(w, h, self.0), 0, 0);
            Ok(())
        }

        fn emit(&self, ctx: &mut RenderContext) -> RenderResult<()> {
            ctx.set(PanelPlacement {
                rect: RectPx::from_size(1, 1),
            });
            Ok(())
        }
    }

    #[test]
    fn properties_are_typed() {
        let mut ctx = RenderContext::new(Canvas::new(2, 2));
        assert!(!ctx.has::<PanelPlacement>());

        ctx.set(PanelPlacement {
            rect: RectPx::new(1, 2, 3, 4),
        });
        assert!(ctx.has::<PanelPlacement>());
        assert!(!ctx.has::<GradientBand>());
        assert_eq!(ctx.get::<PanelPlacement>().unwrap().rect, RectPx::new(1, 2, 3, 4));

        // setting again replaces
        ctx.set(PanelPlacement {
            rect: RectPx::from_size(9, 9),
        });
        assert_eq!(ctx.get::<PanelPlacement>().unwrap().rect.width, 9);
    }

    #[test]
    fn apply_runs_transform_then_emit() {
        let mut ctx = RenderContext::new(Canvas::new(3, 3));
        apply(&Fill([10, 20, 30, 255]), &mut ctx).unwrap();

        assert!(ctx.has::<PanelPlacement>());
        let canvas = ctx.into_canvas();
        assert!(canvas.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn placed_layer_honours_offset() {
        let mut canvas = solid(4, 4, [0, 0, 0, 255]);
        PlacedLayer {
            layer: solid(2, 2, [255, 255, 255, 255]),
            x: 3,
            y: -1,
        }
        .composite_onto(&mut canvas);

        assert_eq!(canvas.get_pixel(3, 0).0, [255, 255, 255, 255]);
        assert_eq!(canvas.get_pixel(3, 1).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(2, 0).0, [0, 0, 0, 255]);
    }
}
