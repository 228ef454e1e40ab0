//! Frame composition engine.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, trace};

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult, validate_caption};
use crate::fit::cover_fit;
use crate::frame::{RgbaLayer, SizePx};
use crate::layer::raster::{looks_like_svg, render_svg};
use crate::layer::{
    self, AccentStage, BottomGradient, Byline, CaptionStage, FontProvider, GradientEngine,
    LayerEffect, LogoStage, PanelGeometry, PanelStage, RenderContext, StrokeStage,
};
use crate::typeface::Typeface;

// ============================================================================
// Stage
// ============================================================================

/// The steps of a render, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResizeCrop,
    GradientApply,
    GridApply,
    TextLayoutAndDraw,
    PanelBuildAndPaste,
    StrokeOverlay,
    TriangleApply,
    LogoPlace,
    FlattenEmit,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::ResizeCrop,
        Stage::GradientApply,
        Stage::GridApply,
        Stage::TextLayoutAndDraw,
        Stage::PanelBuildAndPaste,
        Stage::StrokeOverlay,
        Stage::TriangleApply,
        Stage::LogoPlace,
        Stage::FlattenEmit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResizeCrop => "resize-crop",
            Stage::GradientApply => "gradient",
            Stage::GridApply => "grid",
            Stage::TextLayoutAndDraw => "text-layout",
            Stage::PanelBuildAndPaste => "panel",
            Stage::StrokeOverlay => "stroke",
            Stage::TriangleApply => "triangle",
            Stage::LogoPlace => "logo",
            Stage::FlattenEmit => "flatten",
        }
    }
}

// ============================================================================
// FrameComposer
// ============================================================================

/// Renders promotional frames.
///
/// `FrameComposer` holds only immutable state (the gradient strategy picked
/// at construction and a font provider), so one instance can render many
/// variants concurrently.
///
/// # Paint order
///
/// 1. **Resize & crop** the photo to the target (cover-fit)
/// 2. **Bottom gradient** over `gradient_height_ratio` of the height
/// 3. **Grid** inside the gradient band, fading with it
/// 4. **Caption layout**, glyphs drawn in panel space
/// 5. **Panel**: blurred, tinted card with the glyphs, pasted back
/// 6. **Stroke** around the card, then the optional byline
/// 7. **Triangle** accent in the top-right corner
/// 8. **Logo**, always on top
/// 9. **Flatten** to opaque RGB
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use image::{Rgba, RgbaImage};
/// use promo_renderer::{BlockFont, FrameComposer, RenderConfig, TargetSize};
///
/// let composer = FrameComposer::new(Arc::new(BlockFont));
/// let photo = RgbaImage::from_pixel(640, 480, Rgba([90, 120, 160, 255]));
/// let logo = RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]));
///
/// let config = RenderConfig {
///     target: TargetSize::Square(1080),
///     ..RenderConfig::square()
/// };
/// let frame = composer.render(&photo, &logo, "Hello", &config).unwrap();
/// assert_eq!(frame.dimensions(), (1080, 1080));
/// ```
pub struct FrameComposer {
    engine: GradientEngine,
    fonts: Arc<dyn FontProvider>,
}

impl FrameComposer {
    /// Creates a composer drawing text with `fonts`.
    pub fn new(fonts: Arc<dyn FontProvider>) -> Self {
        Self {
            engine: GradientEngine::detect(),
            fonts,
        }
    }

    /// Creates a composer with the system default font (or the built-in
    /// block font when the system has none).
    pub fn with_default_font() -> Self {
        Self::new(Typeface::load(None))
    }

    /// Overrides the gradient strategy chosen by the startup probe.
    pub fn with_engine(mut self, engine: GradientEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn engine(&self) -> GradientEngine {
        self.engine
    }

    /// Renders one variant.
    ///
    /// `base` and `logo` are decoded images; `caption` is validated (trimmed,
    /// 1 to 1000 characters). The result is fully opaque.
    #[tracing::instrument(level = "debug", skip_all, fields(target = ?config.target))]
    pub fn render(
        &self,
        base: &RgbaImage,
        logo: &RgbaImage,
        caption: &str,
        config: &RenderConfig,
    ) -> RenderResult<RgbImage> {
        let caption = validate_caption(caption)?;
        config.validate()?;

        let started = Instant::now();
        let canvas = cover_fit(base, &config.target)?;
        trace!(stage = Stage::ResizeCrop.as_str(), "stage done");

        let logo = fit_logo(logo, config.logo_size);
        let font = self.fonts.sized(config.font_size);
        let line_height = font.line_height();

        let byline_font = config.byline.as_ref().map(|b| self.fonts.sized(b.font_size));
        let icon = config.byline.as_ref().and_then(|b| {
            (b.icon_size > 0).then(|| {
                imageops::resize(&*logo, b.icon_size, b.icon_size, FilterType::Lanczos3)
            })
        });
        let byline = config.byline.as_ref().zip(byline_font.as_deref()).map(|(style, font)| {
            Byline {
                text: &style.text,
                font,
                icon: icon.as_ref(),
                x: config.margins.text,
                style,
            }
        });
        let byline_clearance = byline
            .as_ref()
            .map(|b| {
                b.height()
                    .saturating_add(config.panel.byline_gap)
                    .saturating_add(config.panel.byline_inset)
            });

        let gradient = BottomGradient {
            engine: self.engine,
            height_ratio: config.gradient_height_ratio,
            start: config.colors.bottom_start,
            end: config.colors.bottom_end,
        };
        let caption_stage = CaptionStage {
            text: &caption,
            font: &*font,
            geometry: PanelGeometry {
                text_margin: config.margins.text,
                padding: config.panel.padding,
                line_height,
                line_spacing: config.line_spacing(line_height),
                byline_clearance,
            },
            max_lines: config.max_lines,
        };
        let panel = PanelStage {
            style: config.panel,
        };
        let stroke = StrokeStage {
            style: config.panel,
            byline,
        };
        let accent = AccentStage {
            engine: self.engine,
            size: config.triangle_size,
            start: config.colors.triangle_start,
            end: config.colors.triangle_end,
        };
        let logo_stage = LogoStage {
            logo: &logo,
            margin: config.margins.logo,
        };

        let stages: [(Stage, &dyn LayerEffect); 7] = [
            (Stage::GradientApply, &gradient),
            (Stage::GridApply, &config.grid),
            (Stage::TextLayoutAndDraw, &caption_stage),
            (Stage::PanelBuildAndPaste, &panel),
            (Stage::StrokeOverlay, &stroke),
            (Stage::TriangleApply, &accent),
            (Stage::LogoPlace, &logo_stage),
        ];

        let mut ctx = RenderContext::new(canvas);
        for (stage, effect) in stages {
            layer::apply(effect, &mut ctx)?;
            trace!(stage = stage.as_str(), "stage done");
        }

        let frame = DynamicImage::ImageRgba8(ctx.into_canvas()).to_rgb8();
        debug!(
            width = frame.width(),
            height = frame.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "frame rendered"
        );
        Ok(frame)
    }
}

/// Resizes the logo to `size` unless it already has that size.
fn fit_logo(logo: &RgbaLayer, size: Option<SizePx>) -> Cow<'_, RgbaLayer> {
    match size {
        Some(size) if size != SizePx::of(logo) => Cow::Owned(imageops::resize(
            logo,
            size.width,
            size.height,
            FilterType::Lanczos3,
        )),
        _ => Cow::Borrowed(logo),
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a source photo from any format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> RenderResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RenderError::decode("source image", e))
}

/// Decodes a logo. SVG markup is rasterized at `size` (or its intrinsic size);
/// raster logos are decoded as-is and resized later by the composer.
pub fn decode_logo(bytes: &[u8], size: Option<SizePx>) -> RenderResult<RgbaImage> {
    if looks_like_svg(bytes) {
        let markup = std::str::from_utf8(bytes)
            .map_err(|e| RenderError::svg(format!("logo is not UTF-8: {e}")))?;
        return render_svg(markup, size);
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RenderError::decode("logo", e))
}

// ============================================================================
// Tests
// ============================================================================
