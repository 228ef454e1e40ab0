//! Caption panel: layout, blurred tinted card, stroke outline and byline.
//!
//! The caption is wrapped and drawn onto a transparent layer in the panel's
//! own coordinate space ([`CaptionStage`]). [`PanelStage`] then cuts the
//! canvas region under the panel, blurs and tints it, lays the glyphs on top
//! and pastes the result back. [`StrokeStage`] outlines the card and draws
//! the optional byline below it.

use image::{RgbaImage, imageops};
use tracing::debug;

use super::{CaptionLayout, LayerEffect, PanelPlacement, RenderContext};
use crate::error::RenderResult;
use crate::frame::{Canvas, RectPx, RgbaLayer, SizePx};
use crate::layer::raster::{apply_mask, composite_over, solid, solid_mask};
use crate::layer::text::{TextRenderer, wrap};

/// Caption and byline ink colour.
const TEXT_RGBA: [u8; 4] = [255, 255, 255, 255];

// ============================================================================
// Styles
// ============================================================================

/// Look of the caption card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelStyle {
    /// Inner padding between the card edge and the text, in pixels.
    pub padding: u32,
    /// Gaussian blur sigma applied to the photo under the card.
    pub blur_sigma: f32,
    /// Flat colour laid over the blurred photo.
    pub tint: [u8; 4],
    /// Outline colour.
    pub stroke: [u8; 4],
    /// Outline width, growing inward from the card edge.
    pub stroke_width: u32,
    /// Gap between the card's bottom edge and the byline.
    pub byline_gap: u32,
    /// Extra clearance below the byline when positioning the card.
    pub byline_inset: u32,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            padding: 64,
            blur_sigma: 20.0,
            tint: [161, 161, 170, 102],
            stroke: [255, 255, 255, 102],
            stroke_width: 1,
            byline_gap: 96,
            byline_inset: 32,
        }
    }
}

/// A single line of text drawn under the card, led by a small copy of the logo.
#[derive(Debug, Clone, PartialEq)]
pub struct BylineStyle {
    pub text: String,
    pub font_size: f32,
    /// Distance from the canvas bottom to the bottom of the byline.
    pub bottom_margin: u32,
    /// Side of the square logo copy.
    pub icon_size: u32,
    /// Space between the logo copy and the text.
    pub icon_gap: u32,
}

impl BylineStyle {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 48.0,
            bottom_margin: 48,
            icon_size: 60,
            icon_gap: 16,
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Inputs that determine where the card sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelGeometry {
    /// Left/right distance from the canvas edge to the card.
    pub text_margin: u32,
    pub padding: u32,
    pub line_height: u32,
    pub line_spacing: u32,
    /// Space reserved under the card for a byline
    /// (`byline height + gap + inset`), if there is one.
    pub byline_clearance: Option<u32>,
}

impl PanelGeometry {
    /// Width available to caption text on a canvas `canvas_width` wide.
    pub fn text_width(&self, canvas_width: u32) -> u32 {
        canvas_width
            .saturating_sub(self.text_margin.saturating_mul(2))
            .saturating_sub(self.padding.saturating_mul(2))
    }

    /// Card rectangle for `line_count` lines, clamped to the canvas.
    ///
    /// Height is `2 * padding + n * line_height + (n - 1) * line_spacing`.
    /// The card's bottom edge sits `byline_clearance` above the canvas bottom
    /// when a byline is present, `text_margin` above it otherwise.
    pub fn rect(&self, canvas: SizePx, line_count: usize) -> RectPx {
        let lines = line_count as u32;
        let height = self
            .padding
            .saturating_mul(2)
            .saturating_add(lines.saturating_mul(self.line_height))
            .saturating_add(lines.saturating_sub(1).saturating_mul(self.line_spacing));
        let width = canvas.width.saturating_sub(self.text_margin.saturating_mul(2));
        let clearance = self.byline_clearance.unwrap_or(self.text_margin);
        let y = canvas.height.saturating_sub(height.saturating_add(clearance));
        RectPx::new(self.text_margin.min(canvas.width), y, width, height).clamp_to(canvas)
    }
}

// ============================================================================
// Panel construction
// ============================================================================

/// Builds the card for `rect`: blurred canvas region, tinted, fully opaque.
///
/// The rectangle is clamped to the canvas first.
pub fn build_panel(
    canvas: &Canvas,
    rect: RectPx,
    blur_sigma: f32,
    tint: [u8; 4],
) -> RenderResult<RgbaLayer> {
    let rect = rect.clamp_to(SizePx::of(canvas));
    let (width, height) = (rect.width, rect.height);
    if width == 0 || height == 0 {
        return Ok(RgbaImage::new(width, height));
    }

    let region = imageops::crop_imm(canvas, rect.x, rect.y, width, height).to_image();
    let mut panel = if blur_sigma > 0.0 {
        imageops::fast_blur(&region, blur_sigma)
    } else {
        region
    };
    composite_over(&mut panel, &solid(width, height, tint), 0, 0);
    apply_mask(&mut panel, &solid_mask(width, height, 255))?;
    Ok(panel)
}

/// A canvas-sized overlay holding only the outline of `rect`.
pub fn stroke_outline(canvas: SizePx, rect: RectPx, rgba: [u8; 4], width: u32) -> RgbaLayer {
    let mut layer = RgbaImage::new(canvas.width, canvas.height);
    let rect = rect.clamp_to(canvas);
    if width == 0 || rect.width == 0 || rect.height == 0 {
        return layer;
    }

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let inset = (x - rect.x)
                .min(rect.right() - 1 - x)
                .min(y - rect.y)
                .min(rect.bottom() - 1 - y);
            if inset < width {
                layer.put_pixel(x, y, image::Rgba(rgba));
            }
        }
    }
    layer
}

// ============================================================================
// CaptionStage
// ============================================================================

/// Wraps the caption and draws it in panel coordinates.
pub struct CaptionStage<'a> {
    pub text: &'a str,
    pub font: &'a dyn TextRenderer,
    pub geometry: PanelGeometry,
    pub max_lines: Option<usize>,
}

impl LayerEffect for CaptionStage<'_> {
    fn name(&self) -> &'static str {
        "caption"
    }

    /// Glyphs go onto the panel, not the photo; nothing is painted here.
    fn transform(&self, _ctx: &mut RenderContext) -> RenderResult<()> {
        Ok(())
    }

    fn emit(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let canvas = SizePx::of(&ctx.canvas);
        let geometry = self.geometry;
        let lines = wrap(self.font, self.text, geometry.text_width(canvas.width), self.max_lines);
        let rect = geometry.rect(canvas, lines.len());

        let mut glyphs = RgbaImage::new(rect.width, rect.height);
        let step = geometry.line_height + geometry.line_spacing;
        for (i, line) in lines.lines().iter().enumerate() {
            let y = geometry.padding + i as u32 * step;
            self.font
                .draw_line(&mut glyphs, geometry.padding as i32, y as i32, line, TEXT_RGBA);
        }

        debug!(
            lines = lines.len(),
            truncated = lines.is_truncated(),
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "caption laid out"
        );
        ctx.set(CaptionLayout {
            lines,
            line_height: geometry.line_height,
            line_spacing: geometry.line_spacing,
            rect,
            glyphs,
        });
        Ok(())
    }
}

// ============================================================================
// PanelStage
// ============================================================================

/// Builds the card under the caption layout and pastes it with its glyphs.
pub struct PanelStage {
    pub style: PanelStyle,
}

impl LayerEffect for PanelStage {
    fn name(&self) -> &'static str {
        "panel"
    }

    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        let (rect, panel) = match ctx.get::<CaptionLayout>() {
            Some(layout) => {
                let mut panel =
                    build_panel(&ctx.canvas, layout.rect, self.style.blur_sigma, self.style.tint)?;
                composite_over(&mut panel, &layout.glyphs, 0, 0);
                (layout.rect, panel)
            }
            None => {
                debug!("no caption layout, skipping panel");
                return Ok(());
            }
        };
        composite_over(&mut ctx.canvas, &panel, rect.x as i32, rect.y as i32);
        Ok(())
    }

    fn emit(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        if let Some(rect) = ctx.get::<CaptionLayout>().map(|layout| layout.rect) {
            ctx.set(PanelPlacement { rect });
        }
        Ok(())
    }
}

// ============================================================================
// StrokeStage
// ============================================================================

/// A byline ready to be drawn: resolved font, text and logo copy.
pub struct Byline<'a> {
    pub text: &'a str,
    pub font: &'a dyn TextRenderer,
    /// Logo copy already resized to `icon_size`.
    pub icon: Option<&'a RgbaLayer>,
    /// Left edge of the line.
    pub x: u32,
    pub style: &'a BylineStyle,
}

impl Byline<'_> {
    pub fn height(&self) -> u32 {
        self.font.line_height()
    }

    /// Draws the logo copy and the text with the line's bottom edge
    /// `bottom_margin` above the canvas bottom. The logo copy is centred
    /// vertically on the line.
    pub fn draw(&self, canvas: &mut Canvas) {
        let line_height = self.height() as i32;
        let y = canvas.height() as i32 - line_height - self.style.bottom_margin as i32;
        let mut text_x = self.x as i32;

        if let Some(icon) = self.icon {
            let icon_y = y + (line_height - icon.height() as i32).div_euclid(2);
            composite_over(canvas, icon, text_x, icon_y);
            text_x += (self.style.icon_size + self.style.icon_gap) as i32;
        }
        self.font.draw_line(canvas, text_x, y, self.text, TEXT_RGBA);
    }
}

/// Outlines the pasted card, then draws the byline if there is one.
pub struct StrokeStage<'a> {
    pub style: PanelStyle,
    pub byline: Option<Byline<'a>>,
}

impl LayerEffect for StrokeStage<'_> {
    fn name(&self) -> &'static str {
        "stroke"
    }

    fn transform(&self, ctx: &mut RenderContext) -> RenderResult<()> {
        if let Some(placement) = ctx.get::<PanelPlacement>().copied() {
            let outline = stroke_outline(
                SizePx::of(&ctx.canvas),
                placement.rect,
                self.style.stroke,
                self.style.stroke_width,
            );
            composite_over(&mut ctx.canvas, &outline, 0, 0);
        }
        if let Some(byline) = &self.byline {
            byline.draw(&mut ctx.canvas);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::apply;
    use crate::typeface::BlockText;
    use image::Rgba;

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const TINTED_BLACK: [u8; 4] = [64, 64, 68, 255];

    fn geometry() -> PanelGeometry {
        PanelGeometry {
            text_margin: 20,
            padding: 10,
            line_height: 15,
            line_spacing: 3,
            byline_clearance: None,
        }
    }

    #[test]
    fn geometry_follows_line_count() {
        let g = PanelGeometry {
            text_margin: 100,
            ..geometry()
        };
        let canvas = SizePx::new(1000, 1000);
        assert_eq!(g.text_width(1000), 780);
        assert_eq!(g.rect(canvas, 2), RectPx::new(100, 847, 800, 53));
        assert_eq!(g.rect(canvas, 1), RectPx::new(100, 865, 800, 35));

        let with_byline = PanelGeometry {
            byline_clearance: Some(15 + 96 + 32),
            ..g
        };
        assert_eq!(with_byline.rect(canvas, 2).y, 804);
    }

    #[test]
    fn geometry_clamps_to_small_canvases() {
        let rect = geometry().rect(SizePx::new(30, 30), 10);
        assert_eq!(rect.y, 0);
        assert!(rect.bottom() <= 30);
        assert!(rect.right() <= 30);
        assert_eq!(geometry().text_width(30), 0);
    }

    #[test]
    fn huge_geometry_saturates() {
        let g = PanelGeometry {
            text_margin: 3_000_000_000,
            padding: 3_000_000_000,
            byline_clearance: Some(u32::MAX),
            ..geometry()
        };
        assert_eq!(g.text_width(2160), 0);
        let rect = g.rect(SizePx::new(2160, 2160), 40);
        assert_eq!(rect.y, 0);
        assert!(rect.right() <= 2160);
        assert!(rect.bottom() <= 2160);
    }

    #[test]
    fn panel_is_tinted_and_opaque() {
        let canvas = solid(50, 50, BLACK);
        let panel = build_panel(&canvas, RectPx::new(10, 10, 20, 10), 20.0, [161, 161, 170, 102])
            .unwrap();
        assert_eq!(panel.dimensions(), (20, 10));
        assert!(panel.pixels().all(|p| p.0 == TINTED_BLACK));
    }

    #[test]
    fn panel_blurs_the_region_under_it() {
        let mut canvas = solid(40, 40, BLACK);
        for y in 0..40 {
            for x in 20..40 {
                canvas.put_pixel(x, y, Rgba(WHITE));
            }
        }
        let panel = build_panel(&canvas, RectPx::new(0, 0, 40, 40), 4.0, [0, 0, 0, 0]).unwrap();
        let edge = panel.get_pixel(19, 20)[0];
        assert!(edge > 0 && edge < 255, "edge pixel {edge} was not blurred");
        assert!(panel.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn empty_panel_rect_is_not_an_error() {
        let canvas = solid(10, 10, BLACK);
        let panel = build_panel(&canvas, RectPx::new(20, 20, 5, 5), 20.0, WHITE).unwrap();
        assert_eq!(panel.dimensions(), (0, 0));
    }

    #[test]
    fn outline_is_drawn_inward() {
        let layer = stroke_outline(SizePx::new(10, 10), RectPx::new(2, 2, 5, 4), WHITE, 1);
        assert_eq!(layer.get_pixel(2, 2).0, WHITE);
        assert_eq!(layer.get_pixel(6, 5).0, WHITE);
        assert_eq!(layer.get_pixel(4, 2).0, WHITE);
        assert_eq!(layer.get_pixel(3, 3)[3], 0);
        assert_eq!(layer.get_pixel(7, 2)[3], 0);
        assert_eq!(layer.get_pixel(2, 6)[3], 0);
    }

    #[test]
    fn caption_is_drawn_onto_the_panel() {
        let font = BlockText::new(20.0);
        let mut ctx = RenderContext::new(solid(200, 200, BLACK));

        apply(
            &CaptionStage {
                text: "ab cd",
                font: &font,
                geometry: geometry(),
                max_lines: None,
            },
            &mut ctx,
        )
        .unwrap();
        {
            let layout = ctx.get::<CaptionLayout>().unwrap();
            assert_eq!(layout.lines.lines(), ["ab cd"]);
            assert_eq!(layout.rect, RectPx::new(20, 145, 160, 35));
            // captions never touch the photo directly
            assert!(ctx.canvas.pixels().all(|p| p.0 == BLACK));
        }

        let style = PanelStyle {
            blur_sigma: 0.0,
            ..PanelStyle::default()
        };
        apply(&PanelStage { style }, &mut ctx).unwrap();
        assert_eq!(
            ctx.get::<PanelPlacement>().unwrap().rect,
            RectPx::new(20, 145, 160, 35)
        );
        // first glyph box starts at the padding
        assert_eq!(ctx.canvas.get_pixel(30, 155).0, WHITE);
        assert_eq!(ctx.canvas.get_pixel(25, 147).0, TINTED_BLACK);
        assert_eq!(ctx.canvas.get_pixel(5, 5).0, BLACK);

        apply(&StrokeStage { style, byline: None }, &mut ctx).unwrap();
        let corner = ctx.canvas.get_pixel(20, 145).0;
        assert!(corner[0] > TINTED_BLACK[0], "stroke missing: {corner:?}");
        assert_eq!(ctx.canvas.get_pixel(25, 147).0, TINTED_BLACK);
    }

    #[test]
    fn byline_sits_above_the_bottom_margin() {
        let font = BlockText::new(20.0);
        let style = BylineStyle {
            bottom_margin: 10,
            icon_size: 6,
            icon_gap: 4,
            ..BylineStyle::new("a")
        };
        let icon = solid(6, 6, [255, 0, 0, 255]);
        let byline = Byline {
            text: &style.text,
            font: &font,
            icon: Some(&icon),
            x: 5,
            style: &style,
        };

        let mut canvas = solid(100, 100, BLACK);
        byline.draw(&mut canvas);

        // line spans rows 75..90; icon centred at 75 + (15 - 6) / 2 = 79
        assert_eq!(canvas.get_pixel(5, 79).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(5, 78).0, BLACK);
        assert_eq!(canvas.get_pixel(15, 75).0, WHITE);
        assert_eq!(canvas.get_pixel(15, 89).0, WHITE);
        assert_eq!(canvas.get_pixel(15, 90).0, BLACK);
    }
}
