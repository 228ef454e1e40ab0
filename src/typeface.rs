//! Font loading and glyph rasterization.
//!
//! [`Typeface`] wraps an `ab_glyph` outline font. [`Typeface::load`] resolves
//! a face in order: the configured font file, then the system's bold
//! sans-serif face (discovered through `fontdb`), and finally the built-in
//! [`BlockFont`] so a render never aborts for lack of a font.

use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, FontVec, Glyph, PxScale, Rect, ScaleFont, point};
use image::Rgba;
use resvg::usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};
use crate::frame::Canvas;
use crate::layer::raster::alpha_blend;
use crate::layer::text::{FontProvider, TextMeasure, TextRenderer};

// ============================================================================
// Typeface
// ============================================================================

/// An outline font that can be instantiated at any pixel size.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl Typeface {
    /// Parses a TrueType/OpenType face from raw bytes.
    pub fn from_bytes(data: Vec<u8>, index: u32) -> RenderResult<Self> {
        let font = FontVec::try_from_vec_and_index(data, index)
            .map_err(|e| RenderError::font(format!("invalid font data: {e}")))?;
        Ok(Self {
            font: FontArc::new(font),
        })
    }

    /// Loads a face from a font file.
    pub fn from_file(path: &Path) -> RenderResult<Self> {
        let data = std::fs::read(path)
            .map_err(|e| RenderError::font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(data, 0)
    }

    /// Finds the system's bold sans-serif face, or any face at all.
    pub fn system_default() -> RenderResult<Self> {
        let mut db = Database::new();
        db.load_system_fonts();

        let families = [Family::SansSerif];
        let bold = Query {
            families: &families,
            weight: Weight::BOLD,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let regular = Query {
            weight: Weight::NORMAL,
            ..bold
        };

        let id = db
            .query(&bold)
            .or_else(|| db.query(&regular))
            .or_else(|| db.faces().next().map(|face| face.id))
            .ok_or_else(|| RenderError::font("no system fonts installed"))?;

        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| RenderError::font("system font data is unreadable"))?;
        debug!(faces = db.len(), "resolved system default font");
        Self::from_bytes(data, index)
    }

    /// Resolves a usable face, degrading from `path` to the system default
    /// and then to [`BlockFont`].
    pub fn load(path: Option<&Path>) -> Arc<dyn FontProvider> {
        if let Some(path) = path {
            match Self::from_file(path) {
                Ok(face) => return Arc::new(face),
                Err(e) => warn!(error = %e, "configured font unavailable, using system default"),
            }
        }
        match Self::system_default() {
            Ok(face) => Arc::new(face),
            Err(e) => {
                warn!(error = %e, "no system font, using built-in block font");
                Arc::new(BlockFont)
            }
        }
    }

    /// Instantiates this face at `px` pixels.
    pub fn at(&self, px: f32) -> ScaledTypeface {
        ScaledTypeface {
            font: self.font.clone(),
            scale: PxScale::from(px),
        }
    }
}

impl FontProvider for Typeface {
    fn sized(&self, px: f32) -> Box<dyn TextRenderer> {
        Box::new(self.at(px))
    }
}

// ============================================================================
// ScaledTypeface
// ============================================================================

/// A [`Typeface`] at a fixed pixel size.
#[derive(Clone)]
pub struct ScaledTypeface {
    font: FontArc,
    scale: PxScale,
}

impl ScaledTypeface {
    /// Lays out `text` on a single line with its baseline at `baseline_y`.
    fn layout(&self, text: &str, x: f32, baseline_y: f32) -> Vec<Glyph> {
        let scaled = self.font.as_scaled(self.scale);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut caret = x;
        let mut previous = None;

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(self.scale, point(caret, baseline_y)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        glyphs
    }

    /// Union of the pixel bounds of all outlined glyphs.
    fn ink_bounds(&self, text: &str) -> Option<Rect> {
        self.layout(text, 0.0, 0.0)
            .into_iter()
            .filter_map(|glyph| self.font.outline_glyph(glyph))
            .map(|outlined| outlined.px_bounds())
            .reduce(|a, b| Rect {
                min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
                max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
            })
    }
}

impl TextMeasure for ScaledTypeface {
    fn measure(&self, text: &str) -> u32 {
        self.ink_bounds(text)
            .map(|r| (r.max.x - r.min.x).max(0.0) as u32)
            .unwrap_or(0)
    }
}

impl TextRenderer for ScaledTypeface {
    fn line_height(&self) -> u32 {
        self.ink_bounds("Ay")
            .map(|r| (r.max.y - r.min.y).max(0.0) as u32)
            .unwrap_or_else(|| self.scale.y.ceil() as u32)
    }

    fn draw_line(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, rgba: [u8; 4]) {
        let ascent = self.font.as_scaled(self.scale).ascent();
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);

        for glyph in self.layout(text, x as f32, y as f32 + ascent) {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * rgba[3] as f32).round() as u8;
                if alpha == 0 {
                    return;
                }
                let dst = canvas.get_pixel_mut(px as u32, py as u32);
                *dst = alpha_blend(Rgba([rgba[0], rgba[1], rgba[2], alpha]), *dst);
            });
        }
    }
}

// ============================================================================
// BlockFont
// ============================================================================

/// Built-in face used when no outline font can be found.
///
/// Every non-whitespace character is drawn as a solid box. Advance is 60% of
/// the pixel size, boxes leave a sixth of the advance as a gap, and the line
/// height is 72% of the pixel size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFont;

impl FontProvider for BlockFont {
    fn sized(&self, px: f32) -> Box<dyn TextRenderer> {
        Box::new(BlockText::new(px))
    }
}

/// [`BlockFont`] at a fixed pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockText {
    advance: u32,
    glyph_width: u32,
    height: u32,
}

impl BlockText {
    pub fn new(px: f32) -> Self {
        let advance = (px * 3.0 / 5.0).ceil().max(1.0) as u32;
        let gap = (advance / 6).max(1).min(advance - 1);
        Self {
            advance,
            glyph_width: advance - gap,
            height: (px * 18.0 / 25.0).ceil().max(1.0) as u32,
        }
    }

    pub fn advance(&self) -> u32 {
        self.advance
    }

    /// Character indices that carry ink.
    fn inked(text: &str) -> impl Iterator<Item = u32> + '_ {
        text.chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| i as u32)
    }
}

impl TextMeasure for BlockText {
    fn measure(&self, text: &str) -> u32 {
        let mut inked = Self::inked(text);
        let Some(first) = inked.next() else {
            return 0;
        };
        let last = inked.last().unwrap_or(first);
        (last - first) * self.advance + self.glyph_width
    }
}

impl TextRenderer for BlockText {
    fn line_height(&self) -> u32 {
        self.height
    }

    fn draw_line(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, rgba: [u8; 4]) {
        let (width, height) = (canvas.width() as i64, canvas.height() as i64);
        for index in Self::inked(text) {
            let left = x as i64 + (index * self.advance) as i64;
            for py in (y as i64).max(0)..(y as i64 + self.height as i64).min(height) {
                for px in left.max(0)..(left + self.glyph_width as i64).min(width) {
                    let dst = canvas.get_pixel_mut(px as u32, py as u32);
                    *dst = alpha_blend(Rgba(rgba), *dst);
                }
            }
        }
    }
}
