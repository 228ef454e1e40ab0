//! Per-variant render configuration and the named presets.
//!
//! A [`RenderConfig`] is built once per variant, usually from a [`Preset`],
//! and is only read during a render.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::frame::{Color, SizePx, rgb};
use crate::layer::{BylineStyle, GridStyle, PanelStyle};

/// Largest pixel length any configuration field may hold.
pub const MAX_EXTENT: u32 = 10_000;

// ============================================================================
// Target size
// ============================================================================

/// Which part of a scaled landscape source survives the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Center,
    #[default]
    Bottom,
}

impl Anchor {
    pub const ALL: [Anchor; 3] = [Anchor::Top, Anchor::Center, Anchor::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Top => "top",
            Anchor::Center => "center",
            Anchor::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Anchor::Top),
            "center" | "centre" => Ok(Anchor::Center),
            "bottom" => Ok(Anchor::Bottom),
            other => Err(RenderError::config(format!("unknown anchor {other:?}"))),
        }
    }
}

/// Output dimensions of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// A `side x side` frame, cropped around the centre.
    Square(u32),
    /// A `width x height` frame whose vertical crop follows `anchor`.
    Landscape { width: u32, height: u32, anchor: Anchor },
}

impl TargetSize {
    pub fn size(&self) -> SizePx {
        match *self {
            TargetSize::Square(side) => SizePx::new(side, side),
            TargetSize::Landscape { width, height, .. } => SizePx::new(width, height),
        }
    }

    /// The vertical anchor, for landscape targets only.
    pub fn anchor(&self) -> Option<Anchor> {
        match *self {
            TargetSize::Square(_) => None,
            TargetSize::Landscape { anchor, .. } => Some(anchor),
        }
    }
}

// ============================================================================
// RenderConfig
// ============================================================================

/// Distances from the canvas edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    /// Left/right margin of the caption card, and its bottom margin when
    /// there is no byline.
    pub text: u32,
    /// Top and right margin of the logo.
    pub logo: u32,
}

/// Colour pairs of the two gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientColors {
    pub bottom_start: Color,
    pub bottom_end: Color,
    pub triangle_start: Color,
    pub triangle_end: Color,
}

impl Default for GradientColors {
    fn default() -> Self {
        Self {
            bottom_start: rgb(70, 84, 154),
            bottom_end: rgb(42, 48, 80),
            triangle_start: rgb(42, 48, 80),
            triangle_end: rgb(70, 84, 154),
        }
    }
}

/// Everything that shapes one output variant.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub target: TargetSize,
    /// Fraction of the canvas height covered by the bottom gradient.
    pub gradient_height_ratio: f64,
    /// Side of the top-right accent triangle. Zero disables it.
    pub triangle_size: u32,
    pub grid: GridStyle,
    pub margins: Margins,
    /// Caption size in pixels.
    pub font_size: f32,
    /// Gap between caption lines as a fraction of the line height.
    pub line_spacing_ratio: f64,
    /// Line ceiling for the caption, `None` for unlimited.
    pub max_lines: Option<usize>,
    pub colors: GradientColors,
    /// Size the logo is resized to, `None` to keep it as decoded.
    pub logo_size: Option<SizePx>,
    pub panel: PanelStyle,
    pub byline: Option<BylineStyle>,
}

impl RenderConfig {
    /// The configuration of a named preset.
    pub fn preset(preset: Preset) -> Self {
        match preset.anchor() {
            None => Self::square(),
            Some(anchor) => Self::landscape(anchor),
        }
    }

    /// 2160 x 2160 social-media square.
    pub fn square() -> Self {
        Self {
            target: TargetSize::Square(2160),
            gradient_height_ratio: 0.4,
            triangle_size: 600,
            grid: GridStyle {
                square_size: 295,
                line_thickness: 4,
                opacity_ratio: 0.3,
                vertical_offset: 75,
            },
            margins: Margins { text: 96, logo: 71 },
            font_size: 120.0,
            line_spacing_ratio: 0.2,
            max_lines: None,
            colors: GradientColors::default(),
            logo_size: None,
            panel: PanelStyle::default(),
            byline: None,
        }
    }

    /// 2310 x 1200 landscape with the given vertical anchor.
    pub fn landscape(anchor: Anchor) -> Self {
        Self {
            target: TargetSize::Landscape {
                width: 2310,
                height: 1200,
                anchor,
            },
            grid: GridStyle {
                square_size: 200,
                line_thickness: 3,
                opacity_ratio: 0.3,
                vertical_offset: 50,
            },
            margins: Margins { text: 71, logo: 71 },
            font_size: 150.0,
            max_lines: Some(3),
            logo_size: Some(SizePx::new(180, 180)),
            ..Self::square()
        }
    }

    pub fn with_byline(mut self, byline: BylineStyle) -> Self {
        self.byline = Some(byline);
        self
    }

    /// Gap between caption lines for a given line height.
    pub fn line_spacing(&self, line_height: u32) -> u32 {
        (f64::from(line_height) * self.line_spacing_ratio.max(0.0)) as u32
    }

    /// Rejects configurations no render could honour.
    pub fn validate(&self) -> RenderResult<()> {
        if self.target.size().is_empty() {
            return Err(RenderError::config("target size must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.gradient_height_ratio) {
            return Err(RenderError::config(format!(
                "gradient height ratio {} is outside 0..=1",
                self.gradient_height_ratio
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(RenderError::config(format!(
                "font size {} must be positive",
                self.font_size
            )));
        }
        if self.logo_size.is_some_and(|s| s.is_empty()) {
            return Err(RenderError::config("logo size must be non-zero"));
        }
        for (field, value) in self.extents() {
            if value > MAX_EXTENT {
                return Err(RenderError::config(format!(
                    "{field} {value} exceeds {MAX_EXTENT}px"
                )));
            }
        }
        if let Some(byline) = &self.byline {
            if !(byline.font_size.is_finite() && byline.font_size > 0.0) {
                return Err(RenderError::config(format!(
                    "byline font size {} must be positive",
                    byline.font_size
                )));
            }
        }
        Ok(())
    }

    /// Every pixel length of the configuration, by name.
    fn extents(&self) -> Vec<(&'static str, u32)> {
        let target = self.target.size();
        let mut extents = vec![
            ("target width", target.width),
            ("target height", target.height),
            ("triangle size", self.triangle_size),
            ("grid square size", self.grid.square_size),
            ("grid line thickness", self.grid.line_thickness),
            ("grid vertical offset", self.grid.vertical_offset),
            ("text margin", self.margins.text),
            ("logo margin", self.margins.logo),
            ("font size", self.font_size as u32),
            ("panel padding", self.panel.padding),
            ("stroke width", self.panel.stroke_width),
            ("byline gap", self.panel.byline_gap),
            ("byline inset", self.panel.byline_inset),
        ];
        if let Some(size) = self.logo_size {
            extents.extend([("logo width", size.width), ("logo height", size.height)]);
        }
        if let Some(byline) = &self.byline {
            extents.extend([
                ("byline font size", byline.font_size as u32),
                ("byline bottom margin", byline.bottom_margin),
                ("byline icon size", byline.icon_size),
                ("byline icon gap", byline.icon_gap),
            ]);
        }
        extents
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::square()
    }
}

// ============================================================================
// Preset
// ============================================================================

/// The named output variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Square,
    LandscapeTop,
    LandscapeCenter,
    LandscapeBottom,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Square,
        Preset::LandscapeCenter,
        Preset::LandscapeTop,
        Preset::LandscapeBottom,
    ];

    pub fn landscape(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Top => Preset::LandscapeTop,
            Anchor::Center => Preset::LandscapeCenter,
            Anchor::Bottom => Preset::LandscapeBottom,
        }
    }

    pub fn anchor(&self) -> Option<Anchor> {
        match self {
            Preset::Square => None,
            Preset::LandscapeTop => Some(Anchor::Top),
            Preset::LandscapeCenter => Some(Anchor::Center),
            Preset::LandscapeBottom => Some(Anchor::Bottom),
        }
    }

    /// File name suffix of this variant.
    pub fn suffix(&self) -> &'static str {
        match self {
            Preset::Square => "square",
            Preset::LandscapeTop => "landscape_top",
            Preset::LandscapeCenter => "landscape_center",
            Preset::LandscapeBottom => "landscape_bottom",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Preset {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.suffix().eq_ignore_ascii_case(s))
            .ok_or_else(|| RenderError::config(format!("unknown preset {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_preset_values() {
        let config = RenderConfig::preset(Preset::Square);
        assert_eq!(config.target, TargetSize::Square(2160));
        assert_eq!(config.target.size(), SizePx::new(2160, 2160));
        assert_eq!(config.target.anchor(), None);
        assert_eq!(config.grid.square_size, 295);
        assert_eq!(config.margins, Margins { text: 96, logo: 71 });
        assert_eq!(config.max_lines, None);
        assert_eq!(config.logo_size, None);
        assert_eq!(config.colors.bottom_start, rgb(70, 84, 154));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn landscape_presets_differ_only_by_anchor() {
        let top = RenderConfig::preset(Preset::LandscapeTop);
        let bottom = RenderConfig::preset(Preset::LandscapeBottom);
        assert_eq!(top.target.size(), SizePx::new(2310, 1200));
        assert_eq!(top.target.anchor(), Some(Anchor::Top));
        assert_eq!(bottom.target.anchor(), Some(Anchor::Bottom));
        assert_eq!(top.max_lines, Some(3));
        assert_eq!(top.logo_size, Some(SizePx::new(180, 180)));
        assert_eq!(top.font_size, 150.0);
        assert_eq!(top.grid.line_thickness, 3);

        let retargeted = RenderConfig {
            target: bottom.target,
            ..top
        };
        assert_eq!(retargeted, bottom);
    }

    #[test]
    fn suffixes_round_trip() {
        let suffixes: Vec<_> = Preset::ALL.iter().map(Preset::suffix).collect();
        assert_eq!(
            suffixes,
            ["square", "landscape_center", "landscape_top", "landscape_bottom"]
        );
        for preset in Preset::ALL {
            assert_eq!(preset.suffix().parse::<Preset>().unwrap(), preset);
            assert_eq!(RenderConfig::preset(preset).target.anchor(), preset.anchor());
        }
        assert!("portrait".parse::<Preset>().is_err());
    }

    #[test]
    fn anchor_parsing() {
        assert_eq!("Top".parse::<Anchor>().unwrap(), Anchor::Top);
        assert_eq!(" centre ".parse::<Anchor>().unwrap(), Anchor::Center);
        assert!("left".parse::<Anchor>().is_err());
        assert_eq!(Anchor::default(), Anchor::Bottom);
    }

    #[test]
    fn line_spacing_truncates() {
        let config = RenderConfig::square();
        assert_eq!(config.line_spacing(87), 17);
        assert_eq!(config.line_spacing(4), 0);
    }

    #[test]
    fn validation_rejects_unusable_configs() {
        let mut config = RenderConfig::square();
        config.target = TargetSize::Square(0);
        assert!(config.validate().is_err());

        let mut config = RenderConfig::square();
        config.gradient_height_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = RenderConfig::square();
        config.font_size = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = RenderConfig::square();
        config.logo_size = Some(SizePx::new(0, 10));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_bounds_every_pixel_length() {
        let mut config = RenderConfig::square();
        config.panel.padding = 3_000_000_000;
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));

        let mut config = RenderConfig::square();
        config.margins.text = MAX_EXTENT + 1;
        assert!(config.validate().is_err());

        let mut config = RenderConfig::square();
        config.triangle_size = 70_000;
        assert!(config.validate().is_err());

        let mut config = RenderConfig::square();
        config.font_size = 1e12;
        assert!(config.validate().is_err());

        let mut byline = BylineStyle::new("by");
        byline.icon_gap = u32::MAX;
        assert!(RenderConfig::square().with_byline(byline).validate().is_err());

        let mut config = RenderConfig::square();
        config.triangle_size = MAX_EXTENT;
        assert!(config.validate().is_ok());
    }
}
