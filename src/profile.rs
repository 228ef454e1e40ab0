//! Serializable render profile.
//!
//! A [`RenderProfile`] names a preset and overrides any of its values. It is
//! the JSON form in which a caller (a bot, a CLI flag file) describes a
//! variant. Every field is optional; a field that cannot be read or is out
//! of range is ignored with a warning and the preset value is kept.
//!
//! # Example
//!
//! ```
//! use promo_renderer::{Configurable, Preset, RenderConfig, RenderProfile};
//!
//! let profile = RenderProfile::from_json(
//!     r##"{ "preset": "landscape_top", "fontSize": 132, "colors": { "bottomStart": "#101820" } }"##,
//! )
//! .unwrap();
//!
//! let config = RenderConfig::from_profile(&profile);
//! assert_eq!(config.font_size, 132.0);
//! assert_eq!(config.target, RenderConfig::preset(Preset::LandscapeTop).target);
//!
//! let json = config.export_profile().to_json().unwrap();
//! assert!(json.contains("\"bottomStart\":\"#101820\""));
//! ```

use palette::Srgb;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::config::{MAX_EXTENT, Preset, RenderConfig};
use crate::frame::{Color, SizePx, with_alpha};
use crate::layer::BylineStyle;

// ============================================================================
// Configurable
// ============================================================================

/// Types whose settings can be overridden from, and exported to, a profile.
pub trait Configurable {
    /// Applies every readable override in `profile`.
    fn apply_profile(&mut self, profile: &RenderProfile);

    /// Captures the current settings as a profile.
    fn export_profile(&self) -> RenderProfile;
}

// ============================================================================
// Field helpers
// ============================================================================

/// Deserializes an optional field, turning unreadable values into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(%value, error = %e, "ignoring unreadable profile value");
            Ok(None)
        }
    }
}

/// Parses `#rrggbb` (or `rrggbb`, `#rgb`).
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    hex.trim().parse::<Srgb<u8>>().ok()
}

/// Formats a colour as lowercase `#rrggbb`.
pub fn to_hex_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

fn override_with<T: Copy>(target: &mut T, value: Option<T>, field: &str, valid: impl Fn(T) -> bool)
where
    T: std::fmt::Debug,
{
    if let Some(value) = value {
        if valid(value) {
            *target = value;
        } else {
            warn!(field, ?value, "profile value out of range, keeping preset");
        }
    }
}

fn override_color(target: &mut Color, value: &Option<String>, field: &str) {
    if let Some(hex) = value {
        match parse_hex_color(hex) {
            Some(color) => *target = color,
            None => warn!(field, value = %hex, "invalid hex colour, keeping preset"),
        }
    }
}

// ============================================================================
// Section settings
// ============================================================================

/// Grid overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub square_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub line_thickness: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub opacity_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vertical_offset: Option<u32>,
}

/// Margin overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub logo: Option<u32>,
}

/// Gradient colour overrides as `#rrggbb` strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bottom_start: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bottom_end: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub triangle_start: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub triangle_end: Option<String>,
}

/// Caption card overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub blur_sigma: Option<f32>,
    /// Tint colour as `#rrggbb`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tint_alpha: Option<u8>,
}

/// Byline settings. The byline is enabled by giving it a text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BylineSettings {
    pub text: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bottom_margin: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub icon_gap: Option<u32>,
}

// ============================================================================
// RenderProfile
// ============================================================================

/// A preset plus overrides, in a JSON-friendly shape.
///
/// # JSON Format
///
/// ```json
/// {
///   "preset": "landscape_center",
///   "gradientHeightRatio": 0.35,
///   "grid": { "squareSize": 180 },
///   "maxLines": 0,
///   "logoSize": [160, 160],
///   "byline": { "text": "Business and government" }
/// }
/// ```
///
/// `maxLines: 0` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProfile {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gradient_height_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub triangle_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub margins: Option<MarginSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub line_spacing_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub colors: Option<ColorSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub logo_size: Option<[u32; 2]>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub byline: Option<BylineSettings>,
}

impl RenderProfile {
    /// Creates an empty profile (the square preset, unmodified).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_byline(mut self, text: impl Into<String>) -> Self {
        self.byline = Some(BylineSettings {
            text: text.into(),
            ..BylineSettings::default()
        });
        self
    }

    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// RenderConfig <-> RenderProfile
// ============================================================================

impl RenderConfig {
    /// The profile's preset with its overrides applied.
    pub fn from_profile(profile: &RenderProfile) -> Self {
        let mut config = Self::preset(profile.preset.unwrap_or(Preset::Square));
        config.apply_profile(profile);
        config
    }
}

fn positive_f32(v: f32) -> bool {
    v.is_finite() && v > 0.0 && v <= MAX_EXTENT as f32
}

fn extent(v: u32) -> bool {
    v <= MAX_EXTENT
}

fn unit_f64(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

impl Configurable for RenderConfig {
    fn apply_profile(&mut self, profile: &RenderProfile) {
        override_with(
            &mut self.gradient_height_ratio,
            profile.gradient_height_ratio,
            "gradientHeightRatio",
            unit_f64,
        );
        override_with(&mut self.triangle_size, profile.triangle_size, "triangleSize", extent);
        override_with(&mut self.font_size, profile.font_size, "fontSize", positive_f32);
        override_with(
            &mut self.line_spacing_ratio,
            profile.line_spacing_ratio,
            "lineSpacingRatio",
            |v: f64| v.is_finite() && v >= 0.0,
        );
        if let Some(max) = profile.max_lines {
            self.max_lines = (max > 0).then_some(max);
        }
        if let Some([w, h]) = profile.logo_size {
            if (1..=MAX_EXTENT).contains(&w) && (1..=MAX_EXTENT).contains(&h) {
                self.logo_size = Some(SizePx::new(w, h));
            } else {
                warn!(field = "logoSize", w, h, "profile value out of range, keeping preset");
            }
        }

        if let Some(grid) = &profile.grid {
            let g = &mut self.grid;
            override_with(&mut g.square_size, grid.square_size, "grid.squareSize", |v| v > 0 && v <= MAX_EXTENT);
            override_with(&mut g.line_thickness, grid.line_thickness, "grid.lineThickness", extent);
            override_with(&mut g.opacity_ratio, grid.opacity_ratio, "grid.opacityRatio", unit_f64);
            override_with(
                &mut g.vertical_offset,
                grid.vertical_offset,
                "grid.verticalOffset",
                extent,
            );
        }

        if let Some(margins) = &profile.margins {
            override_with(&mut self.margins.text, margins.text, "margins.text", extent);
            override_with(&mut self.margins.logo, margins.logo, "margins.logo", extent);
        }

        if let Some(colors) = &profile.colors {
            let c = &mut self.colors;
            override_color(&mut c.bottom_start, &colors.bottom_start, "colors.bottomStart");
            override_color(&mut c.bottom_end, &colors.bottom_end, "colors.bottomEnd");
            override_color(&mut c.triangle_start, &colors.triangle_start, "colors.triangleStart");
            override_color(&mut c.triangle_end, &colors.triangle_end, "colors.triangleEnd");
        }

        if let Some(panel) = &profile.panel {
            let p = &mut self.panel;
            override_with(&mut p.padding, panel.padding, "panel.padding", extent);
            override_with(&mut p.blur_sigma, panel.blur_sigma, "panel.blurSigma", |v: f32| {
                v.is_finite() && v >= 0.0
            });
            if let Some(hex) = &panel.tint {
                match parse_hex_color(hex) {
                    Some(c) => p.tint = with_alpha(c, p.tint[3]),
                    None => warn!(field = "panel.tint", value = %hex, "invalid hex colour, keeping preset"),
                }
            }
            override_with(&mut p.tint[3], panel.tint_alpha, "panel.tintAlpha", |_| true);
        }

        if let Some(settings) = &profile.byline {
            let text = settings.text.trim();
            if text.is_empty() {
                warn!(field = "byline.text", "empty byline text, byline disabled");
                self.byline = None;
            } else {
                let mut byline = self
                    .byline
                    .clone()
                    .unwrap_or_else(|| BylineStyle::new(text));
                byline.text = text.to_string();
                override_with(&mut byline.font_size, settings.font_size, "byline.fontSize", positive_f32);
                override_with(
                    &mut byline.bottom_margin,
                    settings.bottom_margin,
                    "byline.bottomMargin",
                    extent,
                );
                override_with(&mut byline.icon_size, settings.icon_size, "byline.iconSize", extent);
                override_with(&mut byline.icon_gap, settings.icon_gap, "byline.iconGap", extent);
                self.byline = Some(byline);
            }
        }
    }

    fn export_profile(&self) -> RenderProfile {
        let preset = match self.target.anchor() {
            None => Preset::Square,
            Some(anchor) => Preset::landscape(anchor),
        };
        RenderProfile {
            preset: Some(preset),
            gradient_height_ratio: Some(self.gradient_height_ratio),
            triangle_size: Some(self.triangle_size),
            grid: Some(GridSettings {
                square_size: Some(self.grid.square_size),
                line_thickness: Some(self.grid.line_thickness),
                opacity_ratio: Some(self.grid.opacity_ratio),
                vertical_offset: Some(self.grid.vertical_offset),
            }),
            margins: Some(MarginSettings {
                text: Some(self.margins.text),
                logo: Some(self.margins.logo),
            }),
            font_size: Some(self.font_size),
            line_spacing_ratio: Some(self.line_spacing_ratio),
            max_lines: Some(self.max_lines.unwrap_or(0)),
            colors: Some(ColorSettings {
                bottom_start: Some(to_hex_color(self.colors.bottom_start)),
                bottom_end: Some(to_hex_color(self.colors.bottom_end)),
                triangle_start: Some(to_hex_color(self.colors.triangle_start)),
                triangle_end: Some(to_hex_color(self.colors.triangle_end)),
            }),
            logo_size: self.logo_size.map(|s| [s.width, s.height]),
            panel: Some(PanelSettings {
                padding: Some(self.panel.padding),
                blur_sigma: Some(self.panel.blur_sigma),
                tint: Some(to_hex_color(Srgb::new(
                    self.panel.tint[0],
                    self.panel.tint[1],
                    self.panel.tint[2],
                ))),
                tint_alpha: Some(self.panel.tint[3]),
            }),
            byline: self.byline.as_ref().map(|b| BylineSettings {
                text: b.text.clone(),
                font_size: Some(b.font_size),
                bottom_margin: Some(b.bottom_margin),
                icon_size: Some(b.icon_size),
                icon_gap: Some(b.icon_gap),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
