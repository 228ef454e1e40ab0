//! promo-renderer: branded promotional image rendering
//!
//! This crate turns a source photo, a logo and a caption into fixed-size
//! promotional frames: a cover-fit crop overlaid with a bottom gradient, a
//! fading grid, a blurred caption card, a corner accent and the logo.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use image::{Rgba, RgbaImage};
//! use promo_renderer::{BlockFont, FrameComposer, VariantSet, render_variants};
//!
//! let composer = FrameComposer::new(Arc::new(BlockFont));
//! let photo = RgbaImage::from_pixel(400, 300, Rgba([30, 60, 90, 255]));
//! let logo = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
//!
//! let outcomes = render_variants(
//!     &composer,
//!     &photo,
//!     &logo,
//!     "Quarterly results",
//!     &VariantSet::Social.configs(),
//! );
//! let frame = outcomes[0].result.as_ref().unwrap();
//! assert_eq!(frame.dimensions(), (2160, 2160));
//! ```
//!
//! # Serializable Profiles
//!
//! Callers describe variants as JSON through [`RenderProfile`] and the
//! [`Configurable`] trait:
//!
//! ```
//! use promo_renderer::{Configurable, Preset, RenderConfig, RenderProfile};
//!
//! let profile = RenderProfile::new()
//!     .with_preset(Preset::LandscapeCenter)
//!     .with_byline("Business and government");
//! let config = RenderConfig::from_profile(&profile);
//! assert!(config.byline.is_some());
//!
//! let exported = config.export_profile();
//! let json = exported.to_json().unwrap();
//! assert!(json.contains("landscape_center"));
//! ```

mod batch;
mod composer;
mod config;
mod error;
mod fit;
mod frame;
pub mod layer;
mod profile;
mod typeface;

pub use batch::{
    BatchReport, VariantOutcome, VariantSet, encode_png, output_file_name, render_variants,
};
pub use composer::{FrameComposer, Stage, decode_image, decode_logo};
pub use config::{Anchor, GradientColors, MAX_EXTENT, Margins, Preset, RenderConfig, TargetSize};
pub use error::{MAX_CAPTION_CHARS, RenderError, RenderResult, validate_caption};
pub use fit::{cover_fit, crop_origin, scaled_size};
pub use frame::{Canvas, Color, Mask, RectPx, RgbaLayer, SizePx, rgb, with_alpha};
pub use layer::{
    BylineStyle, FontProvider, GradientEngine, GradientPath, GridStyle, LayerEffect, PanelStyle,
    RenderContext, TextMeasure, TextRenderer, WrappedText, wrap,
};
pub use profile::{
    BylineSettings, ColorSettings, Configurable, GridSettings, MarginSettings, PanelSettings,
    RenderProfile, parse_hex_color, to_hex_color,
};
pub use typeface::{BlockFont, BlockText, ScaledTypeface, Typeface};
