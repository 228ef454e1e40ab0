//! Cover-fit resizing: scale to cover the target, then crop the overflow.

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::config::{Anchor, TargetSize};
use crate::error::{RenderError, RenderResult};
use crate::frame::{Canvas, SizePx};

/// Size of `source` after scaling by `max(tw / sw, th / sh)`.
///
/// Each dimension is truncated and then raised to the target's, so floating
/// point error can never leave the scaled image a pixel short.
pub fn scaled_size(source: SizePx, target: SizePx) -> SizePx {
    let scale = f64::max(
        f64::from(target.width) / f64::from(source.width),
        f64::from(target.height) / f64::from(source.height),
    );
    SizePx::new(
        ((f64::from(source.width) * scale) as u32).max(target.width),
        ((f64::from(source.height) * scale) as u32).max(target.height),
    )
}

/// Top-left corner of the crop window inside the scaled image.
///
/// Horizontally the window is always centred. Vertically it is centred for
/// square targets and follows the anchor for landscape ones.
pub fn crop_origin(scaled: SizePx, target: &TargetSize) -> (u32, u32) {
    let size = target.size();
    let spare_w = scaled.width.saturating_sub(size.width);
    let spare_h = scaled.height.saturating_sub(size.height);
    let y = match target.anchor() {
        None | Some(Anchor::Center) => spare_h / 2,
        Some(Anchor::Top) => 0,
        Some(Anchor::Bottom) => spare_h,
    };
    (spare_w / 2, y)
}

/// Scales `source` to cover `target` (Lanczos3) and crops it to exactly the
/// target size.
pub fn cover_fit(source: &Canvas, target: &TargetSize) -> RenderResult<Canvas> {
    let size = target.size();
    if size.is_empty() {
        return Err(RenderError::config("target size must be non-zero"));
    }
    let source_size = SizePx::of(source);
    if source_size.is_empty() {
        return Err(RenderError::config("source image has no pixels"));
    }

    let scaled = scaled_size(source_size, size);
    let (x, y) = crop_origin(scaled, target);
    debug!(
        src_w = source_size.width,
        src_h = source_size.height,
        scaled_w = scaled.width,
        scaled_h = scaled.height,
        x,
        y,
        "cover fit"
    );

    let resized = if scaled == source_size {
        source.clone()
    } else {
        imageops::resize(source, scaled.width, scaled.height, FilterType::Lanczos3)
    };
    Ok(imageops::crop_imm(&resized, x, y, size.width, size.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn landscape(anchor: Anchor) -> TargetSize {
        TargetSize::Landscape {
            width: 2310,
            height: 1200,
            anchor,
        }
    }

    #[test]
    fn scale_covers_both_axes() {
        assert_eq!(
            scaled_size(SizePx::new(4000, 3000), SizePx::new(2160, 2160)),
            SizePx::new(2880, 2160)
        );
        assert_eq!(
            scaled_size(SizePx::new(1000, 3000), SizePx::new(2310, 1200)),
            SizePx::new(2310, 6930)
        );
        // upscaling a tiny source
        assert_eq!(
            scaled_size(SizePx::new(3, 7), SizePx::new(30, 30)),
            SizePx::new(30, 70)
        );
    }

    #[test]
    fn scaled_size_never_falls_short() {
        let targets = [SizePx::new(2160, 2160), SizePx::new(2310, 1200), SizePx::new(7, 3)];
        for target in targets {
            for w in [1u32, 3, 7, 333, 999, 1001, 4000, 4321] {
                for h in [1u32, 2, 9, 577, 1200, 3000, 3333] {
                    let s = scaled_size(SizePx::new(w, h), target);
                    assert!(s.width >= target.width && s.height >= target.height);
                    // one axis matches the target exactly, give or take truncation
                    assert!(s.width == target.width || s.height == target.height);
                }
            }
        }
    }

    #[test]
    fn anchors_pick_the_vertical_window() {
        let scaled = SizePx::new(2310, 3000);
        assert_eq!(crop_origin(scaled, &landscape(Anchor::Top)), (0, 0));
        assert_eq!(crop_origin(scaled, &landscape(Anchor::Center)), (0, 900));
        assert_eq!(crop_origin(scaled, &landscape(Anchor::Bottom)), (0, 1800));
        assert_eq!(
            crop_origin(SizePx::new(2880, 2160), &TargetSize::Square(2160)),
            (360, 0)
        );
    }

    #[test]
    fn cover_fit_output_matches_target_and_is_opaque() {
        let source = RgbaImage::from_pixel(40, 30, Rgba([10, 200, 30, 255]));
        for target in [TargetSize::Square(24), landscape(Anchor::Top)] {
            let out = cover_fit(&source, &target).unwrap();
            assert_eq!(SizePx::of(&out), target.size());
            assert!(out.pixels().all(|p| p[3] == 255));
        }
    }

    #[test]
    fn bottom_anchor_keeps_the_bottom_of_the_photo() {
        // red top half, blue bottom half, already at scale 1
        let mut source = RgbaImage::from_pixel(10, 40, Rgba([255, 0, 0, 255]));
        for y in 20..40 {
            for x in 0..10 {
                source.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let target = |anchor| TargetSize::Landscape {
            width: 10,
            height: 10,
            anchor,
        };

        let bottom = cover_fit(&source, &target(Anchor::Bottom)).unwrap();
        assert!(bottom.pixels().all(|p| p.0 == [0, 0, 255, 255]));
        let top = cover_fit(&source, &target(Anchor::Top)).unwrap();
        assert!(top.pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let source = RgbaImage::new(0, 10);
        assert!(cover_fit(&source, &TargetSize::Square(10)).is_err());
        let source = RgbaImage::new(10, 10);
        assert!(cover_fit(&source, &TargetSize::Square(0)).is_err());
    }
}
