//! Pixel-level helpers shared by the compositing layers.
//!
//! Blending, masking, polygon rasterization (through `resvg::tiny_skia`) and
//! SVG rasterization (through `resvg`/`usvg`) live here so each layer module
//! only describes *what* it paints.

use image::{Luma, Rgba, RgbaImage};
use resvg::tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use resvg::usvg::{Options, Tree};

use crate::error::{RenderError, RenderResult};
use crate::frame::{Mask, RgbaLayer, SizePx};

// ============================================================================
// Layer construction
// ============================================================================

/// Creates a layer filled with a single RGBA value.
pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaLayer {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

/// Creates a mask filled with a single coverage value.
pub fn solid_mask(width: u32, height: u32, value: u8) -> Mask {
    Mask::from_pixel(width, height, Luma([value]))
}

/// Rasterizes a closed polygon into a mask, without anti-aliasing.
///
/// Pixels whose centre lies inside the polygon get coverage 255, all others 0.
/// Degenerate polygons (fewer than three points, zero area) yield an empty mask.
pub fn polygon_mask(width: u32, height: u32, points: &[(f32, f32)]) -> Mask {
    let mut mask = solid_mask(width, height, 0);
    let Some((&(x0, y0), rest)) = points.split_first() else {
        return mask;
    };
    if rest.len() < 2 {
        return mask;
    }

    let mut builder = PathBuilder::new();
    builder.move_to(x0, y0);
    for &(x, y) in rest {
        builder.line_to(x, y);
    }
    builder.close();

    let Some(path) = builder.finish() else {
        return mask;
    };
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return mask;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = false;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    for (dst, src) in mask.pixels_mut().zip(pixmap.pixels()) {
        dst.0[0] = src.alpha();
    }
    mask
}

/// Replaces the alpha channel of `layer` by the values of `mask`.
///
/// Both buffers must have the same dimensions.
pub fn apply_mask(layer: &mut RgbaLayer, mask: &Mask) -> RenderResult<()> {
    if layer.dimensions() != mask.dimensions() {
        return Err(RenderError::config(format!(
            "mask {:?} does not match layer {:?}",
            mask.dimensions(),
            layer.dimensions()
        )));
    }
    for (pixel, coverage) in layer.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = coverage.0[0];
    }
    Ok(())
}

// ============================================================================
// SVG Rendering
// ============================================================================

/// Renders SVG markup to an RGBA layer.
///
/// With `target = None` the SVG is rendered at its intrinsic size; otherwise
/// it is scaled (independently per axis) to exactly `target`.
pub fn render_svg(svg_data: &str, target: Option<SizePx>) -> RenderResult<RgbaLayer> {
    let opts = Options::default();
    let tree = Tree::from_str(svg_data, &opts).map_err(|e| RenderError::svg(e.to_string()))?;

    let svg_size = tree.size();
    let (width, height) = match target {
        Some(size) => (size.width, size.height),
        None => (
            svg_size.width().ceil() as u32,
            svg_size.height().ceil() as u32,
        ),
    };

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::svg(format!("cannot allocate {width}x{height} pixmap")))?;
    let transform = Transform::from_scale(
        width as f32 / svg_size.width(),
        height as f32 / svg_size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Returns true if the bytes look like SVG markup rather than a raster file.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia uses premultiplied alpha, we need to unpremultiply
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }
    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination). Source pixels
/// falling outside the destination are clipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i64;
    let dest_height = dest.height() as i64;

    for sy in 0..src.height() {
        let dy = y as i64 + sy as i64;
        if dy < 0 || dy >= dest_height {
            continue;
        }
        for sx in 0..src.width() {
            let dx = x as i64 + sx as i64;
            if dx < 0 || dx >= dest_width {
                continue;
            }

            let src_pixel = src.get_pixel(sx, sy);
            if src_pixel[3] == 0 {
                continue;
            }
            let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
            *dst_pixel = alpha_blend(*src_pixel, *dst_pixel);
        }
    }
}

/// Alpha blends two RGBA pixels (source over destination).
pub fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><rect x="0" y="0" width="100" height="50" fill="#ff0000"/></svg>"##;

    #[test]
    fn render_svg_intrinsic_size() {
        let img = render_svg(SIMPLE_SVG, None).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
        assert_eq!(img.get_pixel(50, 25).0, [255, 0, 0, 255]);
    }

    #[test]
    fn render_svg_to_target_size() {
        let img = render_svg(SIMPLE_SVG, Some(SizePx::new(30, 30))).unwrap();
        assert_eq!(img.dimensions(), (30, 30));
        assert_eq!(img.get_pixel(15, 15).0, [255, 0, 0, 255]);
    }

    #[test]
    fn render_svg_rejects_garbage() {
        assert!(matches!(
            render_svg("not an svg", None),
            Err(RenderError::Svg(_))
        ));
    }

    #[test]
    fn svg_sniffing() {
        assert!(looks_like_svg(SIMPLE_SVG.as_bytes()));
        assert!(looks_like_svg(b"<?xml version=\"1.0\"?>\n<svg></svg>"));
        assert!(!looks_like_svg(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a]));
    }

    #[test]
    fn composite_simple() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));

        composite_over(&mut dest, &src, 3, 3);

        assert_eq!(dest.get_pixel(5, 5).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn composite_clips_negative_offsets() {
        let mut dest = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));

        composite_over(&mut dest, &src, -2, -3);

        assert_eq!(dest.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(dest.get_pixel(2, 0).0, [0, 0, 0, 255]);
        assert_eq!(dest.get_pixel(0, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn composite_with_transparency() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]));

        composite_over(&mut dest, &src, 0, 0);

        let pixel = dest.get_pixel(0, 0);
        assert!(pixel[0] > 0, "Should have some red");
        assert!(pixel[2] > 0, "Should have some blue");
        assert_eq!(pixel[3], 255, "Opaque destination stays opaque");
    }

    #[test]
    fn blend_over_transparent_keeps_source() {
        let out = alpha_blend(Rgba([10, 20, 30, 100]), Rgba([0, 0, 0, 0]));
        assert_eq!(out.0, [10, 20, 30, 100]);
    }

    #[test]
    fn apply_mask_replaces_alpha() {
        let mut layer = solid(3, 1, [9, 9, 9, 200]);
        let mut mask = solid_mask(3, 1, 0);
        mask.put_pixel(1, 0, Luma([77]));

        apply_mask(&mut layer, &mask).unwrap();

        assert_eq!(layer.get_pixel(0, 0).0, [9, 9, 9, 0]);
        assert_eq!(layer.get_pixel(1, 0).0, [9, 9, 9, 77]);
    }

    #[test]
    fn apply_mask_rejects_mismatched_dimensions() {
        let mut layer = solid(3, 3, [0, 0, 0, 0]);
        let mask = solid_mask(2, 3, 255);
        assert!(apply_mask(&mut layer, &mask).is_err());
    }

    #[test]
    fn polygon_mask_fills_rectangle() {
        let mask = polygon_mask(4, 4, &[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)]);
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(3, 1).0, [255]);
        assert_eq!(mask.get_pixel(0, 2).0, [0]);
        assert_eq!(mask.get_pixel(3, 3).0, [0]);
    }

    #[test]
    fn polygon_mask_degenerate_is_empty() {
        let mask = polygon_mask(4, 4, &[(0.0, 0.0), (4.0, 4.0)]);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }
}
