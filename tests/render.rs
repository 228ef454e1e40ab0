use std::sync::Arc;

use image::{Rgba, RgbaImage};
use promo_renderer::{
    Anchor, BlockFont, Configurable, FrameComposer, GridStyle, Margins, PanelStyle, Preset,
    RenderConfig, RenderError, RenderProfile, SizePx, TargetSize, cover_fit,
};

const RED: [u8; 4] = [255, 0, 0, 255];

fn composer() -> FrameComposer {
    FrameComposer::new(Arc::new(BlockFont))
}

fn photo(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255])
    })
}

/// A preset scaled down so debug builds render it quickly.
fn scaled_down(target: TargetSize) -> RenderConfig {
    RenderConfig {
        target,
        triangle_size: 40,
        grid: GridStyle {
            square_size: 24,
            line_thickness: 2,
            opacity_ratio: 0.3,
            vertical_offset: 4,
        },
        margins: Margins { text: 8, logo: 6 },
        font_size: 16.0,
        logo_size: Some(SizePx::new(12, 12)),
        panel: PanelStyle {
            padding: 6,
            blur_sigma: 3.0,
            ..PanelStyle::default()
        },
        ..RenderConfig::square()
    }
}

#[test]
fn square_preset_end_to_end() {
    let base = photo(4000, 3000);
    let logo = RgbaImage::from_pixel(200, 200, Rgba(RED));
    let config = RenderConfig::preset(Preset::Square);

    let frame = composer().render(&base, &logo, "Test", &config).unwrap();
    assert_eq!(frame.dimensions(), (2160, 2160));

    // logo is 71px from the top and right edges
    assert_eq!(frame.get_pixel(2160 - 71 - 200, 71).0, [255, 0, 0]);
    assert_eq!(frame.get_pixel(2160 - 71 - 1, 71 + 199).0, [255, 0, 0]);
    assert_ne!(frame.get_pixel(2160 - 70, 71).0, [255, 0, 0]);
    assert_ne!(frame.get_pixel(2160 - 71 - 1, 70).0, [255, 0, 0]);

    // first glyph of the caption, one padding inside the card
    let card_y = 2160 - (2 * 64 + 87) - 96;
    assert_eq!(frame.get_pixel(96 + 64, card_y + 64).0, [255, 255, 255]);
}

#[test]
fn rendering_twice_is_byte_identical() {
    let base = photo(640, 360);
    let logo = RgbaImage::from_pixel(30, 20, Rgba([10, 200, 40, 200]));
    let config = RenderConfig {
        max_lines: Some(2),
        ..scaled_down(TargetSize::Landscape {
            width: 231,
            height: 120,
            anchor: Anchor::Center,
        })
    };
    let caption = "Region launches a new programme for small business support";

    let c = composer();
    let first = c.render(&base, &logo, caption, &config).unwrap();
    let second = c.render(&base, &logo, caption, &config).unwrap();
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn cover_fit_matches_every_target_exactly() {
    let sources = [(4000, 3000), (3000, 4000), (1000, 1000), (33, 7), (7, 33), (2310, 1200)];
    let targets = [
        TargetSize::Square(216),
        TargetSize::Landscape {
            width: 231,
            height: 120,
            anchor: Anchor::Top,
        },
        TargetSize::Landscape {
            width: 231,
            height: 120,
            anchor: Anchor::Bottom,
        },
    ];
    for (w, h) in sources {
        let source = RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255]));
        for target in &targets {
            let out = cover_fit(&source, target).unwrap();
            assert_eq!(SizePx::of(&out), target.size(), "{w}x{h} -> {target:?}");
            assert!(out.pixels().all(|p| p[3] == 255), "{w}x{h} exposed padding");
        }
    }
}

#[test]
fn landscape_output_uses_the_logo_override() {
    let base = photo(800, 600);
    let logo = RgbaImage::from_pixel(50, 50, Rgba(RED));
    let config = scaled_down(TargetSize::Landscape {
        width: 231,
        height: 120,
        anchor: Anchor::Bottom,
    });

    let frame = composer().render(&base, &logo, "Hello", &config).unwrap();
    assert_eq!(frame.dimensions(), (231, 120));
    // 12px logo, 6px margins
    assert_eq!(frame.get_pixel(231 - 6 - 12, 6).0, [255, 0, 0]);
    assert_eq!(frame.get_pixel(231 - 6 - 1, 6 + 11).0, [255, 0, 0]);
    assert_ne!(frame.get_pixel(231 - 6 - 13, 6).0, [255, 0, 0]);
}

#[test]
fn profiles_drive_a_render() {
    let profile = RenderProfile::from_json(
        r##"{
            "preset": "landscape_top",
            "triangleSize": "huge",
            "colors": { "triangleStart": "#00ff00" }
        }"##,
    )
    .unwrap();
    let config = RenderConfig::from_profile(&profile);
    assert_eq!(config.triangle_size, 600);

    let config = RenderConfig {
        colors: config.colors,
        logo_size: None,
        ..scaled_down(TargetSize::Landscape {
            width: 231,
            height: 120,
            anchor: Anchor::Top,
        })
    };
    let logo = RgbaImage::new(1, 1);
    let frame = composer().render(&photo(400, 400), &logo, "Hi", &config).unwrap();
    // top row of the accent carries the start colour
    assert_eq!(frame.get_pixel(230, 0).0, [0, 255, 0]);
}

#[test]
fn oversized_lengths_are_rejected_not_panicked_on() {
    let base = photo(300, 200);
    let logo = RgbaImage::from_pixel(10, 10, Rgba(RED));
    let preset = scaled_down(TargetSize::Square(120));

    let profile = RenderProfile::from_json(
        r#"{
            "panel": { "padding": 3000000000 },
            "margins": { "text": 3000000000 },
            "triangleSize": 70000
        }"#,
    )
    .unwrap();
    let mut config = preset.clone();
    config.apply_profile(&profile);
    assert_eq!(config, preset);
    assert!(composer().render(&base, &logo, "Still fine", &config).is_ok());

    for oversized in [
        RenderConfig {
            panel: PanelStyle {
                padding: 3_000_000_000,
                ..preset.panel
            },
            ..preset.clone()
        },
        RenderConfig {
            margins: Margins {
                text: 3_000_000_000,
                logo: 6,
            },
            ..preset.clone()
        },
        RenderConfig {
            triangle_size: 70_000,
            ..preset.clone()
        },
    ] {
        let result = composer().render(&base, &logo, "Too big", &oversized);
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))), "{result:?}");
    }
}
