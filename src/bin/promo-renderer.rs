use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use promo_renderer::{
    Anchor, BatchReport, Configurable, FrameComposer, Preset, RenderConfig, RenderProfile,
    Typeface, VariantSet, decode_image, decode_logo, encode_png, output_file_name,
    render_variants,
};

#[derive(Parser, Debug)]
#[command(name = "promo-renderer", version)]
/// Render branded promotional frames for every photo in a folder.
struct Cli {
    /// Caption drawn on the card.
    #[arg(long)]
    text: String,

    /// Folder of source photos.
    #[arg(long, default_value = "img")]
    img_dir: PathBuf,

    /// Folder holding the logo; the first file (by name) is used.
    #[arg(long, default_value = "logo")]
    logo_dir: PathBuf,

    /// Output folder, created when missing.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Which variants to produce.
    #[arg(long, value_enum, default_value_t = VariantChoice::All)]
    variants: VariantChoice,

    /// Landscape anchor for `investor-single` and `combined`.
    #[arg(long, value_enum, default_value_t = AnchorChoice::Bottom)]
    anchor: AnchorChoice,

    /// TTF/OTF caption font. Falls back to the system sans-serif.
    #[arg(long)]
    font: Option<PathBuf>,

    /// JSON render profile applied on top of every preset.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Optional byline drawn under the card.
    #[arg(long)]
    byline: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantChoice {
    Social,
    Investor,
    InvestorSingle,
    Combined,
    All,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnchorChoice {
    Top,
    Center,
    Bottom,
}

impl Cli {
    fn variant_set(&self) -> VariantSet {
        let anchor = match self.anchor {
            AnchorChoice::Top => Anchor::Top,
            AnchorChoice::Center => Anchor::Center,
            AnchorChoice::Bottom => Anchor::Bottom,
        };
        match self.variants {
            VariantChoice::Social => VariantSet::Social,
            VariantChoice::Investor => VariantSet::Investor,
            VariantChoice::InvestorSingle => VariantSet::InvestorSingle(anchor),
            VariantChoice::Combined => VariantSet::Combined(anchor),
            VariantChoice::All => VariantSet::All,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    promo_renderer::validate_caption(&cli.text)?;

    let variants = variant_configs(&cli)?;
    let logo_path = first_file(&cli.logo_dir)?
        .with_context(|| format!("no logo found in '{}'", cli.logo_dir.display()))?;
    let logo_bytes =
        std::fs::read(&logo_path).with_context(|| format!("read logo '{}'", logo_path.display()))?;
    // SVG logos are rasterized once, at the largest override among the variants
    let logo_size = variants.iter().filter_map(|(_, c)| c.logo_size).max_by_key(|s| s.width);
    let logo = decode_logo(&logo_bytes, logo_size)
        .with_context(|| format!("decode logo '{}'", logo_path.display()))?;

    let images = list_files(&cli.img_dir)?;
    if images.is_empty() {
        anyhow::bail!("no images found in '{}'", cli.img_dir.display());
    }
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create output dir '{}'", cli.out_dir.display()))?;

    let composer = FrameComposer::new(Typeface::load(cli.font.as_deref()));
    info!(
        images = images.len(),
        variants = %cli.variant_set(),
        gradient = ?composer.engine().path(),
        "starting batch"
    );

    let report = BatchReport::timed(|report| {
        for path in &images {
            match render_one(&composer, path, &logo, &cli, &variants) {
                Ok(outcomes) => report.record_image(&outcomes),
                Err(e) => {
                    warn!(image = %path.display(), error = %format!("{e:#}"), "image skipped");
                    report.record_failure();
                }
            }
        }
    });

    if report.successful == 0 {
        anyhow::bail!("no image could be rendered ({} failed)", report.failed);
    }
    println!(
        "rendered {} of {} images into '{}'",
        report.successful,
        report.total(),
        cli.out_dir.display()
    );
    Ok(())
}

fn variant_configs(cli: &Cli) -> anyhow::Result<Vec<(Preset, RenderConfig)>> {
    let profile = match &cli.profile {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read profile '{}'", path.display()))?;
            let profile = RenderProfile::from_json(&json)
                .with_context(|| format!("parse profile '{}'", path.display()))?;
            Some(profile)
        }
        None => None,
    };
    let byline = cli.byline.as_deref().map(|text| RenderProfile::new().with_byline(text));

    let mut variants = cli.variant_set().configs();
    for (_, config) in &mut variants {
        // the profile's own preset is ignored; the variant set decides the targets
        for overrides in profile.iter().chain(byline.iter()) {
            config.apply_profile(overrides);
        }
    }
    Ok(variants)
}

/// Decodes and renders all variants of one photo, writing the successes.
fn render_one(
    composer: &FrameComposer,
    path: &Path,
    logo: &image::RgbaImage,
    cli: &Cli,
    variants: &[(Preset, RenderConfig)],
) -> anyhow::Result<Vec<promo_renderer::VariantOutcome>> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    let base = decode_image(&bytes).with_context(|| format!("decode '{}'", path.display()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("no file name in '{}'", path.display()))?;

    let outcomes = render_variants(composer, &base, logo, &cli.text, variants);
    for outcome in &outcomes {
        let Ok(frame) = &outcome.result else { continue };
        let out = cli.out_dir.join(output_file_name(&stem, outcome.preset));
        let png = encode_png(frame)?;
        std::fs::write(&out, png).with_context(|| format!("write '{}'", out.display()))?;
        info!(path = %out.display(), "saved");
    }
    Ok(outcomes)
}

fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("list folder '{}'", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list folder '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn first_file(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    Ok(list_files(dir)?.into_iter().next())
}
