//! Multi-variant rendering and batch bookkeeping.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage, RgbaImage};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::composer::FrameComposer;
use crate::config::{Anchor, Preset, RenderConfig};
use crate::error::{RenderError, RenderResult};

// ============================================================================
// Variant sets
// ============================================================================

/// Which variants a run produces for every source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariantSet {
    /// The square only.
    Social,
    /// The three landscape anchors.
    Investor,
    /// One landscape anchor.
    InvestorSingle(Anchor),
    /// The square plus one landscape anchor.
    Combined(Anchor),
    /// The square plus the three landscape anchors.
    #[default]
    All,
}

impl VariantSet {
    /// The presets of this set, in output order.
    pub fn presets(&self) -> Vec<Preset> {
        match *self {
            VariantSet::Social => vec![Preset::Square],
            VariantSet::Investor => Anchor::ALL.into_iter().map(Preset::landscape).collect(),
            VariantSet::InvestorSingle(anchor) => vec![Preset::landscape(anchor)],
            VariantSet::Combined(anchor) => vec![Preset::Square, Preset::landscape(anchor)],
            VariantSet::All => Preset::ALL.to_vec(),
        }
    }

    /// The presets of this set paired with their default configurations.
    pub fn configs(&self) -> Vec<(Preset, RenderConfig)> {
        self.presets()
            .into_iter()
            .map(|p| (p, RenderConfig::preset(p)))
            .collect()
    }
}

impl fmt::Display for VariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantSet::Social => f.write_str("social"),
            VariantSet::Investor => f.write_str("investor"),
            VariantSet::InvestorSingle(anchor) => write!(f, "investor:{anchor}"),
            VariantSet::Combined(anchor) => write!(f, "combined:{anchor}"),
            VariantSet::All => f.write_str("all"),
        }
    }
}

impl FromStr for VariantSet {
    type Err = RenderError;

    /// Parses `social`, `investor`, `investor:<anchor>`, `combined[:<anchor>]`
    /// or `all`. `combined` without an anchor uses the bottom anchor.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (name, anchor) = match s.split_once(':') {
            Some((name, anchor)) => (name, Some(anchor.parse::<Anchor>()?)),
            None => (s.as_str(), None),
        };
        match (name, anchor) {
            ("social", None) => Ok(VariantSet::Social),
            ("investor", None) => Ok(VariantSet::Investor),
            ("investor", Some(anchor)) => Ok(VariantSet::InvestorSingle(anchor)),
            ("combined", anchor) => Ok(VariantSet::Combined(anchor.unwrap_or_default())),
            ("all", None) => Ok(VariantSet::All),
            _ => Err(RenderError::config(format!("unknown variant set {s:?}"))),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// The result of rendering one variant.
#[derive(Debug)]
pub struct VariantOutcome {
    pub preset: Preset,
    pub result: RenderResult<RgbImage>,
}

/// Renders every variant of one image in parallel.
///
/// Each variant owns its canvas; only the decoded inputs and the composer are
/// shared. Outcomes come back in the order of `variants`.
pub fn render_variants(
    composer: &FrameComposer,
    base: &RgbaImage,
    logo: &RgbaImage,
    caption: &str,
    variants: &[(Preset, RenderConfig)],
) -> Vec<VariantOutcome> {
    variants
        .par_iter()
        .map(|(preset, config)| {
            let result = composer.render(base, logo, caption, config);
            match &result {
                Err(e) if e.is_validation() => {
                    warn!(variant = preset.suffix(), error = %e, "variant rejected")
                }
                Err(e) => error!(variant = preset.suffix(), error = %e, "variant failed"),
                Ok(_) => {}
            }
            VariantOutcome {
                preset: *preset,
                result,
            }
        })
        .collect()
}

// ============================================================================
// Tally
// ============================================================================

/// Successes and failures over a run.
///
/// An image counts as successful when at least one of its variants
/// rendered.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub successful: usize,
    pub failed: usize,
    pub variants_rendered: usize,
    pub variants_failed: usize,
    elapsed: Duration,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcomes of one image.
    pub fn record_image(&mut self, outcomes: &[VariantOutcome]) {
        let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
        self.variants_rendered += ok;
        self.variants_failed += outcomes.len() - ok;
        if ok > 0 {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Records an image that failed before any variant was attempted.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Times `run` and logs the resulting tally.
    pub fn timed(run: impl FnOnce(&mut BatchReport)) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::new();
        run(&mut report);
        report.elapsed = started.elapsed();
        info!(
            successful = report.successful,
            failed = report.failed,
            variants = report.variants_rendered,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch finished"
        );
        report
    }
}

// ============================================================================
// Output
// ============================================================================

/// `{stem}_{suffix}.png`
pub fn output_file_name(stem: &str, preset: Preset) -> String {
    format!("{stem}_{}.png", preset.suffix())
}

/// Encodes a frame as PNG.
pub fn encode_png(frame: &RgbImage) -> RenderResult<Vec<u8>> {
    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(RenderError::Encode)?;
    Ok(bytes)
}
