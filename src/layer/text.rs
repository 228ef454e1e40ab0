//! Caption measurement, wrapping and truncation.
//!
//! Wrapping is greedy over whitespace-separated words. A word that cannot
//! fit on a line of its own is split character by character. When the line
//! ceiling is hit, the last accepted line is shortened until it can carry a
//! trailing [`ELLIPSIS`].

use tracing::debug;

use crate::frame::Canvas;

/// Appended to the last line when the caption does not fit.
pub const ELLIPSIS: &str = "...";

// ============================================================================
// Text Traits
// ============================================================================

/// Measures the rendered width of a run of text, in pixels.
pub trait TextMeasure {
    /// Width of the ink bounding box of `text`. Empty and whitespace-only
    /// strings measure 0.
    fn measure(&self, text: &str) -> u32;
}

/// A face at a fixed pixel size that can measure and draw single lines.
pub trait TextRenderer: TextMeasure + Send + Sync {
    /// Ink height of the string `"Ay"`, used as the nominal line height.
    fn line_height(&self) -> u32;

    /// Draws `text` with its ascender top at `y` and its origin at `x`.
    ///
    /// Glyph coverage is multiplied into the alpha of `rgba` and blended
    /// source-over onto `canvas`. Pixels outside the canvas are clipped.
    fn draw_line(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, rgba: [u8; 4]);
}

/// Produces [`TextRenderer`]s at arbitrary pixel sizes from one face.
pub trait FontProvider: Send + Sync {
    fn sized(&self, px: f32) -> Box<dyn TextRenderer>;
}

// ============================================================================
// WrappedText
// ============================================================================

/// The result of [`wrap`]: lines in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WrappedText {
    lines: Vec<String>,
    truncated: bool,
}

impl WrappedText {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if some of the input was dropped and an ellipsis was appended.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// Accumulates lines up to an optional ceiling.
struct LineSink {
    lines: Vec<String>,
    capacity: Option<usize>,
    truncated: bool,
}

impl LineSink {
    /// Accepts `line` unless the ceiling is reached, in which case the sink
    /// is marked truncated and `false` is returned.
    fn push(&mut self, line: String) -> bool {
        if self.capacity.is_some_and(|cap| self.lines.len() >= cap) {
            self.truncated = true;
            return false;
        }
        self.lines.push(line);
        true
    }
}

// ============================================================================
// Wrapping
// ============================================================================

/// Wraps `text` into lines no wider than `width_limit` pixels.
///
/// At most `max_lines` lines are returned when a ceiling is given (a ceiling
/// of zero is treated as one). Characters that are individually wider than
/// the limit are dropped. The only line allowed to exceed the limit is a lone
/// `"..."` when not even the ellipsis fits.
pub fn wrap<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    width_limit: u32,
    max_lines: Option<usize>,
) -> WrappedText {
    let mut sink = LineSink {
        lines: Vec::new(),
        capacity: max_lines.map(|n| n.max(1)),
        truncated: false,
    };
    let mut current = String::new();

    for word in text.split_whitespace() {
        if sink.truncated {
            break;
        }

        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure.measure(&candidate) <= width_limit {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            if !sink.push(std::mem::take(&mut current)) {
                break;
            }
            if measure.measure(word) <= width_limit {
                current = word.to_string();
                continue;
            }
        }

        for part in split_word(measure, word, width_limit) {
            if !sink.push(part) {
                break;
            }
        }
    }

    if !current.is_empty() && !sink.truncated {
        sink.push(current);
    }

    if sink.truncated {
        if let Some(last) = sink.lines.last_mut() {
            *last = fit_ellipsis(measure, last, width_limit);
        }
    }

    WrappedText {
        lines: sink.lines,
        truncated: sink.truncated,
    }
}

/// Splits an overlong word into the longest prefixes that fit.
fn split_word<M: TextMeasure + ?Sized>(measure: &M, word: &str, width_limit: u32) -> Vec<String> {
    let mut parts = Vec::new();
    let mut part = String::new();

    for ch in word.chars() {
        part.push(ch);
        if measure.measure(&part) <= width_limit {
            continue;
        }
        part.pop();

        if !part.is_empty() {
            parts.push(std::mem::take(&mut part));
        }
        let single = ch.to_string();
        if measure.measure(&single) <= width_limit {
            part = single;
        } else {
            debug!(%ch, width_limit, "dropping character wider than the line");
        }
    }

    if !part.is_empty() {
        parts.push(part);
    }
    parts
}

/// Drops trailing characters from `line` until `line + "..."` fits.
fn fit_ellipsis<M: TextMeasure + ?Sized>(measure: &M, line: &str, width_limit: u32) -> String {
    let mut base = line.to_string();
    loop {
        let candidate = format!("{}{ELLIPSIS}", base.trim_end());
        if base.is_empty() || measure.measure(&candidate) <= width_limit {
            return candidate;
        }
        base.pop();
    }
}

// ============================================================================
// Tests
// ============================================================================
