//! Error types surfaced to callers of the renderer.

/// Maximum caption length, in characters, after trimming.
pub const MAX_CAPTION_CHARS: usize = 1000;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("caption is empty")]
    EmptyCaption,

    #[error("caption is too long: {len} characters (maximum {max})")]
    CaptionTooLong { len: usize, max: usize },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("svg error: {0}")]
    Svg(String),

    #[error("no usable font: {0}")]
    FontUnavailable(String),

    #[error("failed to encode output: {0}")]
    Encode(#[source] image::ImageError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RenderError {
    pub fn decode(what: &'static str, source: image::ImageError) -> Self {
        Self::Decode { what, source }
    }

    pub fn svg(msg: impl Into<String>) -> Self {
        Self::Svg(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::FontUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns true for errors caused by the caller's inputs rather than by
    /// the rendering environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyCaption | Self::CaptionTooLong { .. } | Self::Decode { .. } | Self::Svg(_)
        )
    }
}

/// Trims a caption and checks that it holds between 1 and
/// [`MAX_CAPTION_CHARS`] characters.
pub fn validate_caption(caption: &str) -> RenderResult<String> {
    let trimmed = caption.trim();
    if trimmed.is_empty() {
        return Err(RenderError::EmptyCaption);
    }
    let len = trimmed.chars().count();
    if len > MAX_CAPTION_CHARS {
        return Err(RenderError::CaptionTooLong {
            len,
            max: MAX_CAPTION_CHARS,
        });
    }
    Ok(trimmed.to_string())
}
