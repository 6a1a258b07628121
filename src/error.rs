use thiserror::Error;

/// Precondition violations reported by the per-image analysis.
///
/// Degenerate images (flat, no contours, nothing above the size threshold)
/// are not errors; they produce an empty [`crate::AnalysisResult`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error(
        "image {width}x{height} is smaller than one gradient cell at resolution {resolution}"
    )]
    ImageTooSmall {
        width: u32,
        height: u32,
        resolution: f64,
    },

    #[error("image has no pixels")]
    EmptyImage,

    #[error("failed to write debug output: {0}")]
    DebugOutput(String),
}

impl AnalysisError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
