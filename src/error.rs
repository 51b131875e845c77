use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("{axis} axis has {found} values but z has {expected} {what}")]
    ShapeMismatch {
        axis: &'static str,
        found: usize,
        expected: usize,
        what: &'static str,
    },

    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("invalid metadata: {0}")]
    InvalidMeta(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("unsupported image format '{0}'")]
    UnsupportedFormat(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl PlotError {
    /// Wraps any plotters drawing error.
    pub(crate) fn render(err: impl std::fmt::Display) -> Self {
        PlotError::Render(err.to_string())
    }
}
