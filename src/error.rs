use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("Please load an image first")]
    NoImageLoaded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Malformed metadata container: {0}")]
    MalformedContainer(String),

    #[error("Input of {size} bytes exceeds the {limit} byte analysis limit")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

pub type Result<T> = std::result::Result<T, ForensicsError>;
