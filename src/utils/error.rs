use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Validation and upstream messages reach the operator verbatim, so no
    // prefix on these two.
    #[error("{message}")]
    ValidationError { message: String },

    #[error("{message}")]
    UpstreamError { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ExportError>;
