//! Error types for the media provider client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    /// Missing or malformed provider configuration
    #[error("Media configuration error: {0}")]
    Configuration(String),

    /// The URL does not point at a provider-hosted asset
    #[error("Not a media delivery URL: {0}")]
    InvalidUrl(String),

    /// Nothing to upload
    #[error("Empty upload")]
    EmptyUpload,

    /// The provider answered with an error
    #[error("Media provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable answer
    #[error("Media provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;
