use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Decode error: {0}")]
    DecodeError(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
