use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Summarizer error: {message}")]
    Summarizer { message: String },
}

impl SearchError {
    /// Errors that must fail the whole request rather than degrade it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
