use thiserror::Error;

use crate::state::PipelineId;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unsupported webhook event kind: {0:?}")]
    UnsupportedEventKind(String),

    #[error("Pipeline {0} not found")]
    PipelineNotFound(PipelineId),

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Failed to update message: {0}")]
    UpdateFailed(String),

    #[error("Telegram API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
