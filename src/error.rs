use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("chart unavailable for {symbol}: {reason}")]
    ChartUnavailable { symbol: String, reason: String },

    #[error("signal #{index} is not in the loaded history of {bot_id}")]
    UnknownSignal { bot_id: String, index: usize },

    #[error("no bot detail is open")]
    NoBotSelected,

    #[error("invalid API url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl DeskError {
    /// Failures a poll or fetch can recover from by retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeskError::Transport(_) | DeskError::Decode(_) | DeskError::Status { .. }
        )
    }
}
