use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The exchange was aborted by an explicit cancel. Recovered silently;
    /// never surfaced into the conversation.
    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

impl ChatError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}
