use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Transport(String),

    #[error("model API returned non-success status {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("malformed model response: {0}")]
    Protocol(String),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid JSON chunk: {err}"))
    }
}
