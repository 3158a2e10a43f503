use thiserror::Error;

/// Every failure surfaced by the Sonic client.
///
/// Callers that only need a human-readable string can rely on `Display`
/// (or [`SonicError::message`]); `Api` renders as the resolved server
/// message with no prefix.
#[derive(Error, Debug)]
pub enum SonicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Reqwest error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SonicError {
    pub fn code(&self) -> &'static str {
        match self {
            SonicError::Config(_) => "CONFIG_ERROR",
            SonicError::InvalidInput(_) => "INVALID_INPUT",
            SonicError::Api { .. } => "API_ERROR",
            SonicError::Protocol(_) => "PROTOCOL_ERROR",
            SonicError::Transport(_) => "HTTP_ERROR",
        }
    }

    /// HTTP status of the failed call, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SonicError::Api { status, .. } => Some(*status),
            SonicError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<url::ParseError> for SonicError {
    fn from(err: url::ParseError) -> Self {
        SonicError::Config(format!("Invalid base URL: {}", err))
    }
}
