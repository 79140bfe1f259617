//! Error types for the virtu engine.

/// Errors raised while serving a session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client went away; nothing more can be delivered.
    #[error("client disconnected")]
    Disconnected,

    /// The completion service failed or returned something unusable.
    #[error("completion error: {0}")]
    Completion(String),

    /// The speech synthesizer failed or returned something unusable.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Invalid startup configuration (catalog files and the like).
    #[error("config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Disconnects end a session quietly; everything else is worth logging.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
