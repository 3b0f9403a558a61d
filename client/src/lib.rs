pub mod client;
pub mod listener;
pub mod pending;

pub use client::{Client, Completion};
pub use listener::{
    ConnectionState, InvalidationSink, Listener, ListenerConfig, ListenerHandle, StaleViews,
    DEFAULT_RECONNECT_DELAY,
};
pub use pending::PendingCompletions;
use ringtone_types::catalog::ValidationError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    /// The service refused the request; `message` is its own wording, shown verbatim.
    #[error("{message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(#[source] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("session completion aborted before it settled")]
    CompletionAborted,
}

impl Error {
    /// Status of a rejected request.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
