use shared::error::{ErrorBody, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid api base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server responded with HTTP {status}")]
    Status {
        status: u16,
        body: Option<ErrorBody>,
    },
    #[error("failed to encode request body: {0}")]
    Encode(String),
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// A failed store operation, already carrying the user-facing message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: TransportError,
    },
    #[error("{message}")]
    Domain { status_code: i64, message: String },
}

impl StoreError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::Transport { message, .. } | Self::Domain { message, .. } => message,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::Domain { .. } => FailureKind::Domain,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_not_found(),
            Self::Domain { status_code, .. } => *status_code == 404,
        }
    }
}
