//! Remote service errors with a transient/permanent classification.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Gmail API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("could not decode Gmail response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting, server-busy and dropped connections are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            RemoteError::Transport(_) => true,
            RemoteError::Decode(_) => false,
        }
    }

    /// Filter creation also sees spurious 400s while the account is under load.
    pub fn is_transient_for_filter_create(&self) -> bool {
        self.is_transient() || self.status() == Some(400)
    }
}
