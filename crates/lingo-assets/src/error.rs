use std::io;

/// Install was stopped through its cancellation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Install cancelled")]
pub struct Cancelled;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Server sent an empty file")]
    EmptyPayload,

    #[error("Download truncated: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Cancelled")]
    Cancelled,
}

