//! Local-only persistence: a synchronous key-value store and the launcher
//! list mirrored into it.

pub mod local;
pub mod storage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value for {key} is not valid: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no entry at position {index} (list has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}
