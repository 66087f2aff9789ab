//! Error types for the LOD engine

use thiserror::Error;

/// Main error type for the engine
///
/// Only recoverable conditions live here. Broken ownership or locking
/// discipline (reading a cut level, writing without a lease) panics instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("detail level mismatch: expected {expected}, found {found}")]
    DetailMismatch { expected: u8, found: u8 },

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    #[error("truncated container data: needed {needed} bytes, found {found}")]
    Truncated { needed: usize, found: usize },

    #[error("corrupt container: {0}")]
    Corrupt(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Executor error: {0}")]
    Executor(String),
}

impl Error {
    /// True for errors caused by malformed or incompatible stored data.
    ///
    /// Callers loading regions fall back to regenerating on these.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::DetailMismatch { .. }
                | Error::UnsupportedVersion(_)
                | Error::Truncated { .. }
                | Error::Corrupt(_)
                | Error::Compression(_)
        )
    }
}
