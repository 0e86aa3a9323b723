//! Error types for the chunking library.
//!
//! The boundary uses structured error values: configuration problems and
//! stream I/O failures surface to the caller, while recoverable parse
//! issues are demoted to warnings on the analysis or chunk metadata.

use thiserror::Error;

/// Errors surfaced at the library boundary.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// The provided configuration is inconsistent or out of range.
    ///
    /// No chunks are produced when this is returned.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The underlying stream or file failed during streaming iteration.
    ///
    /// Chunks already yielded before the failure remain valid.
    #[error("stream I/O failure: {0}")]
    StreamIo(#[from] std::io::Error),

    /// Internal processing failure. Indicates a bug rather than bad input.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ChunkerError::InvalidConfig("overlap_size >= max_chunk_size".to_string());
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChunkerError = io.into();
        assert!(matches!(err, ChunkerError::StreamIo(_)));
    }
}
