//! Streaming front-end for large documents.
//!
//! Batch chunking needs the whole document in memory; for big files
//! (roughly 10 MB and up) the streaming front-end reads bounded line
//! windows instead, finds fence-safe split points, and feeds each window
//! to the batch pipeline. Memory use is proportional to the window size,
//! not the file.

pub mod fence_tracker;
pub mod split;
mod stream;

use serde::{Deserialize, Serialize};

pub use fence_tracker::FenceTracker;
pub use split::SplitDetector;
pub use stream::ChunkStream;

use crate::error::ChunkerError;
use crate::{
    DEFAULT_SAFE_SPLIT_THRESHOLD, DEFAULT_STREAM_BUFFER_SIZE, DEFAULT_STREAM_MAX_MEMORY_MB,
    DEFAULT_STREAM_OVERLAP_LINES,
};

/// Configuration for the streaming front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Bytes accumulated per window before a split is attempted
    pub buffer_size: usize,

    /// Lines of an emitted window re-fed to the next one for context
    pub overlap_lines: usize,

    /// Memory hint in megabytes; caps window growth when it is smaller
    /// than `buffer_size`
    pub max_memory_mb: usize,

    /// Fraction of the window that must be consumed before a split point
    /// is considered, in (0, 1)
    pub safe_split_threshold: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            overlap_lines: DEFAULT_STREAM_OVERLAP_LINES,
            max_memory_mb: DEFAULT_STREAM_MAX_MEMORY_MB,
            safe_split_threshold: DEFAULT_SAFE_SPLIT_THRESHOLD,
        }
    }
}

impl StreamingConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.buffer_size == 0 {
            return Err(ChunkerError::InvalidConfig(
                "buffer_size must be at least 1 byte".to_string(),
            ));
        }
        if self.max_memory_mb == 0 {
            return Err(ChunkerError::InvalidConfig(
                "max_memory_mb must be at least 1".to_string(),
            ));
        }
        if !(self.safe_split_threshold > 0.0 && self.safe_split_threshold < 1.0) {
            return Err(ChunkerError::InvalidConfig(format!(
                "safe_split_threshold ({}) must be within (0, 1)",
                self.safe_split_threshold
            )));
        }
        Ok(())
    }
}
