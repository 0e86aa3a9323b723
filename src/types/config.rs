//! Configuration for batch chunking.

use serde::{Deserialize, Serialize};

use crate::error::ChunkerError;
use crate::types::StrategyKind;
use crate::{
    DEFAULT_CODE_THRESHOLD, DEFAULT_COVERAGE_TOLERANCE, DEFAULT_MAX_CHUNK_SIZE,
    DEFAULT_MIN_CHUNK_SIZE, DEFAULT_OVERLAP_SIZE, DEFAULT_STRUCTURE_THRESHOLD,
};

/// Configuration for a chunking invocation.
///
/// All sizes are in characters. The defaults target embedding-sized chunks
/// of roughly two thousand characters with a light overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Upper target size per chunk
    pub max_chunk_size: usize,

    /// Chunks below this floor are merged with a neighbor
    pub min_chunk_size: usize,

    /// Overlap spliced onto each side of a chunk
    pub overlap_size: usize,

    /// Atomic blocks (fences, tables) are never split. Always true in
    /// effect; present so callers can express intent explicitly.
    pub preserve_atomic_blocks: bool,

    /// Code ratio at or above which the code-aware strategy is eligible
    pub code_threshold: f64,

    /// Minimum header count for the structural strategy
    pub structure_threshold: usize,

    /// Force a specific strategy by name (`code_aware`, `structural`,
    /// `fallback`) instead of arbitration
    pub strategy_override: Option<String>,

    /// Tolerated content-coverage drift during validation, as a fraction
    /// of the source's non-whitespace length
    pub coverage_tolerance: f64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            preserve_atomic_blocks: true,
            code_threshold: DEFAULT_CODE_THRESHOLD,
            structure_threshold: DEFAULT_STRUCTURE_THRESHOLD,
            strategy_override: None,
            coverage_tolerance: DEFAULT_COVERAGE_TOLERANCE,
        }
    }
}

impl ChunkConfig {
    /// Create a config with the given maximum chunk size.
    pub fn with_size(size: usize) -> Self {
        Self {
            max_chunk_size: size,
            ..Default::default()
        }
    }

    /// Set the merge floor.
    pub fn with_min_size(mut self, min: usize) -> Self {
        self.min_chunk_size = min;
        self
    }

    /// Set the overlap.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap_size = overlap;
        self
    }

    /// Set the structural header threshold.
    pub fn with_structure_threshold(mut self, threshold: usize) -> Self {
        self.structure_threshold = threshold;
        self
    }

    /// Force a strategy instead of arbitration.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy_override = Some(strategy.as_str().to_string());
        self
    }

    /// Parse the strategy override, if any.
    pub fn override_kind(&self) -> Result<Option<StrategyKind>, ChunkerError> {
        self.strategy_override
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Check the configuration for internal consistency.
    ///
    /// Returns [`ChunkerError::InvalidConfig`] describing the first problem
    /// found; a failed validation produces no chunks.
    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.max_chunk_size == 0 {
            return Err(ChunkerError::InvalidConfig(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.max_chunk_size < self.min_chunk_size {
            return Err(ChunkerError::InvalidConfig(format!(
                "max_chunk_size ({}) is below min_chunk_size ({})",
                self.max_chunk_size, self.min_chunk_size
            )));
        }
        if self.overlap_size >= self.max_chunk_size {
            return Err(ChunkerError::InvalidConfig(format!(
                "overlap_size ({}) must be below max_chunk_size ({})",
                self.overlap_size, self.max_chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.code_threshold) {
            return Err(ChunkerError::InvalidConfig(format!(
                "code_threshold ({}) must be within [0, 1]",
                self.code_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.coverage_tolerance) {
            return Err(ChunkerError::InvalidConfig(format!(
                "coverage_tolerance ({}) must be within [0, 1]",
                self.coverage_tolerance
            )));
        }
        self.override_kind()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChunkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = ChunkConfig::with_size(100).with_min_size(200);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overlap_at_max() {
        let mut config = ChunkConfig::with_size(100).with_min_size(10);
        config.overlap_size = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = ChunkConfig::default();
        config.code_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_override() {
        let mut config = ChunkConfig::default();
        config.strategy_override = Some("semantic".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_accepts_known_override() {
        let config = ChunkConfig::default().with_strategy(StrategyKind::Structural);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.override_kind().unwrap(),
            Some(StrategyKind::Structural)
        );
    }

    #[test]
    fn test_rejects_zero_max() {
        let mut config = ChunkConfig::default();
        config.max_chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
