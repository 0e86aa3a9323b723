//! Code-aware chunking that never cuts inside a fence or table.

use anyhow::Result;

use super::base::{split_around_atomics, AtomicSplitContext, Strategy};
use crate::types::{Chunk, ChunkConfig, ContentAnalysis, StrategyKind};

/// Strategy for documents dominated by atomic blocks.
///
/// Walks the document as alternating gap and atomic regions: gaps are
/// packed into paragraph chunks, while every fenced block and table
/// becomes exactly one chunk, flagged oversize when it cannot fit the
/// configured limit.
#[derive(Debug, Default)]
pub struct CodeAwareStrategy;

impl CodeAwareStrategy {
    /// Create a new code-aware strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for CodeAwareStrategy {
    fn name(&self) -> &'static str {
        "code_aware"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::CodeAware
    }

    fn description(&self) -> &'static str {
        "Splits around atomic code blocks and tables without ever cutting inside them"
    }

    fn apply(
        &self,
        text: &str,
        analysis: &ContentAnalysis,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Ok(vec![]);
        }

        let atomics = analysis.atomic_ranges();
        let ctx = AtomicSplitContext {
            strategy: StrategyKind::CodeAware,
            header_path: "",
            header_level: 0,
            section_integrity: false,
        };

        let mut chunks = Vec::new();
        split_around_atomics(
            &lines,
            1,
            lines.len(),
            &atomics,
            config,
            &ctx,
            &mut chunks,
        );
        Ok(chunks)
    }
}
