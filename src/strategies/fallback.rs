//! Paragraph-packing fallback for unstructured documents.

use anyhow::Result;

use super::base::{pack_paragraphs, split_paragraphs, Strategy};
use crate::types::{Chunk, ChunkConfig, ChunkMetadata, ContentAnalysis, StrategyKind};

/// Strategy of last resort for documents with no usable structure.
///
/// Groups blank-line-delimited paragraphs into size-bounded chunks,
/// cascading to sentence and word boundaries when a single paragraph
/// exceeds the limit.
#[derive(Debug, Default)]
pub struct FallbackStrategy;

impl FallbackStrategy {
    /// Create a new fallback strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn description(&self) -> &'static str {
        "Greedy paragraph packing with sentence and word cascades"
    }

    fn apply(
        &self,
        text: &str,
        _analysis: &ContentAnalysis,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Ok(vec![]);
        }

        let paragraphs = split_paragraphs(&lines, 1);
        let chunks = pack_paragraphs(paragraphs, config.max_chunk_size)
            .into_iter()
            .map(|piece| {
                let metadata = ChunkMetadata {
                    strategy: StrategyKind::Fallback,
                    ..Default::default()
                };
                Chunk::new(piece.text, piece.start_line, piece.end_line).with_metadata(metadata)
            })
            .collect();
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::types::ContentType;
    use pretty_assertions::assert_eq;

    fn apply(text: &str, config: &ChunkConfig) -> Vec<Chunk> {
        let analysis = Analyzer::new().analyze(text);
        FallbackStrategy::new()
            .apply(text, &analysis, config)
            .unwrap()
    }

    #[test]
    fn test_single_paragraph() {
        let chunks = apply("Hello, world.", &ChunkConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world.");
        assert_eq!(chunks[0].metadata.content_type, ContentType::Text);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 1));
    }

    #[test]
    fn test_paragraphs_packed_up_to_limit() {
        let text = "alpha alpha alpha.\n\nbeta beta beta.\n\ngamma gamma gamma.\n";
        let chunks = apply(text, &ChunkConfig::with_size(45).with_min_size(5));

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 45);
        }
    }

    #[test]
    fn test_giant_paragraph_cascades() {
        let text = "Sentence number one right here. ".repeat(20);
        let chunks = apply(text.trim_end(), &ChunkConfig::with_size(100).with_min_size(10));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 100);
        }
    }
}
