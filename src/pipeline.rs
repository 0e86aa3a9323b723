//! The chunking pipeline: normalize, analyze, select, apply, post-process.

use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::error::ChunkerError;
use crate::postprocess::PostProcessor;
use crate::router::StrategyRouter;
use crate::types::{Chunk, ChunkConfig, ContentAnalysis};

/// Batch chunking pipeline.
///
/// Owns a validated configuration and drives the full flow for each
/// invocation. Invocations share nothing and are pure: the same text and
/// configuration always produce bytewise identical chunks.
pub struct ChunkPipeline {
    analyzer: Analyzer,
    router: StrategyRouter,
    config: ChunkConfig,
}

impl ChunkPipeline {
    /// Create a pipeline, validating the configuration up front.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkerError> {
        config.validate()?;
        Ok(Self {
            analyzer: Analyzer::new(),
            router: StrategyRouter::new(),
            config,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunk a document.
    pub fn run(&self, text: &str) -> Result<Vec<Chunk>, ChunkerError> {
        self.run_with_analysis(text).map(|(chunks, _)| chunks)
    }

    /// Chunk a document and return the structural analysis along with the
    /// chunks, for callers that want the metrics.
    pub fn run_with_analysis(
        &self,
        text: &str,
    ) -> Result<(Vec<Chunk>, ContentAnalysis), ChunkerError> {
        let normalized = normalize(text);
        if normalized.trim().is_empty() {
            debug!("whitespace-only input, nothing to chunk");
            return Ok((Vec::new(), ContentAnalysis::default()));
        }

        let analysis = self.analyzer.analyze(&normalized);
        for warning in &analysis.warnings {
            warn!(?warning, "recoverable parse issue");
        }

        let kind = self.router.select(&analysis, &self.config);
        let chunks = self
            .router
            .get(kind)
            .apply(&normalized, &analysis, &self.config)?;

        let chunks =
            PostProcessor::new(&analysis, kind, &self.config).process(chunks, &normalized);
        Ok((chunks, analysis))
    }
}

/// Strip a BOM and normalize CRLF/CR line endings to LF.
pub(crate) fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Chunk a markdown document with the given configuration.
///
/// This is the batch entry point. Returns chunks in document order; a
/// whitespace-only input yields an empty list rather than an error.
pub fn chunk_markdown(text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>, ChunkerError> {
    ChunkPipeline::new(config.clone())?.run(text)
}

/// Chunk a markdown document and also return the structural analysis.
pub fn chunk_markdown_with_analysis(
    text: &str,
    config: &ChunkConfig,
) -> Result<(Vec<Chunk>, ContentAnalysis), ChunkerError> {
    ChunkPipeline::new(config.clone())?.run_with_analysis(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, StrategyKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunks = chunk_markdown("", &ChunkConfig::default()).unwrap();
        assert!(chunks.is_empty());

        let chunks = chunk_markdown("  \n\t\n  ", &ChunkConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_single_paragraph_below_min() {
        let chunks = chunk_markdown("Hello, world.", &ChunkConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world.");
        assert_eq!(chunks[0].metadata.strategy, StrategyKind::Fallback);
        assert_eq!(chunks[0].metadata.content_type, ContentType::Text);
        assert_eq!(chunks[0].metadata.size, 13);
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let mut config = ChunkConfig::default();
        config.overlap_size = config.max_chunk_size;
        let result = chunk_markdown("some text", &config);
        assert!(matches!(result, Err(ChunkerError::InvalidConfig(_))));
    }

    #[test]
    fn test_line_ending_normalization() {
        assert_eq!(normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize("\u{feff}title"), "title");
    }

    #[test]
    fn test_crlf_input_matches_lf_input() {
        let lf = "# A\n\nfirst paragraph.\n\n# B\n\nsecond paragraph.\n";
        let crlf = lf.replace('\n', "\r\n");
        let config = ChunkConfig::default();

        let from_lf = chunk_markdown(lf, &config).unwrap();
        let from_crlf = chunk_markdown(&crlf, &config).unwrap();
        assert_eq!(from_lf, from_crlf);
    }

    #[test]
    fn test_deterministic_output() {
        let text = "# Title\n\nbody text.\n\n```rust\nfn f() {}\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let config = ChunkConfig::default();

        let first = chunk_markdown(text, &config).unwrap();
        let second = chunk_markdown(text, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analysis_returned_alongside_chunks() {
        let text = "# A\n\n```\ncode\n```\n";
        let (chunks, analysis) =
            chunk_markdown_with_analysis(text, &ChunkConfig::default()).unwrap();

        assert!(!chunks.is_empty());
        assert_eq!(analysis.code_block_count, 1);
        assert_eq!(analysis.header_count, 1);
    }

    #[test]
    fn test_code_document_routes_code_aware() {
        let text = "intro\n\n```python\nprint('x')\n```\n\noutro\n";
        let chunks = chunk_markdown(text, &ChunkConfig::default()).unwrap();

        assert!(chunks
            .iter()
            .all(|c| c.metadata.strategy == StrategyKind::CodeAware));
        assert!(chunks
            .iter()
            .any(|c| c.metadata.content_type == ContentType::Code));
    }
}
