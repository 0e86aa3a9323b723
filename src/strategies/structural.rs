//! Section-based chunking along the header hierarchy.

use anyhow::Result;

use super::base::{
    char_count, pack_paragraphs, region_text, split_around_atomics, split_paragraphs,
    AtomicSplitContext, Strategy,
};
use crate::types::{
    AtomicRange, Chunk, ChunkConfig, ChunkMetadata, ContentAnalysis, ContentType, OversizeReason,
    StrategyKind, PREAMBLE_PATH,
};

/// Strategy for well-structured prose documents.
///
/// Emits the preamble first, then one region per header section. Each
/// section carries the ancestor header chain as its `header_path`.
/// Oversized sections are split around their atomic blocks when they have
/// any, and cascade through paragraph, sentence, and word boundaries
/// otherwise.
#[derive(Debug, Default)]
pub struct StructuralStrategy;

impl StructuralStrategy {
    /// Create a new structural strategy.
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_section(
        &self,
        lines: &[&str],
        start_line: usize,
        end_line: usize,
        header_path: &str,
        header_level: u8,
        atomics: &[AtomicRange],
        config: &ChunkConfig,
        out: &mut Vec<Chunk>,
    ) {
        if start_line > end_line {
            return;
        }
        let content = region_text(lines, start_line, end_line);
        if content.trim().is_empty() {
            return;
        }

        let has_atomic = atomics
            .iter()
            .any(|r| r.start_line <= end_line && r.end_line >= start_line);

        if char_count(&content) <= config.max_chunk_size {
            let content_type = if has_atomic {
                ContentType::Mixed
            } else {
                ContentType::Text
            };
            let metadata = ChunkMetadata {
                strategy: StrategyKind::Structural,
                content_type,
                ..ChunkMetadata::for_section(header_path, header_level)
            };
            out.push(Chunk::new(content, start_line, end_line).with_metadata(metadata));
            return;
        }

        if has_atomic {
            let ctx = AtomicSplitContext {
                strategy: StrategyKind::Structural,
                header_path,
                header_level,
                section_integrity: true,
            };
            split_around_atomics(lines, start_line, end_line, atomics, config, &ctx, out);
            return;
        }

        let region = &lines[start_line - 1..end_line];
        let paragraphs = split_paragraphs(region, start_line);
        for piece in pack_paragraphs(paragraphs, config.max_chunk_size) {
            let metadata = ChunkMetadata {
                strategy: StrategyKind::Structural,
                ..ChunkMetadata::for_section(header_path, header_level)
            };
            out.push(
                Chunk::new(piece.text, piece.start_line, piece.end_line).with_metadata(metadata),
            );
        }
    }
}

/// Join an ancestor stack and the current header into a `/A/B/C` path.
fn build_path(stack: &[(u8, String)], current: &str) -> String {
    let mut path = String::new();
    for (_, text) in stack {
        path.push('/');
        path.push_str(text);
    }
    path.push('/');
    path.push_str(current);
    path
}

impl Strategy for StructuralStrategy {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Structural
    }

    fn description(&self) -> &'static str {
        "Splits by header sections, preserving the header hierarchy as metadata"
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
        let mut chunks = Vec::new();

        let first_header_line = analysis
            .headers
            .first()
            .map(|h| h.line)
            .unwrap_or(lines.len() + 1);

        if first_header_line > 1 {
            let end = first_header_line - 1;
            let region = region_text(&lines, 1, end);
            if !region.trim().is_empty() {
                if analysis.has_preamble {
                    let mut metadata = ChunkMetadata {
                        strategy: StrategyKind::Structural,
                        content_type: ContentType::Preamble,
                        ..ChunkMetadata::for_section(PREAMBLE_PATH, 0)
                    };
                    if char_count(&region) > config.max_chunk_size {
                        metadata = metadata.with_oversize(OversizeReason::SectionIntegrity);
                    }
                    chunks.push(Chunk::new(region, 1, end).with_metadata(metadata));
                } else {
                    // Leading content too small to qualify as a preamble is
                    // still source content; emit it unlabeled.
                    self.emit_section(&lines, 1, end, "", 0, &atomics, config, &mut chunks);
                }
            }
        }

        let mut stack: Vec<(u8, String)> = Vec::new();
        for (i, header) in analysis.headers.iter().enumerate() {
            let section_end = analysis
                .headers
                .get(i + 1)
                .map(|next| next.line - 1)
                .unwrap_or(lines.len());

            while stack
                .last()
                .map_or(false, |(level, _)| *level >= header.level)
            {
                stack.pop();
            }
            let path = build_path(&stack, &header.text);
            stack.push((header.level, header.text.clone()));

            self.emit_section(
                &lines,
                header.line,
                section_end,
                &path,
                header.level,
                &atomics,
                config,
                &mut chunks,
            );
        }

        Ok(chunks)
    }
}
