//! Base trait for chunking strategies and shared splitting helpers.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::{
    AtomicKind, AtomicRange, Chunk, ChunkConfig, ChunkMetadata, ContentAnalysis, ContentType,
    OversizeReason, StrategyKind,
};

lazy_static! {
    static ref INLINE_CODE_RE: Regex = Regex::new(r"`[^`\n]+`").unwrap();
}

/// The core trait implemented by each chunking strategy.
///
/// A strategy takes the normalized document text plus its structural
/// analysis and splits it into chunks in document order. Strategies fill
/// in structural metadata; global metadata (chunk index, overlap, final
/// size) is applied by the post-processor.
pub trait Strategy: Send + Sync {
    /// Get the name of this strategy.
    fn name(&self) -> &'static str;

    /// The strategy tag recorded in chunk metadata.
    fn kind(&self) -> StrategyKind;

    /// Chunk the given text with the provided configuration.
    fn apply(
        &self,
        text: &str,
        analysis: &ContentAnalysis,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>>;

    /// Get the description of this strategy.
    fn description(&self) -> &'static str {
        "A chunking strategy"
    }
}

/// A contiguous piece of text with its source line range.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Piece {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Number of characters in a string. Sizes throughout the crate are
/// measured in characters, not bytes.
pub(crate) fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Count inline code spans; more than one marks a text chunk as mixed.
pub(crate) fn inline_code_spans(text: &str) -> usize {
    INLINE_CODE_RE.find_iter(text).count()
}

/// Content type for a prose chunk, using the inline-code heuristic.
pub(crate) fn prose_content_type(text: &str) -> ContentType {
    if inline_code_spans(text) > 1 {
        ContentType::Mixed
    } else {
        ContentType::Text
    }
}

/// Split a line region into blank-line-delimited paragraphs.
///
/// `first_line` is the absolute 1-based line number of `lines[0]`. Blank
/// lines are dropped; the non-whitespace content is fully preserved.
pub(crate) fn split_paragraphs(lines: &[&str], first_line: usize) -> Vec<Piece> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0usize;

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(Piece {
                    text: current.join("\n"),
                    start_line: first_line + start,
                    end_line: first_line + i - 1,
                });
                current.clear();
            }
        } else {
            if current.is_empty() {
                start = i;
            }
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(Piece {
            text: current.join("\n"),
            start_line: first_line + start,
            end_line: first_line + lines.len() - 1,
        });
    }

    paragraphs
}

/// Greedily pack paragraphs into pieces of at most `max_chars` characters.
///
/// A paragraph that alone exceeds the limit cascades to sentence and then
/// word boundaries.
pub(crate) fn pack_paragraphs(paragraphs: Vec<Piece>, max_chars: usize) -> Vec<Piece> {
    let mut packed: Vec<Piece> = Vec::new();
    let mut current: Option<Piece> = None;

    for paragraph in paragraphs {
        if paragraph.char_len() > max_chars {
            if let Some(done) = current.take() {
                packed.push(done);
            }
            packed.extend(split_oversized(&paragraph, max_chars));
            continue;
        }

        current = match current.take() {
            None => Some(paragraph),
            Some(mut acc) => {
                // +2 for the blank-line separator
                if acc.char_len() + 2 + paragraph.char_len() > max_chars {
                    packed.push(acc);
                    Some(paragraph)
                } else {
                    acc.text.push_str("\n\n");
                    acc.text.push_str(&paragraph.text);
                    acc.end_line = paragraph.end_line;
                    Some(acc)
                }
            }
        };
    }

    if let Some(done) = current.take() {
        packed.push(done);
    }

    packed
}

/// Split an oversized paragraph at sentence boundaries, falling back to
/// word boundaries for any single sentence that still exceeds the limit.
pub(crate) fn split_oversized(paragraph: &Piece, max_chars: usize) -> Vec<Piece> {
    let mut out = Vec::new();
    for (start, end) in packed_sentence_spans(&paragraph.text, max_chars) {
        let span_text = &paragraph.text[start..end];
        if char_count(span_text) <= max_chars {
            push_span_piece(paragraph, start, end, &mut out);
        } else {
            for (ws, we) in word_spans(span_text, max_chars) {
                push_span_piece(paragraph, start + ws, start + we, &mut out);
            }
        }
    }
    out
}

fn push_span_piece(paragraph: &Piece, start: usize, end: usize, out: &mut Vec<Piece>) {
    let raw = &paragraph.text[start..end];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let leading_ws = raw.len() - raw.trim_start().len();
    let start_line = paragraph.start_line
        + newline_count(&paragraph.text[..start + leading_ws]);
    let end_line = paragraph.start_line + newline_count(paragraph.text[..end].trim_end());
    out.push(Piece {
        text: text.to_string(),
        start_line,
        end_line: end_line.max(start_line),
    });
}

fn newline_count(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Byte spans of sentences, greedily grouped up to `max_chars` per group.
///
/// Sentence boundaries are `.`, `!`, or `?` followed by whitespace or end
/// of text. The spans tile the input, so no content is lost.
fn packed_sentence_spans(text: &str, max_chars: usize) -> Vec<(usize, usize)> {
    let sentences = sentence_spans(text);
    let mut groups: Vec<(usize, usize)> = Vec::new();

    for (start, end) in sentences {
        match groups.last_mut() {
            // Sentence spans tile the text, so extending the last group
            // keeps it contiguous.
            Some((gstart, gend)) if char_count(&text[*gstart..end]) <= max_chars => {
                *gend = end;
            }
            _ => groups.push((start, end)),
        }
    }

    groups
}

/// Byte spans of individual sentences, tiling the whole input.
pub(crate) fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = iter
                .peek()
                .map_or(true, |&(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                spans.push((start, end));
                start = end;
            }
        }
    }

    if start < text.len() {
        spans.push((start, text.len()));
    }
    spans
}

/// Byte spans of word-bounded groups of at most `max_chars` characters.
pub(crate) fn word_spans(text: &str, max_chars: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut chars_in_span = 0usize;

    for (offset, word) in text.split_word_bound_indices() {
        let word_chars = word.chars().count();
        if chars_in_span + word_chars > max_chars && chars_in_span > 0 {
            spans.push((start, offset));
            start = offset;
            chars_in_span = 0;
        }
        chars_in_span += word_chars;
    }

    if start < text.len() {
        spans.push((start, text.len()));
    }
    spans
}

/// Slice a 1-based inclusive line range out of the document's line table.
pub(crate) fn region_text(lines: &[&str], start_line: usize, end_line: usize) -> String {
    lines[start_line - 1..end_line].join("\n")
}

/// How [`split_around_atomics`] labels the chunks it produces.
pub(crate) struct AtomicSplitContext<'a> {
    pub strategy: StrategyKind,
    pub header_path: &'a str,
    pub header_level: u8,
    /// Attribute oversize atomics to section preservation instead of the
    /// block kind itself (the structural strategy's view).
    pub section_integrity: bool,
}

/// Walk a line region as alternating gap and atomic sub-regions.
///
/// Gaps are packed into paragraph chunks; each atomic range becomes exactly
/// one chunk, flagged oversize when it exceeds the limit. Atomic ranges
/// partially outside the region are clamped to it.
pub(crate) fn split_around_atomics(
    lines: &[&str],
    start_line: usize,
    end_line: usize,
    atomics: &[AtomicRange],
    config: &ChunkConfig,
    ctx: &AtomicSplitContext<'_>,
    out: &mut Vec<Chunk>,
) {
    let mut cursor = start_line;

    for range in atomics {
        if range.end_line < start_line || range.start_line > end_line {
            continue;
        }
        let atomic_start = range.start_line.max(start_line);
        let atomic_end = range.end_line.min(end_line);

        if atomic_start > cursor {
            gap_chunks(lines, cursor, atomic_start - 1, config, ctx, out);
        }

        out.push(atomic_chunk(lines, range, atomic_start, atomic_end, config, ctx));
        cursor = atomic_end + 1;
    }

    if cursor <= end_line {
        gap_chunks(lines, cursor, end_line, config, ctx, out);
    }
}

/// Pack a gap region into paragraph chunks.
fn gap_chunks(
    lines: &[&str],
    start_line: usize,
    end_line: usize,
    config: &ChunkConfig,
    ctx: &AtomicSplitContext<'_>,
    out: &mut Vec<Chunk>,
) {
    let region = &lines[start_line - 1..end_line];
    let paragraphs = split_paragraphs(region, start_line);
    for piece in pack_paragraphs(paragraphs, config.max_chunk_size) {
        let metadata = ChunkMetadata {
            strategy: ctx.strategy,
            content_type: prose_content_type(&piece.text),
            header_path: ctx.header_path.to_string(),
            header_level: ctx.header_level,
            ..Default::default()
        };
        out.push(Chunk::new(piece.text, piece.start_line, piece.end_line).with_metadata(metadata));
    }
}

fn atomic_chunk(
    lines: &[&str],
    range: &AtomicRange,
    start_line: usize,
    end_line: usize,
    config: &ChunkConfig,
    ctx: &AtomicSplitContext<'_>,
) -> Chunk {
    let content = region_text(lines, start_line, end_line);
    let mut metadata = match range.kind {
        AtomicKind::Fence => ChunkMetadata::for_code(range.language.as_deref()),
        AtomicKind::Table => ChunkMetadata::for_table(),
    };
    metadata.strategy = ctx.strategy;
    metadata.header_path = ctx.header_path.to_string();
    metadata.header_level = ctx.header_level;

    if char_count(&content) > config.max_chunk_size {
        let reason = if ctx.section_integrity {
            OversizeReason::SectionIntegrity
        } else {
            match range.kind {
                AtomicKind::Fence => OversizeReason::CodeBlockIntegrity,
                AtomicKind::Table => OversizeReason::TableIntegrity,
            }
        };
        metadata = metadata.with_oversize(reason);
    }

    Chunk::new(content, start_line, end_line).with_metadata(metadata)
}
