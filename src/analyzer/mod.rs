//! Single-pass structural analysis of markdown documents.
//!
//! The analyzer scans LF-normalized text line by line and extracts fenced
//! code blocks, ATX headers, GFM tables, and the preamble region, plus the
//! content-ratio metrics used for strategy arbitration. The hot loop is a
//! plain line scan; regexes are only used for header and separator-row
//! shape checks.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::types::{ContentAnalysis, FencedBlock, HeaderInfo, ParseWarning, TableBlock};
use crate::{PREAMBLE_MIN_CHARS, PREAMBLE_MIN_LINES};

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"^(#{1,6})\s+(.+)$").unwrap();
}

/// State of an open fence while scanning.
struct OpenFence {
    fence_char: char,
    fence_len: usize,
    language: Option<String>,
    start_line: usize,
    start_byte: usize,
}

/// Structural analyzer for markdown text.
///
/// Produces a [`ContentAnalysis`] in a single pass. Expects line endings
/// already normalized to LF; the pipeline takes care of that.
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Scan the document and produce its structural analysis.
    pub fn analyze(&self, text: &str) -> ContentAnalysis {
        let lines: Vec<&str> = text.lines().collect();

        let mut line_offsets = Vec::with_capacity(lines.len());
        let mut offset = 0usize;
        for line in &lines {
            line_offsets.push(offset);
            offset += line.len() + 1;
        }

        let mut code_blocks = Vec::new();
        let mut headers: Vec<HeaderInfo> = Vec::new();
        let mut tables = Vec::new();
        let mut warnings = Vec::new();
        let mut open_fence: Option<OpenFence> = None;

        let mut i = 0usize;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            if let Some(open) = &open_fence {
                if is_fence_close(trimmed, open.fence_char, open.fence_len) {
                    let open = open_fence.take().expect("fence state checked above");
                    code_blocks.push(FencedBlock {
                        language: open.language,
                        start_line: open.start_line,
                        end_line: i + 1,
                        start_byte: open.start_byte,
                        end_byte: line_offsets[i] + line.len(),
                        fence_char: open.fence_char,
                        fence_len: open.fence_len,
                        closed: true,
                    });
                }
                i += 1;
                continue;
            }

            if let Some((fence_char, fence_len, language)) = parse_fence_open(trimmed) {
                open_fence = Some(OpenFence {
                    fence_char,
                    fence_len,
                    language,
                    start_line: i + 1,
                    start_byte: line_offsets[i],
                });
                i += 1;
                continue;
            }

            if let Some(caps) = HEADER_RE.captures(trimmed) {
                let level = caps[1].len() as u8;
                let raw = caps[2].trim();
                // Trailing closing-hash runs are decoration, not text.
                let stripped = raw.trim_end_matches('#').trim_end();
                let text = if stripped.is_empty() { raw } else { stripped };
                headers.push(HeaderInfo {
                    level,
                    text: text.to_string(),
                    line: i + 1,
                    byte_offset: line_offsets[i],
                });
                i += 1;
                continue;
            }

            if is_pipe_row(trimmed) && i + 1 < lines.len() {
                let next = lines[i + 1].trim();
                if is_pipe_row(next) && is_separator_row(next) {
                    let header_cells = cell_count(trimmed);
                    let separator_cells = cell_count(next);
                    if header_cells == separator_cells {
                        let mut end = i + 1;
                        while end + 1 < lines.len() && is_pipe_row(lines[end + 1].trim()) {
                            end += 1;
                        }
                        tables.push(TableBlock {
                            start_line: i + 1,
                            end_line: end + 1,
                            column_count: separator_cells,
                            row_count: end - i + 1,
                        });
                        i = end + 1;
                        continue;
                    }
                    // Separator shape without a matching cell count: the
                    // rows stay ordinary text.
                    warnings.push(ParseWarning::MalformedTable { line: i + 1 });
                }
            }

            i += 1;
        }

        if let Some(open) = open_fence.take() {
            warnings.push(ParseWarning::UnclosedFence {
                line: open.start_line,
            });
            code_blocks.push(FencedBlock {
                language: open.language,
                start_line: open.start_line,
                end_line: lines.len(),
                start_byte: open.start_byte,
                end_byte: text.len(),
                fence_char: open.fence_char,
                fence_len: open.fence_len,
                closed: false,
            });
        }

        let total_chars = text.chars().count();
        let code_chars: usize = code_blocks
            .iter()
            .map(|b| text[b.start_byte..b.end_byte.min(text.len())].chars().count())
            .sum();
        let code_ratio = code_chars as f64 / total_chars.max(1) as f64;

        let (has_preamble, preamble_end_line) =
            detect_preamble(text, &lines, headers.first());

        let analysis = ContentAnalysis {
            total_chars,
            total_lines: lines.len(),
            code_ratio,
            code_block_count: code_blocks.len(),
            header_count: headers.len(),
            max_header_depth: headers.iter().map(|h| h.level).max().unwrap_or(0),
            table_count: tables.len(),
            code_blocks,
            headers,
            tables,
            has_preamble,
            preamble_end_line,
            warnings,
        };

        debug!(
            total_lines = analysis.total_lines,
            code_blocks = analysis.code_block_count,
            headers = analysis.header_count,
            tables = analysis.table_count,
            code_ratio = analysis.code_ratio,
            "analyzed document"
        );

        analysis
    }
}

/// Whether a trimmed line is an ATX header.
pub(crate) fn is_atx_header(trimmed: &str) -> bool {
    HEADER_RE.is_match(trimmed)
}

/// Check whether a trimmed line opens a fence; returns the fence character,
/// run length, and language tag.
pub(crate) fn parse_fence_open(trimmed: &str) -> Option<(char, usize, Option<String>)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    if run < 3 {
        return None;
    }
    let tag = trimmed[run..].trim();
    let language = if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    };
    Some((first, run, language))
}

/// A closing fence is a run of the opening character, at least as long as
/// the opening run, with no other content on the line.
pub(crate) fn is_fence_close(trimmed: &str, fence_char: char, fence_len: usize) -> bool {
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c == fence_char)
        && trimmed.chars().count() >= fence_len
}

fn is_pipe_row(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Separator rows consist of cells of dashes, optional colons, and
/// whitespace only.
fn is_separator_row(trimmed: &str) -> bool {
    cells(trimmed).iter().all(|cell| {
        cell.contains('-')
            && cell
                .chars()
                .all(|c| c == '-' || c == ':' || c.is_whitespace())
    })
}

fn cells(trimmed: &str) -> Vec<&str> {
    let inner = trimmed
        .strip_prefix('|')
        .unwrap_or(trimmed)
        .strip_suffix('|')
        .unwrap_or(trimmed);
    inner.split('|').collect()
}

fn cell_count(trimmed: &str) -> usize {
    cells(trimmed).len()
}

/// Preamble: enough non-blank content before the first header, or the whole
/// document when it has no headers at all.
fn detect_preamble(
    text: &str,
    lines: &[&str],
    first_header: Option<&HeaderInfo>,
) -> (bool, usize) {
    match first_header {
        Some(header) => {
            let region = &lines[..header.line - 1];
            let non_blank = region.iter().filter(|l| !l.trim().is_empty()).count();
            let region_chars = text[..header.byte_offset].trim().chars().count();
            if non_blank >= PREAMBLE_MIN_LINES && region_chars >= PREAMBLE_MIN_CHARS {
                (true, header.line)
            } else {
                (false, 0)
            }
        }
        None => {
            if text.trim().is_empty() {
                (false, 0)
            } else {
                (true, lines.len() + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyze(text: &str) -> ContentAnalysis {
        Analyzer::new().analyze(text)
    }

    #[test]
    fn test_basic_fence_extraction() {
        let text = "intro\n\n```python\nprint('hi')\n```\n\noutro\n";
        let analysis = analyze(text);

        assert_eq!(analysis.code_block_count, 1);
        let block = &analysis.code_blocks[0];
        assert_eq!(block.language.as_deref(), Some("python"));
        assert_eq!(block.start_line, 3);
        assert_eq!(block.end_line, 5);
        assert!(block.closed);
        assert_eq!(block.fence_char, '`');
        assert_eq!(block.fence_len, 3);
        assert!(analysis.code_ratio > 0.0);
    }

    #[test]
    fn test_tilde_fence() {
        let text = "~~~rust\nfn main() {}\n~~~\n";
        let analysis = analyze(text);

        assert_eq!(analysis.code_block_count, 1);
        assert_eq!(analysis.code_blocks[0].fence_char, '~');
        assert_eq!(analysis.code_blocks[0].language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_nested_shorter_fence_is_content() {
        let text = "````\nouter\n```\ninner\n```\n````\n";
        let analysis = analyze(text);

        assert_eq!(analysis.code_block_count, 1);
        let block = &analysis.code_blocks[0];
        assert_eq!(block.start_line, 1);
        assert_eq!(block.end_line, 6);
        assert_eq!(block.fence_len, 4);
    }

    #[test]
    fn test_longer_close_accepted() {
        let text = "```\ncode\n`````\nafter\n";
        let analysis = analyze(text);

        assert_eq!(analysis.code_block_count, 1);
        assert_eq!(analysis.code_blocks[0].end_line, 3);
        assert!(analysis.code_blocks[0].closed);
    }

    #[test]
    fn test_unclosed_fence_closed_at_eof() {
        let text = "start\n```\nnever closed\n";
        let analysis = analyze(text);

        assert_eq!(analysis.code_block_count, 1);
        let block = &analysis.code_blocks[0];
        assert!(!block.closed);
        assert_eq!(block.end_line, 3);
        assert_eq!(
            analysis.warnings,
            vec![ParseWarning::UnclosedFence { line: 2 }]
        );
    }

    #[test]
    fn test_headers_extracted_with_levels() {
        let text = "# One\n\ntext\n\n## Two ##\n\n### Three\n";
        let analysis = analyze(text);

        assert_eq!(analysis.header_count, 3);
        assert_eq!(analysis.headers[0].level, 1);
        assert_eq!(analysis.headers[0].text, "One");
        assert_eq!(analysis.headers[1].text, "Two");
        assert_eq!(analysis.headers[2].level, 3);
        assert_eq!(analysis.max_header_depth, 3);
    }

    #[test]
    fn test_header_inside_fence_ignored() {
        let text = "```\n# not a header\n```\n";
        let analysis = analyze(text);

        assert_eq!(analysis.header_count, 0);
    }

    #[test]
    fn test_hash_without_space_is_not_header() {
        let analysis = analyze("#tag\n");
        assert_eq!(analysis.header_count, 0);
    }

    #[test]
    fn test_table_extraction() {
        let text = "| Name | Age |\n|------|-----|\n| Alice | 30 |\n| Bob | 25 |\n\ntext\n";
        let analysis = analyze(text);

        assert_eq!(analysis.table_count, 1);
        let table = &analysis.tables[0];
        assert_eq!(table.start_line, 1);
        assert_eq!(table.end_line, 4);
        assert_eq!(table.column_count, 2);
        assert_eq!(table.row_count, 4);
    }

    #[test]
    fn test_table_separator_mismatch_demoted() {
        let text = "| a | b |\n|---|\nrest\n";
        let analysis = analyze(text);

        assert_eq!(analysis.table_count, 0);
        assert_eq!(
            analysis.warnings,
            vec![ParseWarning::MalformedTable { line: 1 }]
        );
    }

    #[test]
    fn test_table_inside_fence_ignored() {
        let text = "```\n| a | b |\n|---|---|\n| 1 | 2 |\n```\n";
        let analysis = analyze(text);

        assert_eq!(analysis.table_count, 0);
        assert_eq!(analysis.code_block_count, 1);
    }

    #[test]
    fn test_preamble_detected() {
        let text = "This is an introduction paragraph.\nIt has two non-blank lines and enough characters.\n\n# First\n\ncontent\n";
        let analysis = analyze(text);

        assert!(analysis.has_preamble);
        assert_eq!(analysis.preamble_end_line, 4);
    }

    #[test]
    fn test_short_intro_is_not_preamble() {
        let text = "Tiny.\n\n# First\n\ncontent\n";
        let analysis = analyze(text);

        assert!(!analysis.has_preamble);
    }

    #[test]
    fn test_headerless_document_is_all_preamble() {
        let text = "just a paragraph\n\nand another\n";
        let analysis = analyze(text);

        assert!(analysis.has_preamble);
        assert_eq!(analysis.preamble_end_line, analysis.total_lines + 1);
    }

    #[test]
    fn test_code_ratio_headerless() {
        let text = "```\nxxxx\n```\n";
        let analysis = analyze(text);
        // Everything is inside the fence range.
        assert!(analysis.code_ratio > 0.9);
    }
}
