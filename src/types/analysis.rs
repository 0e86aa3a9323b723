//! Structural analysis results.
//!
//! The analyzer references the source by line number and byte offset; line
//! numbers are 1-based and inclusive, byte ranges end-exclusive.

use serde::{Deserialize, Serialize};

/// A fenced code block found in the document.
///
/// The line range includes the fence delimiter lines. Opening and closing
/// fences use the same character, with the closing run at least as long as
/// the opening run; strictly shorter inner runs are treated as content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FencedBlock {
    /// Language tag from the opening fence, if any
    pub language: Option<String>,
    /// First line of the block (the opening fence), 1-based
    pub start_line: usize,
    /// Last line of the block (the closing fence, or EOF), inclusive
    pub end_line: usize,
    /// Byte offset of the block start
    pub start_byte: usize,
    /// Byte offset one past the block end
    pub end_byte: usize,
    /// Fence delimiter character (backtick or tilde)
    pub fence_char: char,
    /// Length of the opening delimiter run
    pub fence_len: usize,
    /// False when the document ended before the closing fence
    pub closed: bool,
}

/// An ATX header found outside any fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Header level, 1-6
    pub level: u8,
    /// Visible header text, trailing hash runs stripped
    pub text: String,
    /// Line number, 1-based
    pub line: usize,
    /// Byte offset of the header line start
    pub byte_offset: usize,
}

/// A GFM table found outside any fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    /// First line of the table (the header row), 1-based
    pub start_line: usize,
    /// Last table row, inclusive
    pub end_line: usize,
    /// Number of columns, derived from the separator row
    pub column_count: usize,
    /// Total rows in the table range, header and separator included
    pub row_count: usize,
}

/// Non-fatal issues observed during analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A fence was still open at end of input; it was closed at EOF
    UnclosedFence { line: usize },
    /// A pipe row had no valid separator row and was demoted to text
    MalformedTable { line: usize },
}

/// Aggregated structural description of a document.
///
/// Produced by a single pass of the analyzer and consumed by strategy
/// arbitration and the strategies themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Total characters in the normalized document
    pub total_chars: usize,
    /// Total lines in the normalized document
    pub total_lines: usize,
    /// Characters inside fenced block ranges divided by total characters
    pub code_ratio: f64,
    /// Number of fenced code blocks
    pub code_block_count: usize,
    /// Number of ATX headers outside fences
    pub header_count: usize,
    /// Deepest header level present (0 when no headers)
    pub max_header_depth: u8,
    /// Number of tables
    pub table_count: usize,
    /// Fenced blocks in document order
    pub code_blocks: Vec<FencedBlock>,
    /// Headers in document order
    pub headers: Vec<HeaderInfo>,
    /// Tables in document order
    pub tables: Vec<TableBlock>,
    /// Whether the content before the first header qualifies as a preamble
    pub has_preamble: bool,
    /// First line not belonging to the preamble (exclusive bound)
    pub preamble_end_line: usize,
    /// Non-fatal issues observed while scanning
    pub warnings: Vec<ParseWarning>,
}

impl ContentAnalysis {
    /// Atomic line ranges (fences and tables) in document order.
    ///
    /// Overlapping ranges cannot occur: tables are only recognized outside
    /// fences, and fences do not nest at equal-or-longer run lengths.
    pub fn atomic_ranges(&self) -> Vec<AtomicRange> {
        let mut ranges: Vec<AtomicRange> = self
            .code_blocks
            .iter()
            .map(|block| AtomicRange {
                start_line: block.start_line,
                end_line: block.end_line,
                kind: AtomicKind::Fence,
                language: block.language.clone(),
            })
            .chain(self.tables.iter().map(|table| AtomicRange {
                start_line: table.start_line,
                end_line: table.end_line,
                kind: AtomicKind::Table,
                language: None,
            }))
            .collect();
        ranges.sort_by_key(|r| r.start_line);
        ranges
    }

    /// Whether any atomic block intersects the given inclusive line range.
    pub fn range_contains_atomic(&self, start_line: usize, end_line: usize) -> bool {
        self.atomic_ranges()
            .iter()
            .any(|r| r.start_line <= end_line && r.end_line >= start_line)
    }
}

/// What kind of atomic block a range is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicKind {
    Fence,
    Table,
}

/// A line range that no strategy may split.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicRange {
    pub start_line: usize,
    pub end_line: usize,
    pub kind: AtomicKind,
    pub language: Option<String>,
}
