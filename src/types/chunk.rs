//! Chunk type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChunkerError;

/// Header path assigned to preamble chunks.
pub const PREAMBLE_PATH: &str = "/__preamble__";

/// A chunk of content extracted from a markdown document.
///
/// Chunks are the fundamental unit of content that gets embedded and
/// indexed. Line numbers are 1-based and inclusive on both ends, referring
/// to the normalized (LF-only) source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The actual text content of the chunk
    pub content: String,

    /// First source line covered by this chunk (1-based)
    pub start_line: usize,

    /// Last source line covered by this chunk (inclusive)
    pub end_line: usize,

    /// Metadata describing origin, structure, and processing flags
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk spanning the given line range.
    pub fn new(content: String, start_line: usize, end_line: usize) -> Self {
        let size = content.chars().count();
        Self {
            content,
            start_line,
            end_line,
            metadata: ChunkMetadata {
                size,
                ..ChunkMetadata::default()
            },
        }
    }

    /// Create a chunk with metadata. The size field is recomputed from the
    /// content so it can never disagree with it.
    pub fn with_metadata(mut self, mut metadata: ChunkMetadata) -> Self {
        metadata.size = self.content.chars().count();
        self.metadata = metadata;
        self
    }

    /// Content length in characters.
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Which chunking strategy produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Splits around atomic code/table ranges
    CodeAware,
    /// Splits by header sections
    Structural,
    /// Paragraph packing
    Fallback,
}

impl StrategyKind {
    /// Stable string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CodeAware => "code_aware",
            StrategyKind::Structural => "structural",
            StrategyKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_aware" => Ok(StrategyKind::CodeAware),
            "structural" => Ok(StrategyKind::Structural),
            "fallback" => Ok(StrategyKind::Fallback),
            other => Err(ChunkerError::InvalidConfig(format!(
                "unknown strategy override: {other:?}"
            ))),
        }
    }
}

/// Dominant content kind of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Code,
    Table,
    /// Prose that embeds atomic blocks or a notable amount of inline code
    Mixed,
    /// Content preceding the first header
    Preamble,
    /// A single chunk covering the entire source
    Document,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Code => "code",
            ContentType::Table => "table",
            ContentType::Mixed => "mixed",
            ContentType::Preamble => "preamble",
            ContentType::Document => "document",
        }
    }
}

/// Why a chunk was allowed to exceed the configured maximum size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizeReason {
    /// A fenced code block may not be split
    CodeBlockIntegrity,
    /// A table may not be split
    TableIntegrity,
    /// A section-level atomic forced the size
    SectionIntegrity,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Metadata associated with a chunk.
///
/// A record of known typed fields plus an `extra` map for anything a
/// downstream consumer wants to attach. Optional fields are omitted from
/// the serialized form when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Strategy that produced this chunk
    pub strategy: StrategyKind,

    /// Dominant content kind
    pub content_type: ContentType,

    /// Ancestor header chain, e.g. `/API/Authentication`; empty when the
    /// chunk sits under no header, `/__preamble__` for preamble chunks
    pub header_path: String,

    /// Level of the governing header (0 when none)
    pub header_level: u8,

    /// Order of this chunk in the emitted sequence (0-based)
    pub chunk_index: usize,

    /// Content length in characters
    pub size: usize,

    /// Whether this chunk is permitted to exceed `max_chunk_size`
    #[serde(skip_serializing_if = "is_false", default)]
    pub allow_oversize: bool,

    /// Justification for an oversize chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub oversize_reason: Option<OversizeReason>,

    /// Set when the chunk contains an unbalanced fence marker
    #[serde(skip_serializing_if = "is_false", default)]
    pub fence_balance_error: bool,

    /// Characters spliced in from the previous chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub overlap_prev: Option<usize>,

    /// Characters spliced in from the next chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub overlap_next: Option<usize>,

    /// Language tag of a code chunk, when the fence declared one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,

    /// Non-fatal invariant warnings recorded during post-processing
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,

    /// Global chunk counter across a streaming run
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stream_chunk_index: Option<usize>,

    /// Index of the streaming window that produced this chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stream_window_index: Option<usize>,

    /// Total bytes consumed from the stream when this chunk was emitted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bytes_processed: Option<usize>,

    /// Additional arbitrary metadata
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub extra: Option<serde_json::Value>,
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Fallback,
            content_type: ContentType::Text,
            header_path: String::new(),
            header_level: 0,
            chunk_index: 0,
            size: 0,
            allow_oversize: false,
            oversize_reason: None,
            fence_balance_error: false,
            overlap_prev: None,
            overlap_next: None,
            language: None,
            warnings: Vec::new(),
            stream_chunk_index: None,
            stream_window_index: None,
            bytes_processed: None,
            extra: None,
        }
    }
}

impl ChunkMetadata {
    /// Metadata for a code-block chunk.
    pub fn for_code(language: Option<&str>) -> Self {
        Self {
            content_type: ContentType::Code,
            language: language.map(String::from),
            ..Default::default()
        }
    }

    /// Metadata for a table chunk.
    pub fn for_table() -> Self {
        Self {
            content_type: ContentType::Table,
            ..Default::default()
        }
    }

    /// Metadata for a section chunk under the given header path.
    pub fn for_section(header_path: &str, header_level: u8) -> Self {
        Self {
            header_path: header_path.to_string(),
            header_level,
            ..Default::default()
        }
    }

    /// Mark the chunk as justified oversize.
    pub fn with_oversize(mut self, reason: OversizeReason) -> Self {
        self.allow_oversize = true;
        self.oversize_reason = Some(reason);
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_in_chars() {
        let chunk = Chunk::new("héllo".to_string(), 1, 1);
        assert_eq!(chunk.metadata.size, 5);
        assert_eq!(chunk.len(), 5);
    }

    #[test]
    fn test_strategy_kind_round_trip() {
        for kind in [
            StrategyKind::CodeAware,
            StrategyKind::Structural,
            StrategyKind::Fallback,
        ] {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("clever".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_metadata_serialization_omits_unset_fields() {
        let chunk = Chunk::new("text".to_string(), 1, 1);
        let json = serde_json::to_value(&chunk).unwrap();
        let meta = &json["metadata"];

        assert_eq!(meta["strategy"], "fallback");
        assert_eq!(meta["content_type"], "text");
        assert!(meta.get("allow_oversize").is_none());
        assert!(meta.get("language").is_none());
        assert!(meta.get("oversize_reason").is_none());
    }

    #[test]
    fn test_oversize_reason_serialized_snake_case() {
        let meta = ChunkMetadata::for_code(Some("python"))
            .with_oversize(OversizeReason::CodeBlockIntegrity);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["oversize_reason"], "code_block_integrity");
        assert_eq!(json["language"], "python");
        assert_eq!(json["allow_oversize"], true);
    }
}
