//! Structure-Aware Markdown Chunking
//!
//! A chunking library for RAG pipelines that splits markdown documents into
//! size-bounded, semantically coherent chunks without breaking fenced code
//! blocks, tables, or header hierarchy.
//!
//! The pipeline is linear: normalize line endings, analyze document
//! structure, select a chunking strategy, apply it, then post-process
//! (merge undersized chunks, splice overlap, enrich metadata, validate).
//!
//! ```
//! use mdchunk::{chunk_markdown, ChunkConfig};
//!
//! let text = "# Intro\n\nSome content.\n\n## Details\n\nMore content.";
//! let chunks = chunk_markdown(text, &ChunkConfig::default()).unwrap();
//! for chunk in &chunks {
//!     println!("{} [{}..{}]", chunk.metadata.header_path, chunk.start_line, chunk.end_line);
//! }
//! ```
//!
//! Large files can be processed incrementally through
//! [`ChunkStream`](streaming::ChunkStream), which reads line windows, finds
//! fence-safe split points, and delegates each window to the batch pipeline.

pub mod analyzer;
pub mod error;
pub mod pipeline;
pub mod postprocess;
pub mod router;
pub mod strategies;
pub mod streaming;
pub mod types;

pub use analyzer::Analyzer;
pub use error::ChunkerError;
pub use pipeline::{chunk_markdown, chunk_markdown_with_analysis, ChunkPipeline};
pub use router::StrategyRouter;
pub use strategies::Strategy;
pub use streaming::{ChunkStream, StreamingConfig};
pub use types::{
    Chunk, ChunkConfig, ChunkMetadata, ContentAnalysis, ContentType, FencedBlock, HeaderInfo,
    OversizeReason, ParseWarning, StrategyKind, TableBlock,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::pipeline::{chunk_markdown, chunk_markdown_with_analysis, ChunkPipeline};
    pub use crate::streaming::{ChunkStream, StreamingConfig};
    pub use crate::types::*;
    pub use crate::ChunkerError;
}

/// Default upper target chunk size in characters
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 2000;

/// Default floor below which chunks are merged into a neighbor
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 200;

/// Default overlap spliced onto each side of a chunk, in characters
pub const DEFAULT_OVERLAP_SIZE: usize = 100;

/// Code ratio at or above which the code-aware strategy becomes eligible
pub const DEFAULT_CODE_THRESHOLD: f64 = 0.30;

/// Minimum header count for the structural strategy
pub const DEFAULT_STRUCTURE_THRESHOLD: usize = 3;

/// Tolerated content-coverage drift during validation (fraction of source)
pub const DEFAULT_COVERAGE_TOLERANCE: f64 = 0.005;

/// Minimum non-blank lines before the first header to count as a preamble
pub const PREAMBLE_MIN_LINES: usize = 2;

/// Minimum characters before the first header to count as a preamble
pub const PREAMBLE_MIN_CHARS: usize = 40;

/// Default streaming window buffer size in bytes (100 KB)
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 100 * 1024;

/// Default lines carried over between streaming windows
pub const DEFAULT_STREAM_OVERLAP_LINES: usize = 20;

/// Default streaming memory hint in megabytes
pub const DEFAULT_STREAM_MAX_MEMORY_MB: usize = 100;

/// Default fraction of a window that must be consumed before a split
pub const DEFAULT_SAFE_SPLIT_THRESHOLD: f64 = 0.8;
