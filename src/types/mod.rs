//! Core types for the chunking library.

mod analysis;
mod chunk;
mod config;

pub use analysis::{
    AtomicKind, AtomicRange, ContentAnalysis, FencedBlock, HeaderInfo, ParseWarning, TableBlock,
};
pub use chunk::{Chunk, ChunkMetadata, ContentType, OversizeReason, StrategyKind, PREAMBLE_PATH};
pub use config::ChunkConfig;
