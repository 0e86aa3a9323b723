//! Chunking strategy implementations.
//!
//! Three strategies cover the document shapes that matter for retrieval:
//! code-aware splitting around atomic blocks, structural splitting by
//! header sections, and paragraph-packing fallback. The router picks one
//! per document; the post-processor finishes the output.

pub mod base;
mod code_aware;
mod fallback;
mod structural;

pub use base::Strategy;
pub use code_aware::CodeAwareStrategy;
pub use fallback::FallbackStrategy;
pub use structural::StructuralStrategy;
