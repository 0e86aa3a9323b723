//! Strategy arbitration.

use tracing::debug;

use crate::strategies::{CodeAwareStrategy, FallbackStrategy, Strategy, StructuralStrategy};
use crate::types::{ChunkConfig, ContentAnalysis, StrategyKind};

/// Router that selects the chunking strategy for a document.
///
/// Selection is deterministic and stateless, driven entirely by the
/// analysis metrics and configuration; the router never inspects the text
/// itself. An explicit override in the configuration wins outright.
#[derive(Debug, Default)]
pub struct StrategyRouter {
    code_aware: CodeAwareStrategy,
    structural: StructuralStrategy,
    fallback: FallbackStrategy,
}

impl StrategyRouter {
    /// Create a new router.
    pub fn new() -> Self {
        Self {
            code_aware: CodeAwareStrategy::new(),
            structural: StructuralStrategy::new(),
            fallback: FallbackStrategy::new(),
        }
    }

    /// Apply the selection rules, in order:
    ///
    /// 1. a valid `strategy_override` wins;
    /// 2. any code block, any table, or a code ratio at the threshold
    ///    selects code-aware;
    /// 3. enough headers with enough depth selects structural;
    /// 4. otherwise fallback.
    ///
    /// The configuration is expected to be validated already; an invalid
    /// override name is ignored here.
    pub fn select(&self, analysis: &ContentAnalysis, config: &ChunkConfig) -> StrategyKind {
        let kind = self.select_inner(analysis, config);
        debug!(
            strategy = kind.as_str(),
            code_blocks = analysis.code_block_count,
            tables = analysis.table_count,
            code_ratio = analysis.code_ratio,
            headers = analysis.header_count,
            "selected strategy"
        );
        kind
    }

    fn select_inner(&self, analysis: &ContentAnalysis, config: &ChunkConfig) -> StrategyKind {
        if let Ok(Some(kind)) = config.override_kind() {
            return kind;
        }

        if analysis.code_block_count >= 1
            || analysis.table_count >= 1
            || analysis.code_ratio >= config.code_threshold
        {
            return StrategyKind::CodeAware;
        }

        let required_depth = if analysis.has_preamble { 2 } else { 1 };
        if analysis.header_count >= config.structure_threshold
            && analysis.max_header_depth >= required_depth
        {
            return StrategyKind::Structural;
        }

        StrategyKind::Fallback
    }

    /// Get the strategy for a selection tag.
    pub fn get(&self, kind: StrategyKind) -> &dyn Strategy {
        match kind {
            StrategyKind::CodeAware => &self.code_aware,
            StrategyKind::Structural => &self.structural,
            StrategyKind::Fallback => &self.fallback,
        }
    }

    /// List all strategies with their descriptions.
    pub fn list_strategies(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            (self.code_aware.name(), self.code_aware.description()),
            (self.structural.name(), self.structural.description()),
            (self.fallback.name(), self.fallback.description()),
        ]
    }
}
