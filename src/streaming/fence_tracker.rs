//! Fence state tracking across lines.

use crate::analyzer::{is_fence_close, parse_fence_open};

/// Line-by-line fence state machine.
///
/// Shares the analyzer's fence grammar: a run of 3+ backticks or tildes
/// opens, and only a run of the same character at least as long closes.
/// Used by the streaming split detector to avoid cutting inside a fence,
/// and by the post-processor's balance check.
#[derive(Debug, Clone, Default)]
pub struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Create a tracker in the outside-fence state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the state machine is currently inside a fence.
    pub fn is_inside_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed the next line and update the state.
    pub fn observe_line(&mut self, line: &str) {
        let trimmed = line.trim();
        match self.open {
            Some((fence_char, fence_len)) => {
                if is_fence_close(trimmed, fence_char, fence_len) {
                    self.open = None;
                }
            }
            None => {
                if let Some((fence_char, fence_len, _)) = parse_fence_open(trimmed) {
                    self.open = Some((fence_char, fence_len));
                }
            }
        }
    }

    /// Forget any open fence.
    pub fn reset(&mut self) {
        self.open = None;
    }
}

/// Whether a chunk of text opens every fence it closes and vice versa.
pub(crate) fn fence_balanced(text: &str) -> bool {
    let mut tracker = FenceTracker::new();
    for line in text.lines() {
        tracker.observe_line(line);
    }
    !tracker.is_inside_fence()
}
