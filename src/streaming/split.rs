//! Safe split point detection for streaming windows.

use crate::analyzer::is_atx_header;
use crate::streaming::fence_tracker::FenceTracker;

/// Finds a line index at which a filled window buffer can be cut without
/// splitting a fence.
///
/// The detector only considers indices past a threshold fraction of the
/// buffer so windows keep their intended size. Preference order: the line
/// before a header, the line after a blank-line paragraph break, any line
/// outside a fence, and finally the threshold index itself.
#[derive(Debug, Clone)]
pub struct SplitDetector {
    threshold: f64,
}

impl SplitDetector {
    /// Create a detector with the given threshold fraction.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Choose a split index for the buffer; the emitted region is
    /// `buffer[..index]`, so the chosen line starts the next window.
    ///
    /// `start_state` is the fence state at the first buffer line.
    pub fn find_split(&self, buffer: &[String], start_state: &FenceTracker) -> usize {
        let len = buffer.len();
        if len < 2 {
            return len;
        }

        let threshold_index = ((len as f64 * self.threshold) as usize).clamp(1, len - 1);

        // Fence state before each line, replayed from the window start.
        let mut tracker = start_state.clone();
        let mut inside_before = Vec::with_capacity(len);
        for line in buffer {
            inside_before.push(tracker.is_inside_fence());
            tracker.observe_line(line);
        }

        let mut paragraph_candidate = None;
        let mut outside_candidate = None;

        for i in threshold_index..len {
            if inside_before[i] {
                continue;
            }
            if is_atx_header(buffer[i].trim()) {
                return i;
            }
            if paragraph_candidate.is_none() && buffer[i - 1].trim().is_empty() {
                paragraph_candidate = Some(i);
            }
            if outside_candidate.is_none() {
                outside_candidate = Some(i);
            }
        }

        paragraph_candidate
            .or(outside_candidate)
            .unwrap_or(threshold_index)
    }
}
