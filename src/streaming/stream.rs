//! Windowed streaming over large markdown inputs.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ChunkerError;
use crate::pipeline::ChunkPipeline;
use crate::streaming::fence_tracker::FenceTracker;
use crate::streaming::split::SplitDetector;
use crate::streaming::StreamingConfig;
use crate::types::{Chunk, ChunkConfig};

/// Lazy chunk iterator over a line-producing source.
///
/// Lines accumulate into a window until the configured buffer size is
/// reached; a fence-safe split point is chosen and the emitted region is
/// delegated to the batch pipeline. The last `overlap_lines` lines of each
/// emitted region are re-fed to the next window so context survives the
/// boundary, which means chunks near window edges may repeat a bounded
/// number of lines.
///
/// Dropping the iterator cancels the stream; an I/O failure is yielded as
/// an error on the next advance and ends iteration, leaving previously
/// yielded chunks valid.
pub struct ChunkStream<R: BufRead> {
    reader: R,
    pipeline: ChunkPipeline,
    streaming: StreamingConfig,
    detector: SplitDetector,
    /// Window buffer; starts each round with the carry from the last split
    buffer: Vec<String>,
    buffer_bytes: usize,
    /// Absolute 1-based line number of `buffer[0]`
    buffer_first_line: usize,
    /// Fence state at the start of the buffer
    fence_state: FenceTracker,
    pending: VecDeque<Chunk>,
    bytes_processed: usize,
    window_index: usize,
    chunk_counter: usize,
    eof: bool,
    done: bool,
}

impl ChunkStream<BufReader<File>> {
    /// Stream chunks from a file on disk.
    pub fn from_path(
        path: impl AsRef<Path>,
        config: ChunkConfig,
        streaming: StreamingConfig,
    ) -> Result<Self, ChunkerError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), config, streaming)
    }
}

impl<R: BufRead> ChunkStream<R> {
    /// Stream chunks from any buffered line source.
    pub fn from_reader(
        reader: R,
        config: ChunkConfig,
        streaming: StreamingConfig,
    ) -> Result<Self, ChunkerError> {
        streaming.validate()?;
        let pipeline = ChunkPipeline::new(config)?;
        let detector = SplitDetector::new(streaming.safe_split_threshold);
        Ok(Self {
            reader,
            pipeline,
            streaming,
            detector,
            buffer: Vec::new(),
            buffer_bytes: 0,
            buffer_first_line: 1,
            fence_state: FenceTracker::new(),
            pending: VecDeque::new(),
            bytes_processed: 0,
            window_index: 0,
            chunk_counter: 0,
            eof: false,
            done: false,
        })
    }

    /// The effective byte limit for one window.
    fn window_limit(&self) -> usize {
        let memory_cap = self.streaming.max_memory_mb.saturating_mul(1024 * 1024);
        self.streaming.buffer_size.min(memory_cap).max(1)
    }

    /// Read lines until the window is full or the source is exhausted,
    /// then process one window into `pending`.
    fn advance(&mut self) -> Result<(), ChunkerError> {
        let limit = self.window_limit();

        while !self.eof && self.buffer_bytes < limit {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                self.eof = true;
                break;
            }
            self.bytes_processed += read;
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            self.buffer_bytes += line.len() + 1;
            self.buffer.push(line);
        }

        if self.buffer.is_empty() {
            self.done = true;
            return Ok(());
        }

        if self.eof && self.buffer_bytes < limit {
            // Final window: consume everything that is left.
            let window: Vec<String> = std::mem::take(&mut self.buffer);
            self.buffer_bytes = 0;
            self.done = true;
            self.process_window(&window)?;
            return Ok(());
        }

        let split = self.detector.find_split(&self.buffer, &self.fence_state);
        if split >= self.buffer.len() {
            // The detector consumed the whole buffer; emit it and start
            // the next window fresh.
            let window: Vec<String> = std::mem::take(&mut self.buffer);
            self.buffer_bytes = 0;
            for line in &window {
                self.fence_state.observe_line(line);
            }
            let first_line = self.buffer_first_line;
            self.buffer_first_line += window.len();
            self.process_window_at(&window, first_line)?;
            return Ok(());
        }

        // Keep the overlap tail of the emitted region, plus the remainder,
        // as the next window's prefix. At least one line must leave the
        // buffer so the stream always makes progress.
        let overlap = self.streaming.overlap_lines.min(split.saturating_sub(1));
        let consumed = split - overlap;

        let window: Vec<String> = self.buffer[..split].to_vec();
        let retained: Vec<String> = self.buffer[consumed..].to_vec();

        for line in &self.buffer[..consumed] {
            self.fence_state.observe_line(line);
        }

        let window_first_line = self.buffer_first_line;
        self.buffer_first_line += consumed;
        self.buffer = retained;
        self.buffer_bytes = self.buffer.iter().map(|l| l.len() + 1).sum();

        self.process_window_at(&window, window_first_line)?;
        Ok(())
    }

    fn process_window(&mut self, window: &[String]) -> Result<(), ChunkerError> {
        self.process_window_at(window, self.buffer_first_line)
    }

    /// Run one window through the batch pipeline and queue the results
    /// with stream metadata and absolute line numbers.
    fn process_window_at(
        &mut self,
        window: &[String],
        first_line: usize,
    ) -> Result<(), ChunkerError> {
        let text = window.join("\n");
        let chunks = self.pipeline.run(&text)?;

        debug!(
            window_index = self.window_index,
            lines = window.len(),
            chunks = chunks.len(),
            bytes_processed = self.bytes_processed,
            "processed streaming window"
        );

        for mut chunk in chunks {
            chunk.start_line += first_line - 1;
            chunk.end_line += first_line - 1;
            chunk.metadata.stream_chunk_index = Some(self.chunk_counter);
            chunk.metadata.stream_window_index = Some(self.window_index);
            chunk.metadata.bytes_processed = Some(self.bytes_processed);
            self.chunk_counter += 1;
            self.pending.push_back(chunk);
        }

        self.window_index += 1;
        Ok(())
    }
}

impl<R: BufRead> Iterator for ChunkStream<R> {
    type Item = Result<Chunk, ChunkerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }
            if let Err(error) = self.advance() {
                warn!(%error, "streaming failed, ending iteration");
                self.done = true;
                return Some(Err(error));
            }
        }
    }
}
