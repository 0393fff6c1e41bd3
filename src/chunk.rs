//! Splitting large inputs into independently parsed chunks.
//!
//! Chunks are runs of whole lines. A chunk ends before a level 1-3 heading
//! once it has reached 70% of the target size, or before any line that would
//! push it past the hard maximum. Joining the chunks with `\n` reproduces the
//! input exactly.
//!
//! The splitter has no notion of open code fences or tables, so a boundary
//! can fall inside one. The block parser then sees an unterminated fence at
//! the end of one chunk and a stray closing fence at the start of the next.

use memchr::memchr_iter;

use crate::patterns::CHUNK_HEADING_RE;

/// Target chunk size in bytes used by the converter.
pub const DEFAULT_CHUNK_TARGET: usize = 64 * 1024;

/// Line-boundary chunk splitter.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    target: usize,
    hard_max: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TARGET)
    }
}

impl Chunker {
    /// Create a chunker aiming for `target` bytes, splitting hard at 1.5x.
    pub fn new(target: usize) -> Self {
        let target = target.max(1);
        Self {
            target,
            hard_max: target + target / 2,
        }
    }

    /// Size at which a heading line may start a new chunk.
    fn soft_limit(&self) -> usize {
        self.target * 7 / 10
    }

    /// Split `text` into chunks.
    ///
    /// Always returns at least one chunk; a single line longer than the hard
    /// maximum becomes a chunk of its own.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut chunks = Vec::new();
        let mut chunk_start = 0;
        let mut line_start = 0;

        let line_ends = memchr_iter(b'\n', text.as_bytes()).chain(std::iter::once(text.len()));
        for line_end in line_ends {
            let line = &text[line_start..line_end];
            let current = line_start.saturating_sub(chunk_start);

            if line_start > chunk_start {
                let at_heading = CHUNK_HEADING_RE.is_match(line) && current >= self.soft_limit();
                let too_large = current + line.len() > self.hard_max;
                if at_heading || too_large {
                    // Drop the newline separating the chunks.
                    chunks.push(&text[chunk_start..line_start - 1]);
                    chunk_start = line_start;
                }
            }

            line_start = line_end + 1;
        }

        chunks.push(&text[chunk_start..]);
        chunks
    }
}
