//! Splits free-form document text into overlapping, token-aligned windows.
//!
//! Retrieval runs over two window sizes of the same corpus, so the chunker is
//! deliberately small and pure: the same text and size always produce the same
//! windows, and no I/O happens here.
//!
//! # How windows are formed
//!
//! *   **Tokens**: the text is split on any run of whitespace. Tokens are never
//!     split, so a token longer than the target size becomes an oversized window
//!     of its own.
//! *   **Boundaries**: tokens are joined by single spaces into a buffer. When the
//!     next token would push the buffer past the target size, the buffer is
//!     emitted as a window.
//! *   **Overlap**: the next buffer is seeded with the longest whole-token suffix
//!     of the emitted window whose length (spaces included) stays within
//!     `floor(window_len * overlap_ratio)`. The token that triggered the boundary
//!     is appended after the seed.
//!
//! Lengths are counted in characters (Unicode scalar values), not bytes.
//!
//! ```
//! use gaia_context::text::chunk_text;
//!
//! let windows = chunk_text("a b c d e f g h", 5);
//! assert_eq!(windows, vec!["a b c", "d e f", "g h"]);
//! ```
//!
//! Seeding can make a window exceed the target size by up to the overlap plus
//! the triggering token. Callers that need a hard ceiling must post-process.
use serde::Serialize;

/// Fraction of an emitted window carried into the next one.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.15;

/// Configured window splitter.
///
/// A `WindowChunker` holds the target window size and the overlap ratio. It is
/// cheap to construct and `Copy`, so indexers keep one per granularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowChunker {
    chunk_size: usize,
    overlap_ratio: f64,
}

/// A single window together with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextWindow {
    /// Position of this window within the document (0-indexed).
    pub sequence: usize,
    /// Length of `text` in characters.
    pub length: usize,
    /// The window content: whole tokens joined by single spaces.
    pub text: String,
}

impl WindowChunker {
    /// Creates a chunker for the given target size using [`DEFAULT_OVERLAP_RATIO`].
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
        }
    }

    /// Sets the overlap ratio. Negative or non-finite values disable overlap.
    pub fn with_overlap_ratio(mut self, overlap_ratio: f64) -> Self {
        self.overlap_ratio = if overlap_ratio.is_finite() && overlap_ratio > 0.0 {
            overlap_ratio
        } else {
            0.0
        };
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_ratio(&self) -> f64 {
        self.overlap_ratio
    }

    /// Splits `text` into ordered windows.
    ///
    /// Empty or whitespace-only input yields an empty vector. The output never
    /// contains an empty window.
    pub fn chunks(&self, text: &str) -> Vec<String> {
        let mut windows = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut buffer_len = 0usize;

        for token in text.split_whitespace() {
            let token_len = char_len(token);

            // A boundary is only taken once the buffer holds something, so an
            // oversized leading token never produces an empty window.
            if !buffer.is_empty() && buffer_len + token_len + 1 > self.chunk_size {
                windows.push(buffer.join(" "));
                buffer = self.overlap_tail(&buffer, buffer_len);
                buffer_len = joined_len(&buffer);
            }

            if !buffer.is_empty() {
                buffer_len += 1;
            }
            buffer_len += token_len;
            buffer.push(token);
        }

        if !buffer.is_empty() {
            windows.push(buffer.join(" "));
        }

        windows
    }

    /// Same as [`WindowChunker::chunks`] but keeps sequence numbers and lengths.
    pub fn windows(&self, text: &str) -> Vec<TextWindow> {
        self.chunks(text)
            .into_iter()
            .enumerate()
            .map(|(sequence, text)| TextWindow {
                sequence,
                length: char_len(&text),
                text,
            })
            .collect()
    }

    // Longest whole-token suffix of `tokens` that fits the overlap budget.
    fn overlap_tail<'a>(&self, tokens: &[&'a str], window_len: usize) -> Vec<&'a str> {
        let budget = (window_len as f64 * self.overlap_ratio).floor() as usize;
        let last = tokens.len().saturating_sub(1);
        let mut taken = 0usize;
        let mut start = tokens.len();

        for (idx, token) in tokens.iter().enumerate().rev() {
            let separator = usize::from(idx != last);
            let cost = char_len(token) + separator;
            if taken + cost > budget {
                break;
            }
            taken += cost;
            start = idx;
        }

        tokens[start..].to_vec()
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new(512)
    }
}

/// Splits `text` into windows of roughly `chunk_size` characters using the
/// default overlap ratio.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    WindowChunker::new(chunk_size).chunks(text)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn joined_len(tokens: &[&str]) -> usize {
    let chars: usize = tokens.iter().map(|t| char_len(t)).sum();
    chars + tokens.len().saturating_sub(1)
}
