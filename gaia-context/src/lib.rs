pub mod text;

// Re-export the chunking entry points for external use
pub use text::{DEFAULT_OVERLAP_RATIO, TextWindow, WindowChunker, chunk_text};
