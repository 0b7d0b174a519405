//! Token-window text splitting
//!
//! Tokens are Unicode word-boundary segments (words, whitespace runs and
//! punctuation), so concatenating a window's tokens reproduces the text
//! exactly. A window of `chunk_size` tokens is cut back to its last
//! punctuation mark when that mark lies past `min_chunk_size_chars`; the next
//! window starts right after the cut.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, Document};

/// Splits documents into chunks of roughly `chunk_size` tokens
#[derive(Debug, Clone)]
pub struct TokenTextSplitter {
    config: ChunkingConfig,
}

impl TokenTextSplitter {
    /// Create a splitter
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split every document, numbering chunks per document
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(i, text)| Chunk::new(text, doc.chunk_metadata(i)))
            })
            .collect()
    }

    /// Split raw text into chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut rest = text;

        while !rest.is_empty() && chunks.len() < self.config.max_num_chunks {
            let window_end = rest
                .split_word_bound_indices()
                .nth(chunk_size)
                .map_or(rest.len(), |(idx, _)| idx);
            let window = &rest[..window_end];

            if window.trim().is_empty() {
                rest = &rest[window_end..];
                continue;
            }

            let chunk = match self.last_punctuation(window) {
                Some((char_pos, cut)) if char_pos > self.config.min_chunk_size_chars => {
                    &window[..cut]
                }
                _ => window,
            };

            let emitted = if self.config.keep_separator {
                chunk.trim().to_string()
            } else {
                chunk.replace('\n', " ").trim().to_string()
            };

            if emitted.chars().count() > self.config.min_chunk_length_to_embed {
                chunks.push(emitted);
            }

            rest = &rest[chunk.len()..];
        }

        // chunk limit reached; the remainder becomes one final chunk
        let remainder = rest.replace('\n', " ");
        let remainder = remainder.trim();
        if remainder.chars().count() > self.config.min_chunk_length_to_embed {
            tracing::debug!(
                max_num_chunks = self.config.max_num_chunks,
                remainder_chars = remainder.chars().count(),
                "Chunk limit reached; keeping remaining text as one chunk"
            );
            chunks.push(remainder.to_string());
        }

        chunks
    }

    /// Char position of the last punctuation mark and the byte offset just after it
    fn last_punctuation(&self, window: &str) -> Option<(usize, usize)> {
        window
            .char_indices()
            .enumerate()
            .filter(|(_, (_, c))| self.config.punctuation_marks.contains(c))
            .last()
            .map(|(char_pos, (byte_idx, c))| (char_pos, byte_idx + c.len_utf8()))
    }
}

impl Default for TokenTextSplitter {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}
