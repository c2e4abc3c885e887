//! Recursive separator-based text splitter.
//!
//! Text is split after each occurrence of the coarsest separator present
//! (the separator stays with the text before it), pieces are merged
//! greedily into chunks of at most `chunk_size` characters, and pieces that
//! are still too large are split again with the finer separators. Each new
//! chunk starts with a word-aligned tail of the previous one, no longer than
//! `chunk_overlap` characters.
//!
//! All bookkeeping is done on byte ranges into the source text, so every
//! chunk is an exact substring and offsets come for free.

use std::ops::Range;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, ChunkingConfig};

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    config: ChunkingConfig,
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

impl RecursiveTextSplitter {
    pub fn new(config: ChunkingConfig) -> DomainResult<Self> {
        config.validate().map_err(DomainError::ValidationFailed)?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with_offsets(text)
            .into_iter()
            .map(|range| text[range].to_string())
            .collect()
    }

    /// Byte ranges of each chunk in `text`.
    ///
    /// Ranges are trimmed of surrounding whitespace, never empty, and their
    /// end offsets are strictly increasing.
    pub fn split_with_offsets(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let raw = self.split_range(text, 0..text.len(), &self.config.separators);
        let mut chunks: Vec<Range<usize>> = Vec::with_capacity(raw.len());
        for range in raw {
            let Some(trimmed) = trim_range(text, range) else {
                continue;
            };
            // Fully contained in the previous chunk.
            if chunks.last().is_some_and(|last| trimmed.end <= last.end) {
                continue;
            }
            chunks.push(trimmed);
        }
        chunks
    }

    /// Split `text` into [`Chunk`]s belonging to `document_id`.
    pub fn create_chunks(&self, text: &str, document_id: &str) -> Vec<Chunk> {
        self.split_with_offsets(text)
            .into_iter()
            .enumerate()
            .map(|(index, range)| Chunk::new(document_id, text[range.clone()].to_string(), index, range.start, range.end))
            .collect()
    }

    fn split_range(&self, text: &str, range: Range<usize>, separators: &[String]) -> Vec<Range<usize>> {
        let span = &text[range.clone()];
        if span.chars().count() <= self.config.chunk_size {
            return vec![range];
        }

        let Some(pos) = separators
            .iter()
            .position(|sep| sep.is_empty() || span.contains(sep.as_str()))
        else {
            return self.char_windows(text, range);
        };

        let separator = separators[pos].as_str();
        if separator.is_empty() {
            return self.char_windows(text, range);
        }

        let pieces = piece_ranges(span, separator, range.start);
        self.merge_pieces(text, pieces, &separators[pos + 1..])
    }

    fn merge_pieces(&self, text: &str, pieces: Vec<Range<usize>>, finer: &[String]) -> Vec<Range<usize>> {
        let size = self.config.chunk_size;
        let mut chunks = Vec::new();
        let mut buffer: Option<Range<usize>> = None;

        for piece in pieces {
            let start = buffer.as_ref().map_or(piece.start, |b| b.start);
            if char_len(text, start..piece.end) <= size {
                buffer = Some(start..piece.end);
                continue;
            }

            let oversized = char_len(text, piece.clone()) > size;
            let tail_start = buffer.take().and_then(|flushed| {
                let budget = if oversized {
                    self.config.chunk_overlap
                } else {
                    let gap = char_len(text, flushed.end..piece.end);
                    self.config.chunk_overlap.min(size.saturating_sub(gap))
                };
                let tail = overlap_start(text, flushed.clone(), budget);
                chunks.push(flushed);
                tail
            });
            let start = tail_start.unwrap_or(piece.start);

            if oversized {
                let mut sub_chunks = self.split_range(text, start..piece.end, finer);
                buffer = sub_chunks.pop();
                chunks.extend(sub_chunks);
            } else {
                buffer = Some(start..piece.end);
            }
        }

        chunks.extend(buffer);
        chunks
    }

    /// Fixed-width character windows, used when no separator applies.
    fn char_windows(&self, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
        let size = self.config.chunk_size;
        let stride = size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut offsets: Vec<usize> = text[range.clone()]
            .char_indices()
            .map(|(i, _)| range.start + i)
            .collect();
        let char_count = offsets.len();
        offsets.push(range.end);

        let mut windows = Vec::new();
        let mut first = 0;
        loop {
            let last = (first + size).min(char_count);
            windows.push(offsets[first]..offsets[last]);
            if last == char_count {
                break;
            }
            first += stride;
        }
        windows
    }
}

fn char_len(text: &str, range: Range<usize>) -> usize {
    text[range].chars().count()
}

/// Pieces of `span` offset by `base`, each ending just after an occurrence
/// of `separator`. The pieces tile the span, so no separator text is lost;
/// only whitespace disappears when chunks are trimmed.
fn piece_ranges(span: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in span.match_indices(separator) {
        let end = idx + separator.len();
        pieces.push(base + start..base + end);
        start = end;
    }
    if start < span.len() {
        pieces.push(base + start..base + span.len());
    }
    pieces
}

/// Start of the overlap tail carried from `chunk` into the next chunk.
///
/// At most `budget` characters, moved forward to the next word start.
/// `None` when nothing but whitespace would be carried.
fn overlap_start(text: &str, chunk: Range<usize>, budget: usize) -> Option<usize> {
    if budget == 0 {
        return None;
    }

    let slice = &text[chunk.clone()];
    let skip = slice.chars().count().saturating_sub(budget);
    let mut start = slice.char_indices().nth(skip).map_or(slice.len(), |(i, _)| i);

    let at_word_start = start == 0 || slice[..start].ends_with(char::is_whitespace);
    if !at_word_start {
        if let Some(ws) = slice[start..].find(char::is_whitespace) {
            start += ws;
        }
    }
    start += slice[start..].len() - slice[start..].trim_start().len();

    (start < slice.len()).then_some(chunk.start + start)
}

fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[range.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let leading = slice.len() - slice.trim_start().len();
    Some(range.start + leading..range.start + leading + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveTextSplitter {
        RecursiveTextSplitter::new(ChunkingConfig::new(size, overlap)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(RecursiveTextSplitter::new(ChunkingConfig::new(10, 10)).is_err());
        assert!(RecursiveTextSplitter::new(ChunkingConfig::new(0, 0)).is_err());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = splitter(100, 10).split_text("  Hello world.  ");
        assert_eq!(chunks, vec!["Hello world."]);
    }

    #[test]
    fn test_blank_text_no_chunks() {
        assert!(splitter(100, 10).split_text("").is_empty());
        assert!(splitter(100, 10).split_text(" \n\n\t ").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = splitter(30, 0).split_text(text);
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here.", "Third one."]);
    }

    #[test]
    fn test_chunks_bounded_and_substrings() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let splitter = splitter(120, 30);
        for chunk in splitter.split_text(&text) {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk.len());
            assert!(text.contains(&chunk));
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_overlap_is_word_aligned_and_bounded() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron pi rho sigma";
        let ranges = splitter(30, 12).split_with_offsets(text);
        assert!(ranges.len() > 1);
        for pair in ranges.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.end > prev.end);
            if next.start < prev.end {
                let shared = &text[next.start..prev.end];
                assert!(shared.chars().count() <= 12);
                assert!(next.start == 0 || text[..next.start].ends_with(' '));
            }
        }
    }

    #[test]
    fn test_separator_only_text_is_kept() {
        assert_eq!(splitter(1, 0).split_text(". "), vec!["."]);
        assert_eq!(splitter(2, 0).split_text(". . ."), vec![".", ".", "."]);
    }

    #[test]
    fn test_sentence_periods_survive_chunk_boundaries() {
        let chunks = splitter(12, 0).split_text("First one. Second one. Third one.");
        assert_eq!(chunks, vec!["First one.", "Second one.", "Third one."]);
    }

    #[test]
    fn test_character_fallback_without_separators() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 2).split_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= 10));
    }

    #[test]
    fn test_custom_separators_without_empty_fall_back_to_windows() {
        let config = ChunkingConfig::new(5, 0).with_separators(["|"]);
        let splitter = RecursiveTextSplitter::new(config).unwrap();
        let chunks = splitter.split_text("abcdefghijkl");
        assert_eq!(chunks, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "日本語のテキスト。".repeat(20);
        let chunks = splitter(16, 4).split_text(&text);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn test_create_chunks_offsets() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = splitter(15, 5).create_chunks(text, "doc");
        assert_eq!(chunks[0].chunk_index, 0);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.id, format!("doc:chunk:{i}"));
            assert_eq!(&text[chunk.start_offset..chunk.end_offset], chunk.content);
        }
    }
}
