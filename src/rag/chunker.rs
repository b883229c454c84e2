//! Positional chunking of filing text.
//!
//! A filing is reduced to at most three representative spans: the opening,
//! middle and closing thirds. Each span is capped at `chunk_size` characters
//! and, where possible, cut at a sentence boundary so excerpts read cleanly
//! in a prompt.

use crate::utils::toml_config::ChunkingConfig;

/// Maximum number of chunks produced per document.
pub const MAX_CHUNKS: usize = 3;

pub const DEFAULT_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_MIN_LENGTH: usize = 1000;
pub const DEFAULT_BOUNDARY_RATIO: f64 = 0.7;

/// Splits a document into first, middle and last thirds.
///
/// Lengths are counted in Unicode scalar values, so a cut never lands
/// inside a multi-byte character.
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdsChunker {
    chunk_size: usize,
    min_length: usize,
    boundary_ratio: f64,
}

impl Default for ThirdsChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_MIN_LENGTH)
    }
}

impl ThirdsChunker {
    pub fn new(chunk_size: usize, min_length: usize) -> Self {
        Self {
            chunk_size,
            min_length,
            boundary_ratio: DEFAULT_BOUNDARY_RATIO,
        }
    }

    /// Position (as a fraction of `chunk_size`) after which a period may
    /// end a truncated chunk.
    pub fn with_boundary_ratio(mut self, ratio: f64) -> Self {
        self.boundary_ratio = ratio;
        self
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.min_length).with_boundary_ratio(config.boundary_ratio)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Produce up to [`MAX_CHUNKS`] chunks in document order.
    ///
    /// Text shorter than `min_length` yields nothing. Chunks that are empty
    /// after trimming are dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let len = text.chars().count();
        if len < self.min_length {
            return Vec::new();
        }

        let first = byte_offset(text, len / 3);
        let second = byte_offset(text, 2 * len / 3);
        let sections = [&text[..first], &text[first..second], &text[second..]];

        sections
            .iter()
            .map(|section| self.truncate(section).trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .take(MAX_CHUNKS)
            .collect()
    }

    fn truncate<'a>(&self, section: &'a str) -> &'a str {
        if section.chars().count() <= self.chunk_size {
            return section;
        }

        let head = &section[..byte_offset(section, self.chunk_size)];
        let threshold = self.chunk_size as f64 * self.boundary_ratio;

        match head.rfind('.') {
            Some(pos) if head[..pos].chars().count() as f64 > threshold => &head[..=pos],
            _ => head,
        }
    }
}

/// Byte offset of the `chars`-th character, or the end of `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn test_short_text_yields_nothing() {
        let chunker = ThirdsChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(&filler(999)).is_empty());
    }

    #[test]
    fn test_min_length_is_inclusive() {
        let chunker = ThirdsChunker::default();
        let chunks = chunker.chunk(&filler(1000));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 1000);
    }

    #[test]
    fn test_sections_kept_in_order() {
        let text = format!("{}{}{}", "a".repeat(500), "b".repeat(500), "c".repeat(500));
        let chunks = ThirdsChunker::default().chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].chars().all(|c| c == 'a'));
        assert!(chunks[1].chars().all(|c| c == 'b'));
        assert!(chunks[2].chars().all(|c| c == 'c'));
    }

    #[test]
    fn test_long_section_cut_at_late_period() {
        // Period at char index 3500 of the first section (> 0.7 * 4000)
        let section = format!("{}.{}", "a".repeat(3500), "a".repeat(1499));
        let text = section.repeat(3);
        let chunks = ThirdsChunker::default().chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3501);
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_long_section_early_period_ignored() {
        // Period at index 1000 is before the 70% mark, so the raw cut wins
        let section = format!("{}.{}", "a".repeat(1000), "a".repeat(3999));
        let text = section.repeat(3);
        let chunks = ThirdsChunker::default().chunk(&text);

        assert_eq!(chunks[0].chars().count(), 4000);
    }

    #[test]
    fn test_period_exactly_at_threshold_not_used() {
        let chunker = ThirdsChunker::new(10, 3);
        // Period at index 7 == 0.7 * 10, must be strictly greater
        let section = "aaaaaaa.aaaa";
        assert_eq!(chunker.truncate(section), "aaaaaaa.aa");

        let section = "aaaaaaaa.aaa";
        assert_eq!(chunker.truncate(section), "aaaaaaaa.");
    }

    #[test]
    fn test_whitespace_trimmed_and_empty_dropped() {
        let chunker = ThirdsChunker::new(100, 9);
        let text = format!("  abc  {}  xyz  ", " ".repeat(5));
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks, vec!["abc".to_string(), "xyz".to_string()]);
    }

    #[test]
    fn test_multibyte_text_never_split_mid_char() {
        let chunker = ThirdsChunker::new(50, 10);
        let text = "銀行の自己資本比率。".repeat(40);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }

    #[test]
    fn test_from_config() {
        let config = ChunkingConfig {
            chunk_size: 200,
            min_length: 50,
            boundary_ratio: 0.5,
        };
        let chunker = ThirdsChunker::from_config(&config);
        assert_eq!(chunker.chunk_size(), 200);
        assert_eq!(chunker.min_length(), 50);
        assert_eq!(chunker.boundary_ratio, 0.5);
    }
}
