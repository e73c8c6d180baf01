//! Draft text chunking
//!
//! Fixed-size overlapping windows measured in chars (not bytes), so
//! multi-byte scripts never split inside a code point.

/// Window parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    /// Windows whose trimmed length is at or below this are discarded
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 200,
            min_chars: 50,
        }
    }
}

impl ChunkingConfig {
    /// Distance between window starts (at least 1)
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Split text into trimmed overlapping windows
pub fn split_into_chunks(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = config.chunk_size.max(1);
    let step = config.step();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if trimmed.chars().count() > config.min_chars {
            chunks.push(trimmed.to_string());
        }
        start += step;
    }
    chunks
}

/// Truncate to at most `max_chars` chars
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_overlap_and_cover_text() {
        let text: String = (0..2000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split_into_chunks(&text, &ChunkingConfig::default());

        // starts at 0, 600, 1200, 1800
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 800);
        assert_eq!(&chunks[0][600..], &chunks[1][..200]);
        assert_eq!(chunks[3].len(), 200);
    }

    #[test]
    fn test_short_windows_are_dropped() {
        let config = ChunkingConfig::default();
        assert!(split_into_chunks("   too short   ", &config).is_empty());
        assert!(split_into_chunks("", &config).is_empty());

        let exactly_min = "x".repeat(50);
        assert!(split_into_chunks(&exactly_min, &config).is_empty());
        assert_eq!(split_into_chunks(&"x".repeat(51), &config).len(), 1);
    }

    #[test]
    fn test_multibyte_text_is_split_on_chars() {
        let text = "नियम ".repeat(300);
        let config = ChunkingConfig {
            chunk_size: 100,
            overlap: 20,
            min_chars: 10,
        };
        let chunks = split_into_chunks(&text, &config);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_overlap_not_smaller_than_size_still_advances() {
        let config = ChunkingConfig {
            chunk_size: 10,
            overlap: 10,
            min_chars: 0,
        };
        assert_eq!(config.step(), 1);
        assert_eq!(split_into_chunks("abcdefghijkl", &config).len(), 12);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 2000), "hi");
    }
}
