//! Overlapping word-boundary chunker for document ingestion
//!
//! Splits extracted text into size-bounded, overlapping segments. Sizes are
//! expressed in characters and converted to word counts with a fixed
//! five-characters-per-word assumption, so a split never lands inside a word.

use crate::{ExtractError, Result};

/// Average word length used to convert character budgets to word counts.
const AVG_WORD_LEN: usize = 5;

/// A bounded segment of a source document.
///
/// `index` is dense over emitted chunks: dropped undersized windows leave no
/// gap in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub index: i64,
}

/// Text chunker with overlapping windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Target chunk size in characters
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    overlap: usize,

    /// Chunks shorter than this many characters are dropped, not padded.
    /// Zero keeps every trailing fragment.
    min_chunk_len: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// Rejects `overlap >= chunk_size`: the window could never advance and
    /// chunking would not terminate.
    pub fn new(chunk_size: usize, overlap: usize, min_chunk_len: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ExtractError::InvalidChunkConfig {
                chunk_size,
                overlap,
            });
        }

        Ok(Self {
            chunk_size,
            overlap,
            min_chunk_len,
        })
    }

    /// Default parameters: 1000-char chunks, 200-char overlap, 50-char floor.
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            min_chunk_len: 50,
        }
    }

    /// Split text into overlapping chunks attributed to `source_id`.
    ///
    /// Empty input, or input entirely below the minimum viable length,
    /// produces an empty sequence.
    pub fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let words_per_chunk = (self.chunk_size / AVG_WORD_LEN).max(1);
        let words_overlap = self.overlap / AVG_WORD_LEN;
        // Integer division can collapse the advance to zero even though the
        // constructor checked the character sizes; one word is the floor.
        let advance = words_per_chunk.saturating_sub(words_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0i64;

        loop {
            let end = (start + words_per_chunk).min(words.len());
            let body = words[start..end].join(" ");

            if body.len() > self.min_chunk_len {
                chunks.push(Chunk {
                    text: body,
                    source_id: source_id.to_string(),
                    index,
                });
                index += 1;
            }

            if end >= words.len() {
                break;
            }
            start += advance;
        }

        chunks
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{i:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = Chunker::with_defaults();
        assert!(chunker.chunk("", "doc.txt").is_empty());
        assert!(chunker.chunk("   \n ", "doc.txt").is_empty());
    }

    #[test]
    fn test_input_below_minimum_is_dropped() {
        let chunker = Chunker::with_defaults();
        // 20 chars, below the 50-char floor: no undersized chunk is emitted
        assert!(chunker.chunk("short text only here", "doc.txt").is_empty());
    }

    #[test]
    fn test_zero_minimum_keeps_short_tail() {
        let chunker = Chunker::new(1000, 200, 0).unwrap();
        let chunks = chunker.chunk("short text only here", "doc.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text only here");
    }

    #[test]
    fn test_indices_are_dense_over_emitted_chunks() {
        let chunker = Chunker::new(100, 25, 50).unwrap();
        let text = sentence(200);
        let chunks = chunker.chunk(&text, "doc.txt");

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as i64);
            assert_eq!(chunk.source_id, "doc.txt");
        }
    }

    #[test]
    fn test_emitted_chunks_exceed_minimum_length() {
        let chunker = Chunker::new(100, 25, 50).unwrap();
        let chunks = chunker.chunk(&sentence(137), "doc.txt");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() > 50);
        }
    }

    #[test]
    fn test_overlap_words_are_reincluded() {
        // 100 chars -> 20 words per chunk, 25 chars -> 5 words of overlap
        let chunker = Chunker::new(100, 25, 0).unwrap();
        let chunks = chunker.chunk(&sentence(50), "doc.txt");
        assert!(chunks.len() >= 2);

        let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
        let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
        assert_eq!(&first[first.len() - 5..], &second[..5]);
    }

    #[test]
    fn test_no_split_inside_a_word() {
        let chunker = Chunker::new(100, 25, 0).unwrap();
        let text = sentence(100);
        for chunk in chunker.chunk(&text, "doc.txt") {
            for word in chunk.text.split_whitespace() {
                // Every emitted token is one of the original words, intact
                assert!(text.contains(word));
                assert_eq!(word.len(), 7);
            }
        }
    }

    #[test]
    fn test_overlap_ge_chunk_size_rejected() {
        assert!(matches!(
            Chunker::new(200, 200, 50),
            Err(ExtractError::InvalidChunkConfig { .. })
        ));
        assert!(matches!(
            Chunker::new(200, 300, 50),
            Err(ExtractError::InvalidChunkConfig { .. })
        ));
        assert!(Chunker::new(200, 199, 50).is_ok());
    }

    #[test]
    fn test_terminates_when_integer_division_collapses_advance() {
        // 9/5 = 1 word per chunk, 5/5 = 1 word overlap: advance clamps to 1
        let chunker = Chunker::new(9, 5, 0).unwrap();
        let chunks = chunker.chunk(&sentence(10), "doc.txt");
        assert_eq!(chunks.len(), 10);
    }

    #[test]
    fn test_single_chunk_when_text_fits() {
        let chunker = Chunker::new(1000, 200, 50).unwrap();
        let text = sentence(60); // well under 200 words
        let chunks = chunker.chunk(&text, "doc.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }
}
