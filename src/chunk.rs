//! # Chunking Module
//!
//! ## Purpose
//! Splits section text into bounded-size chunks suitable for embedding. Two
//! interchangeable strategies: a character-based sliding window with overlap,
//! and greedy token-budget packing with short-tail merging.
//!
//! ## Input/Output Specification
//! - **Input**: Section text plus size parameters
//! - **Output**: Ordered chunk texts; the sliding window also reports char spans
//! - **Properties**: Pure, deterministic, side-effect-free
//!
//! ## Key Features
//! - Lazy sliding-window iteration over character offsets with a space-aware
//!   break accepted only past 60% of the window
//! - Token estimation as `word_count * 1.3`, floored (approximation, not a
//!   real tokenizer)
//! - Trailing fragments below the minimum budget merge back into the previous
//!   chunk instead of standing alone

use crate::errors::{Result, SearchError};

/// One sliding-window chunk with its character span in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Inclusive char offset where the window started
    pub start: usize,
    /// Exclusive char offset where the window ended
    pub end: usize,
    /// Trimmed window text, never empty
    pub text: String,
}

/// Lazy character-window iterator over a section's text.
///
/// Spans are monotonically non-decreasing in start offset, every
/// non-whitespace character is covered by at least one chunk, and consecutive
/// chunks overlap by up to `overlap` characters (less when a space-based
/// break shortened the window).
pub struct SlidingWindow {
    chars: Vec<char>,
    chunk_size: usize,
    overlap: usize,
    start: usize,
    done: bool,
}

/// Create a sliding-window chunker.
///
/// Fails with an invalid-argument error unless `chunk_size > 0` and
/// `overlap < chunk_size`.
pub fn sliding_window(text: &str, chunk_size: usize, overlap: usize) -> Result<SlidingWindow> {
    if chunk_size == 0 {
        return Err(SearchError::InvalidChunking {
            reason: "chunk_size must be > 0".to_string(),
        });
    }
    if overlap >= chunk_size {
        return Err(SearchError::InvalidChunking {
            reason: "overlap must be < chunk_size".to_string(),
        });
    }
    Ok(SlidingWindow {
        chars: text.chars().collect(),
        chunk_size,
        overlap,
        start: 0,
        done: false,
    })
}

impl Iterator for SlidingWindow {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        let length = self.chars.len();
        while !self.done && self.start < length {
            let mut end = (self.start + self.chunk_size).min(length);
            if end < length {
                // Prefer breaking at the last space in the window, but only
                // when it lies past 60% of the window; otherwise keep the
                // hard cut so space-sparse text cannot degenerate into tiny
                // chunks.
                let window = &self.chars[self.start..end];
                if let Some(last_space) = window.iter().rposition(|&c| c == ' ') {
                    if last_space as f64 > self.chunk_size as f64 * 0.6 {
                        end = self.start + last_space;
                    }
                }
            }

            let raw: String = self.chars[self.start..end].iter().collect();
            let trimmed = raw.trim().to_string();
            let span = if trimmed.is_empty() {
                None
            } else {
                Some(ChunkSpan {
                    start: self.start,
                    end,
                    text: trimmed,
                })
            };

            if end >= length {
                self.done = true;
            } else {
                // The window must always advance, even when the overlap
                // swallows a space-shortened window entirely.
                self.start = end.saturating_sub(self.overlap).max(self.start + 1);
            }

            if span.is_some() {
                return span;
            }
        }
        None
    }
}

/// Estimated token count for a text: `word_count * 1.3`, floored.
pub fn estimate_tokens(text: &str) -> usize {
    estimate_word_tokens(text.split_whitespace().count())
}

/// Greedy token-budget packing with short-tail merge-back.
///
/// Words accumulate until the buffer's estimated token count reaches
/// `max_tokens`, which flushes a chunk. A non-empty remainder below
/// `min_tokens` merges into the last emitted chunk; otherwise it becomes the
/// final chunk. The only chunk allowed below `min_tokens` is a sole chunk.
pub fn pack_by_tokens(text: &str, min_tokens: usize, max_tokens: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        current.push(word);
        if estimate_word_tokens(current.len()) >= max_tokens {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        let remainder = current.join(" ");
        if !chunks.is_empty() && estimate_tokens(&remainder) < min_tokens {
            let last = chunks
                .last_mut()
                .expect("chunks checked non-empty above");
            last.push(' ');
            last.push_str(&remainder);
        } else {
            chunks.push(remainder);
        }
    }

    chunks
}

fn estimate_word_tokens(word_count: usize) -> usize {
    (word_count as f64 * 1.3) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            sliding_window("text", 0, 0),
            Err(SearchError::InvalidChunking { .. })
        ));
        assert!(matches!(
            sliding_window("text", 100, 100),
            Err(SearchError::InvalidChunking { .. })
        ));
        assert!(matches!(
            sliding_window("text", 100, 150),
            Err(SearchError::InvalidChunking { .. })
        ));
        assert!(sliding_window("text", 100, 99).is_ok());
    }

    #[test]
    fn covers_every_non_whitespace_character() {
        let text = "The communication of proposals, the acceptance of proposals, and the revocation of proposals and acceptances respectively, are deemed to be made by any act or omission of the party proposing.";
        let spans: Vec<ChunkSpan> = sliding_window(text, 40, 10).unwrap().collect();
        assert!(!spans.is_empty());

        let chars: Vec<char> = text.chars().collect();
        let mut covered = vec![false; chars.len()];
        for span in &spans {
            assert!(span.text.chars().count() <= 40);
            for slot in covered.iter_mut().take(span.end).skip(span.start) {
                *slot = true;
            }
        }
        for (idx, ch) in chars.iter().enumerate() {
            if !ch.is_whitespace() {
                assert!(covered[idx], "char {} ({:?}) not covered", idx, ch);
            }
        }
    }

    #[test]
    fn starts_are_monotonic_and_overlap_is_bounded() {
        let text = "word ".repeat(200);
        let spans: Vec<ChunkSpan> = sliding_window(&text, 50, 12).unwrap().collect();
        for pair in spans.windows(2) {
            assert!(pair[1].start >= pair[0].start);
            assert!(pair[0].end.saturating_sub(pair[1].start) <= 12);
        }
    }

    #[test]
    fn breaks_at_spaces_past_sixty_percent_of_window() {
        let text = "aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddd eeeeeeeeee";
        let spans: Vec<ChunkSpan> = sliding_window(text, 25, 0).unwrap().collect();
        // Each window of 25 chars has its last space past position 15, so
        // every non-final chunk ends cleanly on a word boundary.
        for span in &spans[..spans.len() - 1] {
            assert!(!span.text.ends_with(|c: char| c.is_whitespace()));
            let next_char = text.chars().nth(span.end);
            assert_eq!(next_char, Some(' '));
        }
    }

    #[test]
    fn keeps_hard_cut_on_space_sparse_text() {
        let text = "a".repeat(100);
        let spans: Vec<ChunkSpan> = sliding_window(&text, 30, 5).unwrap().collect();
        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.chars().count() <= 30);
        }
    }

    #[test]
    fn token_estimate_rounds_down() {
        assert_eq!(estimate_tokens("one two three"), 3); // 3 * 1.3 = 3.9
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn packs_words_up_to_max_budget() {
        let text = "word ".repeat(100);
        let chunks = pack_by_tokens(&text, 10, 26);
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(estimate_tokens(chunk) >= 26);
        }
    }

    #[test]
    fn small_remainder_merges_into_previous_chunk() {
        // 25 words: the first 20 flush at the 26-token budget, the last 5
        // estimate to 6 tokens, below min 10, so they merge back.
        let text = "word ".repeat(25);
        let chunks = pack_by_tokens(&text, 10, 26);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].split_whitespace().count(), 25);
    }

    #[test]
    fn large_remainder_becomes_final_chunk() {
        // 30 words: 20 flush, 10 remain estimating to 13 tokens >= min 10.
        let text = "word ".repeat(30);
        let chunks = pack_by_tokens(&text, 10, 26);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].split_whitespace().count(), 10);
    }

    #[test]
    fn sole_chunk_may_be_below_minimum() {
        let chunks = pack_by_tokens("just a few words", 300, 500);
        assert_eq!(chunks.len(), 1);
        assert!(estimate_tokens(&chunks[0]) < 300);
    }

    #[test]
    fn at_most_one_chunk_below_minimum() {
        for words in [5usize, 19, 20, 21, 39, 40, 41, 77] {
            let text = "word ".repeat(words);
            let chunks = pack_by_tokens(&text, 10, 26);
            let small = chunks
                .iter()
                .filter(|c| estimate_tokens(c) < 10)
                .count();
            if chunks.len() == 1 {
                assert!(small <= 1);
            } else {
                assert_eq!(small, 0, "words={}", words);
            }
        }
    }
}
