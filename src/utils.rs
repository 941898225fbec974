//! # Utilities Module
//!
//! ## Purpose
//! Common helpers used throughout the statute search engine for text
//! measurement and operation timing.
//!
//! ## Input/Output Specification
//! - **Input**: Text fragments, operation scopes
//! - **Output**: Word counts, previews, elapsed-time measurements
//! - **Functions**: Text utilities, performance helpers

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

/// Text processing utilities
pub struct TextUtils;

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

impl TextUtils {
    /// Count whitespace-separated words in text
    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Truncate text to the given char length with ellipsis
    pub fn truncate(text: &str, max_length: usize) -> String {
        if text.chars().count() <= max_length {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(TextUtils::word_count("free consent of parties"), 4);
        assert_eq!(TextUtils::word_count("   "), 0);
        assert_eq!(TextUtils::word_count(""), 0);
    }

    #[test]
    fn test_text_truncate() {
        assert_eq!(TextUtils::truncate("Hello world", 20), "Hello world");
        assert_eq!(TextUtils::truncate("This is a very long text", 10), "This is...");
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = Timer::new("unit");
        assert!(timer.elapsed_ms() < 1_000);
        let elapsed = timer.stop();
        assert!(elapsed < 1_000);
    }
}
