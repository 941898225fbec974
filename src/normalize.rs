//! # Text Normalization Module
//!
//! ## Purpose
//! Cleans raw OCR/plaintext statute text into a canonical form the segmenter
//! can rely on: one line-break convention, collapsed whitespace, page markers
//! removed, blank-line runs bounded.
//!
//! ## Input/Output Specification
//! - **Input**: Raw statute text (UTF-8, possibly OCR noise)
//! - **Output**: Normalized text; detected document language
//! - **Properties**: Pure, deterministic, idempotent
//!
//! ## Key Features
//! - Unicode NFC unification before any line handling
//! - Per-line trim and internal whitespace collapsing
//! - Page-marker line removal ("page 12", "12 of 210", "7")
//! - Blank-line run collapsing and whole-text trim
//! - Script-based language tagging (Urdu / English / mixed)

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Detected document language, by script membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ur,
    Mixed,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ur => "ur",
            Language::Mixed => "mixed",
        }
    }
}

/// Pattern for lines that are purely a page marker
pub(crate) fn page_line_pattern() -> Regex {
    Regex::new(r"(?i)^\s*(page\s*)?\d+\s*(of\s*\d+)?\s*$").unwrap()
}

/// Normalize raw statute text.
///
/// Line endings are unified to `\n`, every line is trimmed with internal
/// whitespace runs collapsed to a single space, page-marker lines are
/// dropped, and runs of three or more blank lines shrink to one blank line.
/// Re-normalizing already-normalized text returns it unchanged.
pub fn normalize(raw: &str) -> String {
    let unified: String = raw.nfc().collect::<String>().replace("\r\n", "\n").replace('\r', "\n");
    let page_line = page_line_pattern();

    let mut lines: Vec<String> = Vec::new();
    for line in unified.split('\n') {
        let stripped = line.trim();
        if stripped.is_empty() {
            lines.push(String::new());
            continue;
        }
        if page_line.is_match(stripped) {
            continue;
        }
        lines.push(stripped.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    let joined = lines.join("\n");
    let collapsed = Regex::new(r"\n{3,}").unwrap().replace_all(&joined, "\n\n");
    collapsed.trim().to_string()
}

/// Classify a document's language by the scripts it contains.
///
/// Arabic-script code points (U+0600..U+06FF) mark Urdu; ASCII letters mark
/// English; both together yield `Mixed`.
pub fn detect_language(text: &str) -> Language {
    let has_urdu = text.chars().any(|ch| ('\u{0600}'..='\u{06FF}').contains(&ch));
    let has_latin = text.chars().any(|ch| ch.is_ascii_alphabetic());
    match (has_urdu, has_latin) {
        (true, true) => Language::Mixed,
        (true, false) => Language::Ur,
        _ => Language::En,
    }
}
