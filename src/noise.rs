//! # Noise Classification Module
//!
//! ## Purpose
//! Flags sections and text blocks that are not operative legal text: tables
//! of contents, schedules, fee charts, forms, amendment footnotes and
//! fragments too short to carry a provision.
//!
//! ## Input/Output Specification
//! - **Input**: `Section` records and raw text blocks
//! - **Output**: Boolean noise classifications; TOC-stripped text; cleaned titles
//! - **Heuristics**: List-item line shape ratios, schedule vocabulary, length
//!   thresholds with sub-clause markers
//!
//! ## Key Features
//! - Three-way TOC detection: literal phrase, list-item line ratio, and a
//!   "SECTIONS" header followed by numbered lines
//! - Line-oriented TOC block removal for embedded lists that would otherwise
//!   be misread as real headings
//! - Section-title cleaning that strips dash/sub-clause suffixes and rejects
//!   titles that fail heading candidacy

use crate::normalize::page_line_pattern;
use crate::segment::{is_heading_candidate, Section};
use crate::utils::TextUtils;
use regex::Regex;

/// Vocabulary marking schedules, annexes and other non-operative material
fn schedule_pattern() -> Regex {
    Regex::new(r"(?i)\b(schedule|schedules|forms|tables?|index|fee chart|fees|appendix)\b").unwrap()
}

/// "number, dot, text" list-item shape used by statute tables of contents
fn toc_line_pattern() -> Regex {
    Regex::new(r"^\s*\d+[A-Za-z-]*\.?\s+.+$").unwrap()
}

fn is_sections_marker(line: &str) -> bool {
    let lowered = line.trim().to_lowercase();
    lowered == "sections" || lowered == "sections."
}

/// Decide whether a text block reads like a table of contents.
///
/// A block qualifies when its first few non-empty lines contain the literal
/// phrase "table of contents", when at least 60% of its first 20 non-empty
/// lines have the list-item shape, or when a leading "SECTIONS" header is
/// followed by five or more "digits, dot" lines.
pub fn is_toc_block(text: &str) -> bool {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return true;
    }

    if lines
        .iter()
        .take(5)
        .any(|line| line.to_lowercase().contains("table of contents"))
    {
        return true;
    }

    if lines.len() >= 6 {
        let toc_line = toc_line_pattern();
        let toc_like = lines
            .iter()
            .take(20)
            .filter(|line| toc_line.is_match(line))
            .count();
        if toc_like as f64 / lines.len().min(20) as f64 >= 0.6 {
            return true;
        }
    }

    if lines.iter().take(5).any(|line| is_sections_marker(line)) {
        let numbered = Regex::new(r"^\d+\.").unwrap();
        let count = lines
            .iter()
            .take(20)
            .filter(|line| numbered.is_match(line))
            .count();
        if count >= 5 {
            return true;
        }
    }

    false
}

/// Strip embedded table-of-contents blocks from normalized text.
///
/// A standalone "SECTIONS" line enters skip mode; blank lines and list-item
/// shaped lines that follow are discarded until the first line that is
/// neither, which is kept and ends the skip. Text with no marker line passes
/// through unchanged apart from blank-line collapsing.
pub fn remove_toc_blocks(text: &str) -> String {
    let toc_line = toc_line_pattern();
    let mut output: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in text.split('\n') {
        let stripped = line.trim();
        if is_sections_marker(stripped) {
            skipping = true;
            continue;
        }
        if skipping {
            if stripped.is_empty() {
                continue;
            }
            if toc_line.is_match(stripped) {
                continue;
            }
            skipping = false;
        }
        output.push(line);
    }

    let cleaned = output.join("\n");
    let collapsed = Regex::new(r"\n{3,}").unwrap().replace_all(&cleaned, "\n\n");
    collapsed.trim().to_string()
}

/// Decide whether a section carries no operative legal text.
///
/// Non-substantive sections are "SECTIONS" list headers, sections whose
/// title+text mention schedule vocabulary, TOC-shaped bodies, and bodies of
/// fewer than 25 words with no "(1)" sub-clause marker.
pub fn is_non_substantive(section: &Section) -> bool {
    if is_sections_marker(&section.title) {
        return true;
    }
    let combined = format!("{} {}", section.title, section.text);
    if schedule_pattern().is_match(&combined) {
        return true;
    }
    if is_toc_block(&section.text) {
        return true;
    }
    if TextUtils::word_count(&section.text) < 25 && !section.text.contains("(1)") {
        return true;
    }
    false
}

/// Clean a raw heading title for the cleaned dataset.
///
/// Splits off dash-introduced and "(1)"-introduced body fragments that OCR
/// often glues onto the heading line, then rejects titles that fail heading
/// candidacy, look like page markers or schedule vocabulary, or exceed 120
/// characters. `None` means the section keeps no title, not that the section
/// is dropped.
pub fn clean_section_title(raw_title: &str) -> Option<String> {
    let mut title = raw_title.trim().to_string();
    if title.is_empty() {
        return None;
    }
    if !is_heading_candidate(&title) {
        return None;
    }
    for sep in ["\u{2014}", "\u{2013}"] {
        if let Some(idx) = title.find(sep) {
            title = title[..idx].trim().to_string();
        }
    }
    if let Some(idx) = title.find("-(") {
        title = title[..idx].trim().to_string();
    }
    if let Some(idx) = title.find("(1)") {
        title = title[..idx].trim().to_string();
    }
    if page_line_pattern().is_match(&title) {
        return None;
    }
    if schedule_pattern().is_match(&title) {
        return None;
    }
    if title.to_lowercase().starts_with("page ") {
        return None;
    }
    if title.chars().count() > 120 {
        return None;
    }
    Some(title)
}
