//! # Section Segmentation Module
//!
//! ## Purpose
//! Detects section boundaries in normalized statute text and splits the text
//! into ordered `Section` records. Two heading shapes compete for matches: a
//! bare leading number ("12. Formation of contracts") and the word form
//! ("Section 12. Formation of contracts").
//!
//! ## Input/Output Specification
//! - **Input**: Normalized statute text
//! - **Output**: Ordered, contiguous, non-overlapping `Section` records
//! - **Algorithm**: Candidate generation per pattern, merge by offset with an
//!   explicit tie-break, then a single shared acceptance predicate
//!
//! ## Key Features
//! - Both patterns anchor at line start; candidates are sorted by position and
//!   deduplicated by start offset (the bare-number pattern wins ties)
//! - Heading-candidacy filtering rejects list headers, amendment footnotes and
//!   page markers before they can become boundaries
//! - A lossless path that never drops a document (implicit whole-document
//!   section) and a strict path that may yield zero sections

use crate::normalize::page_line_pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A numbered operative unit of a statute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Statute section number; may contain letters or hyphens ("15A")
    pub section_id: String,
    /// Heading text immediately following the number
    pub title: String,
    /// Text from the heading to the start of the next heading
    pub text: String,
}

/// Section id assigned when a document yields no headings on the lossless path
pub const IMPLICIT_SECTION_ID: &str = "root";

/// Which heading pattern produced a candidate; the bare-number pattern wins
/// ties at the same offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum HeadingPattern {
    BareNumber,
    SectionWord,
}

#[derive(Debug, Clone)]
struct HeadingCandidate {
    start: usize,
    pattern: HeadingPattern,
    section_id: String,
    title: String,
}

/// Heading detector holding the compiled competing patterns
pub struct SectionSegmenter {
    bare_number: Regex,
    section_word: Regex,
}

impl Default for SectionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionSegmenter {
    pub fn new() -> Self {
        Self {
            bare_number: Regex::new(r"(?m)^\s*(?P<num>\d+[A-Za-z-]*)\.\s+(?P<title>[^\n]+)$")
                .unwrap(),
            section_word: Regex::new(
                r"(?mi)^\s*(section|sec\.?)[\s\x{00A0}]+(?P<num>\d+[A-Za-z-]*)\.\s*(?P<title>[^\n]+)$",
            )
            .unwrap(),
        }
    }

    /// Strict segmentation: zero surviving headings yield zero sections, so a
    /// document without recognizable headings is dropped by this path.
    pub fn extract_sections(&self, text: &str) -> Vec<Section> {
        self.sections_from_candidates(text, self.surviving_candidates(text))
    }

    /// Lossless segmentation: zero surviving headings degenerate to a single
    /// implicit section covering the whole document.
    pub fn extract_sections_lossless(&self, text: &str) -> Vec<Section> {
        let candidates = self.surviving_candidates(text);
        if candidates.is_empty() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            return vec![Section {
                section_id: IMPLICIT_SECTION_ID.to_string(),
                title: String::new(),
                text: trimmed.to_string(),
            }];
        }
        self.sections_from_candidates(text, candidates)
    }

    /// Generate candidates from both patterns, merge by offset and apply the
    /// shared acceptance predicate.
    fn surviving_candidates(&self, text: &str) -> Vec<HeadingCandidate> {
        let mut candidates: Vec<HeadingCandidate> = Vec::new();

        for (pattern, regex) in [
            (HeadingPattern::BareNumber, &self.bare_number),
            (HeadingPattern::SectionWord, &self.section_word),
        ] {
            for caps in regex.captures_iter(text) {
                let full = caps.get(0).expect("match group 0 always present");
                candidates.push(HeadingCandidate {
                    start: full.start(),
                    pattern,
                    section_id: caps["num"].trim().to_string(),
                    title: caps["title"].trim().to_string(),
                });
            }
        }

        candidates.sort_by(|a, b| a.start.cmp(&b.start).then(a.pattern.cmp(&b.pattern)));

        let mut surviving: Vec<HeadingCandidate> = Vec::new();
        let mut last_start = None;
        for candidate in candidates {
            if last_start == Some(candidate.start) {
                continue;
            }
            if !is_heading_candidate(&candidate.title) {
                continue;
            }
            last_start = Some(candidate.start);
            surviving.push(candidate);
        }
        surviving
    }

    fn sections_from_candidates(
        &self,
        text: &str,
        candidates: Vec<HeadingCandidate>,
    ) -> Vec<Section> {
        let mut sections = Vec::with_capacity(candidates.len());
        for (idx, candidate) in candidates.iter().enumerate() {
            let end = candidates
                .get(idx + 1)
                .map(|next| next.start)
                .unwrap_or(text.len());
            sections.push(Section {
                section_id: candidate.section_id.clone(),
                title: candidate.title.clone(),
                text: text[candidate.start..end].trim().to_string(),
            });
        }
        sections
    }
}

/// Shared heading-acceptance predicate, used both for section boundaries and
/// for title cleaning.
///
/// Rejects empty titles, the "SECTIONS" list header, titles that begin like a
/// cross-reference continuation ("of the ..."), amendment footnotes ("ins.",
/// "subs.", "omitted") and page markers.
pub fn is_heading_candidate(title: &str) -> bool {
    let lowered = title.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    if lowered == "sections" || lowered == "sections." {
        return false;
    }
    if lowered.starts_with("of the ") || lowered.starts_with("of ") {
        return false;
    }
    let footnote = Regex::new(r"(?i)^\s*\d+\s*(ins\.|subs\.|omitted)\b").unwrap();
    if footnote.is_match(title) {
        return false;
    }
    if ["ins.", "subs.", "omitted", "subs ", "ins "]
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return false;
    }
    if page_line_pattern().is_match(title) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_word_form_headings_into_ordered_sections() {
        let text = "Section 10. What agreements are contracts\nAll agreements are contracts if they are made (1) by free consent (2) for a lawful consideration.\nSection 11. Who are competent to contract\nEvery person is competent to contract who is of the age of majority.";
        let sections = SectionSegmenter::new().extract_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_id, "10");
        assert_eq!(sections[0].title, "What agreements are contracts");
        assert!(sections[0].text.contains("free consent"));
        assert_eq!(sections[1].section_id, "11");
        assert!(sections[1].text.starts_with("Section 11."));
    }

    #[test]
    fn splits_bare_number_headings() {
        let text = "15A. Liability of directors\nDirectors are jointly liable for the debts described in this Part.\n16. Winding up\nA company may be wound up voluntarily.";
        let sections = SectionSegmenter::new().extract_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_id, "15A");
        assert_eq!(sections[1].section_id, "16");
    }

    #[test]
    fn section_spans_are_contiguous_and_ordered() {
        let text = "1. Short title\nThis Act may be called the Contract Act.\n2. Interpretation clause\nIn this Act the following words are used.\n3. Communication of proposals\nThe communication of proposals is deemed to be made.";
        let sections = SectionSegmenter::new().extract_sections(text);
        let ids: Vec<&str> = sections.iter().map(|s| s.section_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        // Each span starts at its own heading and stops before the next one.
        for section in &sections {
            assert!(section.text.starts_with(&format!("{}. {}", section.section_id, section.title)));
        }
        assert!(sections[0].text.ends_with("the Contract Act."));
        assert!(sections[1].text.ends_with("words are used."));
        assert!(sections[2].text.ends_with("deemed to be made."));
    }

    #[test]
    fn rejects_non_heading_titles() {
        assert!(is_heading_candidate("What agreements are contracts"));
        assert!(!is_heading_candidate(""));
        assert!(!is_heading_candidate("Sections"));
        assert!(!is_heading_candidate("sections."));
        assert!(!is_heading_candidate("of the Companies Act"));
        assert!(!is_heading_candidate("of contracts generally"));
        assert!(!is_heading_candidate("ins. by Act IV of 1976"));
        assert!(!is_heading_candidate("Subs. by Ordinance XII"));
        assert!(!is_heading_candidate("omitted by Act II of 1991"));
        assert!(!is_heading_candidate("4 ins. by the Finance Act"));
        assert!(!is_heading_candidate("page 12"));
        assert!(!is_heading_candidate("12 of 210"));
    }

    #[test]
    fn filtered_headings_do_not_become_boundaries() {
        let text = "5. of the previous Act\nSome continuation line.\n6. Revocation of proposals\nA proposal is revoked by communication of notice.";
        let sections = SectionSegmenter::new().extract_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_id, "6");
    }

    #[test]
    fn strict_path_drops_heading_free_documents() {
        let text = "This preamble has no numbered headings at all, only prose.";
        assert!(SectionSegmenter::new().extract_sections(text).is_empty());
    }

    #[test]
    fn lossless_path_keeps_heading_free_documents() {
        let text = "This preamble has no numbered headings at all, only prose.";
        let sections = SectionSegmenter::new().extract_sections_lossless(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_id, IMPLICIT_SECTION_ID);
        assert_eq!(sections[0].text, text);
    }
}
