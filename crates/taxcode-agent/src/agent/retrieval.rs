//! Keyword retrieval over the converted tax code.
//!
//! Deliberately simple: heading-delimited sections scored by term overlap.
//! No embeddings, no NLP; the language model downstream does the synthesis.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum sections returned per query.
const MAX_SECTIONS: usize = 3;

/// Stored section content is capped at this many characters.
const SECTION_PREVIEW_CHARS: usize = 500;

/// Domain vocabulary checked against a question before falling back to its
/// own words.
const TAX_TERMS: &[&str] = &[
    "deduction",
    "credit",
    "income",
    "tax",
    "filing",
    "return",
    "dependent",
    "exemption",
    "liability",
    "asset",
    "charitable",
    "business",
    "expense",
    "capital",
    "gain",
    "loss",
    "dividend",
    "interest",
    "retirement",
    "IRA",
    "401k",
    "estate",
    "gift",
];

/// Words too generic to retrieve on when falling back to question words.
const QUESTION_STOPWORDS: &[&str] = &["what", "where", "when", "which", "there", "their", "about"];

static HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,4}\s").expect("valid regex"));
static SECTION_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"§(\d+)(?:\(([^)]+)\))?").expect("valid regex"));
static HEADING_SECTION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#{1,4}\s+§\d+(?:\([^)]+\))?").expect("valid regex"));
static HEADING_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,4}\s+").expect("valid regex"));

/// A section of the tax code judged relevant to one query. Ephemeral,
/// rebuilt per query.
#[derive(Debug, Clone)]
pub struct RelevantSection {
    /// The heading line, markdown marks included.
    pub heading: String,
    /// Section content, truncated to a preview.
    pub content: String,
    /// Citation derived from the heading.
    pub citation: String,
    /// Number of matching key terms.
    pub relevance: usize,
}

/// Extract the key terms of a question.
///
/// Any known tax term present in the question wins; otherwise every
/// question word longer than four characters that is not a stopword.
#[must_use]
pub fn extract_key_terms(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    let found: Vec<String> = TAX_TERMS
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .map(|term| (*term).to_owned())
        .collect();

    if !found.is_empty() {
        return found;
    }

    question
        .split_whitespace()
        .filter(|word| {
            let lowered = word.to_lowercase();
            word.chars().count() > 4 && !QUESTION_STOPWORDS.contains(&lowered.as_str())
        })
        .map(str::to_owned)
        .collect()
}

/// Split a Markdown document into (heading, content) sections.
///
/// A section starts at a heading line (one to four `#`) followed by a blank
/// line, and runs to the next heading or end of text. Headings without a
/// following blank line or without content do not open a section.
#[must_use]
pub fn split_sections(markdown: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if HEADING_LINE.is_match(lines[i])
            && i + 1 < lines.len()
            && lines[i + 1].trim().is_empty()
        {
            let heading = lines[i];
            let mut j = i + 2;
            while j < lines.len() && !HEADING_LINE.is_match(lines[j]) {
                j += 1;
            }
            let content = lines[i + 2..j].join("\n");
            if !content.is_empty() {
                sections.push((heading.to_owned(), content));
            }
            i = j;
        } else {
            i += 1;
        }
    }

    sections
}

/// Score all sections of the document against a question and return the top
/// matches by descending relevance.
#[must_use]
pub fn find_relevant_sections(tax_code: &str, question: &str) -> Vec<RelevantSection> {
    let key_terms = extract_key_terms(question);
    let mut relevant: Vec<RelevantSection> = Vec::new();

    for (heading, content) in split_sections(tax_code) {
        let heading_lower = heading.to_lowercase();
        let content_lower = content.to_lowercase();
        let relevance = key_terms
            .iter()
            .filter(|term| {
                let term = term.to_lowercase();
                content_lower.contains(&term) || heading_lower.contains(&term)
            })
            .count();

        if relevance > 0 {
            let citation = extract_citation(&heading);
            relevant.push(RelevantSection {
                citation,
                content: truncate_chars(&content, SECTION_PREVIEW_CHARS),
                heading,
                relevance,
            });
        }
    }

    // Stable sort keeps document order among equal scores.
    relevant.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    relevant.truncate(MAX_SECTIONS);
    relevant
}

/// Derive a citation string from a section heading.
///
/// A `§<number>(<subsection>)` pattern becomes a statute citation; anything
/// else falls back to the generic document wording.
#[must_use]
pub fn extract_citation(heading: &str) -> String {
    if let Some(caps) = SECTION_REF.captures(heading) {
        let section = &caps[1];
        let heading_text = HEADING_SECTION_PREFIX.replace_all(heading, "");
        let heading_text = heading_text.trim();
        return match caps.get(2) {
            Some(subsection) => {
                format!("26 USC §{section}({}) [{heading_text}]", subsection.as_str())
            }
            None => format!("26 USC §{section} [{heading_text}]"),
        };
    }

    let clean = HEADING_MARKS.replace_all(heading, "");
    format!("US Tax Code [{}]", clean.trim())
}

/// Truncate a string to at most `max` characters.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
