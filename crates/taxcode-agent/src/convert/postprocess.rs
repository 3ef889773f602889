//! Whole-document cleanup pass.
//!
//! Runs once over the fully assembled text, after the walker: the rules
//! operate on global newline structure, not on per-node fragments. The pass
//! is idempotent; line trimming runs before newline collapsing so trimmed
//! blank lines cannot surface new runs on a second application.

use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static BLANK_BEFORE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n(#+\s)").expect("valid regex"));
static EXCESS_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Normalize spacing in an assembled Markdown document.
///
/// Trims every line, collapses runs of three or more newlines to a blank
/// line, removes the blank line directly before a heading, and squeezes
/// repeated spaces.
#[must_use]
pub fn postprocess(markdown: &str) -> String {
    let trimmed: String = markdown
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let collapsed = EXCESS_NEWLINES.replace_all(&trimmed, "\n\n");
    let tightened = BLANK_BEFORE_HEADING.replace_all(&collapsed, "\n$1");
    EXCESS_SPACES.replace_all(&tightened, " ").into_owned()
}
