//! Itemized-list markup to bulleted-block conversion.

use crate::tree::Element;

/// Convert a list-shaped subtree to one `* item` line per item.
///
/// Items are collected from anywhere in the subtree, not only direct
/// children; legal markup often wraps them in intermediate grouping
/// elements. Item text is the item's own direct text joined with the text
/// of every `content` descendant; items that end up empty are dropped.
#[must_use]
pub fn list_to_markdown(list: &Element) -> String {
    let mut lines: Vec<String> = Vec::new();

    for item in list.descendants().filter(|el| el.name == "item") {
        let mut pieces: Vec<&str> = Vec::new();
        if let Some(text) = item.trimmed_text() {
            pieces.push(text);
        }
        for content in item.descendants().filter(|el| el.name == "content") {
            if let Some(text) = content.trimmed_text() {
                pieces.push(text);
            }
        }
        if !pieces.is_empty() {
            lines.push(format!("* {}", pieces.join(" ")));
        }
    }

    lines.join("\n")
}
