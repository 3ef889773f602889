//! Recursive tree walker and per-kind element renderer.
//!
//! The walker is pre-order: a node renders itself first, then its children
//! are appended — except for container kinds, whose renderer consumes the
//! children internally (sections pull their `num`/`heading` out, notes quote
//! every child line, tables and lists flatten their whole subtree). Walking
//! a container's children again would double-render them.

use crate::options::ConvertOptions;
use crate::tree::{Element, ElementKind};

use super::{list, table};

/// Tag of the document root; a `title` directly under it is the document
/// title rather than an ordinary heading.
const DOC_ROOT_TAG: &str = "uscDoc";

/// Kinds whose renderer consumes and emits its children itself.
const fn handles_own_children(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Section
            | ElementKind::Subsection
            | ElementKind::Paragraph
            | ElementKind::Subparagraph
            | ElementKind::Table
            | ElementKind::List
            | ElementKind::Note
    )
}

/// Kinds that render even without direct text.
const fn is_structural(kind: ElementKind) -> bool {
    handles_own_children(kind) || matches!(kind, ElementKind::Title)
}

/// Render a subtree to Markdown text.
///
/// `parent` is the immediate parent element, if any; it only matters for
/// root-level titles. `depth` is the current nesting level.
pub fn render_tree(
    element: &Element,
    parent: Option<&Element>,
    depth: usize,
    options: &ConvertOptions,
) -> String {
    if depth > options.max_depth {
        tracing::debug!(name = %element.name, depth, "max depth reached, dropping subtree");
        return String::new();
    }

    // Textless, non-structural elements contribute no markup of their own
    // (and lose their tail text with it).
    let skipped = element.trimmed_text().is_none() && !is_structural(element.kind);
    let mut out = if skipped {
        String::new()
    } else {
        render_element(element, parent, depth, options)
    };

    if skipped && options.prune_empty {
        return out;
    }

    if !handles_own_children(element.kind) {
        for child in &element.children {
            out.push_str(&render_tree(child, Some(element), depth + 1, options));
        }
    }

    out
}

/// Render exactly one element according to its kind.
///
/// Container kinds walk their own (non-metadata) children here; everything
/// else leaves child handling to [`render_tree`]. The tail text, if any, is
/// appended unconditionally at the end: it belongs to the parent's inline
/// stream and this fragment is what the parent concatenates.
#[allow(clippy::too_many_lines)]
fn render_element(
    element: &Element,
    parent: Option<&Element>,
    depth: usize,
    options: &ConvertOptions,
) -> String {
    let mut out = String::new();

    match element.kind {
        ElementKind::Title => {
            if parent.is_some_and(|p| p.name == DOC_ROOT_TAG) {
                if let Some(num) = element.child_text("num") {
                    out.push_str(&format!("# {num}\n\n"));
                }
                if let Some(heading) = element.child_text("heading") {
                    out.push_str(&format!("# {heading}\n\n"));
                }
            } else if let Some(text) = element.trimmed_text() {
                // Interior titles carry no heading level of their own.
                out.push_str(text);
                out.push(' ');
            }
        }

        ElementKind::Section | ElementKind::Subsection => {
            let marker = if element.kind == ElementKind::Section {
                "##"
            } else {
                "###"
            };

            let mut header = String::new();
            if let Some(num) = element.child_text("num") {
                header.push_str(num);
                header.push(' ');
            }
            if let Some(heading) = element.child_text("heading") {
                header.push_str(heading);
            }

            let mut content = String::new();
            for child in &element.children {
                if child.name != "num" && child.name != "heading" {
                    content.push_str(&render_tree(child, Some(element), depth + 1, options));
                }
            }

            if !header.is_empty() {
                out.push_str(&format!("\n{marker} {}\n\n", header.trim_end()));
            }
            out.push_str(&content);
        }

        ElementKind::Paragraph | ElementKind::Subparagraph => {
            let mut extra = String::new();
            for child in &element.children {
                if child.name != "num" && child.name != "content" {
                    extra.push_str(&render_tree(child, Some(element), depth + 1, options));
                }
            }

            if let Some(num) = element.child_text("num") {
                if element.kind == ElementKind::Subparagraph {
                    out.push_str("  - ");
                }
                out.push_str(&format!("**{num}** "));
            }
            if let Some(content) = element.child_text("content") {
                out.push_str(content);
                out.push(' ');
            }
            out.push_str(extra.trim());
            if !out.trim().is_empty() {
                out.push('\n');
            }
        }

        ElementKind::PlainText => {
            if let Some(text) = element.trimmed_text() {
                out.push_str(text);
                out.push(' ');
            }
        }

        ElementKind::Table => {
            let rendered = table::table_to_markdown(element);
            if !rendered.is_empty() {
                out.push_str(&rendered);
                out.push('\n');
            }
        }

        ElementKind::Note => {
            if let Some(heading) = element.child_text("heading") {
                out.push_str(&format!("> **{heading}**\n"));
            }
            if let Some(text) = element.trimmed_text() {
                let quoted: Vec<String> = text
                    .lines()
                    .map(|line| format!("> {}", line.trim_end()))
                    .collect();
                out.push_str(&quoted.join("\n"));
                out.push('\n');
            }
            for child in &element.children {
                if child.name == "heading" {
                    continue;
                }
                let rendered = render_tree(child, Some(element), depth + 1, options);
                let quoted: Vec<String> = rendered
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| format!("> {}", line.trim_end()))
                    .collect();
                if !quoted.is_empty() {
                    out.push_str(&quoted.join("\n"));
                    out.push('\n');
                }
            }
        }

        ElementKind::Reference => {
            // Stays inline: no trailing newline or space of its own.
            if let Some(text) = element.trimmed_text() {
                match element.attr("href") {
                    Some(href) if !href.is_empty() => {
                        out.push_str(&format!("[{text}]({href})"));
                    }
                    _ => out.push_str(&format!("*{text}*")),
                }
            }
        }

        ElementKind::List => {
            let rendered = list::list_to_markdown(element);
            if !rendered.is_empty() {
                out.push_str(&rendered);
                out.push('\n');
            }
        }

        ElementKind::Metadata => {}

        ElementKind::Other => {
            if let Some(text) = element.trimmed_text() {
                out.push_str(text);
                out.push(' ');
            }
        }
    }

    if let Some(tail) = element.tail.as_deref() {
        let tail = tail.trim();
        if !tail.is_empty() {
            out.push_str(tail);
            out.push(' ');
        }
    }

    out
}
