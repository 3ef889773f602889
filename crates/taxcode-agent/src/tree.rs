//! Owned document tree for structured legal-markup XML.
//!
//! The tree mirrors the lxml element model: an element owns its direct text
//! (text before the first child) and every child owns a `tail` (text between
//! its end tag and the next sibling, which logically belongs to the parent's
//! inline stream). Parsing is lenient: mismatched or stray end tags are
//! tolerated rather than aborting the conversion.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ConvertError;

/// Closed set of element kinds recognized by the renderer.
///
/// Resolved once from the local tag name when the tree is built, so the
/// renderer dispatches on a variant instead of re-matching strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementKind {
    /// Document or part title, rendered as a level-1 heading at the root.
    Title,
    /// Numbered section, rendered as a level-2 heading.
    Section,
    /// Numbered subsection, rendered as a level-3 heading.
    Subsection,
    /// Numbered paragraph with a bold number prefix.
    Paragraph,
    /// Indented, bulleted subparagraph.
    Subparagraph,
    /// Inline prose (`p`, `content`, `chapeau`).
    PlainText,
    /// Tabular markup, rendered as a pipe table.
    Table,
    /// Editorial note, rendered as a blockquote.
    Note,
    /// Inline reference, rendered as a link or italic text.
    Reference,
    /// Itemized list, rendered as bullets.
    List,
    /// Parent-owned or container-only metadata (`num`, `heading`, `meta`,
    /// `main`); renders nothing itself.
    Metadata,
    /// Any other tag; renders its own text if it has any.
    #[default]
    Other,
}

impl ElementKind {
    /// Map a resolved local tag name to its kind.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "title" => Self::Title,
            "section" => Self::Section,
            "subsection" => Self::Subsection,
            "paragraph" => Self::Paragraph,
            "subparagraph" => Self::Subparagraph,
            "p" | "content" | "chapeau" => Self::PlainText,
            "table" => Self::Table,
            "note" | "notes" => Self::Note,
            "ref" => Self::Reference,
            "list" => Self::List,
            "num" | "heading" | "meta" | "main" => Self::Metadata,
            _ => Self::Other,
        }
    }
}

/// Strip any namespace qualification from a raw tag identifier.
///
/// Handles both the Clark notation `{uri}local` and the prefixed form
/// `prefix:local`. Pure and total; an unqualified name passes through.
#[must_use]
pub fn local_name(raw: &str) -> &str {
    let name = raw.rsplit('}').next().unwrap_or(raw);
    name.rsplit(':').next().unwrap_or(name)
}

/// One node of the document tree.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Resolved local tag name, namespace already stripped.
    pub name: String,
    /// Renderer dispatch kind, resolved from `name` at build time.
    pub kind: ElementKind,
    /// Attributes in document order, keys namespace-stripped.
    pub attrs: Vec<(String, String)>,
    /// Text immediately inside the element, before any child.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Text following this element's end tag, owned by the parent's stream.
    pub tail: Option<String>,
}

impl Element {
    /// Create an element from a raw (possibly namespace-qualified) tag name.
    #[must_use]
    pub fn new(raw_tag: &str) -> Self {
        let name = local_name(raw_tag).to_owned();
        let kind = ElementKind::from_tag(&name);
        Self {
            name,
            kind,
            ..Self::default()
        }
    }

    /// Look up an attribute value by key.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed direct text, or `None` if absent or whitespace-only.
    #[must_use]
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Trimmed direct text of the first child with the given local name.
    ///
    /// Used for the `num`/`heading`/`content` sub-fields that parents render
    /// themselves.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .filter(|child| child.name == name)
            .find_map(Element::trimmed_text)
    }

    /// First descendant (document order, excluding `self`) with the given
    /// local name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|el| el.name == name)
    }

    /// Pre-order iterator over all descendants, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Flattened text of the whole subtree: every direct text and interior
    /// tail, trimmed and joined with single spaces.
    #[must_use]
    pub fn flat_text(&self) -> String {
        let mut pieces = Vec::new();
        collect_text(self, &mut pieces);
        pieces.join(" ")
    }
}

fn collect_text(element: &Element, pieces: &mut Vec<String>) {
    if let Some(text) = element.trimmed_text() {
        pieces.push(text.to_owned());
    }
    for child in &element.children {
        collect_text(child, pieces);
        if let Some(tail) = child.tail.as_deref() {
            let tail = tail.trim();
            if !tail.is_empty() {
                pieces.push(tail.to_owned());
            }
        }
    }
}

/// Pre-order descendant iterator, see [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        for child in element.children.iter().rev() {
            self.stack.push(child);
        }
        Some(element)
    }
}

/// Parse an XML string into a document tree.
///
/// Mismatched end tags close the innermost open element; stray end tags and
/// unparsed prologue material are skipped. Unclosed elements at end of input
/// are closed in order. Only the first top-level element becomes the root;
/// anything after it is ignored.
///
/// # Errors
///
/// Returns [`ConvertError::XmlParse`] on unrecoverable parser errors and
/// [`ConvertError::EmptyDocument`] when no element was found at all.
pub fn parse(xml: &str) -> Result<Element, ConvertError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let config = reader.config_mut();
    config.trim_text(false);
    // Lenient mode: mismatched and stray end tags become ordinary events
    // for the stack-pop logic below instead of hard parse errors.
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    parse_reader(&mut reader)
}

fn parse_reader(reader: &mut Reader<&[u8]>) -> Result<Element, ConvertError> {
    let mut buf = Vec::new();
    // Open elements, innermost last.
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let mut element = element_from_start(reader, &e);
                element.attrs = decode_attrs(reader, &e);
                stack.push(element);
            }
            Event::Empty(e) => {
                let mut element = element_from_start(reader, &e);
                element.attrs = decode_attrs(reader, &e);
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                // Lenient: any end tag closes the innermost open element.
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut stack, &text);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    // Close anything left open at end of input.
    while let Some(element) = stack.pop() {
        attach(&mut stack, &mut root, element);
    }

    root.ok_or(ConvertError::EmptyDocument)
}

fn element_from_start(reader: &Reader<&[u8]>, e: &BytesStart) -> Element {
    let raw = decode_bytes(reader, e.name().as_ref());
    Element::new(&raw)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Append character data to the innermost open element: before any child it
/// becomes the element's text, after a child it becomes that child's tail.
fn append_text(stack: &mut [Element], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(last_child) = parent.children.last_mut() {
        match &mut last_child.tail {
            Some(tail) => tail.push_str(text),
            None => last_child.tail = Some(text.to_owned()),
        }
    } else {
        match &mut parent.text {
            Some(existing) => existing.push_str(text),
            None => parent.text = Some(text.to_owned()),
        }
    }
}

fn decode_bytes(reader: &Reader<&[u8]>, bytes: &[u8]) -> String {
    reader.decoder().decode(bytes).map_or_else(
        |_| String::from_utf8_lossy(bytes).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

fn decode_attrs(reader: &Reader<&[u8]>, e: &BytesStart) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = decode_bytes(reader, attr.key.as_ref());
        if key.starts_with("xmlns") {
            continue;
        }
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        attrs.push((local_name(&key).to_owned(), value));
    }
    attrs
}

/// Decode a general entity reference to its character value.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s[1..].starts_with(['x', 'X']) {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        other => format!("&{other};"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn local_name_strips_clark_notation() {
        assert_eq!(local_name("{http://xml.house.gov/schemas/uslm/1.0}section"), "section");
    }

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name("uslm:section"), "section");
        assert_eq!(local_name("section"), "section");
    }

    #[test]
    fn kinds_resolve_at_build_time() {
        assert_eq!(Element::new("uslm:subsection").kind, ElementKind::Subsection);
        assert_eq!(Element::new("chapeau").kind, ElementKind::PlainText);
        assert_eq!(Element::new("quotedContent").kind, ElementKind::Other);
    }

    #[test]
    fn text_and_tail_split_like_lxml() {
        let root = parse("<p>before <ref>link</ref> after</p>").unwrap();
        assert_eq!(root.text.as_deref(), Some("before "));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].text.as_deref(), Some("link"));
        assert_eq!(root.children[0].tail.as_deref(), Some(" after"));
    }

    #[test]
    fn attributes_are_decoded_and_namespace_stripped() {
        let root = parse(r#"<ref xmlns:x="u" x:href="https://x?a=1&amp;b=2">t</ref>"#).unwrap();
        assert_eq!(root.attr("href"), Some("https://x?a=1&b=2"));
        assert_eq!(root.attr("xmlns:x"), None);
    }

    #[test]
    fn mismatched_end_tags_are_tolerated() {
        let root = parse("<section><p>text</div></section>").unwrap();
        assert_eq!(root.name, "section");
        assert_eq!(root.children[0].trimmed_text(), Some("text"));
    }

    #[test]
    fn stray_end_tag_after_root_is_ignored() {
        let root = parse("<p>text</p></stray>").unwrap();
        assert_eq!(root.name, "p");
        assert_eq!(root.trimmed_text(), Some("text"));
    }

    #[test]
    fn unclosed_elements_close_at_eof() {
        let root = parse("<section><p>dangling").unwrap();
        assert_eq!(root.name, "section");
        assert_eq!(root.children[0].name, "p");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse("  "), Err(ConvertError::EmptyDocument)));
    }

    #[test]
    fn entities_decode_into_text() {
        let root = parse("<p>a &amp; b &#169;</p>").unwrap();
        assert_eq!(root.text.as_deref(), Some("a & b ©"));
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let root = parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = root.descendants().map(|el| el.name.as_str()).collect();
        assert_eq!(names, ["b", "c", "d"]);
    }

    #[test]
    fn flat_text_collapses_whitespace_and_keeps_tails() {
        let root = parse("<td>  a\n  <b>bold</b> tail </td>").unwrap();
        assert_eq!(root.flat_text(), "a bold tail");
    }

    #[test]
    fn child_text_skips_empty_candidates() {
        let root = parse("<section><num>  </num><num> §63 </num></section>").unwrap();
        assert_eq!(root.child_text("num"), Some("§63"));
        assert_eq!(root.child_text("heading"), None);
    }
}
