//! Structured legal-markup XML to Markdown conversion.
//!
//! The pipeline is a pure tree transformation: parse the source into the
//! [`crate::tree`] model, walk it depth-first rendering each element, then
//! run a whole-document cleanup pass. All I/O happens at the boundary in
//! [`convert_file`].

mod list;
mod postprocess;
mod render;
mod table;

use std::fs;
use std::path::Path;

pub use postprocess::postprocess;
pub use render::render_tree;

use crate::error::ConvertError;
use crate::options::ConvertOptions;
use crate::tree;

/// Convert an XML document string to Markdown.
///
/// # Errors
///
/// Returns [`ConvertError`] if the document cannot be parsed at all;
/// recoverable markup problems are tolerated by the lenient parser.
pub fn convert_str(xml: &str, options: &ConvertOptions) -> Result<String, ConvertError> {
    let root = tree::parse(xml)?;
    let raw = render_tree(&root, None, 0, options);
    Ok(postprocess(&raw))
}

/// Convert an XML file on disk to a Markdown file.
///
/// # Errors
///
/// Returns [`ConvertError`] on read, parse, or write failure. A document
/// that fails to parse aborts the conversion with a diagnostic instead of
/// writing partial output.
pub fn convert_file(
    xml_path: &Path,
    markdown_path: &Path,
    options: &ConvertOptions,
) -> Result<(), ConvertError> {
    tracing::info!(path = %xml_path.display(), "loading XML file");
    let xml = fs::read_to_string(xml_path).map_err(|source| ConvertError::Read {
        path: xml_path.to_path_buf(),
        source,
    })?;
    tracing::info!(bytes = xml.len(), "parsing and converting to Markdown");

    let markdown = convert_str(&xml, options)?;

    tracing::info!(path = %markdown_path.display(), "writing Markdown");
    fs::write(markdown_path, &markdown).map_err(|source| ConvertError::Write {
        path: markdown_path.to_path_buf(),
        source,
    })?;
    tracing::info!("conversion completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn end_to_end_document_conversion() {
        let xml = r#"<uscDoc xmlns="http://xml.house.gov/schemas/uslm/1.0">
            <title>
                <num>Title 26</num>
                <heading>Internal Revenue Code</heading>
            </title>
            <main>
                <section>
                    <num>§63</num>
                    <heading>Taxable Income Defined</heading>
                    <paragraph>
                        <num>(1)</num>
                        <content>In general</content>
                        <ref href="https://x">see note</ref>
                    </paragraph>
                </section>
            </main>
        </uscDoc>"#;
        let out = convert_str(xml, &ConvertOptions::default()).unwrap();

        assert!(out.contains("# Title 26"));
        assert!(out.contains("## §63 Taxable Income Defined"));
        let link_line = out.lines().find(|l| l.contains("[see note](https://x)")).unwrap();
        assert!(link_line.starts_with("**(1)** In general"));
    }

    #[test]
    fn converted_output_is_postprocessed() {
        let xml = "<section><num>§1</num><heading>Tax imposed</heading><p>a  lot   of space</p></section>";
        let out = convert_str(xml, &ConvertOptions::default()).unwrap();
        assert_eq!(out, "\n## §1 Tax imposed\n\na lot of space");
    }

    #[test]
    fn convert_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let xml_path = dir.path().join("doc.xml");
        let md_path = dir.path().join("doc.md");
        std::fs::write(&xml_path, "<section><num>§1</num><heading>H</heading></section>").unwrap();

        convert_file(&xml_path, &md_path, &ConvertOptions::default()).unwrap();

        let out = std::fs::read_to_string(&md_path).unwrap();
        assert_eq!(out, "\n## §1 H\n\n");
    }

    #[test]
    fn missing_input_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_file(
            &dir.path().join("absent.xml"),
            &dir.path().join("out.md"),
            &ConvertOptions::default(),
        );
        assert!(matches!(result, Err(ConvertError::Read { .. })));
    }
}
