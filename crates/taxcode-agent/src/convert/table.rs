//! Tabular markup to pipe-table conversion.

use crate::tree::Element;

/// Convert a table-shaped subtree to a Markdown pipe table.
///
/// The header row (plus its `---` separator) is emitted only when the header
/// group contains at least one `th` cell; body rows with no `td` cells are
/// skipped. Header and body column counts are passed through as found, with
/// no reconciliation between the two.
#[must_use]
pub fn table_to_markdown(table: &Element) -> String {
    let mut lines: Vec<String> = Vec::new();

    let headers: Vec<String> = table
        .find("thead")
        .map(|thead| {
            thead
                .descendants()
                .filter(|el| el.name == "th")
                .map(Element::flat_text)
                .collect()
        })
        .unwrap_or_default();

    if !headers.is_empty() {
        lines.push(format!("| {} |", headers.join(" | ")));
        lines.push(format!("| {} |", vec!["---"; headers.len()].join(" | ")));
    }

    if let Some(tbody) = table.find("tbody") {
        for row in tbody.descendants().filter(|el| el.name == "tr") {
            let cells: Vec<String> = row
                .descendants()
                .filter(|el| el.name == "td")
                .map(Element::flat_text)
                .collect();
            if !cells.is_empty() {
                lines.push(format!("| {} |", cells.join(" | ")));
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::tree::parse;

    use super::*;

    fn convert(xml: &str) -> String {
        table_to_markdown(&parse(xml).unwrap())
    }

    #[test]
    fn header_and_one_body_row_yield_three_lines() {
        let out = convert(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
        );
        assert_eq!(out, "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn body_only_table_has_no_separator() {
        let out = convert("<table><tbody><tr><td>x</td></tr></tbody></table>");
        assert_eq!(out, "| x |");
    }

    #[test]
    fn header_only_table_degrades_to_two_lines() {
        let out = convert("<table><thead><tr><th>A</th></tr></thead></table>");
        assert_eq!(out, "| A |\n| --- |");
    }

    #[test]
    fn empty_rows_are_skipped() {
        let out = convert(
            "<table><tbody><tr></tr><tr><td>kept</td></tr></tbody></table>",
        );
        assert_eq!(out, "| kept |");
    }

    #[test]
    fn mismatched_column_counts_pass_through() {
        let out = convert(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>only</td></tr></tbody></table>",
        );
        assert_eq!(out, "| A | B |\n| --- | --- |\n| only |");
    }

    #[test]
    fn cell_text_is_flattened() {
        let out = convert(
            "<table><tbody><tr><td>rate of <b>39.6</b> percent</td></tr></tbody></table>",
        );
        assert_eq!(out, "| rate of 39.6 percent |");
    }
}
