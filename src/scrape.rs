//! Structural helpers over `scraper` for the legacy HTML pages.
//!
//! Every table lookup works the same way: find the innermost `<table>`
//! whose text contains a landmark label, then walk its rows by position.
//! No parent-chain navigation, so a markup shim around a table does not
//! break the scan.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table").unwrap())
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").unwrap())
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").unwrap())
}

/// Collects the text of an element's subtree with non-breaking spaces
/// normalized and runs of whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect::<Vec<_>>().join(" ");
    let normalized = raw.replace('\u{a0}', " ");
    whitespace_re().replace_all(&normalized, " ").trim().to_string()
}

/// Whole-document text, normalized the same way.
pub fn document_text(document: &Html) -> String {
    let raw: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    let normalized = raw.replace('\u{a0}', " ");
    whitespace_re().replace_all(&normalized, " ").trim().to_string()
}

/// Finds the innermost table whose text contains `landmark`. Tables are
/// visited in tree order, so of a nested chain that all contain the label,
/// the deepest one wins.
pub fn landmark_table<'a>(document: &'a Html, landmark: &str) -> Option<ElementRef<'a>> {
    document
        .select(table_selector())
        .filter(|table| element_text(*table).contains(landmark))
        .last()
}

/// Rows of a table, in order.
pub fn table_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    table.select(row_selector()).collect()
}

/// Cell texts of a row, in order.
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(cell_selector()).map(element_text).collect()
}

/// True when any of the row's text matches one of the skip labels. Used to
/// drop header, label, and total rows from a landmark table.
pub fn row_matches_any(row: ElementRef<'_>, labels: &[&str]) -> bool {
    let text = element_text(row);
    labels.iter().any(|label| text.contains(label))
}

/// The first cell of the row following the row that contains `label`.
/// Several detail pages put a value on the line under its caption.
pub fn value_below_label(document: &Html, label: &str) -> Option<String> {
    cells_below_label(document, label)
        .into_iter()
        .next()
        .filter(|s| !s.is_empty())
}

/// All cell texts of the row following the row that contains `label`.
/// Empty when the label or the row below it is missing. Pages that put
/// several captions on one row (Address / Municipality) put their values
/// side by side on the next.
pub fn cells_below_label(document: &Html, label: &str) -> Vec<String> {
    let Some(table) = landmark_table(document, label) else {
        return Vec::new();
    };
    let rows = table_rows(table);
    let Some(position) = rows.iter().position(|row| element_text(*row).contains(label)) else {
        return Vec::new();
    };
    match rows.get(position + 1) {
        Some(below) => row_cells(*below),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_table_wins() {
        let html = Html::parse_document(
            "<table><tr><td>Outer</td></tr><tr><td>\
             <table><tr><td>Roll Number</td></tr><tr><td>123</td></tr></table>\
             </td></tr></table>",
        );
        let table = landmark_table(&html, "Roll Number").unwrap();
        assert_eq!(table_rows(table).len(), 2);
    }

    #[test]
    fn value_below_label_reads_next_row() {
        let html = Html::parse_document(
            "<table><tr><td><b>Roll Number</b></td></tr>\
             <tr><td> 02518 1060 </td><td>other</td></tr></table>",
        );
        assert_eq!(
            value_below_label(&html, "Roll Number").as_deref(),
            Some("02518 1060")
        );
    }

    #[test]
    fn cells_below_label_keep_sibling_columns() {
        let html = Html::parse_document(
            "<table><tr><td><b>Address</b></td><td><b>Municipality</b></td></tr>\
             <tr><td>73 TISDALE ST S</td><td>HAMILTON</td></tr></table>",
        );
        assert_eq!(
            cells_below_label(&html, "Address"),
            vec!["73 TISDALE ST S".to_string(), "HAMILTON".to_string()]
        );
        assert!(cells_below_label(&html, "Postal Code").is_empty());
    }

    #[test]
    fn text_normalizes_nbsp_and_runs() {
        let html = Html::parse_document("<p>March&nbsp;1,\n   2021</p>");
        assert_eq!(document_text(&html), "March 1, 2021");
    }

    #[test]
    fn missing_landmark_is_none() {
        let html = Html::parse_document("<table><tr><td>nothing here</td></tr></table>");
        assert!(landmark_table(&html, "Roll Number").is_none());
        assert!(value_below_label(&html, "Roll Number").is_none());
    }
}
