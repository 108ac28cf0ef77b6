//! Table extractors turning federation listing pages into `Tournament` records.

pub mod legacy;
pub mod modern;

pub use legacy::LegacyExtractor;
pub use modern::ModernExtractor;

use crate::types::Tournament;
use scraper::{ElementRef, Html};

/// Dialect-specific walk over a listing document's rows
pub trait TableExtractor: Send + Sync {
    /// Extract tournaments in document order; never fails, unusable rows are dropped
    fn extract(&self, document: &Html) -> Vec<Tournament>;

    fn extract_from_str(&self, body: &str) -> Vec<Tournament> {
        let document = Html::parse_document(body);
        self.extract(&document)
    }
}

/// Remove layout whitespace from cell text: newlines, tabs and double-space pairs
pub fn strip_layout(input: &str) -> String {
    input.replace("  ", "").replace('\n', "").replace('\t', "")
}

/// Concatenated text of an element, layout stripped and trimmed
pub fn cell_text(element: &ElementRef) -> String {
    strip_layout(&raw_text(element)).trim().to_string()
}

pub fn raw_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

/// Collapse every whitespace run into one space
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identifier following `marker` in a detail URL, empty if the marker is missing
pub fn id_from_url(url: &str, marker: &str) -> String {
    match url.split_once(marker) {
        Some((_, id)) => id.trim().to_string(),
        None => String::new(),
    }
}

/// Substring strictly between the first `start` and the next `end` after it
pub fn text_between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let rest = &haystack[from..];
    let to = rest.find(end)?;
    Some(&rest[..to])
}

/// Skill-level cells sometimes carry an escaped placeholder instead of a value
pub fn clean_skill_level(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed == "&nbsp;" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Direct `td` children of a row, skipping cells of nested tables
pub fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

pub fn has_class(element: &ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// True when a cell lies between the row and its listing table, i.e. the row
/// belongs to a sub-table. Cells outside the listing table do not count.
pub fn is_nested_row(row: &ElementRef, table_class: &str) -> bool {
    for el in row.ancestors().filter_map(|node| node.value().as_element()) {
        if el.name() == "table" && el.classes().any(|c| c == table_class) {
            return false;
        }
        if el.name() == "td" {
            return true;
        }
    }
    false
}
