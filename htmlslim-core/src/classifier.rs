//! Node predicates and table classification.
//!
//! Everything here is a pure function of the current tree. Table verdicts
//! are never cached because earlier passes may already have flattened
//! nested tables.

use crate::dom::{node::is_table_structure_tag, NodeData, NodeId, Tree};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Noise tags removed by the generic pipeline
pub const GENERIC_NOISE_TAGS: [&str; 2] = ["script", "style"];

/// Noise tags removed by the Word-aware pipeline
pub const WORD_NOISE_TAGS: [&str; 4] = ["script", "style", "meta", "link"];

const CELL_TAGS: [&str; 2] = ["td", "th"];

static NUMERIC_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+[.,]\d+|\d{3,}").expect("NUMERIC_TOKEN_REGEX: hardcoded regex is valid")
});

static DATE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[:/]\d{1,2}[:/]\d{2,4}|\d{1,2}:\d{2}:\d{2}|AM|PM")
        .expect("DATE_TIME_REGEX: hardcoded regex is valid")
});

pub fn is_noise_tag(tag_name: &str, word_variant: bool) -> bool {
    if word_variant {
        WORD_NOISE_TAGS.contains(&tag_name)
    } else {
        GENERIC_NOISE_TAGS.contains(&tag_name)
    }
}

pub fn is_comment(tree: &Tree, id: NodeId) -> bool {
    tree.data(id).is_comment()
}

/// All descendant text of `id` in document order
pub fn visible_text(tree: &Tree, id: NodeId) -> String {
    tree.text(id)
}

/// Remove every newline, tab and space character. Other whitespace (CR,
/// no-break space) is kept.
pub fn normalize_for_comparison(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\n' | '\t' | ' '))
        .collect()
}

/// True when the node's visible text is blank. With
/// `preserve_table_structure`, table-structure elements are never empty.
pub fn is_structurally_empty(tree: &Tree, id: NodeId, preserve_table_structure: bool) -> bool {
    if preserve_table_structure
        && tree
            .tag_name(id)
            .is_some_and(is_table_structure_tag)
    {
        return false;
    }
    visible_text(tree, id).trim().is_empty()
}

/// Number of ancestors up to and including the document root. Only used to
/// order tables deepest-first.
pub fn get_table_depth(tree: &Tree, id: NodeId) -> usize {
    tree.depth(id)
}

/// How many `table` elements enclose `id`
pub fn table_nesting_depth(tree: &Tree, id: NodeId) -> usize {
    tree.ancestors(id)
        .filter(|ancestor| tree.is_element_named(*ancestor, "table"))
        .count()
}

/// Thresholds for wrapper-table detection.
///
/// The defaults are empirical cutoffs that downstream output depends on;
/// changing them changes which tables survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableHeuristics {
    /// A table with fewer cells than this and no data pattern is a wrapper
    pub min_data_cells: usize,
    /// More numeric tokens than this marks the table as data
    pub numeric_token_threshold: usize,
    /// Minimum row count before row shape is considered
    pub min_consistent_rows: usize,
    /// Maximum distinct per-row cell counts for a consistent shape
    pub max_row_shapes: usize,
    /// The widest row must have at least this many cells
    pub min_columns: usize,
}

impl Default for TableHeuristics {
    fn default() -> Self {
        Self {
            min_data_cells: 4,
            numeric_token_threshold: 5,
            min_consistent_rows: 3,
            max_row_shapes: 2,
            min_columns: 2,
        }
    }
}

/// Why a table was judged to be a layout wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperReason {
    NoRows,
    SingleCell,
    NestedTablesOnly,
    TooFewCells,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Wrapper(WrapperReason),
    Data,
}

impl TableKind {
    pub fn is_wrapper(self) -> bool {
        matches!(self, TableKind::Wrapper(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableClassifier {
    heuristics: TableHeuristics,
}

impl TableClassifier {
    pub fn new(heuristics: TableHeuristics) -> Self {
        Self { heuristics }
    }

    pub fn heuristics(&self) -> &TableHeuristics {
        &self.heuristics
    }

    /// Rows of the table's direct `tbody` when it has one, otherwise the
    /// table's own direct `tr` children.
    pub fn data_rows(&self, tree: &Tree, table: NodeId) -> Vec<NodeId> {
        let row_parent = tree
            .children_named(table, &["tbody"])
            .next()
            .unwrap_or(table);
        tree.children_named(row_parent, &["tr"]).collect()
    }

    fn cells(&self, tree: &Tree, row: NodeId) -> Vec<NodeId> {
        tree.children_named(row, &CELL_TAGS).collect()
    }

    /// Decide between layout wrapper and data table. First matching rule wins.
    ///
    /// Panics when `table` is not a `table` element.
    pub fn classify(&self, tree: &Tree, table: NodeId) -> TableKind {
        assert_table(tree, table);

        let rows = self.data_rows(tree, table);
        if rows.is_empty() {
            return TableKind::Wrapper(WrapperReason::NoRows);
        }

        let cells_per_row: Vec<Vec<NodeId>> =
            rows.iter().map(|row| self.cells(tree, *row)).collect();

        if rows.len() == 1 && cells_per_row[0].len() <= 1 {
            return TableKind::Wrapper(WrapperReason::SingleCell);
        }

        // Only cells that are direct children of the table itself count here
        let mut direct_cells = tree.children_named(table, &CELL_TAGS).peekable();
        if direct_cells.peek().is_some()
            && direct_cells.all(|cell| !tree.find_all(cell, "table").is_empty())
        {
            return TableKind::Wrapper(WrapperReason::NestedTablesOnly);
        }

        let total_cells: usize = cells_per_row.iter().map(Vec::len).sum();
        if total_cells < self.heuristics.min_data_cells
            && !self.contains_tabular_data_pattern(tree, table)
        {
            return TableKind::Wrapper(WrapperReason::TooFewCells);
        }

        TableKind::Data
    }

    pub fn is_wrapper_table(&self, tree: &Tree, table: NodeId) -> bool {
        self.classify(tree, table).is_wrapper()
    }

    /// True if the table's content or shape looks like genuine data.
    ///
    /// Panics when `table` is not a `table` element.
    pub fn contains_tabular_data_pattern(&self, tree: &Tree, table: NodeId) -> bool {
        assert_table(tree, table);
        let text = visible_text(tree, table);

        if NUMERIC_TOKEN_REGEX.find_iter(&text).count() > self.heuristics.numeric_token_threshold {
            return true;
        }

        if DATE_TIME_REGEX.is_match(&text) {
            return true;
        }

        let rows = self.data_rows(tree, table);
        if rows.len() >= self.heuristics.min_consistent_rows {
            let cell_counts: Vec<usize> = rows
                .iter()
                .map(|row| self.cells(tree, *row).len())
                .collect();
            let shapes: BTreeSet<usize> = cell_counts.iter().copied().collect();
            let widest = cell_counts.iter().copied().max().unwrap_or(0);
            if shapes.len() <= self.heuristics.max_row_shapes && widest >= self.heuristics.min_columns
            {
                return true;
            }
        }

        tree.find_first(table, |data| data.tag_name() == Some("th"))
            .is_some()
    }
}

fn assert_table(tree: &Tree, id: NodeId) {
    assert!(
        matches!(tree.data(id), NodeData::Element(e) if e.tag_name == "table"),
        "table classification called on non-table node {id}"
    );
}

/// [`TableClassifier::is_wrapper_table`] with the default thresholds
pub fn is_wrapper_table(tree: &Tree, table: NodeId) -> bool {
    TableClassifier::default().is_wrapper_table(tree, table)
}

/// [`TableClassifier::contains_tabular_data_pattern`] with the default thresholds
pub fn contains_tabular_data_pattern(tree: &Tree, table: NodeId) -> bool {
    TableClassifier::default().contains_tabular_data_pattern(tree, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;

    fn first_table(html: &str) -> (Tree, NodeId) {
        let tree = parse_html(html);
        let table = tree.find_all(tree.root(), "table")[0];
        (tree, table)
    }

    fn verdict(html: &str) -> TableKind {
        let (tree, table) = first_table(html);
        TableClassifier::default().classify(&tree, table)
    }

    #[test]
    fn normalization_removes_only_space_tab_newline() {
        assert_eq!(normalize_for_comparison(" a\tb\nc "), "abc");
        assert_eq!(normalize_for_comparison("a\u{a0}b\r"), "a\u{a0}b\r");
    }

    #[test]
    fn noise_tags_depend_on_variant() {
        assert!(is_noise_tag("script", false));
        assert!(!is_noise_tag("meta", false));
        assert!(is_noise_tag("meta", true));
        assert!(is_noise_tag("link", true));
        assert!(!is_noise_tag("p", true));
    }

    #[test]
    fn empty_table_cells_are_preserved_in_word_variant() {
        let tree = parse_html("<td>  </td><p>\u{a0}</p>");
        let td = tree.find_all(tree.root(), "td")[0];
        let p = tree.find_all(tree.root(), "p")[0];
        assert!(!is_structurally_empty(&tree, td, true));
        assert!(is_structurally_empty(&tree, td, false));
        assert!(is_structurally_empty(&tree, p, true));
    }

    #[test]
    fn table_without_rows_is_wrapper() {
        assert_eq!(
            verdict("<table><caption>x</caption></table>"),
            TableKind::Wrapper(WrapperReason::NoRows)
        );
    }

    #[test]
    fn single_cell_table_is_wrapper() {
        assert_eq!(
            verdict("<table><tbody><tr><td>layout</td></tr></tbody></table>"),
            TableKind::Wrapper(WrapperReason::SingleCell)
        );
    }

    #[test]
    fn direct_cells_holding_only_tables_make_a_wrapper() {
        let html = "<table><tr><td>row</td><td>cells</td></tr>\
            <td><table><tr><td>a</td><td>b</td></tr></table></td>\
            <td><table><tr><td>c</td><td>d</td></tr></table></td>\
            </table>";
        assert_eq!(
            verdict(html),
            TableKind::Wrapper(WrapperReason::NestedTablesOnly)
        );
    }

    #[test]
    fn grid_of_nested_tables_in_rows_is_data() {
        let inner = "<table><tr><th>h</th><td>v</td></tr></table>";
        let html = format!(
            "<table><tr><td>{inner}</td><td>{inner}</td></tr>\
             <tr><td>{inner}</td><td>{inner}</td></tr></table>"
        );
        assert_eq!(verdict(&html), TableKind::Data);

        let (cleaned, removed) = crate::clean_word_html(&html, true).unwrap();
        assert_eq!(removed, 0);
        assert!(cleaned.starts_with("<table><tr><td><table>"));
    }

    #[test]
    fn small_table_without_data_is_wrapper() {
        assert_eq!(
            verdict("<table><tr><td>Name</td><td>Logo</td></tr></table>"),
            TableKind::Wrapper(WrapperReason::TooFewCells)
        );
    }

    #[test]
    fn small_table_with_time_is_data() {
        assert_eq!(
            verdict("<table><tr><td>Start</td><td>10:30:00</td></tr></table>"),
            TableKind::Data
        );
    }

    #[test]
    fn small_table_with_date_is_data() {
        assert_eq!(
            verdict("<table><tr><td>Due</td><td>12/31/2023</td></tr></table>"),
            TableKind::Data
        );
    }

    #[test]
    fn small_table_with_meridiem_is_data() {
        assert_eq!(
            verdict("<table><tr><td>Opens</td><td>9 AM</td></tr></table>"),
            TableKind::Data
        );
        assert_eq!(
            verdict("<table><tr><td>Closes</td><td>5 PM</td></tr></table>"),
            TableKind::Data
        );
    }

    #[test]
    fn header_cell_anywhere_marks_data() {
        let (tree, table) = first_table("<table><tr><th>H</th><td>v</td></tr></table>");
        assert!(contains_tabular_data_pattern(&tree, table));
        assert!(!is_wrapper_table(&tree, table));
    }

    #[test]
    fn numeric_tokens_must_exceed_threshold() {
        let five = "<table><tr><td>100 200 300 400 500</td><td>x</td></tr></table>";
        let six = "<table><tr><td>100 200 300 400 500 1.5</td><td>x</td></tr></table>";
        let (tree, table) = first_table(five);
        assert!(!contains_tabular_data_pattern(&tree, table));
        let (tree, table) = first_table(six);
        assert!(contains_tabular_data_pattern(&tree, table));
    }

    #[test]
    fn consistent_row_shape_marks_data() {
        let (tree, table) = first_table(
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr>\
             <tr><td>e</td></tr></table>",
        );
        assert!(contains_tabular_data_pattern(&tree, table));
    }

    #[test]
    fn rows_come_from_direct_tbody_only() {
        let (tree, table) = first_table(
            "<table><tr><td>outer</td></tr>\
             <tbody><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></tbody></table>",
        );
        let rows = TableClassifier::default().data_rows(&tree, table);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let (tree, table) = first_table("<table><tr><td>a</td><td>b</td></tr></table>");
        let lenient = TableClassifier::new(TableHeuristics {
            min_data_cells: 2,
            ..TableHeuristics::default()
        });
        assert!(!lenient.is_wrapper_table(&tree, table));
        assert!(is_wrapper_table(&tree, table));
    }

    #[test]
    #[should_panic(expected = "non-table node")]
    fn classifying_non_table_panics() {
        let tree = parse_html("<div>x</div>");
        let div = tree.find_all(tree.root(), "div")[0];
        is_wrapper_table(&tree, div);
    }

    #[test]
    fn nesting_depth_counts_table_ancestors() {
        let tree = parse_html("<table><tr><td><div><table></table></div></td></tr></table>");
        let tables = tree.find_all(tree.root(), "table");
        assert_eq!(table_nesting_depth(&tree, tables[0]), 0);
        assert_eq!(table_nesting_depth(&tree, tables[1]), 1);
        assert_eq!(get_table_depth(&tree, tables[1]), 5);
    }
}
