//! Before/after statistics for a cleaning run.

use crate::classifier::table_nesting_depth;
use crate::dom::Tree;
use crate::parsers::html::parse_html;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Sizes are in characters
    pub original_size: usize,
    pub cleaned_size: usize,
    /// 0.0 when the original is empty
    pub reduction_percent: f64,
    pub original_table_count: usize,
    pub cleaned_table_count: usize,
    /// Negative if the cleaned document somehow has more tables
    pub tables_removed: i64,
    /// Deepest table-inside-table nesting left in the cleaned document
    pub max_nesting_depth: usize,
}

/// Share of `original_size` that was removed, in percent
pub fn reduction_percent(original_size: usize, cleaned_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - cleaned_size as f64) / original_size as f64 * 100.0
}

fn count_tables(tree: &Tree) -> usize {
    tree.find_all(tree.root(), "table").len()
}

fn max_table_nesting(tree: &Tree) -> usize {
    tree.find_all(tree.root(), "table")
        .into_iter()
        .map(|table| table_nesting_depth(tree, table))
        .max()
        .unwrap_or(0)
}

/// Build the report from both documents and their parsed trees
pub fn analyze_trees(
    original_html: &str,
    original_tree: &Tree,
    cleaned_html: &str,
    cleaned_tree: &Tree,
) -> CleaningReport {
    let original_size = original_html.chars().count();
    let cleaned_size = cleaned_html.chars().count();
    let original_table_count = count_tables(original_tree);
    let cleaned_table_count = count_tables(cleaned_tree);

    CleaningReport {
        original_size,
        cleaned_size,
        reduction_percent: reduction_percent(original_size, cleaned_size),
        original_table_count,
        cleaned_table_count,
        tables_removed: original_table_count as i64 - cleaned_table_count as i64,
        max_nesting_depth: max_table_nesting(cleaned_tree),
    }
}

/// Re-parse both documents and compare them
pub fn analyze_cleaning(original_html: &str, cleaned_html: &str) -> CleaningReport {
    analyze_trees(
        original_html,
        &parse_html(original_html),
        cleaned_html,
        &parse_html(cleaned_html),
    )
}

impl CleaningReport {
    pub fn summary_line(&self) -> String {
        format!(
            "{} -> {} chars ({:.1}% smaller), tables {} -> {}, max nesting {}",
            self.original_size,
            self.cleaned_size,
            self.reduction_percent,
            self.original_table_count,
            self.cleaned_table_count,
            self.max_nesting_depth
        )
    }
}
