use super::engine::{CleanPass, PassOutcome};
use super::UNWRAP_WRAPPER_TABLES;
use crate::classifier::{get_table_depth, TableClassifier, TableKind};
use crate::dom::{NodeId, Tree};
use crate::error::CleanResult;
use std::cmp::Reverse;
use tracing::trace;

/// Replaces layout wrapper tables with their content, deepest table first.
///
/// Inner wrappers are flattened before their ancestors are classified, so an
/// outer table is judged on what it holds after that. Only the structural
/// elements go; no content is removed.
pub struct UnwrapWrapperTablesPass {
    classifier: TableClassifier,
}

impl UnwrapWrapperTablesPass {
    pub fn new(classifier: TableClassifier) -> Self {
        Self { classifier }
    }
}

impl CleanPass for UnwrapWrapperTablesPass {
    fn name(&self) -> &str {
        UNWRAP_WRAPPER_TABLES
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        let mut tables: Vec<(NodeId, usize)> = tree
            .find_all(tree.root(), "table")
            .into_iter()
            .map(|table| (table, get_table_depth(tree, table)))
            .collect();
        // Stable: equal depths keep document order
        tables.sort_by_key(|(_, depth)| Reverse(*depth));

        let mut unwrapped = 0;
        for (table, depth) in tables {
            let TableKind::Wrapper(reason) = self.classifier.classify(tree, table) else {
                continue;
            };
            let sections: Vec<NodeId> = tree.children_named(table, &["tbody", "thead"]).collect();
            for section in sections {
                tree.unwrap(section);
            }
            tree.unwrap(table);
            unwrapped += 1;
            trace!(depth, ?reason, "unwrapped wrapper table");
        }
        Ok(PassOutcome::single_sweep(unwrapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;
    use crate::serializer::render;

    fn unwrap_tables(html: &str) -> (String, usize) {
        let mut tree = parse_html(html);
        let outcome = UnwrapWrapperTablesPass::new(TableClassifier::default())
            .apply(&mut tree)
            .unwrap();
        tree.validate().unwrap();
        (render(&tree), outcome.changes)
    }

    #[test]
    fn single_cell_wrapper_around_data_table() {
        let (html, removed) = unwrap_tables(
            "<table><tr><td><table><tr><td>1</td><td>2</td><td>3</td>\
             <td>4</td><td>5</td><td>6</td></tr></table></td></tr></table>",
        );
        assert_eq!(removed, 1);
        assert_eq!(
            html,
            "<tr><td><table><tr><td>1</td><td>2</td><td>3</td>\
             <td>4</td><td>5</td><td>6</td></tr></table></td></tr>"
        );
    }

    #[test]
    fn tbody_and_thead_go_with_the_wrapper() {
        let (html, removed) = unwrap_tables(
            "<p>a</p><table><thead></thead><tbody><tr><td>layout</td></tr></tbody></table><p>b</p>",
        );
        assert_eq!(removed, 1);
        assert_eq!(html, "<p>a</p><tr><td>layout</td></tr><p>b</p>");
    }

    #[test]
    fn deepest_tables_are_classified_first() {
        // The outer table has two cells, each holding only a one-cell wrapper.
        // Once those are flattened the outer table has 2 plain cells.
        let (html, removed) = unwrap_tables(
            "<table><tr>\
             <td><table><tr><td>left</td></tr></table></td>\
             <td><table><tr><td>right</td></tr></table></td>\
             </tr></table>",
        );
        assert_eq!(removed, 3);
        assert_eq!(
            html,
            "<tr><td><tr><td>left</td></tr></td><td><tr><td>right</td></tr></td></tr>"
        );
    }

    #[test]
    fn data_tables_are_untouched() {
        let source = "<table><tr><th>Item</th><th>Qty</th></tr><tr><td>a</td><td>1</td></tr></table>";
        let (html, removed) = unwrap_tables(source);
        assert_eq!(removed, 0);
        assert_eq!(html, source);
    }
}
