use super::engine::{run_to_fixed_point, CleanPass, PassOutcome};
use super::COLLAPSE_WRAPPERS;
use crate::classifier::{normalize_for_comparison, visible_text};
use crate::dom::node::is_table_structure_tag;
use crate::dom::{NodeId, Tree};
use crate::error::CleanResult;

/// Unwraps elements whose only element child carries all of their text.
///
/// The wrapper is replaced by its children in place. Text siblings of the
/// child stay, but they are whitespace-only by the time the texts compare
/// equal. Repeats until a scan collapses nothing, since collapsing can make
/// an ancestor redundant.
pub struct CollapseWrappersPass {
    preserve_table_structure: bool,
    max_iterations: usize,
}

impl CollapseWrappersPass {
    pub fn new(preserve_table_structure: bool, max_iterations: usize) -> Self {
        Self {
            preserve_table_structure,
            max_iterations,
        }
    }

    fn is_redundant(&self, tree: &Tree, id: NodeId) -> bool {
        let Some(tag_name) = tree.tag_name(id) else {
            return false;
        };
        if self.preserve_table_structure && is_table_structure_tag(tag_name) {
            return false;
        }

        let mut element_children = tree.element_children(id);
        let (Some(child), None) = (element_children.next(), element_children.next()) else {
            return false;
        };
        normalize_for_comparison(&visible_text(tree, child))
            == normalize_for_comparison(&visible_text(tree, id))
    }

    fn sweep(&self, tree: &mut Tree) -> usize {
        let mut collapsed = 0;
        for id in tree.elements() {
            if tree.is_live(id) && self.is_redundant(tree, id) {
                tree.unwrap(id);
                collapsed += 1;
            }
        }
        collapsed
    }
}

impl CleanPass for CollapseWrappersPass {
    fn name(&self) -> &str {
        COLLAPSE_WRAPPERS
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        Ok(run_to_fixed_point(
            tree,
            COLLAPSE_WRAPPERS,
            self.max_iterations,
            |tree| self.sweep(tree),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;
    use crate::serializer::render;

    fn collapse(html: &str, preserve_tables: bool) -> (String, PassOutcome) {
        let mut tree = parse_html(html);
        let outcome = CollapseWrappersPass::new(preserve_tables, 100)
            .apply(&mut tree)
            .unwrap();
        tree.validate().unwrap();
        (render(&tree), outcome)
    }

    #[test]
    fn nested_single_child_wrappers_collapse() {
        let (html, outcome) = collapse("<div><p><span>Hello</span></p></div>", false);
        assert_eq!(html, "<span>Hello</span>");
        assert_eq!(outcome.changes, 2);
    }

    #[test]
    fn whitespace_differences_do_not_block_collapse() {
        let (html, _) = collapse("<div>\n  <p>a b</p>\n</div>", false);
        assert_eq!(html, "\n  <p>a b</p>\n");
    }

    #[test]
    fn extra_text_keeps_the_wrapper() {
        let source = "<div>Note: <b>bold</b></div>";
        let (html, outcome) = collapse(source, false);
        assert_eq!(html, source);
        assert_eq!(outcome.changes, 0);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn two_element_children_keep_the_wrapper() {
        let source = "<div><p>a</p><p>b</p></div>";
        assert_eq!(collapse(source, false).0, source);
    }

    #[test]
    fn table_structure_is_exempt_when_preserved() {
        let source = "<table><tr><td><b>x</b></td></tr></table>";
        assert_eq!(collapse(source, true).0, source);
        assert_eq!(collapse(source, false).0, "<b>x</b>");
    }

    #[test]
    fn deep_chain_converges_within_depth_plus_one() {
        let depth = 50;
        let html = format!("{}text{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let (out, outcome) = collapse(&html, false);
        assert_eq!(out, "<div>text</div>");
        assert!(outcome.iterations <= depth + 1);
    }
}
