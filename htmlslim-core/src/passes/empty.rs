use super::engine::{run_to_fixed_point, CleanPass, PassOutcome};
use super::PRUNE_EMPTY;
use crate::classifier::is_structurally_empty;
use crate::dom::Tree;
use crate::error::CleanResult;

/// Removes elements without visible text, repeating until nothing is left
/// to remove. Void elements such as `br` and `img` have no text and go too.
pub struct PruneEmptyPass {
    preserve_table_structure: bool,
    max_iterations: usize,
}

impl PruneEmptyPass {
    pub fn new(preserve_table_structure: bool, max_iterations: usize) -> Self {
        Self {
            preserve_table_structure,
            max_iterations,
        }
    }

    fn sweep(&self, tree: &mut Tree) -> usize {
        let mut removed = 0;
        for id in tree.elements() {
            if tree.is_live(id) && is_structurally_empty(tree, id, self.preserve_table_structure) {
                tree.decompose(id);
                removed += 1;
            }
        }
        removed
    }
}

impl CleanPass for PruneEmptyPass {
    fn name(&self) -> &str {
        PRUNE_EMPTY
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        Ok(run_to_fixed_point(
            tree,
            PRUNE_EMPTY,
            self.max_iterations,
            |tree| self.sweep(tree),
        ))
    }
}
