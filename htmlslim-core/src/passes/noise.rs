use super::engine::{CleanPass, PassOutcome};
use super::{STRIP_COMMENTS, STRIP_NOISE};
use crate::classifier::{is_comment, GENERIC_NOISE_TAGS, WORD_NOISE_TAGS};
use crate::dom::{NodeId, Tree};
use crate::error::CleanResult;

/// Removes noise elements together with everything inside them
pub struct StripNoisePass {
    tags: Vec<String>,
}

impl StripNoisePass {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    pub fn for_variant(word_variant: bool) -> Self {
        let tags: &[&str] = if word_variant {
            &WORD_NOISE_TAGS
        } else {
            &GENERIC_NOISE_TAGS
        };
        Self::new(tags.iter().map(|t| t.to_string()).collect())
    }

    fn is_noise(&self, tag_name: &str) -> bool {
        self.tags.iter().any(|tag| tag == tag_name)
    }
}

impl CleanPass for StripNoisePass {
    fn name(&self) -> &str {
        STRIP_NOISE
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        let targets: Vec<NodeId> = tree
            .elements()
            .into_iter()
            .filter(|id| tree.tag_name(*id).is_some_and(|tag| self.is_noise(tag)))
            .collect();

        let mut removed = 0;
        for id in targets {
            // Nested noise goes with its noise ancestor
            if tree.is_live(id) {
                tree.decompose(id);
                removed += 1;
            }
        }
        Ok(PassOutcome::single_sweep(removed))
    }
}

pub struct StripCommentsPass;

impl CleanPass for StripCommentsPass {
    fn name(&self) -> &str {
        STRIP_COMMENTS
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        let comments: Vec<NodeId> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|id| is_comment(tree, *id))
            .collect();
        let removed = comments.len();
        for id in comments {
            tree.decompose(id);
        }
        Ok(PassOutcome::single_sweep(removed))
    }
}
