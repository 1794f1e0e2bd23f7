use super::engine::{CleanPass, PassOutcome};
use super::{STRIP_ATTRIBUTES, STRIP_HREF};
use crate::dom::Tree;
use crate::error::CleanResult;

/// Drops `href` from every link; link text and other attributes stay
pub struct StripHrefPass;

impl CleanPass for StripHrefPass {
    fn name(&self) -> &str {
        STRIP_HREF
    }

    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        let mut removed = 0;
        for link in tree.find_all(tree.root(), "a") {
            if let Some(element) = tree.data_mut(link).as_element_mut() {
                if element.attributes.remove("href").is_some() {
                    removed += 1;
                }
            }
        }
        Ok(PassOutcome::single_sweep(removed))
    }
}

/// Clears every attribute not on the preserve list
pub struct StripAttributesPass {
    preserved: Vec<String>,
}

impl StripAttributesPass {
    pub fn new(preserved: Vec<String>) -> Self {
        Self { preserved }
    }
}

impl CleanPass for StripAttributesPass {
    fn name(&self) -> &str {
        STRIP_ATTRIBUTES
    }

    /// Changes are counted per dropped attribute
    fn apply(&self, tree: &mut Tree) -> CleanResult<PassOutcome> {
        let mut dropped = 0;
        for id in tree.elements() {
            if let Some(element) = tree.data_mut(id).as_element_mut() {
                dropped += element
                    .attributes
                    .retain(|name| self.preserved.iter().any(|keep| keep == name));
            }
        }
        Ok(PassOutcome::single_sweep(dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;
    use crate::serializer::render;

    #[test]
    fn href_is_removed_other_attributes_kept() {
        let mut tree = parse_html(r#"<a href="http://x" title="t">link</a><a name="n">anchor</a>"#);
        let outcome = StripHrefPass.apply(&mut tree).unwrap();
        assert_eq!(outcome.changes, 1);
        assert_eq!(render(&tree), r#"<a title="t">link</a><a name="n">anchor</a>"#);
    }

    #[test]
    fn span_attributes_survive_stripping() {
        let mut tree = parse_html(
            r#"<td class="x" colspan="2" style="w" rowspan="3">a</td><p lang="en">b</p>"#,
        );
        let pass = StripAttributesPass::new(vec!["colspan".to_string(), "rowspan".to_string()]);
        let outcome = pass.apply(&mut tree).unwrap();
        assert_eq!(outcome.changes, 3);
        assert_eq!(render(&tree), r#"<td colspan="2" rowspan="3">a</td><p>b</p>"#);
    }

    #[test]
    fn empty_allowlist_strips_everything() {
        let mut tree = parse_html(r#"<td colspan="2">a</td>"#);
        StripAttributesPass::new(Vec::new()).apply(&mut tree).unwrap();
        assert_eq!(render(&tree), "<td>a</td>");
    }
}
