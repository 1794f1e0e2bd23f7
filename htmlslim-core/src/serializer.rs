//! Tree rendering and the textual post-processor.

use crate::dom::node::{is_raw_text_tag, is_void_tag};
use crate::dom::{NodeData, NodeId, Tree};
use regex::Regex;
use std::sync::LazyLock;

static XML_DECLARATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\?xml.*?>").expect("XML_DECLARATION_REGEX: hardcoded regex is valid")
});

static DOCTYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!DOCTYPE.*?>").expect("DOCTYPE_REGEX: hardcoded regex is valid")
});

enum Step {
    Open(NodeId),
    Close(NodeId),
}

/// Render the tree in document order. Output is deterministic for a given
/// tree.
pub fn render(tree: &Tree) -> String {
    let mut out = String::new();
    let mut stack: Vec<Step> = tree
        .children(tree.root())
        .iter()
        .rev()
        .map(|id| Step::Open(*id))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(id) => match tree.data(id) {
                NodeData::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (name, value) in element.attributes.iter() {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        escape_attribute(value, &mut out);
                        out.push('"');
                    }
                    if is_void_tag(&element.tag_name) && tree.children(id).is_empty() {
                        out.push_str("/>");
                        continue;
                    }
                    out.push('>');
                    stack.push(Step::Close(id));
                    stack.extend(tree.children(id).iter().rev().map(|c| Step::Open(*c)));
                }
                NodeData::Text(content) => {
                    let raw = tree
                        .parent(id)
                        .and_then(|parent| tree.tag_name(parent))
                        .is_some_and(is_raw_text_tag);
                    if raw {
                        out.push_str(content);
                    } else {
                        escape_text(content, &mut out);
                    }
                }
                NodeData::Comment(content) if is_processing_instruction(content) => {
                    out.push('<');
                    out.push_str(content);
                    out.push('>');
                }
                NodeData::Comment(content) => {
                    out.push_str("<!--");
                    out.push_str(content);
                    out.push_str("-->");
                }
                NodeData::Doctype { name } => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    out.push('>');
                }
                NodeData::Document => {}
            },
            Step::Close(id) => {
                if let Some(tag_name) = tree.tag_name(id) {
                    out.push_str("</");
                    out.push_str(tag_name);
                    out.push('>');
                }
            }
        }
    }
    out
}

/// `<?xml ...?>` reaches the tree as a bogus comment
fn is_processing_instruction(content: &str) -> bool {
    content.len() >= 2 && content.starts_with('?') && content.ends_with('?')
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Strip XML and DOCTYPE declarations, then drop blank lines
pub fn post_process(html: &str) -> String {
    let html = XML_DECLARATION_REGEX.replace_all(html, "");
    let html = DOCTYPE_REGEX.replace_all(&html, "");
    remove_blank_lines(&html)
}

pub fn remove_blank_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render and post-process in one step
pub fn serialize(tree: &Tree) -> String {
    post_process(&render(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::parse_html;

    #[test]
    fn renders_in_document_order() {
        let tree = parse_html(r#"<div class="a"><p>x<br>y</p><img src="i.png"></div>"#);
        assert_eq!(
            render(&tree),
            r#"<div class="a"><p>x<br/>y</p><img src="i.png"/></div>"#
        );
    }

    #[test]
    fn escapes_text_and_attributes() {
        let tree = parse_html(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"#);
        assert_eq!(
            render(&tree),
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"#
        );
    }

    #[test]
    fn raw_text_is_not_escaped() {
        let tree = parse_html("<script>if (a < b && c) {}</script>");
        assert_eq!(render(&tree), "<script>if (a < b && c) {}</script>");
    }

    #[test]
    fn post_process_strips_declarations_and_blank_lines() {
        let tree = parse_html("<?xml version=\"1.0\"?>\n<!doctype html>\n<p>a</p>\n   \n\t\n<p>b</p>\n");
        assert_eq!(serialize(&tree), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn comments_survive_rendering() {
        let tree = parse_html("<p>a<!-- keep --></p>");
        assert_eq!(render(&tree), "<p>a<!-- keep --></p>");
    }

    #[test]
    fn output_reparses_to_the_same_markup() {
        let html = "<table><tr><td colspan=\"2\">a &amp; b</td></tr></table>\n<ul><li>x</li></ul>";
        let first = serialize(&parse_html(html));
        let second = serialize(&parse_html(&first));
        assert_eq!(first, second);
    }
}
