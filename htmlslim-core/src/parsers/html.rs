//! Lenient HTML parser on top of the html5ever tokenizer.
//!
//! The html5ever tree builder follows the HTML5 insertion modes: it
//! synthesizes `html`/`head`/`body`/`tbody` and relocates or drops stray
//! table parts. Cleaning has to be idempotent on its own output, so only the
//! tokenizer is used here and nesting is decided by [`LenientBuilder`].

use super::{LenientBuilder, MarkupParser};
use crate::dom::{Attributes, Tree};
use crate::error::CleanResult;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use std::cell::RefCell;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupParser for HtmlParser {
    fn parse(&self, markup: &str) -> CleanResult<Tree> {
        Ok(parse_html(markup))
    }

    fn name(&self) -> &str {
        "html"
    }
}

/// Parse `markup` into a tree. Never fails.
pub fn parse_html(markup: &str) -> Tree {
    let sink = BuilderSink {
        builder: RefCell::new(LenientBuilder::new()),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from(markup));
    // The sink never asks to suspend for scripts, so one feed drains the queue.
    let _ = tokenizer.feed(&queue);
    tokenizer.end();
    let builder = std::mem::take(&mut *tokenizer.sink.builder.borrow_mut());
    builder.finish()
}

/// Tokenizer state the content of `tag_name` has to be read in
fn raw_kind_for(tag_name: &str) -> Option<RawKind> {
    match tag_name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

struct BuilderSink {
    builder: RefCell<LenientBuilder>,
}

impl BuilderSink {
    fn start_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let attributes: Attributes = tag
            .attrs
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        let tag_name = tag.name.to_string();
        self.builder
            .borrow_mut()
            .start_element(&tag_name, attributes, tag.self_closing);

        match raw_kind_for(&tag_name) {
            Some(kind) if !tag.self_closing => TokenSinkResult::RawData(kind),
            _ => TokenSinkResult::Continue,
        }
    }
}

impl TokenSink for BuilderSink {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => return self.start_tag(tag),
                TagKind::EndTag => {
                    if !self.builder.borrow_mut().end_element(&tag.name) {
                        trace!(line = line_number, tag = %tag.name, "dropping unmatched end tag");
                    }
                }
            },
            Token::CharacterTokens(text) => self.builder.borrow_mut().text(&text),
            Token::CommentToken(comment) => self.builder.borrow_mut().comment(&comment),
            Token::DoctypeToken(doctype) => {
                let name = doctype.name.as_deref().unwrap_or("html");
                self.builder.borrow_mut().doctype(name);
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}
