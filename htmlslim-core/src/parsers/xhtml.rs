//! XHTML adapter for well-formed exports (Tika, Word "Save as XHTML").

use super::{LenientBuilder, MarkupParser};
use crate::dom::{Attributes, Tree};
use crate::error::{CleanError, CleanResult};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, Default)]
pub struct XhtmlParser;

impl XhtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupParser for XhtmlParser {
    fn parse(&self, markup: &str) -> CleanResult<Tree> {
        parse_xhtml(markup)
    }

    fn name(&self) -> &str {
        "xhtml"
    }
}

/// HTML named entities that show up in office exports. XML's own five are
/// handled by quick-xml.
fn resolve_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "deg" => "\u{b0}",
        "euro" => "\u{20ac}",
        _ => return None,
    })
}

fn xml_error(position: usize, error: impl std::fmt::Display) -> CleanError {
    CleanError::Xhtml {
        position,
        message: error.to_string(),
    }
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase()
}

fn element_attributes(start: &BytesStart, position: usize) -> CleanResult<Attributes> {
    let mut attributes = Attributes::new();
    for attr in start.html_attributes() {
        let attr = attr.map_err(|e| xml_error(position, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr
            .unescape_value_with(resolve_entity)
            .map_err(|e| xml_error(position, e))?;
        attributes.set(key, value.into_owned());
    }
    Ok(attributes)
}

/// Unknown entities are kept literally instead of failing the document.
fn decode_text(text: &BytesText) -> String {
    match text.unescape_with(resolve_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&**text).into_owned(),
    }
}

pub fn parse_xhtml(markup: &str) -> CleanResult<Tree> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut builder = LenientBuilder::new();
    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let attributes = element_attributes(&start, position)?;
                builder.start_element(&element_name(&start), attributes, false);
            }
            Ok(Event::Empty(start)) => {
                let attributes = element_attributes(&start, position)?;
                builder.start_element(&element_name(&start), attributes, true);
            }
            Ok(Event::End(end)) => {
                let end_name = end.name();
                let name: Cow<str> = String::from_utf8_lossy(end_name.as_ref());
                builder.end_element(&name);
            }
            Ok(Event::Text(text)) => builder.text(&decode_text(&text)),
            Ok(Event::CData(data)) => builder.text(&String::from_utf8_lossy(&*data)),
            Ok(Event::Comment(comment)) => {
                builder.comment(&String::from_utf8_lossy(&*comment))
            }
            Ok(Event::DocType(doctype)) => {
                let raw = String::from_utf8_lossy(&*doctype).into_owned();
                let name = raw.split_whitespace().next().unwrap_or("html");
                builder.doctype(&name.to_ascii_lowercase());
            }
            // XML declarations and processing instructions never reach the output
            Ok(Event::Decl(_)) | Ok(Event::PI(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(reader.buffer_position(), e)),
        }
    }
    Ok(builder.finish())
}
