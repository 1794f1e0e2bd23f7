// Parser adapters
//
// Everything downstream of this module works on a `Tree` and never sees the
// source markup again. Parsing is lenient: missing end tags, stray end tags
// and mismatched nesting are absorbed here and never surface as errors.
// - builder.rs: shared open-element stack used by both adapters
// - html.rs: html5ever tokenizer driven builder (default)
// - xhtml.rs: quick-xml adapter for XHTML exports (feature "xhtml")

pub mod builder;
pub mod html;
#[cfg(feature = "xhtml")]
pub mod xhtml;

pub use builder::LenientBuilder;
pub use html::HtmlParser;
#[cfg(feature = "xhtml")]
pub use xhtml::XhtmlParser;

use crate::dom::Tree;
use crate::error::{CleanError, CleanResult};
use serde::{Deserialize, Serialize};

/// Turns markup into a mutable tree.
///
/// Implementations must be tolerant of malformed input; only inputs that the
/// adapter fundamentally cannot read (e.g. broken XML for the XHTML adapter)
/// produce an error.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, markup: &str) -> CleanResult<Tree>;

    /// Parser name for logging and cache keys
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Html,
    Xhtml,
}

impl ParserKind {
    pub fn build(self) -> CleanResult<Box<dyn MarkupParser>> {
        match self {
            ParserKind::Html => Ok(Box::new(HtmlParser::new())),
            #[cfg(feature = "xhtml")]
            ParserKind::Xhtml => Ok(Box::new(XhtmlParser::new())),
            #[cfg(not(feature = "xhtml"))]
            ParserKind::Xhtml => Err(CleanError::InvalidConfig(
                "the xhtml parser requires the \"xhtml\" feature".to_string(),
            )),
        }
    }
}

impl std::str::FromStr for ParserKind {
    type Err = CleanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "html" => Ok(ParserKind::Html),
            "xhtml" | "xml" => Ok(ParserKind::Xhtml),
            other => Err(CleanError::InvalidConfig(format!("unknown parser: {other}"))),
        }
    }
}
