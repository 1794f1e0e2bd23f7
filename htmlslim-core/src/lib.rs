// htmlslim Core Library
//
// Structural simplification of HTML documents: strips noise, unwraps layout
// tables, collapses redundant wrappers and prunes empty elements, producing
// a smaller document with the same visible text.

pub mod analytics;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod dom;
pub mod error;
pub mod parsers;
pub mod passes;
pub mod processor;
pub mod serializer;
pub mod storage;

// Re-export main types and functions for easy use
pub use analytics::{analyze_cleaning, CleaningReport};
pub use classifier::{TableClassifier, TableHeuristics, TableKind};
pub use config::{CleaningConfig, ConfigManager, Profile};
pub use dom::{NodeData, NodeId, Tree};
pub use error::{CleanError, CleanResult};
pub use parsers::{HtmlParser, MarkupParser, ParserKind};
pub use passes::{CleanPass, PassEngine, PipelineReport};
pub use processor::{BatchOptions, BatchSummary, CleanOutput, HtmlCleaner, StepProfiler};

#[cfg(feature = "xhtml")]
pub use parsers::XhtmlParser;

/// Clean `html` with an explicit configuration
pub fn clean_with_config(html: &str, config: &CleaningConfig) -> CleanResult<CleanOutput> {
    config.validate()?;
    let parser = config.parser.build()?;
    processor::clean_document(html, config, parser.as_ref(), &mut StepProfiler::disabled())
}

/// Generic cleaning without table awareness. Attributes are stripped unless
/// `keep_attr` is set; pass `false` for the usual behaviour.
pub fn clean_html(html: &str, keep_attr: bool) -> CleanResult<String> {
    let config = CleaningConfig::generic().with_keep_attr(keep_attr);
    Ok(clean_with_config(html, &config)?.html)
}

/// Table-aware cleaning for Word exports. Returns the cleaned HTML and the
/// number of layout wrapper tables unwrapped. Pass `keep_attr = true` for
/// the usual behaviour; with `false` only `colspan` and `rowspan` survive.
pub fn clean_word_html(html: &str, keep_attr: bool) -> CleanResult<(String, usize)> {
    let config = CleaningConfig::word().with_keep_attr(keep_attr);
    let output = clean_with_config(html, &config)?;
    Ok((output.html, output.wrapper_tables_removed))
}
