// Rewrite passes
//
// Each pass mutates the tree in place and can run on its own; the engine
// fixes their order from the pipeline config.
// - engine.rs: CleanPass trait, PassEngine and the fixed-point helper
// - noise.rs: script/style/meta/link and comment removal
// - tables.rs: layout wrapper table unwrapping
// - attributes.rs: href and attribute stripping
// - wrappers.rs: redundant single-child wrapper collapsing
// - empty.rs: empty element pruning

pub mod attributes;
pub mod empty;
pub mod engine;
pub mod noise;
pub mod tables;
pub mod wrappers;

pub use attributes::{StripAttributesPass, StripHrefPass};
pub use empty::PruneEmptyPass;
pub use engine::{build_pass, CleanPass, PassEngine, PassOutcome, PassStats, PipelineReport};
pub use noise::{StripCommentsPass, StripNoisePass};
pub use tables::UnwrapWrapperTablesPass;
pub use wrappers::CollapseWrappersPass;

pub const STRIP_NOISE: &str = "StripNoise";
pub const STRIP_COMMENTS: &str = "StripComments";
pub const UNWRAP_WRAPPER_TABLES: &str = "UnwrapWrapperTables";
pub const STRIP_HREF: &str = "StripHref";
pub const STRIP_ATTRIBUTES: &str = "StripAttributes";
pub const COLLAPSE_WRAPPERS: &str = "CollapseWrappers";
pub const PRUNE_EMPTY: &str = "PruneEmpty";
