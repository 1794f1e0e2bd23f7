// All cleaning functionality is in htmlslim-core
// This CLI acts as a thin wrapper around the core library

pub mod paths;

// Re-export core types for convenience
pub use htmlslim_core::*;

pub use paths::{default_cache_dir, resolve_cache_dir, CACHE_DIR_ENV};
