use std::path::{Path, PathBuf};

/// Overrides the cache location when `--cache-dir` is not given
pub const CACHE_DIR_ENV: &str = "HTMLSLIM_CACHE_DIR";

/// Platform cache directory, e.g. `~/.cache/htmlslim` on Linux.
/// Falls back to `.htmlslim-cache` in the working directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("htmlslim"))
        .unwrap_or_else(|| PathBuf::from(".htmlslim-cache"))
}

/// Flag first, then `HTMLSLIM_CACHE_DIR`, then the platform default
pub fn resolve_cache_dir(flag: Option<&Path>) -> PathBuf {
    resolve_cache_dir_with(flag, |name| std::env::var(name).ok())
}

fn resolve_cache_dir_with<F>(flag: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    match lookup(CACHE_DIR_ENV) {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => default_cache_dir(),
    }
}
