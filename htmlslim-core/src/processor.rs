use crate::analytics::{analyze_cleaning, CleaningReport};
use crate::cache::{CleanCacheKey, CleanCacheValue};
use crate::config::CleaningConfig;
use crate::error::CleanResult;
use crate::parsers::{HtmlParser, MarkupParser};
use crate::passes::{PassEngine, PipelineReport};
use crate::serializer::{post_process, render};
use crate::storage::{
    calculate_config_hash, calculate_html_hash, CleanStorage, FileStorage, NoOpStorage,
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Suffix of files written by batch cleaning, e.g. `report.clean.html`
pub const CLEANED_SUFFIX: &str = "clean.html";

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Result of cleaning one document in memory
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutput {
    pub html: String,
    pub wrapper_tables_removed: usize,
    pub pipeline: PipelineReport,
}

/// Parse, run the configured passes and serialize. No I/O.
pub fn clean_document(
    markup: &str,
    config: &CleaningConfig,
    parser: &dyn MarkupParser,
    profiler: &mut StepProfiler,
) -> CleanResult<CleanOutput> {
    let mut tree = profiler.time_step("Parse", || parser.parse(markup))?;
    let engine = PassEngine::new(config);
    let mut pipeline = profiler.time_step("Passes", || engine.run(&mut tree))?;
    let mut rendered = profiler.time_step("Serialize", || render(&tree));
    let mut html = post_process(&rendered);

    // Post-processing can drop lines the passes still saw (a line of only
    // no-break spaces keeps a wrapper alive). Re-clean the emitted markup
    // until it is a fixed point of the whole pipeline.
    let mut reruns = 0;
    while config.converge && html != rendered {
        if reruns >= config.max_iterations {
            warn!(reruns, "post-processed output still changing at iteration cap");
            break;
        }
        reruns += 1;
        tree = profiler.time_step("Reparse", || HtmlParser::new().parse(&html))?;
        pipeline.absorb(profiler.time_step("Passes", || engine.run(&mut tree))?);
        rendered = profiler.time_step("Serialize", || render(&tree));
        html = post_process(&rendered);
    }

    debug!(
        profile = %config.profile,
        parser = parser.name(),
        rounds = pipeline.rounds,
        reruns,
        changes = pipeline.total_changes(),
        wrapper_tables_removed = pipeline.wrapper_tables_removed,
        "document cleaned"
    );

    Ok(CleanOutput {
        html,
        wrapper_tables_removed: pipeline.wrapper_tables_removed,
        pipeline,
    })
}

/// A cleaned file, fresh or from the cache
#[derive(Debug, Clone, Serialize)]
pub struct CleanedDocument {
    pub html: String,
    pub wrapper_tables_removed: usize,
    pub report: CleaningReport,
    pub from_cache: bool,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub source: PathBuf,
    pub output: PathBuf,
    pub wrapper_tables_removed: usize,
    pub reduction_percent: f64,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub converted: Vec<BatchItem>,
    /// Sources whose cleaned output already existed
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converted.len() + self.skipped.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Re-clean sources whose output file already exists
    pub overwrite: bool,
    pub skip_cache: bool,
}

enum BatchEntry {
    Converted(BatchItem),
    Skipped(PathBuf),
    Failed(PathBuf, String),
}

/// Cleans documents with one config, optionally backed by a result cache.
/// Shareable across threads; each document gets its own tree.
pub struct HtmlCleaner {
    config: CleaningConfig,
    config_hash: String,
    parser: Box<dyn MarkupParser>,
    storage: Box<dyn CleanStorage>,
}

impl HtmlCleaner {
    /// Create HtmlCleaner with full dependency injection
    pub fn new_with_dependencies(
        config: CleaningConfig,
        parser: Box<dyn MarkupParser>,
        storage: Box<dyn CleanStorage>,
    ) -> Result<Self> {
        config.validate()?;
        let config_hash = calculate_config_hash(&config)?;
        Ok(Self {
            config,
            config_hash,
            parser,
            storage,
        })
    }

    /// Cleaner without a cache, parser chosen by the config
    pub fn new(config: CleaningConfig) -> Result<Self> {
        let parser = config.parser.build()?;
        Self::new_with_dependencies(config, parser, Box::new(NoOpStorage::new()))
    }

    /// Cleaner caching results as JSON files under `cache_dir`
    pub fn with_cache_dir(config: CleaningConfig, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let parser = config.parser.build()?;
        let storage = FileStorage::new(cache_dir.as_ref()).with_context(|| {
            format!("Failed to create cache directory {}", cache_dir.as_ref().display())
        })?;
        Self::new_with_dependencies(config, parser, Box::new(storage))
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    pub fn clean_str(&self, html: &str) -> CleanResult<CleanOutput> {
        clean_document(html, &self.config, self.parser.as_ref(), &mut StepProfiler::disabled())
    }

    pub fn clean_str_with_profiler(
        &self,
        html: &str,
        profiler: &mut StepProfiler,
    ) -> CleanResult<CleanOutput> {
        clean_document(html, &self.config, self.parser.as_ref(), profiler)
    }

    pub fn analyze(&self, original_html: &str, cleaned_html: &str) -> CleaningReport {
        analyze_cleaning(original_html, cleaned_html)
    }

    fn cache_key(&self, html: &str) -> CleanCacheKey {
        CleanCacheKey::new(calculate_html_hash(html), self.config_hash.clone())
    }

    /// Clean a file, consulting the cache unless `skip_cache` is set.
    /// Invalid UTF-8 in the source is replaced rather than rejected.
    pub fn clean_file(
        &self,
        input: &Path,
        skip_cache: bool,
        profiler: &mut StepProfiler,
    ) -> Result<CleanedDocument> {
        let start_time = Instant::now();
        let bytes = profiler
            .time_step("Read", || fs::read(input))
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let html = String::from_utf8_lossy(&bytes);
        let cache_key = self.cache_key(&html);

        if !skip_cache {
            match profiler.time_step("Cache Lookup", || self.storage.get_cleaned(&cache_key)) {
                Ok(Some(cached)) => {
                    debug!(path = %input.display(), "cache hit");
                    return Ok(CleanedDocument {
                        html: cached.html,
                        wrapper_tables_removed: cached.wrapper_tables_removed,
                        report: cached.report,
                        from_cache: true,
                        processing_time_ms: start_time.elapsed().as_millis() as u64,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!(path = %input.display(), error = %e, "cache lookup failed"),
            }
        }

        let output = self.clean_str_with_profiler(&html, profiler)?;
        let report = profiler.time_step("Analyze", || analyze_cleaning(&html, &output.html));
        let processing_time_ms = start_time.elapsed().as_millis() as u64;

        if !skip_cache {
            let cache_value = CleanCacheValue::new(
                output.html.clone(),
                output.wrapper_tables_removed,
                report.clone(),
                processing_time_ms,
            );
            if let Err(e) =
                profiler.time_step("Cache Storage", || self.storage.store_cleaned(&cache_key, &cache_value))
            {
                warn!(path = %input.display(), error = %e, "cache store failed");
            }
        }

        Ok(CleanedDocument {
            html: output.html,
            wrapper_tables_removed: output.wrapper_tables_removed,
            report,
            from_cache: false,
            processing_time_ms,
        })
    }

    /// Clean every `.html`/`.htm` file directly inside `dir` in parallel,
    /// writing `<stem>.clean.html` next to the source or into `output_dir`.
    pub fn clean_directory(
        &self,
        dir: &Path,
        output_dir: Option<&Path>,
        options: BatchOptions,
    ) -> Result<BatchSummary> {
        let sources = collect_html_files(dir)?;
        let output_dir = output_dir.unwrap_or(dir);
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        info!(dir = %dir.display(), files = sources.len(), "cleaning directory");

        let entries: Vec<BatchEntry> = sources
            .par_iter()
            .map(|source| self.clean_batch_entry(source, output_dir, options))
            .collect();

        let mut summary = BatchSummary::default();
        for entry in entries {
            match entry {
                BatchEntry::Converted(item) => summary.converted.push(item),
                BatchEntry::Skipped(path) => summary.skipped.push(path),
                BatchEntry::Failed(path, error) => summary.failed.push((path, error)),
            }
        }
        Ok(summary)
    }

    fn clean_batch_entry(&self, source: &Path, output_dir: &Path, options: BatchOptions) -> BatchEntry {
        let output = cleaned_output_path(source, output_dir);
        if output.exists() && !options.overwrite {
            debug!(path = %source.display(), "output exists, skipping");
            return BatchEntry::Skipped(source.to_path_buf());
        }

        let result = self
            .clean_file(source, options.skip_cache, &mut StepProfiler::disabled())
            .and_then(|document| {
                fs::write(&output, &document.html)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                Ok(document)
            });

        match result {
            Ok(document) => BatchEntry::Converted(BatchItem {
                source: source.to_path_buf(),
                output,
                wrapper_tables_removed: document.wrapper_tables_removed,
                reduction_percent: document.report.reduction_percent,
                from_cache: document.from_cache,
            }),
            Err(e) => {
                warn!(path = %source.display(), error = %e, "failed to clean file");
                BatchEntry::Failed(source.to_path_buf(), format!("{e:#}"))
            }
        }
    }
}

fn is_cleaned_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(&format!(".{CLEANED_SUFFIX}")))
}

fn is_html_source(path: &Path) -> bool {
    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    is_html && !is_cleaned_output(path)
}

/// HTML sources directly inside `dir`, sorted, excluding our own outputs
pub fn collect_html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_html_source(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn cleaned_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{stem}.{CLEANED_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_and_source_filter() {
        let out = cleaned_output_path(Path::new("/in/Report.HTM"), Path::new("/out"));
        assert_eq!(out, PathBuf::from("/out/Report.clean.html"));
        assert!(is_html_source(Path::new("a.html")));
        assert!(is_html_source(Path::new("a.HTM")));
        assert!(!is_html_source(Path::new("a.clean.html")));
        assert!(!is_html_source(Path::new("a.txt")));
    }

    #[test]
    fn profiler_records_only_when_enabled() {
        let mut off = StepProfiler::disabled();
        assert_eq!(off.time_step("x", || 2 + 2), 4);
        assert!(off.timings().is_empty());

        let mut on = StepProfiler::new(true);
        on.time_step("x", || ());
        assert_eq!(on.timings().len(), 1);
    }

    #[test]
    fn clean_file_uses_cache_on_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("doc.html");
        fs::write(&source, "<div><p>cached</p></div><!-- x -->").unwrap();

        let cleaner =
            HtmlCleaner::with_cache_dir(CleaningConfig::generic(), dir.path().join("cache")).unwrap();
        let first = cleaner.clean_file(&source, false, &mut StepProfiler::disabled()).unwrap();
        let second = cleaner.clean_file(&source, false, &mut StepProfiler::disabled()).unwrap();
        let uncached = cleaner.clean_file(&source, true, &mut StepProfiler::disabled()).unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert!(!uncached.from_cache);
        assert_eq!(first.html, "<p>cached</p>");
        assert_eq!(second.html, first.html);
        assert_eq!(second.report, first.report);
    }
}
