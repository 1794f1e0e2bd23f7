use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use htmlslim_core::processor::cleaned_output_path;
use htmlslim_core::{
    BatchOptions, BatchSummary, CleaningConfig, ConfigManager, HtmlCleaner, ParserKind, Profile,
    StepProfiler,
};

use htmlslim_cli::resolve_cache_dir;

#[derive(Parser)]
#[command(name = "htmlslim")]
#[command(about = "Strip Word-export and scraped HTML down to its content structure")]
struct Args {
    /// HTML file, or a directory whose .html/.htm files are cleaned in parallel
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (single input) or directory (directory input).
    /// Defaults to <stem>.clean.html next to each source.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in profile: generic or word
    #[arg(short, long)]
    profile: Option<Profile>,

    /// Keep element attributes
    #[arg(long, conflicts_with = "strip_attr")]
    keep_attr: bool,

    /// Strip attributes (word profile keeps colspan and rowspan)
    #[arg(long)]
    strip_attr: bool,

    /// Input parser: html (lenient) or xhtml (well-formed XML)
    #[arg(long)]
    parser: Option<ParserKind>,

    /// Print a size and table report per document
    #[arg(long)]
    report: bool,

    /// Write the report(s) as JSON to this path
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Skip cache and force fresh processing
    #[arg(long)]
    skip_cache: bool,

    /// Cache directory (default: $HTMLSLIM_CACHE_DIR or the platform cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Re-clean files whose .clean.html output already exists
    #[arg(long)]
    overwrite: bool,

    /// Print per-step timings (parse, passes, serialize, cache)
    #[arg(long)]
    timings: bool,

    /// Show available config options and built-in profiles, then exit
    #[arg(long)]
    show_configs: bool,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    println!("🧹 htmlslim HTML Cleaner");

    if args.show_configs {
        show_help()?;
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        println!("⚠️  No input given. Use --input <file|dir> or --show-configs.");
        std::process::exit(2);
    };
    if !input.exists() {
        println!("⚠️  Input not found at: {}", input.display());
        println!("   Please check the path.");
        std::process::exit(1);
    }

    let config = build_config(&args)?;
    match &args.config {
        Some(path) => println!("📋 Loaded config from: {}", path.display()),
        None => println!("📋 Using built-in {} profile", config.profile),
    }

    let cleaner = if args.skip_cache {
        HtmlCleaner::new(config)?
    } else {
        let cache_dir = resolve_cache_dir(args.cache_dir.as_deref());
        HtmlCleaner::with_cache_dir(config, &cache_dir)?
    };

    if input.is_dir() {
        run_directory(&cleaner, input, &args)
    } else {
        run_file(&cleaner, input, &args)
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Profile first (--profile, HTMLSLIM_PROFILE, the file's, then word), then
/// the config file, then the other HTMLSLIM_* variables, then flags
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = CleaningConfig::layered(
        args.config.as_deref(),
        args.profile,
        Profile::Word,
        |name| std::env::var(name).ok(),
    )?;

    if args.keep_attr {
        config.keep_attr = true;
    }
    if args.strip_attr {
        config.keep_attr = false;
    }
    if let Some(parser) = args.parser {
        config.parser = parser;
    }

    config.validate()?;
    debug!(profile = %config.profile, keep_attr = config.keep_attr, parser = ?config.parser, "config resolved");
    Ok(config)
}

fn run_file(cleaner: &HtmlCleaner, input: &Path, args: &Args) -> Result<()> {
    println!("📄 Processing: {}", input.display());

    let mut profiler = StepProfiler::new(args.timings);
    let document = match cleaner.clean_file(input, args.skip_cache, &mut profiler) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("❌ Cleaning failed: {e:#}");
            std::process::exit(1);
        }
    };

    let output_path = match &args.output {
        Some(path) => path.clone(),
        None => cleaned_output_path(input, input.parent().unwrap_or(Path::new("."))),
    };
    fs::write(&output_path, &document.html)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if document.from_cache {
        println!("✅ Loaded cleaned document from cache");
    } else {
        println!("✅ Successfully cleaned document");
    }
    println!("🗂️  Wrapper tables removed: {}", document.wrapper_tables_removed);
    if args.report {
        print_report_header();
        println!("   {}", document.report.summary_line());
    }
    println!("💾 Cleaned HTML saved to: {}", output_path.display());

    if let Some(report_path) = &args.report_json {
        let json = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "source": input,
            "output": output_path,
            "wrapper_tables_removed": document.wrapper_tables_removed,
            "from_cache": document.from_cache,
            "report": document.report,
        });
        write_json(report_path, &json)?;
    }

    profiler.print_summary();
    Ok(())
}

fn run_directory(cleaner: &HtmlCleaner, input: &Path, args: &Args) -> Result<()> {
    println!("📁 Processing directory: {}", input.display());

    let options = BatchOptions {
        overwrite: args.overwrite,
        skip_cache: args.skip_cache,
    };
    let summary = cleaner.clean_directory(input, args.output.as_deref(), options)?;

    print_batch_summary(&summary, args.report);

    if let Some(report_path) = &args.report_json {
        let json = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "input_dir": input,
            "summary": summary,
        });
        write_json(report_path, &json)?;
    }

    if !summary.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_batch_summary(summary: &BatchSummary, detailed: bool) {
    println!("✅ Cleaned {} of {} files", summary.converted.len(), summary.total());
    if !summary.skipped.is_empty() {
        println!("⏭️  Skipped {} (output exists, use --overwrite)", summary.skipped.len());
    }
    for (path, error) in &summary.failed {
        eprintln!("❌ {}: {}", path.display(), error);
    }

    if detailed && !summary.converted.is_empty() {
        print_report_header();
        for item in &summary.converted {
            let cached = if item.from_cache { " (cached)" } else { "" };
            println!(
                "   {} -> {}: {:.1}% smaller, {} wrapper tables{}",
                item.source.display(),
                item.output.display(),
                item.reduction_percent,
                item.wrapper_tables_removed,
                cached
            );
        }
    }
}

fn print_report_header() {
    println!("📊 Cleaning report:");
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("💾 Report saved to: {}", path.display());
    Ok(())
}

fn show_help() -> Result<()> {
    println!("\n📋 Available Configuration Options:");
    println!("  --input <path>          HTML file or directory to clean");
    println!("  --output <path>         Output file or directory (default: <stem>.clean.html)");
    println!("  --config <path>         Load custom config file (YAML)");
    println!("  --profile <name>        Built-in profile: generic or word (default: word)");
    println!("  --keep-attr             Keep all attributes");
    println!("  --strip-attr            Strip attributes (word keeps colspan/rowspan)");
    println!("  --parser <kind>         html (default) or xhtml");
    println!("  --report                Print size and table report");
    println!("  --report-json <path>    Write the report as JSON");
    println!("  --skip-cache            Ignore and do not update the result cache");
    println!("  --cache-dir <path>      Cache directory (default: $HTMLSLIM_CACHE_DIR or platform cache)");
    println!("  --overwrite             Re-clean files that already have output");
    println!("  --timings               Print per-step timings");

    println!("\n🌱 Environment:");
    println!("  HTMLSLIM_PROFILE, HTMLSLIM_KEEP_ATTR, HTMLSLIM_MAX_ITERATIONS, HTMLSLIM_CACHE_DIR");
    println!("  RUST_LOG (log filter, e.g. htmlslim_core=debug)");

    let manager = ConfigManager::new();
    for config in manager.configs() {
        println!("\n⚙️  Built-in profile '{}':", config.profile);
        for line in config.to_yaml()?.lines() {
            println!("  {line}");
        }
    }

    println!("\n📝 Usage Examples:");
    println!("  htmlslim -i export.html");
    println!("  htmlslim -i export.html -o clean.html --strip-attr --report");
    println!("  htmlslim -i ./exports --overwrite --report-json report.json");
    println!("  htmlslim -i page.html --profile generic");
    Ok(())
}
