//! CLI arguments, config merging, tracing setup, and the compile command.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use docbinder_client::{ClientOptions, OutlineClient};
use docbinder_core::fetcher::FetchOptions;
use docbinder_core::pipeline::{CompileOptions, CompileReport, ProgressReporter};
use docbinder_shared::{
    AppConfig, CompileConfig, DocbinderError, load_config, load_config_from, resolve_api_key,
    validate_api_url,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docbinder: compile a knowledge-base collection into a single HTML file.
#[derive(Parser, Debug)]
#[command(
    name = "docbinder",
    version,
    about = "Compile an Outline collection into a single navigable HTML document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Base URL of the Outline API.
    #[arg(long, env = "OUTLINE_API_URL")]
    pub api_url: Option<String>,

    /// API token (falls back to the env var named in the config file).
    #[arg(long, env = "OUTLINE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Collection to compile.
    #[arg(long, env = "OUTLINE_COLLECTION_ID")]
    pub collection_id: String,

    /// Output HTML file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum concurrent document fetches.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Config file (defaults to ~/.docbinder/docbinder.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docbinder=info",
        1 => "docbinder=debug",
        _ => "docbinder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so they never interleave with the summary.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Run the compile command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let app_config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let config = merge_config(&cli, &app_config)?;

    info!(
        api_url = %config.api_url,
        collection_id = %config.collection_id,
        output = %config.output.display(),
        concurrency = config.concurrency,
        "compiling collection"
    );

    let client = OutlineClient::new(
        &config.api_url,
        config.api_key.clone(),
        &ClientOptions {
            timeout_secs: config.timeout_secs,
        },
    )?;

    let opts = CompileOptions {
        collection_id: config.collection_id.clone(),
        fetch: FetchOptions {
            concurrency: config.concurrency,
        },
        compiled_at: None,
    };

    let reporter = CliProgress::new();
    let report = docbinder_core::pipeline::compile_collection(&client, &opts, &reporter)
        .await
        .inspect_err(|_| reporter.abandon())
        .wrap_err("compilation failed")?;

    write_atomically(&config.output, &report.html)?;

    print_summary(&report, &config.output);
    Ok(())
}

/// Merge CLI flags over the config file over defaults, then validate.
fn merge_config(cli: &Cli, app: &AppConfig) -> Result<CompileConfig> {
    let api_url = validate_api_url(cli.api_url.as_deref().unwrap_or(&app.api.url))?;
    let api_key = resolve_api_key(app, cli.api_key.as_deref())?;

    let config = CompileConfig {
        api_url,
        api_key,
        collection_id: cli.collection_id.trim().to_string(),
        output: cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&app.compile.output)),
        concurrency: cli.concurrency.unwrap_or(app.compile.concurrency),
        timeout_secs: cli.timeout_secs.unwrap_or(app.api.timeout_secs),
    };

    config.validate()?;
    Ok(config)
}

/// Write `contents` to a sibling temp file, then rename it over `path`, so a
/// failed run never leaves a truncated output behind.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DocbinderError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("output path '{}' has no file name", path.display()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents).map_err(|e| DocbinderError::io(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(DocbinderError::io(path, e).into());
    }

    info!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}

fn print_summary(report: &CompileReport, output: &Path) {
    println!();
    println!("  Collection compiled successfully!");
    println!("  Collection: {}", report.collection.name);
    println!("  Documents:  {}", report.document_count);
    println!("  Skipped:    {}", report.skipped.len());
    println!("  Degraded:   {}", report.degraded.len());
    println!("  Output:     {}", output.display());
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    for skipped in &report.skipped {
        warn!(id = %skipped.id, title = %skipped.title, reason = %skipped.reason, "skipped");
        println!("    skipped:  {} ({})", skipped.title, skipped.reason);
    }
    for degraded in &report.degraded {
        println!("    raw:      {} ({})", degraded.title, degraded.reason);
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_fetched(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {title}"));
    }

    fn done(&self, _report: &CompileReport) {
        self.spinner.finish_and_clear();
    }
}
