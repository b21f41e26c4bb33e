//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use brochurekit_core::{
    CompletionClient, CurateResult, DiscoverResult, ExtractLimits, ExtractResult, OpenAiClient,
    OutputLayout, ProgressReporter, RunOptions,
};
use brochurekit_shared::{
    AppConfig, BrochureKitError, HttpClient, init_config, load_config, load_config_from,
    validate_api_key,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BrochureKit: collect brochure-ready text from a company website.
#[derive(Parser)]
#[command(
    name = "brochurekit",
    version,
    about = "Discover, curate and extract the pages of a company website worth putting in a brochure.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.brochurekit/brochurekit.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Collect same-host links from the homepage into candidate_urls.json.
    Discover {
        /// Site homepage URL.
        url: String,

        /// Output directory (defaults to `[defaults] output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Ask the model to pick brochure pages into final_urls.json.
    Curate {
        /// Site homepage URL the candidates were discovered from.
        url: String,

        /// Output directory holding candidate_urls.json.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Model to use instead of `[llm] model`.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Fetch every curated page and write its text under pages/.
    Extract {
        /// Output directory holding final_urls.json.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run discover, curate and extract back to back.
    Run {
        /// Site homepage URL.
        url: String,

        /// Output directory (defaults to `[defaults] output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Model to use instead of `[llm] model`.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brochurekit=info",
        1 => "brochurekit=debug",
        _ => "brochurekit=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Discover { url, out } => cmd_discover(config_path, &url, out.as_deref()).await,
        Command::Curate { url, out, model } => {
            cmd_curate(config_path, &url, out.as_deref(), model.as_deref()).await
        }
        Command::Extract { out } => cmd_extract(config_path, out.as_deref()).await,
        Command::Run { url, out, model } => {
            cmd_run(config_path, &url, out.as_deref(), model.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn output_layout(out: Option<&Path>, config: &AppConfig) -> OutputLayout {
    let root = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
    OutputLayout::new(root)
}

fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!("unsupported URL scheme '{}': expected http or https", parsed.scheme()));
    }
    Ok(parsed)
}

/// Build the model client. Fails before any work when the key is missing.
fn model_client(config: &AppConfig, model: Option<&str>) -> Result<OpenAiClient> {
    let api_key = validate_api_key(config)?;
    let client = OpenAiClient::new(api_key, &config.llm)?;
    Ok(match model {
        Some(m) => client.with_model(m),
        None => client,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_discover(config_path: Option<&Path>, url: &str, out: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let base_url = parse_base_url(url)?;
    let layout = output_layout(out, &config);
    let http = HttpClient::new(&config.http)?;

    info!(url = %base_url, out = %layout.root().display(), "discovering links");

    let reporter = CliProgress::new();
    let result = brochurekit_core::run_discover(&http, &base_url, &layout, &reporter).await;
    reporter.finish();

    print_discover(&result?);
    Ok(())
}

async fn cmd_curate(
    config_path: Option<&Path>,
    url: &str,
    out: Option<&Path>,
    model: Option<&str>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let llm = model_client(&config, model)?;
    let base_url = parse_base_url(url)?;
    let layout = output_layout(out, &config);

    info!(url = %base_url, model = llm.model(), "curating links");

    let reporter = CliProgress::new();
    let result =
        brochurekit_core::run_curate(&llm, &base_url, &layout, config.llm.max_links, &reporter)
            .await;
    reporter.finish();

    print_curate(&check_model_output(result)?);
    Ok(())
}

async fn cmd_extract(config_path: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let layout = output_layout(out, &config);
    let http = HttpClient::new(&config.http)?;
    let limits = ExtractLimits::from(&config.extract);

    info!(out = %layout.root().display(), "extracting pages");

    let reporter = CliProgress::new();
    let result = brochurekit_core::run_extract(&http, &layout, &limits, &reporter).await;
    reporter.finish();

    print_extract(&result?);
    Ok(())
}

async fn cmd_run(
    config_path: Option<&Path>,
    url: &str,
    out: Option<&Path>,
    model: Option<&str>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let llm = model_client(&config, model)?;
    let base_url = parse_base_url(url)?;
    let layout = output_layout(out, &config);
    let http = HttpClient::new(&config.http)?;
    let options = RunOptions {
        max_links: config.llm.max_links,
        limits: ExtractLimits::from(&config.extract),
    };

    info!(url = %base_url, model = llm.model(), out = %layout.root().display(), "running pipeline");

    let reporter = CliProgress::new();
    let result =
        brochurekit_core::run_pipeline(&http, &llm, &base_url, &layout, &options, &reporter).await;
    reporter.finish();

    let result = check_model_output(result)?;
    print_discover(&result.discover);
    print_curate(&result.curate);
    print_extract(&result.extract);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Echo the raw model reply when it could not be decoded.
fn check_model_output<T>(result: brochurekit_shared::Result<T>) -> Result<T> {
    result.map_err(|e: BrochureKitError| {
        if let Some(raw) = e.raw_model_output() {
            eprintln!("Model did not return valid JSON. Raw output:\n\n{raw}\n");
        }
        e.into()
    })
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

fn print_discover(result: &DiscoverResult) {
    println!();
    println!("  Links discovered");
    println!("  Candidates: {}", result.links.len());
    println!("  Saved:      {}", result.path.display());
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_curate(result: &CurateResult) {
    println!();
    println!("  Links curated");
    println!("  Candidates: {}", result.candidates);
    println!("  Selected:   {}", result.selection.links.len());
    for link in &result.selection.links {
        println!("    - [{}] {}", link.page_type, link.url);
    }
    println!("  Saved:      {}", result.path.display());
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_extract(result: &ExtractResult) {
    println!();
    println!("  Pages extracted");
    println!("  Written: {}/{}", result.written.len(), result.total);
    for path in &result.written {
        if let Some(name) = path.file_name() {
            println!("    - {}", name.to_string_lossy());
        }
    }
    if !result.failures.is_empty() {
        println!("  Failed:  {}", result.failures.len());
        for failure in &result.failures {
            println!("    - {}: {}", failure.url, failure.error);
        }
    }
    println!("  Saved:   {}", result.pages_dir.display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_extracted(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracted [{current}/{total}] {url}"));
    }

    fn page_failed(&self, url: &str, error: &str, current: usize, total: usize) {
        self.spinner
            .println(format!("  skipped [{current}/{total}] {url}: {error}"));
    }
}
