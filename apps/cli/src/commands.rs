//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use blockpress_core::{
    ContentSource, FileSource, ProgressReporter, build_site, localize_images, read_graph,
};
use blockpress_images::{DownloadOptions, ProgressFn};
use blockpress_plugins::PluginPipeline;
use blockpress_schema::map_schema;
use blockpress_shared::{BuildSummary, CONFIG_FILE_NAME, SiteConfig, read_config_input, resolve_config};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// blockpress: turn a block-graph workspace into typed site data.
#[derive(Parser)]
#[command(
    name = "blockpress",
    version,
    about = "Extract typed pages, routes, and local images from a block-graph content source.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Build pages and routes for every configured collection.
    Build {
        #[command(flatten)]
        site: SiteArgs,

        /// Directory holding one `<source_id>.json` graph per collection.
        #[arg(long, default_value = "content")]
        source_dir: PathBuf,

        /// Output directory.
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,

        /// Also download images and write localized graphs.
        #[arg(long)]
        images: bool,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download a graph's images and write the remapped graph.
    Images {
        /// Graph JSON file.
        graph: PathBuf,

        /// Directory images are saved to.
        #[arg(long, default_value = "images")]
        dir: PathBuf,

        /// Where to write the localized graph (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Print the property mapping inferred for a graph's schema.
    Schema {
        /// Graph JSON file.
        graph: PathBuf,

        /// Page type whose conventions apply.
        #[arg(long, default_value = "page")]
        page_type: String,
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
    /// Validate the config file.
    Check {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Show resolved configuration.
    Show {
        #[command(flatten)]
        site: SiteArgs,
    },
}

/// Where the site config comes from.
#[derive(clap::Args)]
pub(crate) struct SiteArgs {
    /// Site config file (TOML, or JSON by extension).
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Secret for on-demand revalidation; overrides the config file.
    #[arg(long, env = "BLOCKPRESS_REVALIDATE_SECRET", hide_env_values = true)]
    pub revalidate_secret: Option<String>,
}

/// Image download tuning.
#[derive(clap::Args)]
pub(crate) struct DownloadArgs {
    /// Parallel downloads per batch.
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Public URL prefix written into graphs instead of file paths.
    #[arg(long)]
    pub url_prefix: Option<String>,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "blockpress=info",
        1 => "blockpress=debug",
        _ => "blockpress=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Build {
            site,
            source_dir,
            out,
            images,
            download,
        } => cmd_build(&site, &source_dir, &out, images, &download).await,
        Command::Images {
            graph,
            dir,
            output,
            download,
        } => cmd_images(&graph, &dir, output.as_deref(), &download).await,
        Command::Schema { graph, page_type } => cmd_schema(&graph, &page_type).await,
        Command::Config { action } => match action {
            ConfigAction::Check { site } => cmd_config_check(&site),
            ConfigAction::Show { site } => cmd_config_show(&site),
        },
    }
}

/// Load and resolve the site config. Flags win over the file.
fn load_config(site: &SiteArgs) -> Result<SiteConfig> {
    let mut input = read_config_input(&site.config)
        .wrap_err_with(|| format!("failed to read {}", site.config.display()))?;
    if let Some(secret) = &site.revalidate_secret {
        input.revalidate_secret = Some(secret.clone());
    }
    let config = resolve_config(input).wrap_err("invalid site config")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    site: &SiteArgs,
    source_dir: &Path,
    out: &Path,
    images: bool,
    download: &DownloadArgs,
) -> Result<()> {
    let config = load_config(site)?;
    let source = FileSource::new(source_dir);
    let plugins = PluginPipeline::default();

    info!(
        site = %config.name,
        collections = config.collections.len(),
        source_dir = %source_dir.display(),
        "building site"
    );

    let reporter = CliProgress::new();
    let build = build_site(&config, &source, &plugins, &reporter).await?;

    std::fs::create_dir_all(out).map_err(|e| eyre!("cannot create {}: {e}", out.display()))?;
    let site_path = out.join("site.json");
    write_json(&site_path, &build)?;

    let mut localized_images = 0;
    if images {
        let images_dir = out.join("images");
        let graphs_dir = out.join("graphs");
        std::fs::create_dir_all(&graphs_dir)
            .map_err(|e| eyre!("cannot create {}: {e}", graphs_dir.display()))?;

        for collection in &config.collections {
            let graph = source.fetch_graph(&collection.source_id).await?;
            let (bar, options) = download_options(download, &collection.source_id);
            let localized = localize_images(&graph, &images_dir, &options).await;
            bar.finish_and_clear();

            localized_images += localized.images.len();
            write_json(
                &graphs_dir.join(format!("{}.json", collection.source_id)),
                &localized.graph,
            )?;
        }
    }

    println!();
    println!("  Site built successfully!");
    println!("  Site:        {}", config.name);
    println!("  Collections: {}", build.summary.collections);
    println!("  Pages:       {}", build.summary.pages);
    println!("  Routes:      {}", build.summary.routes);
    if images {
        println!("  Images:      {localized_images}");
    }
    println!("  Output:      {}", site_path.display());
    println!("  Time:        {:.1}s", build.summary.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

async fn cmd_images(
    graph_path: &Path,
    dir: &Path,
    output: Option<&Path>,
    download: &DownloadArgs,
) -> Result<()> {
    let graph = read_graph(graph_path).await?;
    let label = graph_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "graph".to_string());

    let (bar, options) = download_options(download, &label);
    let localized = localize_images(&graph, dir, &options).await;
    bar.finish_and_clear();

    info!(images = localized.images.len(), dir = %dir.display(), "images localized");

    match output {
        Some(path) => write_json(path, &localized.graph)?,
        None => println!("{}", serde_json::to_string_pretty(&localized.graph)?),
    }
    Ok(())
}

async fn cmd_schema(graph_path: &Path, page_type: &str) -> Result<()> {
    let graph = read_graph(graph_path).await?;
    let mapping = map_schema(&graph.schema, page_type, None, None);
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

fn cmd_config_check(site: &SiteArgs) -> Result<()> {
    let config = load_config(site)?;
    println!("Config OK: {}", site.config.display());
    for collection in &config.collections {
        println!(
            "  {} ({}) -> /{}",
            collection.source_id,
            collection.page_type,
            collection
                .path_prefix
                .as_deref()
                .unwrap_or_default()
                .trim_matches('/'),
        );
    }
    Ok(())
}

fn cmd_config_show(site: &SiteArgs) -> Result<()> {
    let mut config = load_config(site)?;
    if config.revalidate_secret.is_some() {
        config.revalidate_secret = Some("********".to_string());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporting
// ---------------------------------------------------------------------------

/// Download options wired to a progress bar labelled `label`.
fn download_options(args: &DownloadArgs, label: &str) -> (ProgressBar, DownloadOptions) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(format!("images: {label}"));

    let handle = bar.clone();
    let on_progress: ProgressFn = Arc::new(move |done, total| {
        handle.set_length(total as u64);
        handle.set_position(done as u64);
    });

    let options = DownloadOptions {
        concurrency: args.concurrency,
        on_progress: Some(on_progress),
        url_prefix: args.url_prefix.clone(),
        ..Default::default()
    };
    (bar, options)
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn collection_done(&self, source_id: &str, pages: usize, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Extracted [{current}/{total}] {source_id}: {pages} pages"
        ));
    }

    fn done(&self, _summary: &BuildSummary) {
        self.spinner.finish_and_clear();
    }
}
