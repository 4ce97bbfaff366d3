//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use docrender_core::merge::merge_json_objects;
use docrender_core::{
    AssembledPage, ComponentContext, assemble_bundle, load_bundle, load_bundle_dir, page_to_html,
};
use docrender_markdown::ExportOptions;
use docrender_shared::{
    AppConfig, RenderOptions, TocEntry, init_config, load_config, load_config_from,
    validate_levels,
};
use tracing::{info, warn};
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docrender: render documentation page bundles.
#[derive(Parser)]
#[command(
    name = "docrender",
    version,
    about = "Render documentation page bundles with scoped component overrides.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docrender/docrender.toml.
    #[arg(long, global = true, env = "DOCRENDER_CONFIG")]
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

/// Output format for `render`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// The composed page tree as JSON.
    Json,
    /// A standalone HTML document.
    Html,
    /// Markdown with YAML front matter.
    Markdown,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble one page bundle and write it out.
    Render {
        /// Path to the page bundle JSON.
        bundle: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// TOML file of extra overrides (tag = "host tag"), applied on top of config.
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Shallowest heading level in the TOC sidebar.
        #[arg(long)]
        toc_min_level: Option<u8>,

        /// Deepest heading level in the TOC sidebar.
        #[arg(long)]
        toc_max_level: Option<u8>,

        /// Site URL for resolving links in Markdown output.
        #[arg(long)]
        base_url: Option<String>,

        /// Omit the "Edit this page" link.
        #[arg(long)]
        no_edit_link: bool,
    },

    /// Print a bundle's table of contents.
    Toc {
        /// Path to the page bundle JSON.
        bundle: PathBuf,
    },

    /// Load and assemble every bundle in a directory, reporting failures.
    Check {
        /// Directory containing `*.json` bundles.
        dir: PathBuf,
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

/// CLI flags that override `[render]` config values.
#[derive(Debug, Default)]
struct RenderFlags {
    toc_min_level: Option<u8>,
    toc_max_level: Option<u8>,
    base_url: Option<String>,
    no_edit_link: bool,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so rendered
/// output on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docrender=info",
        1 => "docrender=debug",
        _ => "docrender=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Render {
            bundle,
            format,
            overrides,
            out,
            toc_min_level,
            toc_max_level,
            base_url,
            no_edit_link,
        } => {
            let flags = RenderFlags {
                toc_min_level,
                toc_max_level,
                base_url,
                no_edit_link,
            };
            let config = resolve_config(config_path.as_deref())?;
            cmd_render(
                &config,
                &bundle,
                format,
                overrides.as_deref(),
                out.as_deref(),
                &flags,
            )
        }
        Command::Toc { bundle } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_toc(&config, &bundle)
        }
        Command::Check { dir } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_check(&config, &dir)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_render(
    config: &AppConfig,
    bundle_path: &Path,
    format: OutputFormat,
    overrides: Option<&Path>,
    out: Option<&Path>,
    flags: &RenderFlags,
) -> Result<()> {
    let options = render_options(config, flags)?;
    let ctx = build_context(config, overrides)?;
    let bundle = load_bundle(bundle_path)?;
    let page = assemble_bundle(&bundle, &ctx, &options)
        .wrap_err_with(|| format!("cannot render {}", bundle_path.display()))?;

    let description = bundle.metadata.as_ref().and_then(|m| m.description.clone());
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&page.to_tree())?,
        OutputFormat::Html => page_to_html(&page),
        OutputFormat::Markdown => {
            let export_opts = ExportOptions {
                title: page.title.clone(),
                permalink: page.permalink.clone(),
                description,
                base_url: options.base_url.clone(),
            };
            docrender_markdown::export(&page_to_html(&page), &export_opts)?.markdown
        }
    };

    info!(
        bundle = %bundle_path.display(),
        output = ?format,
        fingerprint = %short_fingerprint(&page),
        "page rendered"
    );
    write_output(out, &rendered)
}

fn cmd_toc(config: &AppConfig, bundle_path: &Path) -> Result<()> {
    let options = render_options(config, &RenderFlags::default())?;
    let bundle = load_bundle(bundle_path)?;
    let page = assemble_bundle(&bundle, &ComponentContext::root(), &options)
        .wrap_err_with(|| format!("cannot read toc of {}", bundle_path.display()))?;

    if page.toc.is_empty() {
        println!("(no table of contents)");
        return Ok(());
    }

    let mut out = String::new();
    format_toc(&page.toc, 0, &mut out);
    print!("{out}");
    Ok(())
}

fn cmd_check(config: &AppConfig, dir: &Path) -> Result<()> {
    let options = render_options(config, &RenderFlags::default())?;
    let ctx = build_context(config, None)?;
    let loaded = load_bundle_dir(dir)?;

    if loaded.is_empty() {
        warn!(dir = %dir.display(), "no bundles found");
        return Ok(());
    }

    let total = loaded.len();
    let mut failed = 0usize;
    for (path, bundle) in loaded {
        let result = bundle.and_then(|b| assemble_bundle(&b, &ctx, &options));
        match result {
            Ok(page) => println!("  ok    {}  {}", short_fingerprint(&page), path.display()),
            Err(e) => {
                failed += 1;
                println!("  FAIL  {}: {e}", path.display());
            }
        }
    }

    println!();
    println!("  {} of {total} bundles rendered", total - failed);
    if failed > 0 {
        return Err(eyre!("{failed} of {total} bundles failed to render"));
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge `[render]` config with CLI flags.
fn render_options(config: &AppConfig, flags: &RenderFlags) -> Result<RenderOptions> {
    let mut options = RenderOptions::try_from(config)?;

    if let Some(min) = flags.toc_min_level {
        options.toc_min_level = min;
    }
    if let Some(max) = flags.toc_max_level {
        options.toc_max_level = max;
    }
    validate_levels(options.toc_min_level, options.toc_max_level)?;

    if let Some(raw) = &flags.base_url {
        let url = Url::parse(raw).map_err(|e| eyre!("invalid --base-url '{raw}': {e}"))?;
        options.base_url = Some(url);
    }
    if flags.no_edit_link {
        options.show_edit_link = false;
    }
    Ok(options)
}

/// One override scope over the defaults: config `[overrides]` merged with
/// the `--overrides` file, the file winning per tag.
fn build_context(config: &AppConfig, overrides: Option<&Path>) -> Result<ComponentContext> {
    let mut tables = vec![serde_json::to_value(&config.overrides)?];
    if let Some(path) = overrides {
        tables.push(read_override_file(path)?);
    }

    let merged = serde_json::Value::Object(merge_json_objects(&tables));
    Ok(ComponentContext::root().with_json_overrides(&merged, ComponentContext::clone))
}

/// Read an override file. Both a bare table and one nested under
/// `[overrides]` are accepted.
fn read_override_file(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read overrides file {}", path.display()))?;
    let parsed: toml::Table = toml::from_str(&raw)
        .wrap_err_with(|| format!("invalid overrides file {}", path.display()))?;

    let mut value = serde_json::to_value(parsed)?;
    if let Some(nested) = value.get_mut("overrides") {
        value = nested.take();
    }
    Ok(value)
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .wrap_err_with(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "output written");
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn format_toc(entries: &[TocEntry], depth: usize, out: &mut String) {
    for entry in entries {
        out.push_str(&format!(
            "{}- {} (#{})\n",
            "  ".repeat(depth),
            entry.text,
            entry.id
        ));
        format_toc(&entry.children, depth + 1, out);
    }
}

fn short_fingerprint(page: &AssembledPage) -> String {
    page.fingerprint().chars().take(12).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
