//! Application configuration for docrender.
//!
//! User config lives at `~/.docrender/docrender.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocRenderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docrender.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docrender";

// ---------------------------------------------------------------------------
// Config structs (matching docrender.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rendering defaults.
    #[serde(default)]
    pub render: RenderDefaults,

    /// Site-wide component overrides: tag name -> host tag alias.
    ///
    /// Kept as raw JSON values so malformed entries can be skipped
    /// at resolution time instead of failing the whole file.
    #[serde(default)]
    pub overrides: BTreeMap<String, serde_json::Value>,
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDefaults {
    /// Shallowest heading level shown in the TOC sidebar.
    #[serde(default = "default_toc_min_level")]
    pub toc_min_level: u8,

    /// Deepest heading level shown in the TOC sidebar.
    #[serde(default = "default_toc_max_level")]
    pub toc_max_level: u8,

    /// Whether to render an "Edit this page" link when the page has an edit URL.
    #[serde(default = "default_true")]
    pub show_edit_link: bool,

    /// Absolute site URL used to resolve permalinks in exported Markdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            toc_min_level: default_toc_min_level(),
            toc_max_level: default_toc_max_level(),
            show_edit_link: true,
            base_url: None,
        }
    }
}

fn default_toc_min_level() -> u8 {
    2
}
fn default_toc_max_level() -> u8 {
    3
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Render options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime render options, merged from config file + CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub toc_min_level: u8,
    pub toc_max_level: u8,
    pub show_edit_link: bool,
    pub base_url: Option<Url>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            toc_min_level: default_toc_min_level(),
            toc_max_level: default_toc_max_level(),
            show_edit_link: true,
            base_url: None,
        }
    }
}

impl TryFrom<&AppConfig> for RenderOptions {
    type Error = DocRenderError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let render = &config.render;
        validate_levels(render.toc_min_level, render.toc_max_level)?;

        let base_url = render
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    DocRenderError::config(format!("invalid base_url '{raw}': {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            toc_min_level: render.toc_min_level,
            toc_max_level: render.toc_max_level,
            show_edit_link: render.show_edit_link,
            base_url,
        })
    }
}

/// Check that a TOC level range is well-formed (`1 <= min <= max <= 6`).
pub fn validate_levels(min: u8, max: u8) -> Result<()> {
    if !(1..=6).contains(&min) || !(1..=6).contains(&max) {
        return Err(DocRenderError::config(format!(
            "toc levels must be between 1 and 6 (got {min}..{max})"
        )));
    }
    if min > max {
        return Err(DocRenderError::config(format!(
            "toc_min_level {min} is greater than toc_max_level {max}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docrender/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocRenderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docrender/docrender.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocRenderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocRenderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocRenderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let mut config = AppConfig::default();
    // Ship the alias the docs runtime uses out of the box, as an example entry.
    config
        .overrides
        .insert("inlineCode".into(), serde_json::Value::String("code".into()));
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocRenderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocRenderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
