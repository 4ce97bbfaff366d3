//! Shared types, error model, and configuration for docrender.
//!
//! This crate is the foundation depended on by all other docrender crates.
//! It provides:
//! - [`DocRenderError`], the unified error type
//! - Domain types ([`RenderNode`], [`PageMetadata`], [`TocEntry`], [`PageBundle`])
//! - Configuration ([`AppConfig`], [`RenderOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, RenderDefaults, RenderOptions, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_levels,
};
pub use error::{DocRenderError, Result};
pub use types::{
    Author, FRAGMENT_TAG, FrontMatter, NavLink, PageBundle, PageMetadata, Props, RenderNode,
    TEXT_TAG, Tag, TocEntry,
};
