//! Rendering engine for docrender.
//!
//! Resolves content trees against scoped component overrides and assembles
//! documentation and blog pages (header, TOC sidebar, pagination, footer)
//! from page bundles.

pub mod assembler;
pub mod bundle;
pub mod component;
pub mod context;
pub mod html;
pub mod merge;
pub mod renderers;
pub mod resolver;
pub mod toc;

pub use assembler::{AssembledPage, assemble, assemble_bundle, render_tree};
pub use bundle::{load_bundle, load_bundle_dir, parse_bundle};
pub use component::{Render, RenderInput, Renderer, render_fn};
pub use context::{ComponentContext, OverrideMap, OverrideSpec};
pub use html::{page_to_html, to_html};
pub use renderers::Builtin;
pub use resolver::{Resolution, ResolvedFrom, resolve, resolve_in, resolve_with_source};
