//! Page assembler.
//!
//! Takes a page's metadata and content tree, resolves every node through the
//! active [`ComponentContext`], and adds the page chrome: header, TOC
//! sidebar, previous/next pagination and footer.

use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use url::Url;

use docrender_shared::{
    DocRenderError, PageBundle, PageMetadata, Props, RenderNode, RenderOptions, Result,
    TocEntry, validate_levels,
};

use crate::component::RenderInput;
use crate::context::ComponentContext;
use crate::resolver::resolve_in;
use crate::toc::{
    collect_headings, count_entries, ensure_heading_ids, filter_levels, flatten, heading_level,
    nest_flat,
};

/// Front matter key that hides the TOC sidebar.
const HIDE_TOC_KEY: &str = "hide_table_of_contents";
const TOC_MIN_KEY: &str = "toc_min_heading_level";
const TOC_MAX_KEY: &str = "toc_max_heading_level";

/// A fully resolved page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledPage {
    pub title: String,
    pub permalink: String,
    /// Rendered `pageHeader`.
    pub header: RenderNode,
    /// Rendered content root. A fragment when the root tag is `wrapper`.
    pub content: RenderNode,
    /// Rendered `tocSidebar`, absent when the TOC is empty or hidden.
    pub sidebar: Option<RenderNode>,
    /// Rendered `paginator`, absent without previous/next links.
    pub pagination: Option<RenderNode>,
    /// Rendered `pageFooter`, absent without tags or an edit link.
    pub footer: Option<RenderNode>,
    /// TOC entries the sidebar was built from.
    pub toc: Vec<TocEntry>,
}

impl AssembledPage {
    /// Top-level content nodes (the fragment's children, or the root itself).
    pub fn content_children(&self) -> &[RenderNode] {
        if self.content.is_fragment() {
            &self.content.children
        } else {
            std::slice::from_ref(&self.content)
        }
    }

    /// Compose the whole page into one tree.
    ///
    /// ```text
    /// div.doc-page
    /// ├── article
    /// │   ├── header
    /// │   ├── div.markdown   (content)
    /// │   ├── footer
    /// │   └── nav            (pagination)
    /// └── aside              (TOC sidebar)
    /// ```
    pub fn to_tree(&self) -> RenderNode {
        let markdown = RenderNode::new("div")
            .with_prop("className", "markdown")
            .with_children(self.content_children().iter().cloned());

        let mut article = RenderNode::new("article")
            .with_child(self.header.clone())
            .with_child(markdown);
        article = article.with_children(self.footer.iter().cloned());
        article = article.with_children(self.pagination.iter().cloned());

        RenderNode::new("div")
            .with_prop("className", "doc-page")
            .with_prop("data-permalink", self.permalink.as_str())
            .with_child(article)
            .with_children(self.sidebar.iter().cloned())
    }

    /// SHA-256 hex digest of the composed tree's canonical JSON.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.to_tree()).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Assemble one page.
///
/// Fails only when `metadata` is absent: a page cannot be identified or
/// linked into navigation without it.
#[instrument(skip_all, fields(root = %root.tag))]
pub fn assemble(
    metadata: Option<&PageMetadata>,
    root: &RenderNode,
    ctx: &ComponentContext,
    options: &RenderOptions,
) -> Result<AssembledPage> {
    let Some(meta) = metadata else {
        warn!("refusing to render page without metadata");
        return Err(DocRenderError::missing_metadata(format!(
            "content rooted at '{}'",
            root.tag
        )));
    };

    let prepared = ensure_heading_ids(root);
    let content = render_tree(&prepared, ctx);

    let toc = page_toc(meta, &prepared, options);
    let sidebar = build_sidebar(meta, &toc, ctx);
    let pagination = build_pagination(meta, ctx);
    let header = build_header(meta, &prepared, ctx);
    let footer = build_footer(meta, ctx, options);

    info!(
        permalink = %meta.permalink,
        toc_entries = count_entries(&toc),
        has_pagination = pagination.is_some(),
        "page assembled"
    );

    Ok(AssembledPage {
        title: meta.title.clone(),
        permalink: meta.permalink.clone(),
        header,
        content,
        sidebar,
        pagination,
        footer,
        toc,
    })
}

/// Assemble a loaded [`PageBundle`].
pub fn assemble_bundle(
    bundle: &PageBundle,
    ctx: &ComponentContext,
    options: &RenderOptions,
) -> Result<AssembledPage> {
    assemble(bundle.metadata.as_ref(), &bundle.content, ctx, options)
}

/// Resolve a tree through `ctx` without any page chrome.
pub fn render_tree(root: &RenderNode, ctx: &ComponentContext) -> RenderNode {
    render_node(root, None, ctx)
}

// ---------------------------------------------------------------------------
// Tree resolution
// ---------------------------------------------------------------------------

fn render_node(node: &RenderNode, parent: Option<&str>, ctx: &ComponentContext) -> RenderNode {
    if node.is_text() {
        return node.clone();
    }

    let mut props = node.props.clone();
    // A `components` prop scopes overrides for this node's subtree.
    let children = match props.remove("components") {
        Some(raw) => ctx.with_json_overrides(&raw, |inner| render_children(node, inner)),
        None => render_children(node, ctx),
    };

    let renderer = resolve_in(ctx, parent, &node.tag);
    renderer.apply(RenderInput::new(node.tag.clone(), props, children))
}

fn render_children(node: &RenderNode, ctx: &ComponentContext) -> Vec<RenderNode> {
    let mut out = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let rendered = render_node(child, Some(&node.tag), ctx);
        if rendered.is_fragment() {
            out.extend(rendered.children);
        } else {
            out.push(rendered);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// TOC
// ---------------------------------------------------------------------------

fn page_toc(meta: &PageMetadata, prepared: &RenderNode, options: &RenderOptions) -> Vec<TocEntry> {
    let flat = if meta.toc.is_empty() {
        debug!("metadata has no toc, deriving from headings");
        collect_headings(prepared)
    } else {
        flatten(&meta.toc)
    };

    let (min, max) = toc_levels(meta, options);
    filter_levels(&nest_flat(flat), min, max)
}

/// Heading range from front matter, falling back to options when the page's
/// own range is missing or invalid.
fn toc_levels(meta: &PageMetadata, options: &RenderOptions) -> (u8, u8) {
    let min = meta
        .front_matter_level(TOC_MIN_KEY)
        .unwrap_or(options.toc_min_level);
    let max = meta
        .front_matter_level(TOC_MAX_KEY)
        .unwrap_or(options.toc_max_level);

    match validate_levels(min, max) {
        Ok(()) => (min, max),
        Err(e) => {
            warn!(permalink = %meta.permalink, error = %e, "ignoring front matter toc levels");
            (options.toc_min_level, options.toc_max_level)
        }
    }
}

fn build_sidebar(
    meta: &PageMetadata,
    toc: &[TocEntry],
    ctx: &ComponentContext,
) -> Option<RenderNode> {
    if meta.front_matter_bool(HIDE_TOC_KEY) == Some(true) {
        debug!("toc hidden by front matter");
        return None;
    }
    if toc.is_empty() {
        return None;
    }

    let input = RenderNode::new("tocSidebar").with_children(toc.iter().map(toc_item));
    Some(render_tree(&input, ctx))
}

fn toc_item(entry: &TocEntry) -> RenderNode {
    RenderNode::new("tocItem")
        .with_prop("id", entry.id.as_str())
        .with_prop("text", entry.text.as_str())
        .with_prop("level", entry.level)
        .with_children(entry.children.iter().map(toc_item))
}

// ---------------------------------------------------------------------------
// Chrome
// ---------------------------------------------------------------------------

fn page_kind(meta: &PageMetadata) -> &'static str {
    if meta.is_blog_post() { "blog" } else { "doc" }
}

fn build_pagination(meta: &PageMetadata, ctx: &ComponentContext) -> Option<RenderNode> {
    if meta.previous.is_none() && meta.next.is_none() {
        return None;
    }

    let kind = page_kind(meta);
    let links = [("previous", &meta.previous), ("next", &meta.next)]
        .into_iter()
        .filter_map(|(direction, link)| {
            let link = link.as_ref()?;
            Some(
                RenderNode::new("paginatorLink")
                    .with_prop("direction", direction)
                    .with_prop("kind", kind)
                    .with_prop("title", link.title.as_str())
                    .with_prop("permalink", link.permalink.as_str()),
            )
        });

    let input = RenderNode::new("paginator")
        .with_prop("kind", kind)
        .with_children(links);
    Some(render_tree(&input, ctx))
}

fn build_header(meta: &PageMetadata, prepared: &RenderNode, ctx: &ComponentContext) -> RenderNode {
    let mut props = Props::new();
    props.insert("kind".into(), json!(page_kind(meta)));

    // Content that opens with its own h1 already carries the title.
    let has_content_title = prepared
        .descendants()
        .iter()
        .any(|n| heading_level(n) == Some(1));
    if !has_content_title {
        props.insert("title".into(), json!(meta.title));
    }
    if let Some(date) = meta.date {
        props.insert("date".into(), json!(date.to_rfc3339()));
    }
    if let Some(formatted) = &meta.formatted_date {
        props.insert("formattedDate".into(), json!(formatted));
    }
    if let Some(minutes) = meta.reading_time {
        props.insert("readingTime".into(), json!(minutes));
    }
    if !meta.authors.is_empty() {
        props.insert(
            "authors".into(),
            serde_json::to_value(&meta.authors).unwrap_or_default(),
        );
    }

    render_tree(&RenderNode::new("pageHeader").with_props(props), ctx)
}

fn build_footer(
    meta: &PageMetadata,
    ctx: &ComponentContext,
    options: &RenderOptions,
) -> Option<RenderNode> {
    let edit_url = meta
        .edit_url
        .as_deref()
        .filter(|_| options.show_edit_link)
        .and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(edit_url = raw, error = %e, "skipping invalid edit url");
                None
            }
        });

    if edit_url.is_none() && meta.tags.is_empty() {
        return None;
    }

    let mut props = Props::new();
    if let Some(url) = edit_url {
        props.insert("editUrl".into(), Value::String(url.into()));
    }
    if !meta.tags.is_empty() {
        props.insert(
            "tags".into(),
            serde_json::to_value(&meta.tags).unwrap_or_default(),
        );
    }

    Some(render_tree(
        &RenderNode::new("pageFooter").with_props(props),
        ctx,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
