//! Built-in renderers.
//!
//! These cover the semantic tags a documentation page uses (headings, code
//! blocks, lists, links) plus the page chrome the assembler injects (TOC
//! sidebar, pagination, header, footer). Every one of them can be replaced
//! through an override.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Value, json};

use docrender_shared::{Props, RenderNode};

use crate::component::{RenderInput, Renderer};
use crate::toc::{heading_level, slugify};

/// Renderers shipped with docrender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `heading` and `h1`…`h6`: anchored heading with a hash link.
    Heading,
    /// `pre` / `codeBlock`: code block with a detected language.
    CodeBlock,
    /// `list`: `ol` when `ordered` is set, `ul` otherwise.
    List,
    /// `a`: marks external links.
    Link,
    /// `provider`: scopes overrides for its subtree, renders as a fragment.
    Provider,
    TocSidebar,
    TocItem,
    Paginator,
    PaginatorLink,
    PageHeader,
    PageFooter,
}

impl Builtin {
    /// The built-in renderer registered for `tag`, if any.
    pub fn for_tag(tag: &str) -> Option<Self> {
        let builtin = match tag {
            "heading" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            "pre" | "codeBlock" => Self::CodeBlock,
            "list" => Self::List,
            "a" => Self::Link,
            "provider" => Self::Provider,
            "tocSidebar" => Self::TocSidebar,
            "tocItem" => Self::TocItem,
            "paginator" => Self::Paginator,
            "paginatorLink" => Self::PaginatorLink,
            "pageHeader" => Self::PageHeader,
            "pageFooter" => Self::PageFooter,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::CodeBlock => "codeBlock",
            Self::List => "list",
            Self::Link => "link",
            Self::Provider => "provider",
            Self::TocSidebar => "tocSidebar",
            Self::TocItem => "tocItem",
            Self::Paginator => "paginator",
            Self::PaginatorLink => "paginatorLink",
            Self::PageHeader => "pageHeader",
            Self::PageFooter => "pageFooter",
        }
    }

    pub fn render(&self, input: RenderInput) -> RenderNode {
        match self {
            Self::Heading => render_heading(input),
            Self::CodeBlock => render_code_block(input),
            Self::List => render_list(input),
            Self::Link => render_link(input),
            Self::Provider => RenderNode::fragment(input.children),
            Self::TocSidebar => render_toc_sidebar(input),
            Self::TocItem => render_toc_item(input),
            Self::Paginator => render_paginator(input),
            Self::PaginatorLink => render_paginator_link(input),
            Self::PageHeader => render_page_header(input),
            Self::PageFooter => render_page_footer(input),
        }
    }
}

impl From<Builtin> for Renderer {
    fn from(builtin: Builtin) -> Self {
        Renderer::Builtin(builtin)
    }
}

// ---------------------------------------------------------------------------
// Content renderers
// ---------------------------------------------------------------------------

fn render_heading(input: RenderInput) -> RenderNode {
    let probe = RenderNode {
        tag: input.tag.clone(),
        props: input.props.clone(),
        children: Vec::new(),
    };
    let level = heading_level(&probe).unwrap_or(2);

    let mut props = input.props;
    props.remove("level");
    let text = input
        .children
        .iter()
        .map(RenderNode::text_content)
        .collect::<String>();
    let id = match props.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => slugify(&text),
    };
    props.insert("id".into(), Value::String(id.clone()));
    add_class(&mut props, "anchor");

    let hash_link = RenderNode::new("a")
        .with_prop("href", format!("#{id}"))
        .with_prop("className", "hash-link")
        .with_prop("aria-label", format!("Direct link to {}", text.trim()))
        .with_child(RenderNode::text("#"));

    RenderNode {
        tag: format!("h{level}"),
        props,
        children: input.children,
    }
    .with_child(hash_link)
}

fn render_code_block(input: RenderInput) -> RenderNode {
    let mut props = input.props;

    let language = language_from_props(&props).or_else(|| {
        input
            .children
            .iter()
            .find(|child| child.tag == "code")
            .and_then(|code| language_from_props(&code.props))
    });

    add_class(&mut props, "code-block");
    if let Some(language) = language {
        props.insert("data-language".into(), Value::String(language));
    }

    RenderNode {
        tag: "pre".into(),
        props,
        children: input.children,
    }
}

/// Extract `rust` from a `className` such as `language-rust`.
pub fn language_from_class(class_name: &str) -> Option<String> {
    static LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?:^|\s)(?:language|lang)-([\w+#-]+)").expect("valid regex")
    });

    LANG_RE.captures(class_name).map(|c| c[1].to_string())
}

fn language_from_props(props: &Props) -> Option<String> {
    props
        .get("className")
        .and_then(Value::as_str)
        .and_then(language_from_class)
}

fn render_list(input: RenderInput) -> RenderNode {
    let mut props = input.props;
    let ordered = props
        .remove("ordered")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !ordered {
        props.remove("start");
    }

    RenderNode {
        tag: (if ordered { "ol" } else { "ul" }).to_string(),
        props,
        children: input.children,
    }
}

fn render_link(input: RenderInput) -> RenderNode {
    let mut props = input.props;
    let external = props
        .get("href")
        .and_then(Value::as_str)
        .is_some_and(|href| href.starts_with("http://") || href.starts_with("https://"));

    if external {
        props
            .entry("target".to_string())
            .or_insert_with(|| Value::String("_blank".into()));
        props
            .entry("rel".to_string())
            .or_insert_with(|| Value::String("noopener noreferrer".into()));
    }

    RenderNode {
        tag: "a".into(),
        props,
        children: input.children,
    }
}

// ---------------------------------------------------------------------------
// Page chrome
// ---------------------------------------------------------------------------

fn render_toc_sidebar(input: RenderInput) -> RenderNode {
    let list = RenderNode::new("ul")
        .with_prop("className", "table-of-contents")
        .with_children(input.children);

    RenderNode::new("aside")
        .with_prop("className", "toc")
        .with_prop("aria-label", "On this page")
        .with_child(list)
}

fn render_toc_item(input: RenderInput) -> RenderNode {
    let id = str_prop(&input.props, "id");
    let text = str_prop(&input.props, "text");

    let link = RenderNode::new("a")
        .with_prop("href", format!("#{id}"))
        .with_prop("className", "table-of-contents__link")
        .with_child(RenderNode::text(text));

    let mut item = RenderNode::new("li").with_child(link);
    if !input.children.is_empty() {
        item = item.with_child(RenderNode::new("ul").with_children(input.children));
    }
    item
}

fn render_paginator(input: RenderInput) -> RenderNode {
    let label = if is_blog(&input.props) {
        "Blog post page navigation"
    } else {
        "Docs pages"
    };

    RenderNode::new("nav")
        .with_prop("className", "pagination-nav")
        .with_prop("aria-label", label)
        .with_children(input.children)
}

fn render_paginator_link(input: RenderInput) -> RenderNode {
    let previous = str_prop(&input.props, "direction") == "previous";
    // Blog lists run newest first, so "previous" is the newer post.
    let sublabel = match (is_blog(&input.props), previous) {
        (true, true) => "Newer Post",
        (true, false) => "Older Post",
        (false, true) => "Previous",
        (false, false) => "Next",
    };
    let modifier = if previous { "prev" } else { "next" };

    RenderNode::new("a")
        .with_prop("href", str_prop(&input.props, "permalink"))
        .with_prop(
            "className",
            format!("pagination-nav__link pagination-nav__link--{modifier}"),
        )
        .with_child(
            RenderNode::new("div")
                .with_prop("className", "pagination-nav__sublabel")
                .with_child(RenderNode::text(sublabel)),
        )
        .with_child(
            RenderNode::new("div")
                .with_prop("className", "pagination-nav__label")
                .with_child(RenderNode::text(str_prop(&input.props, "title"))),
        )
}

fn render_page_header(input: RenderInput) -> RenderNode {
    let props = &input.props;
    let mut header = RenderNode::new("header");
    let title = str_prop(props, "title");
    if !title.is_empty() {
        header = header.with_child(RenderNode::new("h1").with_child(RenderNode::text(title)));
    }

    if let Some(meta) = post_meta(props) {
        header = header.with_child(meta);
    }

    if let Some(Value::Array(authors)) = props.get("authors") {
        if !authors.is_empty() {
            let items = authors.iter().filter_map(author_node);
            header = header.with_child(
                RenderNode::new("div")
                    .with_prop("className", "authors")
                    .with_children(items),
            );
        }
    }

    header.with_children(input.children)
}

/// `<div class="post-meta"><time>January 23, 2024</time> · 3 min read</div>`
fn post_meta(props: &Props) -> Option<RenderNode> {
    let date = props
        .get("date")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())?;

    let formatted = props
        .get("formattedDate")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| date.format("%B %-d, %Y").to_string());

    let time = RenderNode::new("time")
        .with_prop("dateTime", date.to_rfc3339())
        .with_child(RenderNode::text(formatted));
    let mut meta = RenderNode::new("div")
        .with_prop("className", "post-meta")
        .with_child(time);

    if let Some(minutes) = props.get("readingTime").and_then(Value::as_f64) {
        let rounded = minutes.ceil().max(1.0) as u64;
        meta = meta.with_child(RenderNode::text(format!(" · {rounded} min read")));
    }

    Some(meta)
}

fn author_node(author: &Value) -> Option<RenderNode> {
    let name = author.get("name")?.as_str()?;
    let name_node = match author.get("url").and_then(Value::as_str) {
        Some(url) => RenderNode::new("a")
            .with_prop("href", url)
            .with_child(RenderNode::text(name)),
        None => RenderNode::new("span").with_child(RenderNode::text(name)),
    };

    let mut node = RenderNode::new("div")
        .with_prop("className", "author")
        .with_child(name_node);
    if let Some(title) = author.get("title").and_then(Value::as_str) {
        node = node.with_child(
            RenderNode::new("small").with_child(RenderNode::text(title)),
        );
    }
    Some(node)
}

fn render_page_footer(input: RenderInput) -> RenderNode {
    let props = &input.props;
    let mut footer = RenderNode::new("footer").with_prop("className", "doc-footer");

    if let Some(Value::Array(tags)) = props.get("tags") {
        if !tags.is_empty() {
            let items = tags.iter().filter_map(|tag| {
                let label = tag.get("label")?.as_str()?;
                let permalink = tag.get("permalink")?.as_str()?;
                Some(
                    RenderNode::new("li").with_child(
                        RenderNode::new("a")
                            .with_prop("href", permalink)
                            .with_prop("rel", "tag")
                            .with_child(RenderNode::text(label)),
                    ),
                )
            });
            footer = footer.with_child(
                RenderNode::new("ul")
                    .with_prop("className", "tags")
                    .with_children(items),
            );
        }
    }

    if let Some(edit_url) = props.get("editUrl").and_then(Value::as_str) {
        footer = footer.with_child(
            RenderNode::new("a")
                .with_prop("href", edit_url)
                .with_prop("className", "edit-this-page")
                .with_prop("target", "_blank")
                .with_prop("rel", "noopener noreferrer")
                .with_child(RenderNode::text("Edit this page")),
        );
    }

    footer.with_children(input.children)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_prop<'a>(props: &'a Props, key: &str) -> &'a str {
    props.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn is_blog(props: &Props) -> bool {
    props.get("kind").and_then(Value::as_str) == Some("blog")
}

/// Append a CSS class to the `className` prop.
fn add_class(props: &mut Props, class: &str) {
    let merged = match props.get("className").and_then(Value::as_str) {
        Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
        _ => class.to_string(),
    };
    props.insert("className".into(), json!(merged));
}
