//! Core domain types for docrender page bundles and render trees.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag of a text leaf. Its content lives in the `value` prop.
pub const TEXT_TAG: &str = "#text";

/// Tag of a fragment. Its children are spliced into the parent on assembly.
pub const FRAGMENT_TAG: &str = "#fragment";

/// Free-form props attached to a [`RenderNode`]. Ordered for deterministic output.
pub type Props = BTreeMap<String, Value>;

/// Free-form front matter of a page.
pub type FrontMatter = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// RenderNode
// ---------------------------------------------------------------------------

/// One node of an in-memory content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode")]
pub struct RenderNode {
    /// Semantic tag name (`h2`, `pre`, `inlineCode`, ...).
    pub tag: String,
    /// Props passed to the renderer.
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

/// Wire form of a node: bundles may inline text children as bare strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Text(String),
    Element {
        tag: String,
        #[serde(default)]
        props: Props,
        #[serde(default)]
        children: Vec<RawNode>,
    },
}

impl From<RawNode> for RenderNode {
    fn from(raw: RawNode) -> Self {
        match raw {
            RawNode::Text(text) => RenderNode::text(text),
            RawNode::Element {
                tag,
                props,
                children,
            } => RenderNode {
                tag,
                props,
                children: children.into_iter().map(RenderNode::from).collect(),
            },
        }
    }
}

impl RenderNode {
    /// An element with no props or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// A text leaf.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(TEXT_TAG).with_prop("value", Value::String(value.into()))
    }

    /// A fragment wrapping `children`.
    pub fn fragment(children: Vec<RenderNode>) -> Self {
        Self::new(FRAGMENT_TAG).with_children(children)
    }

    /// Builder: set a prop.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Builder: merge a whole prop map.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    /// Builder: append one child.
    pub fn with_child(mut self, child: RenderNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = RenderNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    pub fn is_fragment(&self) -> bool {
        self.tag == FRAGMENT_TAG
    }

    /// The string value of a prop, if present and a string.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.is_text() {
            if let Some(value) = self.prop_str("value") {
                out.push_str(value);
            }
            return;
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first iterator over this node and its descendants.
    pub fn descendants(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.push_descendants(&mut out);
        out
    }

    fn push_descendants<'a>(&'a self, out: &mut Vec<&'a RenderNode>) {
        out.push(self);
        for child in &self.children {
            child.push_descendants(out);
        }
    }
}

// ---------------------------------------------------------------------------
// PageMetadata
// ---------------------------------------------------------------------------

/// A single table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Display text of the heading.
    #[serde(alias = "value")]
    pub text: String,
    /// Anchor id of the heading.
    pub id: String,
    /// Heading level (2 for `h2`, ...).
    pub level: u8,
    /// Nested entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    pub fn new(text: impl Into<String>, id: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
            level,
            children: Vec::new(),
        }
    }
}

/// A previous/next navigation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub title: String,
    pub permalink: String,
}

/// A tag attached to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub permalink: String,
}

/// A blog post author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        rename = "imageURL",
        alias = "imageUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

/// Static, build-time descriptive data for one documentation page or blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Doc id (`reference/agentchat/groupchat`). Blog posts have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub permalink: String,
    /// Source path as known to the build (`@site/docs/intro.md`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar: Option<String>,
    #[serde(default)]
    pub front_matter: FrontMatter,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    #[serde(default, alias = "prevItem", skip_serializing_if = "Option::is_none")]
    pub previous: Option<NavLink>,
    #[serde(default, alias = "nextItem", skip_serializing_if = "Option::is_none")]
    pub next: Option<NavLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,

    // Blog-only fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// Estimated reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<f64>,
}

impl PageMetadata {
    /// Minimal metadata with just a title and permalink.
    pub fn new(title: impl Into<String>, permalink: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            slug: None,
            permalink: permalink.into(),
            source: None,
            source_dir_name: None,
            edit_url: None,
            version: None,
            sidebar: None,
            front_matter: FrontMatter::new(),
            toc: Vec::new(),
            previous: None,
            next: None,
            tags: Vec::new(),
            date: None,
            formatted_date: None,
            authors: Vec::new(),
            reading_time: None,
        }
    }

    /// Blog posts carry a publication date; docs don't.
    pub fn is_blog_post(&self) -> bool {
        self.date.is_some()
    }

    /// A front matter value as a bool, if present and boolean.
    pub fn front_matter_bool(&self, key: &str) -> Option<bool> {
        self.front_matter.get(key).and_then(Value::as_bool)
    }

    /// A front matter value as a heading level, if present and in `1..=6`.
    pub fn front_matter_level(&self, key: &str) -> Option<u8> {
        self.front_matter
            .get(key)
            .and_then(Value::as_u64)
            .filter(|l| (1..=6).contains(l))
            .map(|l| l as u8)
    }
}

// ---------------------------------------------------------------------------
// PageBundle
// ---------------------------------------------------------------------------

/// One page as emitted by the external build: metadata plus the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBundle {
    /// Absent metadata is representable so the assembler can reject it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    pub content: RenderNode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_accepts_bare_string_children() {
        let json = r#"{"tag":"p","children":["Hello ",{"tag":"strong","children":["world"]}]}"#;
        let node: RenderNode = serde_json::from_str(json).expect("parse node");

        assert_eq!(node.children.len(), 2);
        assert!(node.children[0].is_text());
        assert_eq!(node.text_content(), "Hello world");
    }

    #[test]
    fn text_node_survives_serialization() {
        let node = RenderNode::new("p").with_child(RenderNode::text("hi"));
        let json = serde_json::to_string(&node).expect("serialize");
        let parsed: RenderNode = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, node);
    }

    #[test]
    fn descendants_in_document_order() {
        let tree = RenderNode::new("root")
            .with_child(RenderNode::new("a").with_child(RenderNode::new("a1")))
            .with_child(RenderNode::new("b"));

        let tags: Vec<&str> = tree.descendants().iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn blog_metadata_accepts_prev_next_item() {
        let json = r#"{
            "permalink": "/blog/2024/01/23/Code-execution-in-docker",
            "title": "Code execution is now by default inside docker container",
            "date": "2024-01-23T00:00:00.000Z",
            "formattedDate": "January 23, 2024",
            "readingTime": 2.38,
            "authors": [{"name": "Olga Vrousgou", "imageURL": "https://github.com/olgavrou.png"}],
            "frontMatter": {"tags": ["AutoGen"]},
            "prevItem": {"title": "AutoGenBench", "permalink": "/blog/2024/01/25/AutoGenBench"},
            "nextItem": {"title": "All About Agent Descriptions", "permalink": "/blog/2023/12/29/AgentDescriptions"}
        }"#;
        let meta: PageMetadata = serde_json::from_str(json).expect("parse blog metadata");

        assert!(meta.is_blog_post());
        assert_eq!(meta.previous.as_ref().map(|l| l.title.as_str()), Some("AutoGenBench"));
        assert!(meta.next.is_some());
        assert_eq!(
            meta.authors[0].image_url.as_deref(),
            Some("https://github.com/olgavrou.png")
        );
    }

    #[test]
    fn toc_entry_accepts_value_key() {
        let json = r#"{"value":"GroupChat Objects","id":"groupchat-objects","level":2,
            "children":[{"value":"reset","id":"reset","level":4}]}"#;
        let entry: TocEntry = serde_json::from_str(json).expect("parse toc entry");
        assert_eq!(entry.text, "GroupChat Objects");
        assert_eq!(entry.children[0].level, 4);
    }

    #[test]
    fn front_matter_accessors() {
        let mut meta = PageMetadata::new("Intro", "/docs/intro");
        meta.front_matter
            .insert("hide_table_of_contents".into(), Value::Bool(true));
        meta.front_matter
            .insert("toc_max_heading_level".into(), Value::from(4));
        meta.front_matter
            .insert("toc_min_heading_level".into(), Value::from(9));

        assert_eq!(meta.front_matter_bool("hide_table_of_contents"), Some(true));
        assert_eq!(meta.front_matter_level("toc_max_heading_level"), Some(4));
        assert_eq!(meta.front_matter_level("toc_min_heading_level"), None);
    }

    #[test]
    fn bundle_fixture_validates() {
        let fixture = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../../fixtures/json/groupchat.bundle.json"
        ))
        .expect("read fixture");
        let bundle: PageBundle = serde_json::from_str(&fixture).expect("deserialize fixture");
        let meta = bundle.metadata.expect("fixture has metadata");
        assert_eq!(meta.title, "agentchat.groupchat");
        assert_eq!(meta.toc.len(), 2);
        assert_eq!(meta.toc[0].children.len(), 3);
    }
}
