//! Table-of-contents tools.
//!
//! Bundles ship their TOC either nested (older builds) or flat with levels
//! (newer builds). Everything here works on [`TocEntry`] lists and
//! normalizes both shapes to the same hierarchy.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use docrender_shared::{RenderNode, TocEntry};

/// Generate a GitHub-style anchor slug from heading text.
pub fn slugify(text: &str) -> String {
    static STRIP_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s_-]").expect("valid regex"));
    static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").expect("valid regex"));

    let lowered = text.trim().to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, "");
    SPACE_RE.replace_all(&stripped, "-").into_owned()
}

/// Hands out unique anchor ids: `intro`, `intro-1`, `intro-2`, ...
#[derive(Debug, Default)]
pub struct SlugTracker {
    seen: HashMap<String, usize>,
}

impl SlugTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slugify `text` and de-duplicate against ids handed out so far.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        self.unique(base)
    }

    /// Record an id that is already fixed (e.g. an explicit heading id).
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }

    fn unique(&mut self, base: String) -> String {
        let Some(&last) = self.seen.get(&base) else {
            self.seen.insert(base.clone(), 0);
            return base;
        };

        let mut count = last;
        loop {
            count += 1;
            let candidate = format!("{base}-{count}");
            if !self.seen.contains_key(&candidate) {
                self.seen.insert(base, count);
                self.seen.insert(candidate.clone(), 0);
                return candidate;
            }
        }
    }
}

/// Heading level of a content node, if it is a heading.
///
/// `h1`…`h6` carry the level in the tag; the generic `heading` tag reads the
/// `level` prop and defaults to 2.
pub fn heading_level(node: &RenderNode) -> Option<u8> {
    match node.tag.as_str() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        "heading" => Some(
            node.props
                .get("level")
                .and_then(Value::as_u64)
                .filter(|l| (1..=6).contains(l))
                .map_or(2, |l| l as u8),
        ),
        _ => None,
    }
}

/// Return a copy of `root` where every heading has an `id` prop.
///
/// Explicit ids are kept and reserved up front, so a generated id never
/// collides with one that appears later in the document. Missing ids are
/// slugified from the heading text and de-duplicated in document order.
pub fn ensure_heading_ids(root: &RenderNode) -> RenderNode {
    let mut tracker = SlugTracker::new();
    reserve_explicit_ids(root, &mut tracker);
    let mut out = root.clone();
    assign_ids(&mut out, &mut tracker);
    out
}

fn explicit_id(node: &RenderNode) -> Option<&str> {
    node.prop_str("id").filter(|id| !id.is_empty())
}

fn reserve_explicit_ids(node: &RenderNode, tracker: &mut SlugTracker) {
    if heading_level(node).is_some() {
        if let Some(id) = explicit_id(node) {
            tracker.reserve(id);
        }
    }
    for child in &node.children {
        reserve_explicit_ids(child, tracker);
    }
}

fn assign_ids(node: &mut RenderNode, tracker: &mut SlugTracker) {
    if heading_level(node).is_some() && explicit_id(node).is_none() {
        let id = tracker.slug(&node.text_content());
        node.props.insert("id".into(), Value::String(id));
    }
    for child in &mut node.children {
        assign_ids(child, tracker);
    }
}

/// Derive flat TOC entries from `h2`…`h6` headings in document order.
///
/// Headings without an id are skipped; run [`ensure_heading_ids`] first.
pub fn collect_headings(root: &RenderNode) -> Vec<TocEntry> {
    root.descendants()
        .into_iter()
        .filter_map(|node| {
            let level = heading_level(node)?;
            if level < 2 {
                return None;
            }
            let id = node.prop_str("id")?;
            Some(TocEntry::new(node.text_content().trim(), id, level))
        })
        .collect()
}

/// Flatten a nested TOC into document order, dropping the nesting.
pub fn flatten(entries: &[TocEntry]) -> Vec<TocEntry> {
    let mut out = Vec::new();
    for entry in entries {
        out.push(TocEntry::new(entry.text.clone(), entry.id.clone(), entry.level));
        out.extend(flatten(&entry.children));
    }
    out
}

/// Build a hierarchy from a flat list: each entry becomes a child of the
/// nearest preceding entry with a lower level.
pub fn nest_flat(flat: Vec<TocEntry>) -> Vec<TocEntry> {
    let mut roots = Vec::new();
    let mut stack: Vec<TocEntry> = Vec::new();

    for entry in flat {
        while stack.last().is_some_and(|top| top.level >= entry.level) {
            if let Some(done) = stack.pop() {
                attach(done, &mut stack, &mut roots);
            }
        }
        stack.push(entry);
    }
    while let Some(done) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }

    roots
}

fn attach(done: TocEntry, stack: &mut [TocEntry], roots: &mut Vec<TocEntry>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

/// Normalize either TOC shape to the level-based hierarchy.
pub fn normalize(entries: &[TocEntry]) -> Vec<TocEntry> {
    nest_flat(flatten(entries))
}

/// Keep entries whose level is within `min..=max`. Children of dropped
/// entries are lifted into the dropped entry's place.
pub fn filter_levels(entries: &[TocEntry], min: u8, max: u8) -> Vec<TocEntry> {
    let mut out = Vec::new();
    for entry in entries {
        let children = filter_levels(&entry.children, min, max);
        if (min..=max).contains(&entry.level) {
            out.push(TocEntry {
                text: entry.text.clone(),
                id: entry.id.clone(),
                level: entry.level,
                children,
            });
        } else {
            debug!(id = %entry.id, level = entry.level, "toc entry outside level range");
            out.extend(children);
        }
    }
    out
}

/// Total number of entries, nested ones included.
pub fn count_entries(entries: &[TocEntry]) -> usize {
    entries
        .iter()
        .map(|entry| 1 + count_entries(&entry.children))
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
