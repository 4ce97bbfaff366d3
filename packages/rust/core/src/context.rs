//! Scoped component overrides.
//!
//! A [`ComponentContext`] is an immutable value passed down the render call
//! chain. Child scopes are built by merging a partial [`OverrideMap`] on top
//! of the parent's map, so the innermost scope wins for overlapping tags and
//! outer overrides stay visible for everything else.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::component::Renderer;
use crate::merge::{merge_two, value_kind};

// ---------------------------------------------------------------------------
// OverrideMap
// ---------------------------------------------------------------------------

/// Tag name -> renderer table for one scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideMap {
    entries: BTreeMap<String, Renderer>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table every root context starts from: inline code renders as a
    /// host `code` element and the page wrapper is a fragment.
    pub fn defaults() -> Self {
        Self::new()
            .with("inlineCode", Renderer::host("code"))
            .with("wrapper", Renderer::Fragment)
    }

    /// Builder: register a renderer for `tag`.
    pub fn with(mut self, tag: impl Into<String>, renderer: Renderer) -> Self {
        self.entries.insert(tag.into(), renderer);
        self
    }

    /// Register a renderer, returning the one it replaced.
    pub fn insert(&mut self, tag: impl Into<String>, renderer: Renderer) -> Option<Renderer> {
        self.entries.insert(tag.into(), renderer)
    }

    pub fn get(&self, tag: &str) -> Option<&Renderer> {
        self.entries.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// A new map with `overlay` merged on top of `self`.
    pub fn merged(&self, overlay: &OverrideMap) -> OverrideMap {
        Self {
            entries: merge_two(&self.entries, &overlay.entries),
        }
    }

    /// Build overrides from a JSON table of tag -> host tag alias.
    ///
    /// Returns `None` when `raw` is not an object. Entries whose value is not
    /// a non-empty string are skipped with a warning.
    pub fn from_json(raw: &Value) -> Option<Self> {
        let Value::Object(table) = raw else {
            warn!(kind = value_kind(raw), "override table is not a mapping, ignoring");
            return None;
        };

        let mut map = Self::new();
        for (tag, value) in table {
            match value.as_str() {
                Some(alias) if !alias.is_empty() => {
                    map.insert(tag.clone(), Renderer::host(alias));
                }
                _ => {
                    warn!(tag = %tag, kind = value_kind(value), "skipping malformed override entry");
                }
            }
        }
        Some(map)
    }
}

impl FromIterator<(String, Renderer)> for OverrideMap {
    fn from_iter<I: IntoIterator<Item = (String, Renderer)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// OverrideSpec
// ---------------------------------------------------------------------------

/// Function form of an override: computes the child map from the parent's.
pub type DeriveFn = Arc<dyn Fn(&OverrideMap) -> OverrideMap + Send + Sync>;

/// How a child scope changes its parent's overrides.
#[derive(Clone)]
pub enum OverrideSpec {
    /// Merge these entries on top of the parent's map.
    Extend(OverrideMap),
    /// Replace the parent's map with whatever the function returns.
    Derive(DeriveFn),
}

impl OverrideSpec {
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&OverrideMap) -> OverrideMap + Send + Sync + 'static,
    {
        Self::Derive(Arc::new(f))
    }

    fn apply(&self, parent: &OverrideMap) -> OverrideMap {
        match self {
            Self::Extend(partial) => parent.merged(partial),
            Self::Derive(f) => f(parent),
        }
    }
}

impl From<OverrideMap> for OverrideSpec {
    fn from(map: OverrideMap) -> Self {
        Self::Extend(map)
    }
}

impl fmt::Debug for OverrideSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extend(map) => f.debug_tuple("Extend").field(map).finish(),
            Self::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentContext
// ---------------------------------------------------------------------------

/// The override set active at one point of the render tree.
#[derive(Debug, Clone)]
pub struct ComponentContext {
    overrides: Arc<OverrideMap>,
    depth: usize,
}

impl Default for ComponentContext {
    fn default() -> Self {
        Self::root()
    }
}

impl ComponentContext {
    /// A context with no enclosing scope: the default table.
    pub fn root() -> Self {
        Self::from_map(OverrideMap::defaults())
    }

    /// A top-level context with an explicit table (no defaults merged in).
    pub fn from_map(overrides: OverrideMap) -> Self {
        Self {
            overrides: Arc::new(overrides),
            depth: 0,
        }
    }

    /// The nearest enclosing override set.
    pub fn current_overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    /// Number of scopes between this context and its root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// A child context for explicit passing down the render chain.
    pub fn scoped(&self, spec: impl Into<OverrideSpec>) -> ComponentContext {
        let spec = spec.into();
        let overrides = spec.apply(&self.overrides);
        debug!(depth = self.depth + 1, entries = overrides.len(), "entering override scope");
        Self {
            overrides: Arc::new(overrides),
            depth: self.depth + 1,
        }
    }

    /// Run `body` with `partial` merged on top of the current overrides.
    /// The merged set exists only for the duration of `body`.
    pub fn with_overrides<R>(
        &self,
        partial: OverrideMap,
        body: impl FnOnce(&ComponentContext) -> R,
    ) -> R {
        let child = self.scoped(partial);
        body(&child)
    }

    /// Like [`with_overrides`](Self::with_overrides) but for any [`OverrideSpec`].
    pub fn with_spec<R>(
        &self,
        spec: impl Into<OverrideSpec>,
        body: impl FnOnce(&ComponentContext) -> R,
    ) -> R {
        let child = self.scoped(spec);
        body(&child)
    }

    /// Run `body` under overrides read from a raw JSON table.
    ///
    /// A malformed table is ignored and `body` runs in the current scope.
    pub fn with_json_overrides<R>(
        &self,
        raw: &Value,
        body: impl FnOnce(&ComponentContext) -> R,
    ) -> R {
        match OverrideMap::from_json(raw) {
            Some(partial) => self.with_overrides(partial, body),
            None => body(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::render_fn;
    use docrender_shared::RenderNode;
    use serde_json::json;

    fn named(name: &str) -> Renderer {
        let tag = name.to_string();
        render_fn(name, move |input| {
            RenderNode::new(tag.clone()).with_children(input.children)
        })
    }

    #[test]
    fn root_has_defaults() {
        let ctx = ComponentContext::root();
        assert_eq!(ctx.depth(), 0);
        assert_eq!(
            ctx.current_overrides().get("inlineCode"),
            Some(&Renderer::host("code"))
        );
        assert_eq!(
            ctx.current_overrides().get("wrapper"),
            Some(&Renderer::Fragment)
        );
    }

    #[test]
    fn scope_does_not_leak() {
        let ctx = ComponentContext::root();
        let r1 = named("R1");

        let inside = ctx.with_overrides(OverrideMap::new().with("code", r1.clone()), |inner| {
            inner.current_overrides().get("code").cloned()
        });

        assert_eq!(inside, Some(r1));
        assert!(ctx.current_overrides().get("code").is_none());
    }

    #[test]
    fn inner_scope_wins_and_outer_stays_visible() {
        let ctx = ComponentContext::root();
        let outer_code = named("outer-code");
        let inner_code = named("inner-code");
        let outer_list = named("outer-list");

        ctx.with_overrides(
            OverrideMap::new()
                .with("code", outer_code.clone())
                .with("list", outer_list.clone()),
            |outer| {
                outer.with_overrides(OverrideMap::new().with("code", inner_code.clone()), |inner| {
                    assert_eq!(inner.depth(), 2);
                    assert_eq!(inner.current_overrides().get("code"), Some(&inner_code));
                    assert_eq!(inner.current_overrides().get("list"), Some(&outer_list));
                    // Defaults from the root remain too.
                    assert!(inner.current_overrides().contains("inlineCode"));
                });
                assert_eq!(outer.current_overrides().get("code"), Some(&outer_code));
            },
        );
    }

    #[test]
    fn derive_spec_sees_parent_map() {
        let ctx = ComponentContext::root();
        let child = ctx.scoped(OverrideSpec::derive(|parent| {
            let mut next = OverrideMap::new();
            // Keep only the parent's wrapper, drop everything else.
            if let Some(wrapper) = parent.get("wrapper") {
                next.insert("wrapper", wrapper.clone());
            }
            next
        }));

        assert_eq!(child.current_overrides().len(), 1);
        assert!(!child.current_overrides().contains("inlineCode"));
    }

    #[test]
    fn with_spec_derives_for_the_body_only() {
        let ctx = ComponentContext::root();
        let stripped = ctx.with_spec(OverrideSpec::derive(|_| OverrideMap::new()), |inner| {
            assert_eq!(inner.depth(), 1);
            inner.current_overrides().is_empty()
        });

        assert!(stripped);
        assert!(ctx.current_overrides().contains("inlineCode"));
    }

    #[test]
    fn json_overrides_build_host_aliases() {
        let map = OverrideMap::from_json(&json!({"h5": "h4", "bad": 3, "empty": ""}))
            .expect("object table");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("h5"), Some(&Renderer::host("h4")));
    }

    #[test]
    fn malformed_json_overrides_fall_back_to_current_scope() {
        let ctx = ComponentContext::root();
        let r1 = named("R1");

        ctx.with_overrides(OverrideMap::new().with("code", r1.clone()), |outer| {
            outer.with_json_overrides(&json!(["not", "a", "map"]), |inner| {
                assert_eq!(inner.depth(), outer.depth());
                assert_eq!(inner.current_overrides().get("code"), Some(&r1));
            });
        });
    }

    #[test]
    fn from_iterator_collects() {
        let map: OverrideMap = vec![("pre".to_string(), Renderer::Passthrough)]
            .into_iter()
            .collect();
        assert_eq!(map.tags().collect::<Vec<_>>(), vec!["pre"]);
    }
}
