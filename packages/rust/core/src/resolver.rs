//! Component resolution.
//!
//! Maps a tag to the renderer that should handle it. Lookup order:
//! 1. the current override set (parent-qualified key first, e.g. `pre.code`)
//! 2. the built-in renderer for the tag
//! 3. passthrough
//!
//! Resolution never fails.

use tracing::trace;

use docrender_shared::{FRAGMENT_TAG, TEXT_TAG};

use crate::component::Renderer;
use crate::context::ComponentContext;
use crate::renderers::Builtin;

/// Which layer a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFrom {
    /// `parent.tag` entry in the override set.
    QualifiedOverride,
    /// Plain `tag` entry in the override set.
    Override,
    Builtin,
    Passthrough,
}

/// A renderer plus the layer that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub renderer: Renderer,
    pub from: ResolvedFrom,
}

/// Resolve `tag` in the current scope.
pub fn resolve(ctx: &ComponentContext, tag: &str) -> Renderer {
    resolve_in(ctx, None, tag)
}

/// Resolve `tag` as a child of `parent`. A `"{parent}.{tag}"` override
/// takes precedence over a plain `tag` override.
pub fn resolve_in(ctx: &ComponentContext, parent: Option<&str>, tag: &str) -> Renderer {
    resolve_with_source(ctx, parent, tag).renderer
}

/// Like [`resolve_in`], also reporting where the renderer came from.
pub fn resolve_with_source(
    ctx: &ComponentContext,
    parent: Option<&str>,
    tag: &str,
) -> Resolution {
    if is_reserved(tag) {
        return Resolution {
            renderer: Renderer::Passthrough,
            from: ResolvedFrom::Passthrough,
        };
    }

    let overrides = ctx.current_overrides();

    if let Some(parent) = parent.filter(|p| !is_reserved(p)) {
        let qualified = format!("{parent}.{tag}");
        if let Some(renderer) = overrides.get(&qualified) {
            trace!(tag, parent, renderer = %renderer.name(), "resolved qualified override");
            return Resolution {
                renderer: renderer.clone(),
                from: ResolvedFrom::QualifiedOverride,
            };
        }
    }

    if let Some(renderer) = overrides.get(tag) {
        trace!(tag, renderer = %renderer.name(), "resolved override");
        return Resolution {
            renderer: renderer.clone(),
            from: ResolvedFrom::Override,
        };
    }

    if let Some(builtin) = Builtin::for_tag(tag) {
        return Resolution {
            renderer: Renderer::Builtin(builtin),
            from: ResolvedFrom::Builtin,
        };
    }

    Resolution {
        renderer: Renderer::Passthrough,
        from: ResolvedFrom::Passthrough,
    }
}

/// `#text` and `#fragment` are structural and never resolved.
pub fn is_reserved(tag: &str) -> bool {
    tag == TEXT_TAG || tag == FRAGMENT_TAG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::render_fn;
    use crate::context::OverrideMap;
    use docrender_shared::RenderNode;

    fn named(name: &str) -> Renderer {
        render_fn(name, |input| RenderNode::new("x").with_children(input.children))
    }

    #[test]
    fn override_wins_and_builtin_fills_the_rest() {
        let renderer_a = named("A");
        let ctx = ComponentContext::root().scoped(OverrideMap::new().with("code", renderer_a.clone()));

        assert_eq!(resolve(&ctx, "code"), renderer_a);
        assert_eq!(resolve(&ctx, "heading"), Renderer::Builtin(Builtin::Heading));
    }

    #[test]
    fn nested_scopes_keep_outer_entries() {
        let r1 = named("R1");
        let r2 = named("R2");
        let ctx = ComponentContext::root();

        ctx.with_overrides(OverrideMap::new().with("code", r1.clone()), |outer| {
            outer.with_overrides(OverrideMap::new().with("list", r2.clone()), |inner| {
                assert_eq!(resolve(inner, "code"), r1);
                assert_eq!(resolve(inner, "list"), r2);
            });
        });
    }

    #[test]
    fn unknown_tags_pass_through() {
        let ctx = ComponentContext::root();
        for tag in ["blink", "", "MyComponent", "details"] {
            let resolution = resolve_with_source(&ctx, None, tag);
            assert_eq!(resolution.from, ResolvedFrom::Passthrough);
            assert_eq!(resolution.renderer, Renderer::Passthrough);
        }
    }

    #[test]
    fn tags_without_override_use_builtin_or_passthrough() {
        let ctx = ComponentContext::from_map(OverrideMap::new());
        for tag in ["h2", "pre", "list", "a", "tocSidebar"] {
            assert_eq!(
                resolve_with_source(&ctx, None, tag).from,
                ResolvedFrom::Builtin,
                "{tag} should have a builtin"
            );
        }
        assert_eq!(resolve(&ctx, "p"), Renderer::Passthrough);
    }

    #[test]
    fn qualified_override_beats_plain() {
        let block = named("block-code");
        let inline = named("inline-code");
        let ctx = ComponentContext::root().scoped(
            OverrideMap::new()
                .with("pre.code", block.clone())
                .with("code", inline.clone()),
        );

        let in_pre = resolve_with_source(&ctx, Some("pre"), "code");
        assert_eq!(in_pre.renderer, block);
        assert_eq!(in_pre.from, ResolvedFrom::QualifiedOverride);
        assert_eq!(resolve_in(&ctx, Some("p"), "code"), inline);
        assert_eq!(resolve(&ctx, "code"), inline);
    }

    #[test]
    fn default_table_maps_inline_code_to_host() {
        let ctx = ComponentContext::root();
        assert_eq!(resolve(&ctx, "inlineCode"), Renderer::host("code"));
        assert_eq!(resolve(&ctx, "wrapper"), Renderer::Fragment);
    }

    #[test]
    fn reserved_tags_ignore_overrides() {
        let ctx = ComponentContext::root()
            .scoped(OverrideMap::new().with(TEXT_TAG, named("shout")));
        assert_eq!(resolve(&ctx, TEXT_TAG), Renderer::Passthrough);
        assert_eq!(resolve(&ctx, FRAGMENT_TAG), Renderer::Passthrough);
    }
}
