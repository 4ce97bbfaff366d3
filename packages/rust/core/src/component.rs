//! Renderer capabilities.
//!
//! A [`Renderer`] turns a tag, its props and its already-rendered children
//! into output nodes. Host aliases, fragments and passthrough are plain
//! variants; user code plugs in through the [`Render`] trait.

use std::fmt;
use std::sync::Arc;

use docrender_shared::{Props, RenderNode};

use crate::renderers::Builtin;

/// What a renderer receives for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    /// The tag as it appears in the content tree.
    pub tag: String,
    pub props: Props,
    /// Children, already rendered.
    pub children: Vec<RenderNode>,
}

impl RenderInput {
    pub fn new(tag: impl Into<String>, props: Props, children: Vec<RenderNode>) -> Self {
        Self {
            tag: tag.into(),
            props,
            children,
        }
    }
}

/// User-supplied rendering code.
pub trait Render: Send + Sync {
    /// Stable display name, used in logs and for inspection.
    fn name(&self) -> &str;

    fn render(&self, input: RenderInput) -> RenderNode;
}

struct FnRender<F> {
    name: String,
    f: F,
}

impl<F> Render for FnRender<F>
where
    F: Fn(RenderInput) -> RenderNode + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, input: RenderInput) -> RenderNode {
        (self.f)(input)
    }
}

/// Wrap a closure as a custom [`Renderer`].
pub fn render_fn<F>(name: impl Into<String>, f: F) -> Renderer
where
    F: Fn(RenderInput) -> RenderNode + Send + Sync + 'static,
{
    Renderer::Custom(Arc::new(FnRender {
        name: name.into(),
        f,
    }))
}

/// A resolved rendering capability for one tag.
#[derive(Clone)]
pub enum Renderer {
    /// Emit a host element under the given tag, keeping props and children.
    Host(String),
    /// Emit only the children; the assembler splices them into the parent.
    Fragment,
    /// Emit the node unchanged.
    Passthrough,
    /// One of the renderers shipped with docrender.
    Builtin(Builtin),
    /// User code.
    Custom(Arc<dyn Render>),
}

impl Renderer {
    pub fn host(tag: impl Into<String>) -> Self {
        Self::Host(tag.into())
    }

    pub fn custom(render: impl Render + 'static) -> Self {
        Self::Custom(Arc::new(render))
    }

    /// Display name: `host:code`, `fragment`, `passthrough`, `builtin:heading`,
    /// or the custom renderer's own name.
    pub fn name(&self) -> String {
        match self {
            Self::Host(tag) => format!("host:{tag}"),
            Self::Fragment => "fragment".to_string(),
            Self::Passthrough => "passthrough".to_string(),
            Self::Builtin(builtin) => format!("builtin:{}", builtin.name()),
            Self::Custom(render) => render.name().to_string(),
        }
    }

    /// Run the renderer.
    pub fn apply(&self, input: RenderInput) -> RenderNode {
        match self {
            Self::Host(tag) => RenderNode {
                tag: tag.clone(),
                props: input.props,
                children: input.children,
            },
            Self::Fragment => RenderNode::fragment(input.children),
            Self::Passthrough => RenderNode {
                tag: input.tag,
                props: input.props,
                children: input.children,
            },
            Self::Builtin(builtin) => builtin.render(input),
            Self::Custom(render) => render.render(input),
        }
    }
}

impl PartialEq for Renderer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Fragment, Self::Fragment) | (Self::Passthrough, Self::Passthrough) => true,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderer({})", self.name())
    }
}
