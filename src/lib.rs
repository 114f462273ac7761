//! Sluice is a [Liquid](https://shopify.github.io/liquid/) template
//! engine for Rust.
//!
//! A template is parsed once into a tree and can then be rendered any
//! number of times against different bindings:
//!
//! 1. Text outside markup is copied through verbatim.
//! 2. Objects, `{{ expression }}`, evaluate an expression (with
//! optional filters, `{{ user.name | upcase }}`) and write its string
//! form.
//! 3. Tags, `{% if … %}`, `{% for … %}`, `{% assign … %}`, carry the
//! control flow and never write delimiters of their own.
//!
//! The template syntax is documented in [the _Template_syntax_
//! module](Template_syntax/index.html).  A sample template may look
//! like this:
//!
//! ```text
//! <h1>{{ page.title | escape }}</h1>
//! {% for item in items reversed limit: 10 %}
//!   <p>{{ forloop.index }}: {{ item.name | default: "unnamed" }}</p>
//! {% else %}
//!   <p>Nothing here.</p>
//! {% endfor %}
//! ```
//!
//! Rendering it:
//!
//! ```
//! use sluice::{Bindings, Engine};
//!
//! let engine = Engine::new();
//! let template = engine
//!     .parse("Hello, {{ name }}!", "hello.liquid")
//!     .expect("template parses");
//! let out = engine
//!     .render(&template, Bindings::new().set("name", "world"))
//!     .expect("template renders");
//! assert_eq!(out, "Hello, world!");
//! ```
//!
//! The engine is a library only: no filesystem access, no CLI.
//! Includes are resolved through a caller-supplied
//! [`IncludeResolver`], and host data enters through [`Value`]
//! conversions or the [`Opaque`] trait.

#[macro_use]
extern crate lazy_static;

pub mod Template_syntax;
mod config;
mod context;
mod error;
mod eval;
mod expression;
mod filters;
mod lexemes;
mod parseresult;
mod render;
mod scanner;
mod stdfilters;
mod tags;
mod template;
mod value;

pub use crate::config::{Config, ErrorMode, IncludeResolver, IncludeSource};
pub use crate::context::{Env, RenderCtx};
pub use crate::error::{Error, SourceInfo};
pub use crate::expression::{BinaryOp, Expr, UnaryOp};
pub use crate::filters::{ExprClosure, Filter, FilterArg, ParamKind};
pub use crate::render::Flow;
pub use crate::scanner::{scan, Chunk, ChunkKind};
pub use crate::template::{
    Block, BlockDef, BlockRender, Clause, Seq, TagDef, TagRender, Template,
};
pub use crate::value::{Num, Opaque, Value};

use indexmap::IndexMap;
use std::sync::Arc;

/// A Liquid engine: a configuration of filters, tags, blocks, and an
/// include resolver.  Parsing and rendering only read the
/// configuration, so one engine can serve concurrent renders.
pub struct Engine {
    config: Config,
}

impl Engine {
    /// An engine with the standard Liquid filters, tags, and blocks.
    pub fn new() -> Engine {
        Engine {
            config: Config::liquid(),
        }
    }

    /// An engine with empty registries, for hosts that want full
    /// control over what templates may do.
    pub fn bare() -> Engine {
        Engine {
            config: Config::bare(),
        }
    }

    /// Register a filter.  The `Filter` carries the declared parameter
    /// kinds; dispatch arity-checks and coerces against them.
    pub fn register_filter(&mut self, name: &str, filter: Filter) -> &mut Engine {
        self.config.add_filter(name, filter);
        self
    }

    /// Register a simple tag.  The renderer receives the raw argument
    /// source, the output buffer, and the render context.
    pub fn register_tag<F>(&mut self, name: &str, renderer: F) -> &mut Engine
    where
        F: Fn(&str, &mut String, &mut RenderCtx<'_>) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    {
        let renderer = Arc::new(renderer);
        self.config.add_tag(
            name,
            TagDef {
                compile: Arc::new(move |args, _info, _config| {
                    let args = args.to_string();
                    let renderer = renderer.clone();
                    Ok(template::tag_render(move |out, ctx| {
                        (*renderer)(&args, out, ctx)?;
                        Ok(Flow::Done)
                    }))
                }),
            },
        );
        self
    }

    /// Register a block tag by its grammar.  The renderer receives the
    /// block's clauses in source order (opener first) and may render
    /// any of their bodies.
    pub fn register_block<F>(
        &mut self,
        name: &str,
        terminator: &str,
        intermediates: &[&str],
        renderer: F,
    ) -> &mut Engine
    where
        F: Fn(&Block, &mut String, &mut RenderCtx<'_>) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    {
        let renderer = Arc::new(renderer);
        self.config.add_block(
            name,
            BlockDef {
                terminator: terminator.to_string(),
                intermediates: intermediates.iter().map(|s| s.to_string()).collect(),
                compile: Arc::new(move |block, _config| {
                    let renderer = renderer.clone();
                    Ok(template::block_render(move |out, ctx| {
                        (*renderer)(&block, out, ctx)?;
                        Ok(Flow::Done)
                    }))
                }),
            },
        );
        self
    }

    /// Set the resolver consulted by `{% include %}`.
    pub fn set_include_resolver(
        &mut self,
        resolver: impl IncludeResolver + 'static,
    ) -> &mut Engine {
        self.config.resolver = Some(Arc::new(resolver));
        self
    }

    /// Replace render errors inside `{{ … }}` with `placeholder`
    /// instead of aborting.  Tag errors still abort.
    pub fn set_error_placeholder(&mut self, placeholder: &str) -> &mut Engine {
        self.config.error_mode = ErrorMode::Placeholder(placeholder.to_string());
        self
    }

    /// Parse template source.  `path` names the template in error
    /// messages.
    pub fn parse(&self, source: &str, path: &str) -> Result<Template, Error> {
        tracing::debug!(path, bytes = source.len(), "parsing template");
        template::parse(source, path, &self.config)
    }

    /// Render a parsed template against `bindings`.  The bindings
    /// become the root scope of a fresh environment; `assign` and
    /// `capture` mutate that per-render copy, never the caller's data.
    pub fn render(&self, template: &Template, bindings: Bindings) -> Result<String, Error> {
        tracing::debug!(path = template.path(), "rendering template");
        let mut ctx = RenderCtx::new(&self.config, bindings.0);
        let mut out = String::new();
        template.render_into(&mut out, &mut ctx)?;
        Ok(out)
    }

    /// Parse and render in one step, for one-off templates.
    pub fn render_source(&self, source: &str, bindings: Bindings) -> Result<String, Error> {
        let template = self.parse(source, "(inline)")?;
        self.render(&template, bindings)
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

/// The root bindings for one render.
///
/// ```
/// use sluice::{Bindings, Value};
///
/// let bindings = Bindings::new()
///     .set("title", "Report")
///     .set("count", 3)
///     .set("tags", Value::List(vec!["a".into(), "b".into()]));
/// ```
#[derive(Debug, Default)]
pub struct Bindings(IndexMap<String, Value>);

impl Bindings {
    pub fn new() -> Bindings {
        Bindings(IndexMap::new())
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Bindings {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl From<IndexMap<String, Value>> for Bindings {
    fn from(map: IndexMap<String, Value>) -> Bindings {
        Bindings(map)
    }
}
