//! Engine configuration: the filter, tag, and block registries, the
//! include resolver, and the object-error mode.  Write-at-configure,
//! read-at-render; a `Config` is cheap to clone because every entry is
//! reference-counted.

use crate::error::Error;
use crate::filters::Filter;
use crate::stdfilters::standard_filters;
use crate::tags::{standard_blocks, standard_tags};
use crate::template::{BlockDef, TagDef};
use std::collections::HashMap;
use std::sync::Arc;

/// What to do when evaluating a `{{ … }}` object fails at render time.
/// Tag errors always abort regardless of this setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMode {
    /// Propagate the error and abort the render.
    Strict,
    /// Write this placeholder instead and keep rendering.
    Placeholder(String),
}

/// The source fetched for an `{% include %}`: the raw template text
/// and the canonical pathname used in error messages and as the
/// per-render cache key.
pub struct IncludeSource {
    pub source: String,
    pub path: String,
}

/// Maps the logical name written after `include` to template source.
/// The engine never touches the filesystem itself.
pub trait IncludeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<IncludeSource, Error>;
}

impl<F> IncludeResolver for F
where
    F: Fn(&str) -> Result<IncludeSource, Error> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Result<IncludeSource, Error> {
        self(name)
    }
}

#[derive(Clone)]
pub struct Config {
    filters: HashMap<String, Arc<Filter>>,
    tags: HashMap<String, Arc<TagDef>>,
    blocks: HashMap<String, Arc<BlockDef>>,
    pub(crate) resolver: Option<Arc<dyn IncludeResolver>>,
    pub(crate) error_mode: ErrorMode,
}

impl Config {
    /// An empty configuration: no filters, no tags, no blocks.
    pub fn bare() -> Config {
        Config {
            filters: HashMap::new(),
            tags: HashMap::new(),
            blocks: HashMap::new(),
            resolver: None,
            error_mode: ErrorMode::Strict,
        }
    }

    /// A configuration with the standard Liquid filters, tags, and
    /// blocks registered.
    pub fn liquid() -> Config {
        DEFAULTS.clone()
    }

    pub fn add_filter(&mut self, name: impl Into<String>, filter: Filter) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn add_tag(&mut self, name: impl Into<String>, tag: TagDef) {
        self.tags.insert(name.into(), Arc::new(tag));
    }

    pub fn add_block(&mut self, name: impl Into<String>, block: BlockDef) {
        self.blocks.insert(name.into(), Arc::new(block));
    }

    pub fn filter(&self, name: &str) -> Option<&Arc<Filter>> {
        self.filters.get(name)
    }

    pub fn tag(&self, name: &str) -> Option<&Arc<TagDef>> {
        self.tags.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&Arc<BlockDef>> {
        self.blocks.get(name)
    }

    /// Whether `name` is the terminator or an intermediate tag of any
    /// registered block; used to tell "unexpected tag" from "unknown
    /// tag" when no block is open.
    pub fn is_block_member(&self, name: &str) -> bool {
        self.blocks.values().any(|def| {
            def.terminator == name || def.intermediates.iter().any(|t| t == name)
        })
    }
}

lazy_static! {
    static ref DEFAULTS: Config = {
        let mut config = Config::bare();
        for (name, filter) in standard_filters() {
            config.filters.insert(name, Arc::new(filter));
        }
        for (name, tag) in standard_tags() {
            config.tags.insert(name, Arc::new(tag));
        }
        for (name, block) in standard_blocks() {
            config.blocks.insert(name, Arc::new(block));
        }
        config
    };
}
