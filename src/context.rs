//! The binding environment and the per-render mutable state.

use crate::config::Config;
use crate::error::Error;
use crate::template::Template;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// A stack of scopes.  Lookup walks innermost outward; `assign` and
/// `capture` write to the root scope; `for` bodies push a scope that is
/// dropped on loop exit.
#[derive(Debug, Default)]
pub struct Env {
    scopes: Vec<IndexMap<String, Value>>,
}

impl Env {
    pub fn new(root: IndexMap<String, Value>) -> Env {
        Env {
            scopes: vec![root],
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bind in the root scope, as `assign` and `capture` do.
    pub fn set_root(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.first_mut() {
            scope.insert(name.into(), value);
        }
    }

    /// Bind in the innermost scope (loop variables, include bindings).
    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

/// Includes nested deeper than this report an error instead of
/// recursing forever.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Everything mutable during one render: the environment, the
/// increment/decrement counters, and the parsed-include cache.  The
/// engine configuration is shared read-only.
pub struct RenderCtx<'c> {
    config: &'c Config,
    pub env: Env,
    counters: HashMap<String, i64>,
    include_cache: HashMap<String, Rc<Template>>,
    include_depth: usize,
}

impl<'c> RenderCtx<'c> {
    pub fn new(config: &'c Config, bindings: IndexMap<String, Value>) -> RenderCtx<'c> {
        RenderCtx {
            config,
            env: Env::new(bindings),
            counters: HashMap::new(),
            include_cache: HashMap::new(),
            include_depth: 0,
        }
    }

    pub fn config(&self) -> &'c Config {
        self.config
    }

    /// `increment` semantics: emit the current counter, then add one.
    /// Counters are independent of `assign`-bound variables.
    pub fn increment(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        let current = *counter;
        *counter += 1;
        current
    }

    /// `decrement` semantics: subtract one, then emit.
    pub fn decrement(&mut self, name: &str) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter -= 1;
        *counter
    }

    pub fn cached_include(&self, path: &str) -> Option<Rc<Template>> {
        self.include_cache.get(path).cloned()
    }

    pub fn cache_include(&mut self, path: impl Into<String>, template: Rc<Template>) {
        self.include_cache.insert(path.into(), template);
    }

    pub fn enter_include(&mut self) -> Result<(), Error> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(Error::interpreter("include nesting too deep"));
        }
        self.include_depth += 1;
        Ok(())
    }

    pub fn leave_include(&mut self) {
        self.include_depth -= 1;
    }
}
