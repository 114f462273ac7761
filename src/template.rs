//! The template tree and the chunk-tree builder.
//!
//! A single pass over the scanned chunks drives a stack of open
//! blocks.  Block tags are data, not code: each registered block names
//! its terminator and intermediate tags, so the builder stays generic
//! and only the per-block compile function differs.  Tag and block
//! arguments are parsed here, at template-parse time; rendering never
//! re-parses source.

use crate::config::Config;
use crate::context::RenderCtx;
use crate::error::{Error, SourceInfo};
use crate::expression::{parse_expression, Expr};
use crate::render::Flow;
use crate::scanner::{scan, Chunk, ChunkKind};
use std::fmt;
use std::sync::Arc;

/// A compiled render action for a simple tag occurrence.
pub type TagRender =
    Box<dyn Fn(&mut String, &mut RenderCtx<'_>) -> Result<Flow, Error> + Send + Sync>;

/// A compiled render action for a whole block.
pub type BlockRender =
    Box<dyn Fn(&mut String, &mut RenderCtx<'_>) -> Result<Flow, Error> + Send + Sync>;

/// Box a tag render closure.
pub fn tag_render<F>(render: F) -> TagRender
where
    F: Fn(&mut String, &mut RenderCtx<'_>) -> Result<Flow, Error> + Send + Sync + 'static,
{
    Box::new(render)
}

/// Box a block render closure.
pub fn block_render<F>(render: F) -> BlockRender
where
    F: Fn(&mut String, &mut RenderCtx<'_>) -> Result<Flow, Error> + Send + Sync + 'static,
{
    Box::new(render)
}

/// A simple tag: compiles its argument source into a render action.
pub struct TagDef {
    pub compile:
        Arc<dyn Fn(&str, &SourceInfo, &Config) -> Result<TagRender, Error> + Send + Sync>,
}

/// A block tag grammar: opener (the registry key), intermediates,
/// terminator, and the compile function that turns the collected
/// clauses into a render action.
pub struct BlockDef {
    pub terminator: String,
    pub intermediates: Vec<String>,
    pub compile: Arc<dyn Fn(Block, &Config) -> Result<BlockRender, Error> + Send + Sync>,
}

/// The parsed clauses of one block occurrence, opener first, in source
/// order.
pub struct Block {
    pub name: String,
    pub info: SourceInfo,
    pub clauses: Vec<Clause>,
}

/// One segment of a block: the selector tag that opened it (the block
/// opener or an intermediate such as `else`), its raw arguments, and
/// the body up to the next selector or the terminator.
pub struct Clause {
    pub tag: String,
    pub args: String,
    pub info: SourceInfo,
    pub body: Seq,
}

/// One node of the template tree.
pub enum Node {
    Text(String),
    Object { expr: Expr, info: SourceInfo },
    Tag { name: String, info: SourceInfo, render: TagRender },
    Block { name: String, info: SourceInfo, render: BlockRender },
}

/// An ordered sequence of nodes; the body of a template or clause.
pub struct Seq(pub(crate) Vec<Node>);

/// A parsed template, ready to render any number of times.
pub struct Template {
    pub(crate) root: Seq,
    path: String,
}

impl Template {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Text(text) => out.debug_tuple("Text").field(text).finish(),
            Node::Object { expr, .. } => out.debug_tuple("Object").field(expr).finish(),
            Node::Tag { name, .. } => out.debug_tuple("Tag").field(name).finish(),
            Node::Block { name, .. } => out.debug_tuple("Block").field(name).finish(),
        }
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.debug_list().entries(&self.0).finish()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        out.debug_struct("Template")
            .field("path", &self.path)
            .field("root", &self.root)
            .finish()
    }
}

/// Parse template source into a tree under `config`'s registries.
pub fn parse(source: &str, path: &str, config: &Config) -> Result<Template, Error> {
    let mut chunks = scan(source, path)?;
    apply_whitespace_control(&mut chunks);
    let root = build(chunks, config)?;
    Ok(Template {
        root,
        path: path.to_string(),
    })
}

/// Apply `{{-`/`-}}` style markers: a marker trims the adjacent text
/// chunk only.  The chunk `source` fields stay untouched, so the
/// scanned sequence still reconstructs the input; only the text that
/// reaches the tree is trimmed.
fn apply_whitespace_control(chunks: &mut [Chunk]) {
    for i in 0..chunks.len() {
        if chunks[i].kind != ChunkKind::Text {
            continue;
        }
        let mut text = chunks[i].source.clone();
        if i > 0 && chunks[i - 1].trim_after {
            text = text.trim_start().to_string();
        }
        if i + 1 < chunks.len() && chunks[i + 1].trim_before {
            text = text.trim_end().to_string();
        }
        chunks[i].args = text;
    }
}

struct OpenBlock {
    name: String,
    info: SourceInfo,
    def: Arc<BlockDef>,
    closed: Vec<Clause>,
    tag: String,
    args: String,
    tag_info: SourceInfo,
    body: Vec<Node>,
}

impl OpenBlock {
    fn next_clause(&mut self, tag: String, args: String, info: SourceInfo) {
        let body = std::mem::replace(&mut self.body, Vec::new());
        self.closed.push(Clause {
            tag: std::mem::replace(&mut self.tag, tag),
            args: std::mem::replace(&mut self.args, args),
            info: std::mem::replace(&mut self.tag_info, info),
            body: Seq(body),
        });
    }
}

fn build(chunks: Vec<Chunk>, config: &Config) -> Result<Seq, Error> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<OpenBlock> = Vec::new();

    for chunk in chunks {
        match chunk.kind {
            ChunkKind::Text => {
                if !chunk.args.is_empty() {
                    push_node(&mut stack, &mut root, Node::Text(chunk.args));
                }
            }
            ChunkKind::Object => {
                let expr = parse_expression(&chunk.args, &chunk.info)?;
                push_node(
                    &mut stack,
                    &mut root,
                    Node::Object {
                        expr,
                        info: chunk.info,
                    },
                );
            }
            ChunkKind::Tag => {
                let ends_top = stack
                    .last()
                    .map_or(false, |open| open.def.terminator == chunk.name);
                if ends_top {
                    if let Some(mut open) = stack.pop() {
                        open.next_clause(String::new(), String::new(), chunk.info);
                        let block = Block {
                            name: open.name.clone(),
                            info: open.info.clone(),
                            clauses: open.closed,
                        };
                        let render = (*open.def.compile)(block, config)?;
                        push_node(
                            &mut stack,
                            &mut root,
                            Node::Block {
                                name: open.name,
                                info: open.info,
                                render,
                            },
                        );
                    }
                    continue;
                }
                let continues_top = stack.last().map_or(false, |open| {
                    open.def.intermediates.iter().any(|t| *t == chunk.name)
                });
                if continues_top {
                    if let Some(open) = stack.last_mut() {
                        open.next_clause(chunk.name, chunk.args, chunk.info);
                    }
                    continue;
                }
                if let Some(def) = config.block(&chunk.name) {
                    stack.push(OpenBlock {
                        name: chunk.name.clone(),
                        info: chunk.info.clone(),
                        def: def.clone(),
                        closed: Vec::new(),
                        tag: chunk.name,
                        args: chunk.args,
                        tag_info: chunk.info,
                        body: Vec::new(),
                    });
                } else if let Some(def) = config.tag(&chunk.name) {
                    let render = (*def.compile)(&chunk.args, &chunk.info, config)?;
                    push_node(
                        &mut stack,
                        &mut root,
                        Node::Tag {
                            name: chunk.name,
                            info: chunk.info,
                            render,
                        },
                    );
                } else if config.is_block_member(&chunk.name) {
                    return Err(Error::UnexpectedTag {
                        name: chunk.name,
                        info: chunk.info,
                    });
                } else {
                    return Err(Error::UnknownTag {
                        name: chunk.name,
                        info: chunk.info,
                    });
                }
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(Error::UnbalancedBlock {
            name: open.name,
            info: open.info,
        });
    }
    Ok(Seq(root))
}

fn push_node(stack: &mut Vec<OpenBlock>, root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(open) => open.body.push(node),
        None => root.push(node),
    }
}
