//! Tree execution: walk a parsed template and write its output.
//!
//! `break` and `continue` are not unwound through panics or errors;
//! every node render returns a [`Flow`] and the enclosing `for` block
//! collapses it.

use crate::config::ErrorMode;
use crate::context::RenderCtx;
use crate::error::Error;
use crate::eval::eval;
use crate::template::{Node, Seq, Template};

/// The control signal a node render hands back to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Keep going with the next node.
    Done,
    /// A `{% break %}` looking for its enclosing loop.
    Break,
    /// A `{% continue %}` looking for its enclosing loop.
    Continue,
}

impl Seq {
    pub fn render(&self, out: &mut String, ctx: &mut RenderCtx) -> Result<Flow, Error> {
        for node in &self.0 {
            match node.render(out, ctx)? {
                Flow::Done => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Done)
    }
}

impl Node {
    fn render(&self, out: &mut String, ctx: &mut RenderCtx) -> Result<Flow, Error> {
        match self {
            Node::Text(text) => {
                out.push_str(text);
                Ok(Flow::Done)
            }
            Node::Object { expr, info } => match eval(expr, ctx) {
                Ok(value) => {
                    out.push_str(&value.to_string());
                    Ok(Flow::Done)
                }
                Err(e) => match &ctx.config().error_mode {
                    ErrorMode::Placeholder(placeholder) => {
                        tracing::debug!(error = %e, "object error replaced by placeholder");
                        out.push_str(placeholder);
                        Ok(Flow::Done)
                    }
                    ErrorMode::Strict => Err(e.at(info)),
                },
            },
            Node::Tag { render, info, .. } => render(out, ctx).map_err(|e| e.at(info)),
            Node::Block { render, info, .. } => render(out, ctx).map_err(|e| e.at(info)),
        }
    }
}

impl Template {
    /// Render the whole tree into `out`.  A `break` or `continue` that
    /// escapes to the top level is ignored, as Liquid does outside a
    /// loop.
    pub fn render_into(&self, out: &mut String, ctx: &mut RenderCtx) -> Result<(), Error> {
        let _ = self.root.render(out, ctx)?;
        Ok(())
    }
}
