//! The standard Liquid tags and block tags: control flow (`if`,
//! `unless`, `case`, `for`, `break`, `continue`), mutation (`assign`,
//! `capture`, `increment`, `decrement`), `include`, and `comment`.
//!
//! Arguments are parsed once, at template-parse time, into closures
//! the renderer calls directly.

use crate::config::Config;
use crate::context::RenderCtx;
use crate::error::{Error, SourceInfo};
use crate::eval::eval;
use crate::expression::{comparison, expression, parse_expression, run_parser, Expr, UnaryOp};
use crate::lexemes::{identifier, keyword, ws};
use crate::parseresult::PResult;
use crate::render::Flow;
use crate::template::{block_render, tag_render, Block, BlockDef, Seq, TagDef, Template};
use crate::value::Value;
use indexmap::IndexMap;
use nom::branch::alt;
use nom::character::complete::char;
use nom::combinator::{map, opt, value};
use nom::error::context;
use nom::multi::{many0, separated_list1};
use nom::sequence::{pair, preceded, separated_pair};
use std::rc::Rc;
use std::sync::Arc;

pub fn standard_tags() -> Vec<(String, TagDef)> {
    vec![
        ("assign".to_string(), assign_tag()),
        ("increment".to_string(), increment_tag()),
        ("decrement".to_string(), decrement_tag()),
        ("break".to_string(), flow_tag(Flow::Break)),
        ("continue".to_string(), flow_tag(Flow::Continue)),
        ("include".to_string(), include_tag()),
    ]
}

pub fn standard_blocks() -> Vec<(String, BlockDef)> {
    vec![
        ("if".to_string(), conditional_block("endif", false)),
        ("unless".to_string(), conditional_block("endunless", true)),
        ("case".to_string(), case_block()),
        ("for".to_string(), for_block()),
        ("capture".to_string(), capture_block()),
        ("comment".to_string(), comment_block()),
    ]
}

// ---------------------------------------------------------------- tags

fn assign_tag() -> TagDef {
    TagDef {
        compile: Arc::new(|args, info, _config| {
            let (target, source) = run_parser(assign_args, args, info)?;
            Ok(tag_render(move |_out, ctx| {
                let bound = eval(&source, ctx)?;
                ctx.env.set_root(target.clone(), bound);
                Ok(Flow::Done)
            }))
        }),
    }
}

fn assign_args(input: &str) -> PResult<(String, Expr)> {
    separated_pair(
        map(context("expected variable name", identifier), String::from),
        ws(context("expected \"=\"", char('='))),
        context("expected expression", expression),
    )(input)
}

fn increment_tag() -> TagDef {
    TagDef {
        compile: Arc::new(|args, info, _config| {
            let target = counter_name(args, info)?;
            Ok(tag_render(move |out, ctx| {
                let current = ctx.increment(&target);
                out.push_str(&current.to_string());
                Ok(Flow::Done)
            }))
        }),
    }
}

fn decrement_tag() -> TagDef {
    TagDef {
        compile: Arc::new(|args, info, _config| {
            let target = counter_name(args, info)?;
            Ok(tag_render(move |out, ctx| {
                let current = ctx.decrement(&target);
                out.push_str(&current.to_string());
                Ok(Flow::Done)
            }))
        }),
    }
}

fn counter_name(args: &str, info: &SourceInfo) -> Result<String, Error> {
    run_parser(
        map(context("expected counter name", identifier), String::from),
        args,
        info,
    )
}

fn flow_tag(flow: Flow) -> TagDef {
    TagDef {
        compile: Arc::new(move |_args, _info, _config| {
            Ok(tag_render(move |_out, _ctx| Ok(flow)))
        }),
    }
}

// ------------------------------------------------------------- include

struct IncludeArgs {
    name: Expr,
    with: Option<Expr>,
    iter: Option<Expr>,
    bindings: Vec<(String, Expr)>,
}

fn include_tag() -> TagDef {
    TagDef {
        compile: Arc::new(|args, info, _config| {
            let parsed = run_parser(include_args, args, info)?;
            Ok(tag_render(move |out, ctx| {
                render_include(&parsed, out, ctx)?;
                Ok(Flow::Done)
            }))
        }),
    }
}

fn include_args(input: &str) -> PResult<IncludeArgs> {
    let (input, name) = context("expected template name", comparison)(input)?;
    let (input, with) = opt(preceded(ws(keyword("with")), comparison))(input)?;
    let (input, iter) = if with.is_some() {
        (input, None)
    } else {
        opt(preceded(ws(keyword("for")), comparison))(input)?
    };
    let (input, bindings) = many0(preceded(
        opt(ws(char(','))),
        separated_pair(
            map(ws(identifier), String::from),
            char(':'),
            ws(comparison),
        ),
    ))(input)?;
    Ok((
        input,
        IncludeArgs {
            name,
            with,
            iter,
            bindings,
        },
    ))
}

fn render_include(args: &IncludeArgs, out: &mut String, ctx: &mut RenderCtx) -> Result<(), Error> {
    let logical = eval(&args.name, ctx)?.to_string();
    tracing::trace!(template = %logical, "resolving include");
    let resolver = match &ctx.config().resolver {
        Some(resolver) => resolver.clone(),
        None => {
            return Err(Error::interpreter(format!(
                "cannot include {:?}: no include resolver configured",
                logical
            )))
        }
    };
    let fetched = resolver.resolve(&logical)?;
    let template = match ctx.cached_include(&fetched.path) {
        Some(template) => template,
        None => {
            let parsed = crate::template::parse(&fetched.source, &fetched.path, ctx.config())
                .map_err(|e| Error::Include {
                    source: Box::new(e),
                    info: SourceInfo::unlocated(),
                })?;
            let parsed = Rc::new(parsed);
            ctx.cache_include(fetched.path.clone(), parsed.clone());
            parsed
        }
    };

    let items = match &args.iter {
        Some(source) => Some(match eval(source, ctx)? {
            Value::List(items) => items,
            Value::Nil => Vec::new(),
            single => vec![single],
        }),
        None => None,
    };
    let with = match &args.with {
        Some(source) => Some(eval(source, ctx)?),
        None => None,
    };
    let mut bound = Vec::with_capacity(args.bindings.len());
    for (name, source) in &args.bindings {
        bound.push((name.clone(), eval(source, ctx)?));
    }

    ctx.enter_include()?;
    let var = binding_name(&logical);
    let result = match items {
        Some(items) => {
            let mut result = Ok(());
            for item in items {
                result = render_included_once(&template, &var, &bound, Some(item), out, ctx);
                if result.is_err() {
                    break;
                }
            }
            result
        }
        None => render_included_once(&template, &var, &bound, with, out, ctx),
    };
    ctx.leave_include();
    result
}

fn render_included_once(
    template: &Template,
    var: &str,
    bound: &[(String, Value)],
    item: Option<Value>,
    out: &mut String,
    ctx: &mut RenderCtx,
) -> Result<(), Error> {
    ctx.env.push();
    for (name, value) in bound {
        ctx.env.set_local(name.clone(), value.clone());
    }
    if let Some(item) = item {
        ctx.env.set_local(var.to_string(), item);
    }
    let result = template.render_into(out, ctx);
    ctx.env.pop();
    result.map_err(|e| match e {
        wrapped @ Error::Include { .. } => wrapped,
        other => Error::Include {
            source: Box::new(other),
            info: SourceInfo::unlocated(),
        },
    })
}

/// The variable an include binds its `with`/`for` value to: the
/// template's base name without directory or extension.
fn binding_name(logical: &str) -> String {
    let base = logical.rsplit('/').next().unwrap_or(logical);
    base.split('.').next().unwrap_or(base).to_string()
}

// ------------------------------------------------------------- blocks

fn conditional_block(terminator: &str, invert_opener: bool) -> BlockDef {
    BlockDef {
        terminator: terminator.to_string(),
        intermediates: vec!["elsif".to_string(), "else".to_string()],
        compile: Arc::new(move |block: Block, _config: &Config| {
            let mut arms: Vec<(Option<Expr>, Seq)> = Vec::new();
            for (index, clause) in block.clauses.into_iter().enumerate() {
                let condition = if clause.tag == "else" {
                    None
                } else {
                    let mut condition = parse_expression(&clause.args, &clause.info)?;
                    if invert_opener && index == 0 {
                        condition = Expr::Unary(UnaryOp::Not, Box::new(condition));
                    }
                    Some(condition)
                };
                arms.push((condition, clause.body));
            }
            Ok(block_render(move |out, ctx| {
                for (condition, body) in &arms {
                    let selected = match condition {
                        None => true,
                        Some(condition) => eval(condition, ctx)?.is_truthy(),
                    };
                    if selected {
                        return body.render(out, ctx);
                    }
                }
                Ok(Flow::Done)
            }))
        }),
    }
}

fn case_block() -> BlockDef {
    BlockDef {
        terminator: "endcase".to_string(),
        intermediates: vec!["when".to_string(), "else".to_string()],
        compile: Arc::new(|block: Block, _config: &Config| {
            let mut clauses = block.clauses.into_iter();
            let opener = match clauses.next() {
                Some(clause) => clause,
                None => return Err(Error::interpreter("case block without opener")),
            };
            // Text between `case` and the first `when` is discarded.
            let discriminant = parse_expression(&opener.args, &opener.info)?;
            let mut arms: Vec<(Option<Vec<Expr>>, Seq)> = Vec::new();
            for clause in clauses {
                if clause.tag == "else" {
                    arms.push((None, clause.body));
                } else {
                    let values = run_parser(when_values, &clause.args, &clause.info)?;
                    arms.push((Some(values), clause.body));
                }
            }
            Ok(block_render(move |out, ctx| {
                let subject = eval(&discriminant, ctx)?;
                for (values, body) in &arms {
                    let selected = match values {
                        None => true,
                        Some(values) => {
                            let mut hit = false;
                            for candidate in values {
                                if eval(candidate, ctx)? == subject {
                                    hit = true;
                                    break;
                                }
                            }
                            hit
                        }
                    };
                    if selected {
                        return body.render(out, ctx);
                    }
                }
                Ok(Flow::Done)
            }))
        }),
    }
}

/// `when` accepts several values separated by `,` or `or`.
fn when_values(input: &str) -> PResult<Vec<Expr>> {
    separated_list1(
        alt((value((), ws(char(','))), value((), ws(keyword("or"))))),
        context("expected value", comparison),
    )(input)
}

#[derive(Debug)]
struct ForArgs {
    var: String,
    source: Expr,
    limit: Option<Expr>,
    offset: Option<Expr>,
    reversed: bool,
}

#[derive(Clone)]
enum ForMod {
    Limit(Expr),
    Offset(Expr),
    Reversed,
}

fn for_block() -> BlockDef {
    BlockDef {
        terminator: "endfor".to_string(),
        intermediates: vec!["else".to_string()],
        compile: Arc::new(|block: Block, _config: &Config| {
            let mut clauses = block.clauses.into_iter();
            let opener = match clauses.next() {
                Some(clause) => clause,
                None => return Err(Error::interpreter("for block without opener")),
            };
            let args = run_parser(for_args, &opener.args, &opener.info)?;
            let body = opener.body;
            let mut when_empty: Option<Seq> = None;
            for clause in clauses {
                when_empty = Some(clause.body);
            }
            Ok(block_render(move |out, ctx| {
                render_for(&args, &body, when_empty.as_ref(), out, ctx)
            }))
        }),
    }
}

fn for_args(input: &str) -> PResult<ForArgs> {
    let (input, var) = context("expected loop variable", identifier)(input)?;
    let (input, _) = ws(context("expected \"in\"", keyword("in")))(input)?;
    let (input, source) = context("expected iterable expression", expression)(input)?;
    let (input, modifiers) = many0(ws(for_modifier))(input)?;
    let mut args = ForArgs {
        var: var.to_string(),
        source,
        limit: None,
        offset: None,
        reversed: false,
    };
    for modifier in modifiers {
        match modifier {
            ForMod::Limit(e) => args.limit = Some(e),
            ForMod::Offset(e) => args.offset = Some(e),
            ForMod::Reversed => args.reversed = true,
        }
    }
    Ok((input, args))
}

fn for_modifier(input: &str) -> PResult<ForMod> {
    alt((
        map(
            preceded(
                pair(keyword("limit"), ws(char(':'))),
                context("expected limit value", comparison),
            ),
            ForMod::Limit,
        ),
        map(
            preceded(
                pair(keyword("offset"), ws(char(':'))),
                context("expected offset value", comparison),
            ),
            ForMod::Offset,
        ),
        value(ForMod::Reversed, keyword("reversed")),
    ))(input)
}

fn render_for(
    args: &ForArgs,
    body: &Seq,
    when_empty: Option<&Seq>,
    out: &mut String,
    ctx: &mut RenderCtx,
) -> Result<Flow, Error> {
    let source = eval(&args.source, ctx)?;
    let mut items: Vec<Value> = match source {
        Value::List(items) => items,
        // Iterating a map yields [key, value] pairs in insertion order.
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
            .collect(),
        Value::Nil => Vec::new(),
        single => vec![single],
    };
    if let Some(offset) = &args.offset {
        let n = eval(offset, ctx)?.to_int_lenient().max(0) as usize;
        items = items.split_off(n.min(items.len()));
    }
    if let Some(limit) = &args.limit {
        let n = eval(limit, ctx)?.to_int_lenient().max(0) as usize;
        items.truncate(n);
    }
    if args.reversed {
        items.reverse();
    }
    if items.is_empty() {
        return match when_empty {
            Some(body) => body.render(out, ctx),
            None => Ok(Flow::Done),
        };
    }
    let length = items.len();
    ctx.env.push();
    for (index, item) in items.into_iter().enumerate() {
        ctx.env.set_local(args.var.clone(), item);
        ctx.env.set_local("forloop", forloop_object(index, length));
        match body.render(out, ctx) {
            Ok(Flow::Done) | Ok(Flow::Continue) => (),
            Ok(Flow::Break) => break,
            Err(e) => {
                ctx.env.pop();
                return Err(e);
            }
        }
    }
    ctx.env.pop();
    Ok(Flow::Done)
}

fn forloop_object(index: usize, length: usize) -> Value {
    let mut fields = IndexMap::new();
    fields.insert("index".to_string(), Value::Int(index as i64 + 1));
    fields.insert("index0".to_string(), Value::Int(index as i64));
    fields.insert("first".to_string(), Value::Bool(index == 0));
    fields.insert("last".to_string(), Value::Bool(index + 1 == length));
    fields.insert("length".to_string(), Value::Int(length as i64));
    fields.insert("rindex".to_string(), Value::Int((length - index) as i64));
    fields.insert("rindex0".to_string(), Value::Int((length - index - 1) as i64));
    Value::Map(fields)
}

fn capture_block() -> BlockDef {
    BlockDef {
        terminator: "endcapture".to_string(),
        intermediates: vec![],
        compile: Arc::new(|block: Block, _config: &Config| {
            let mut clauses = block.clauses.into_iter();
            let opener = match clauses.next() {
                Some(clause) => clause,
                None => return Err(Error::interpreter("capture block without opener")),
            };
            let target = run_parser(
                map(context("expected variable name", identifier), String::from),
                &opener.args,
                &opener.info,
            )?;
            let body = opener.body;
            Ok(block_render(move |_out, ctx| {
                let mut captured = String::new();
                let flow = body.render(&mut captured, ctx)?;
                ctx.env.set_root(target.clone(), Value::Str(captured));
                Ok(flow)
            }))
        }),
    }
}

fn comment_block() -> BlockDef {
    BlockDef {
        terminator: "endcomment".to_string(),
        intermediates: vec![],
        compile: Arc::new(|_block: Block, _config: &Config| {
            Ok(block_render(|_out, _ctx| Ok(Flow::Done)))
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_for(source: &str) -> ForArgs {
        match run_parser(for_args, source, &SourceInfo::new("t.liquid", 1, 1)) {
            Ok(args) => args,
            Err(e) => panic!("parse of {:?} failed: {}", source, e),
        }
    }

    #[test]
    fn for_args_plain() {
        let args = parse_for("x in xs");
        assert_eq!(args.var, "x");
        assert!(args.limit.is_none() && args.offset.is_none() && !args.reversed);
    }

    #[test]
    fn for_args_modifiers_any_order() {
        let args = parse_for("p in pages reversed offset: 2 limit: n");
        assert!(args.reversed);
        assert!(args.limit.is_some());
        assert!(args.offset.is_some());
    }

    #[test]
    fn for_args_range_source() {
        let args = parse_for("i in (1..3) limit: 2");
        assert!(matches!(args.source, Expr::Range(_, _)));
    }

    #[test]
    fn for_args_missing_in() {
        let e = run_parser(for_args, "x over xs", &SourceInfo::new("t.liquid", 1, 1))
            .unwrap_err();
        assert!(e.to_string().contains("expected \"in\""), "{}", e);
    }

    #[test]
    fn include_args_forms() {
        let info = SourceInfo::new("t.liquid", 1, 1);
        let args = run_parser(include_args, "'card'", &info).unwrap();
        assert!(args.with.is_none() && args.iter.is_none() && args.bindings.is_empty());
        let args = run_parser(include_args, "'card' with user", &info).unwrap();
        assert!(args.with.is_some());
        let args = run_parser(include_args, "'card' for users", &info).unwrap();
        assert!(args.iter.is_some());
        let args = run_parser(include_args, "'card', title: 'Hi', width: 3", &info).unwrap();
        assert_eq!(args.bindings.len(), 2);
        assert_eq!(args.bindings[0].0, "title");
    }

    #[test]
    fn binding_names() {
        assert_eq!(binding_name("card"), "card");
        assert_eq!(binding_name("shared/card.liquid"), "card");
    }

    #[test]
    fn when_value_lists() {
        let info = SourceInfo::new("t.liquid", 1, 1);
        assert_eq!(run_parser(when_values, "1", &info).unwrap().len(), 1);
        assert_eq!(run_parser(when_values, "1, 2 or 3", &info).unwrap().len(), 3);
    }
}
