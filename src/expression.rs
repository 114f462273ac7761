//! The expression sub-language that appears inside `{{ … }}` objects
//! and tag arguments: literals, variable paths, comparisons, boolean
//! logic, ranges, and filter chains.
//!
//! The grammar is layered by precedence, loosest first: filter chain,
//! `or`, `and`, comparison (non-associative), range, unary `not`/`-`,
//! then primaries with `.name` and `[expr]` postfixes.

use crate::error::{Error, SourceInfo};
use crate::lexemes::{identifier, keyword, number, string_literal, ws};
use crate::parseresult::{to_parse_error, PResult};
use crate::value::Value;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map, opt, value};
use nom::error::context;
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::Finish;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
    Filter {
        input: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

/// Parse a complete expression, consuming all of `source`.  `info` is
/// the location of the start of `source` within its template, used to
/// locate errors.
pub fn parse_expression(source: &str, info: &SourceInfo) -> Result<Expr, Error> {
    run_parser(expression, source, info)
}

/// Run any expression-level parser over a complete source fragment,
/// converting leftovers and nom errors into crate errors.  Tag
/// argument grammars go through here too.
pub fn run_parser<'a, O, P>(parser: P, source: &'a str, info: &SourceInfo) -> Result<O, Error>
where
    P: FnMut(&'a str) -> PResult<'a, O>,
{
    match all_consuming(delimited(multispace0, parser, multispace0))(source).finish() {
        Ok((_, parsed)) => Ok(parsed),
        Err(e) => Err(to_parse_error(source, &e, info)),
    }
}

pub fn expression(input: &str) -> PResult<Expr> {
    filter_chain(input)
}

fn filter_chain(input: &str) -> PResult<Expr> {
    let (input, first) = or_expr(input)?;
    let (input, filters) = many0(preceded(ws(char('|')), filter_call))(input)?;
    let chained = filters.into_iter().fold(first, |acc, (name, args)| {
        Expr::Filter {
            input: Box::new(acc),
            name,
            args,
        }
    });
    Ok((input, chained))
}

/// One link of a filter chain: a name, optionally followed by `:` and
/// comma-separated arguments.
fn filter_call(input: &str) -> PResult<(String, Vec<Expr>)> {
    pair(
        map(context("expected filter name", identifier), String::from),
        map(
            opt(preceded(
                ws(char(':')),
                separated_list1(
                    ws(char(',')),
                    context("expected filter argument", comparison),
                ),
            )),
            Option::unwrap_or_default,
        ),
    )(input)
}

fn or_expr(input: &str) -> PResult<Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(ws(keyword("or")), and_expr))(input)?;
    Ok((input, fold_binary(BinaryOp::Or, first, rest)))
}

fn and_expr(input: &str) -> PResult<Expr> {
    let (input, first) = comparison(input)?;
    let (input, rest) = many0(preceded(ws(keyword("and")), comparison))(input)?;
    Ok((input, fold_binary(BinaryOp::And, first, rest)))
}

fn fold_binary(op: BinaryOp, first: Expr, rest: Vec<Expr>) -> Expr {
    rest.into_iter()
        .fold(first, |a, b| Expr::Binary(op, Box::new(a), Box::new(b)))
}

/// Comparison is non-associative: at most one operator.
pub fn comparison(input: &str) -> PResult<Expr> {
    let (input, lhs) = range_expr(input)?;
    let (input, rhs) = opt(pair(
        ws(comparison_op),
        context("expected right-hand operand", range_expr),
    ))(input)?;
    Ok((input, match rhs {
        Some((op, rhs)) => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
        None => lhs,
    }))
}

fn comparison_op(input: &str) -> PResult<BinaryOp> {
    alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Ne, tag("<>")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
        value(BinaryOp::Contains, keyword("contains")),
    ))(input)
}

fn range_expr(input: &str) -> PResult<Expr> {
    let (input, start) = unary(input)?;
    let (input, end) = opt(preceded(
        ws(tag("..")),
        context("expected range end", unary),
    ))(input)?;
    Ok((input, match end {
        Some(end) => Expr::Range(Box::new(start), Box::new(end)),
        None => start,
    }))
}

fn unary(input: &str) -> PResult<Expr> {
    alt((
        map(
            preceded(terminated(keyword("not"), multispace0), unary),
            |e| Expr::Unary(UnaryOp::Not, Box::new(e)),
        ),
        map(preceded(char('-'), unary), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        postfix,
    ))(input)
}

enum Post {
    Prop(String),
    Index(Expr),
}

fn postfix(input: &str) -> PResult<Expr> {
    let (input, base) = primary(input)?;
    let (input, posts) = many0(alt((
        map(
            preceded(char('.'), context("expected property name", identifier)),
            |name| Post::Prop(name.to_string()),
        ),
        map(
            delimited(
                char('['),
                ws(expression),
                context("expected \"]\"", char(']')),
            ),
            Post::Index,
        ),
    )))(input)?;
    let path = posts.into_iter().fold(base, |acc, post| match post {
        Post::Prop(name) => Expr::Property(Box::new(acc), name),
        Post::Index(index) => Expr::Index(Box::new(acc), Box::new(index)),
    });
    Ok((input, path))
}

fn primary(input: &str) -> PResult<Expr> {
    alt((
        map(number, Expr::Literal),
        map(string_literal, |s| Expr::Literal(Value::Str(s))),
        value(Expr::Literal(Value::Bool(true)), keyword("true")),
        value(Expr::Literal(Value::Bool(false)), keyword("false")),
        value(Expr::Literal(Value::Nil), keyword("nil")),
        value(Expr::Literal(Value::Nil), keyword("null")),
        value(Expr::Literal(Value::Empty), keyword("empty")),
        value(Expr::Literal(Value::Blank), keyword("blank")),
        map(identifier, |name| Expr::Var(name.to_string())),
        delimited(
            terminated(char('('), multispace0),
            context("expected expression", expression),
            preceded(multispace0, context("expected \")\"", char(')'))),
        ),
    ))(input)
}
