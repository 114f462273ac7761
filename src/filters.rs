//! The filter registry and dispatcher.
//!
//! A filter is registered with its declared parameter kinds; dispatch
//! arity-checks the call, coerces each evaluated argument to its
//! declared kind, and invokes the body.  The `Closure` parameter kind
//! is the subtle one: the evaluated argument (a string such as
//! `"weight"`) is re-parsed as an expression and handed to the filter
//! as a callable it can apply per element, which is how `sort`, `map`,
//! and `where` address fields of their inputs.

use crate::context::RenderCtx;
use crate::error::{Error, SourceInfo};
use crate::eval::eval;
use crate::expression::{parse_expression, Expr};
use crate::value::Value;

/// Declared coercion for one filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Pass the evaluated value through unchanged.
    Value,
    /// Lenient integer coercion; unparseable values become 0.
    Integer,
    /// Lenient float coercion.
    Float,
    /// The value's rendered string form.
    Str,
    /// Wrap a non-list into a singleton list; nil becomes empty.
    List,
    /// Re-parse the evaluated string as an expression bound to the
    /// render environment.
    Closure,
}

/// An argument as the filter body receives it, after coercion.
pub enum FilterArg {
    Value(Value),
    Closure(ExprClosure),
}

impl FilterArg {
    /// The plain value, nil for closures.
    pub fn into_value(self) -> Value {
        match self {
            FilterArg::Value(v) => v,
            FilterArg::Closure(_) => Value::Nil,
        }
    }

    pub fn as_closure(&self) -> Option<&ExprClosure> {
        match self {
            FilterArg::Closure(c) => Some(c),
            FilterArg::Value(_) => None,
        }
    }
}

/// A re-parsed filter argument the filter applies per element.  When
/// the element is a map, its entries become the innermost bindings, so
/// the expression `weight` reads the element's `weight` field.
pub struct ExprClosure {
    expr: Expr,
}

impl ExprClosure {
    pub fn apply(&self, element: &Value, ctx: &mut RenderCtx) -> Result<Value, Error> {
        ctx.env.push();
        if let Value::Map(entries) = element {
            for (key, value) in entries {
                ctx.env.set_local(key.clone(), value.clone());
            }
        }
        let result = eval(&self.expr, ctx);
        ctx.env.pop();
        result
    }
}

pub type FilterBody =
    dyn Fn(&mut RenderCtx<'_>, Value, Vec<FilterArg>) -> Result<Value, Error> + Send + Sync;

/// A registered filter: its parameter signature and body.  The input
/// value is not part of the signature; it is always first and always
/// passed through as-is.
pub struct Filter {
    required: Vec<ParamKind>,
    optional: Vec<ParamKind>,
    body: Box<FilterBody>,
}

impl Filter {
    pub fn new<F>(body: F) -> Filter
    where
        F: Fn(&mut RenderCtx<'_>, Value, Vec<FilterArg>) -> Result<Value, Error>
            + Send
            + Sync
            + 'static,
    {
        Filter {
            required: Vec::new(),
            optional: Vec::new(),
            body: Box::new(body),
        }
    }

    pub fn required(mut self, kinds: &[ParamKind]) -> Filter {
        self.required = kinds.to_vec();
        self
    }

    pub fn optional(mut self, kinds: &[ParamKind]) -> Filter {
        self.optional = kinds.to_vec();
        self
    }
}

/// Dispatch one filter application with already-evaluated arguments.
pub fn apply(
    name: &str,
    input: Value,
    args: Vec<Value>,
    ctx: &mut RenderCtx,
) -> Result<Value, Error> {
    let filter = match ctx.config().filter(name) {
        Some(filter) => filter.clone(),
        None => return Err(Error::undefined_filter(name)),
    };
    let min = filter.required.len();
    let max = min + filter.optional.len();
    if args.len() < min || args.len() > max {
        return Err(Error::FilterArity {
            name: name.to_string(),
            expected: if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            },
            actual: args.len(),
            info: SourceInfo::unlocated(),
        });
    }
    let kinds = filter.required.iter().chain(filter.optional.iter());
    let mut coerced = Vec::with_capacity(args.len());
    for (kind, arg) in kinds.zip(args) {
        coerced.push(coerce(*kind, arg)?);
    }
    (filter.body)(ctx, input, coerced)
}

fn coerce(kind: ParamKind, value: Value) -> Result<FilterArg, Error> {
    Ok(match kind {
        ParamKind::Value => FilterArg::Value(value),
        ParamKind::Integer => FilterArg::Value(Value::Int(value.to_int_lenient())),
        ParamKind::Float => FilterArg::Value(Value::Float(value.to_num_lenient().as_f64())),
        ParamKind::Str => FilterArg::Value(Value::Str(value.to_string())),
        ParamKind::List => FilterArg::Value(match value {
            list @ Value::List(_) => list,
            Value::Nil => Value::List(vec![]),
            other => Value::List(vec![other]),
        }),
        ParamKind::Closure => {
            let source = value.to_string();
            let expr = parse_expression(&source, &SourceInfo::unlocated()).map_err(|_| {
                Error::interpreter(format!("{:?} is not a valid filter expression", source))
            })?;
            FilterArg::Closure(ExprClosure { expr })
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use indexmap::IndexMap;

    fn ctx(config: &Config) -> RenderCtx {
        RenderCtx::new(config, IndexMap::new())
    }

    fn shout_config() -> Config {
        let mut config = Config::bare();
        config.add_filter(
            "shout",
            Filter::new(|_, input, args| {
                let suffix = args
                    .into_iter()
                    .next()
                    .map(FilterArg::into_value)
                    .unwrap_or_else(|| Value::Str("!".into()));
                Ok(Value::Str(format!(
                    "{}{}",
                    input.to_string().to_uppercase(),
                    suffix
                )))
            })
            .optional(&[ParamKind::Str]),
        );
        config
    }

    #[test]
    fn dispatch_with_optional_argument() {
        let config = shout_config();
        let mut ctx = ctx(&config);
        let out = apply("shout", Value::Str("hi".into()), vec![], &mut ctx);
        assert_eq!(out.ok(), Some(Value::Str("HI!".into())));
        let out = apply(
            "shout",
            Value::Str("hi".into()),
            vec![Value::Str("?".into())],
            &mut ctx,
        );
        assert_eq!(out.ok(), Some(Value::Str("HI?".into())));
    }

    #[test]
    fn unknown_filter() {
        let config = Config::bare();
        let mut ctx = ctx(&config);
        match apply("nope", Value::Nil, vec![], &mut ctx) {
            Err(Error::UndefinedFilter { name, .. }) => assert_eq!(name, "nope"),
            other => panic!("unexpected {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn arity_is_enforced() {
        let config = shout_config();
        let mut ctx = ctx(&config);
        let too_many = vec![Value::Int(1), Value::Int(2)];
        match apply("shout", Value::Nil, too_many, &mut ctx) {
            Err(Error::FilterArity {
                expected, actual, ..
            }) => {
                assert_eq!(expected, "0 to 1");
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn closure_argument_reads_element_fields() {
        let mut config = Config::bare();
        config.add_filter(
            "key_of_first",
            Filter::new(|ctx, input, args| {
                let closure = match args.first().and_then(FilterArg::as_closure) {
                    Some(c) => c,
                    None => return Ok(Value::Nil),
                };
                match input {
                    Value::List(items) => match items.first() {
                        Some(item) => closure.apply(item, ctx),
                        None => Ok(Value::Nil),
                    },
                    _ => Ok(Value::Nil),
                }
            })
            .required(&[ParamKind::Closure]),
        );
        let mut ctx = ctx(&config);
        let mut item = IndexMap::new();
        item.insert("weight".to_string(), Value::Int(7));
        let input = Value::List(vec![Value::Map(item)]);
        let out = apply(
            "key_of_first",
            input,
            vec![Value::Str("weight".into())],
            &mut ctx,
        );
        assert_eq!(out.ok(), Some(Value::Int(7)));
    }
}
