//! The expression evaluator: a pure recursive walk over the expression
//! AST against the render context.  `and`/`or` short-circuit, ranges
//! materialize eagerly, and property access never fails.

use crate::context::RenderCtx;
use crate::error::Error;
use crate::expression::{BinaryOp, Expr, UnaryOp};
use crate::filters;
use crate::value::{Num, Value};

pub fn eval(expr: &Expr, ctx: &mut RenderCtx) -> Result<Value, Error> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => Ok(ctx.env.lookup(name).cloned().unwrap_or(Value::Nil)),
        Expr::Property(base, key) => Ok(eval(base, ctx)?.property(key)),
        Expr::Index(base, index) => {
            let base = eval(base, ctx)?;
            let index = eval(index, ctx)?;
            Ok(base.index(&index))
        }
        Expr::Unary(op, operand) => {
            let operand = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                UnaryOp::Neg => match operand.as_num() {
                    Some(Num::Int(n)) => Ok(Value::Int(-n)),
                    Some(Num::Float(f)) => Ok(Value::Float(-f)),
                    None => Err(Error::interpreter(format!(
                        "cannot negate a {}",
                        operand.type_name()
                    ))),
                },
            }
        }
        Expr::Binary(op, left, right) => eval_binary(*op, left, right, ctx),
        Expr::Range(start, end) => {
            let start = eval(start, ctx)?.to_int_lenient();
            let end = eval(end, ctx)?.to_int_lenient();
            let items = if start <= end {
                (start..=end).map(Value::Int).collect()
            } else {
                Vec::new()
            };
            Ok(Value::List(items))
        }
        Expr::Filter { input, name, args } => {
            let input = eval(input, ctx)?;
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval(arg, ctx)?);
            }
            filters::apply(name, input, evaluated, ctx)
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &mut RenderCtx,
) -> Result<Value, Error> {
    // Short-circuit the logical operators before touching the right side.
    match op {
        BinaryOp::And => {
            let left = eval(left, ctx)?;
            return if left.is_truthy() {
                Ok(Value::Bool(eval(right, ctx)?.is_truthy()))
            } else {
                Ok(Value::Bool(false))
            };
        }
        BinaryOp::Or => {
            let left = eval(left, ctx)?;
            return if left.is_truthy() {
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(eval(right, ctx)?.is_truthy()))
            };
        }
        _ => (),
    }
    let left = eval(left, ctx)?;
    let right = eval(right, ctx)?;
    let result = match op {
        BinaryOp::Eq => left == right,
        BinaryOp::Ne => left != right,
        BinaryOp::Lt => left.compare(&right) == Some(std::cmp::Ordering::Less),
        BinaryOp::Le => matches!(
            left.compare(&right),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ),
        BinaryOp::Gt => left.compare(&right) == Some(std::cmp::Ordering::Greater),
        BinaryOp::Ge => matches!(
            left.compare(&right),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ),
        BinaryOp::Contains => left.contains(&right),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::error::SourceInfo;
    use crate::expression::parse_expression;
    use indexmap::IndexMap;

    fn eval_str(source: &str, bindings: IndexMap<String, Value>) -> Result<Value, Error> {
        let config = Config::bare();
        let mut ctx = RenderCtx::new(&config, bindings);
        let expr = parse_expression(source, &SourceInfo::new("test.liquid", 1, 1))?;
        eval(&expr, &mut ctx)
    }

    fn ok(source: &str) -> Value {
        match eval_str(source, IndexMap::new()) {
            Ok(v) => v,
            Err(e) => panic!("eval of {:?} failed: {}", source, e),
        }
    }

    #[test]
    fn missing_variables_are_nil() {
        assert_eq!(ok("missing"), Value::Nil);
        assert_eq!(ok("a.b.c.d"), Value::Nil);
    }

    #[test]
    fn short_circuit() {
        // The right side would be a filter error if evaluated.
        assert_eq!(ok("false and (1 | nope)"), Value::Bool(false));
        assert_eq!(ok("true or (1 | nope)"), Value::Bool(true));
    }

    #[test]
    fn comparisons() {
        assert_eq!(ok("1 < 2"), Value::Bool(true));
        assert_eq!(ok("2 <= 2"), Value::Bool(true));
        assert_eq!(ok("1 == 1.0"), Value::Bool(true));
        assert_eq!(ok("'a' < 'b'"), Value::Bool(true));
        // Mixed types compare false, never error.
        assert_eq!(ok("1 < 'x'"), Value::Bool(false));
        assert_eq!(ok("1 > 'x'"), Value::Bool(false));
    }

    #[test]
    fn ranges_are_inclusive() {
        assert_eq!(
            ok("(1..3)"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(ok("(3..1)"), Value::List(vec![]));
    }

    #[test]
    fn negation() {
        assert_eq!(ok("-4"), Value::Int(-4));
        assert_eq!(ok("not nil"), Value::Bool(true));
        assert!(eval_str("-'x'", IndexMap::new()).is_err());
    }

    #[test]
    fn index_and_property() {
        let mut bindings = IndexMap::new();
        bindings.insert(
            "xs".to_string(),
            Value::List(vec![Value::Int(10), Value::Int(20)]),
        );
        let config = Config::bare();
        let mut ctx = RenderCtx::new(&config, bindings);
        let expr =
            parse_expression("xs[1]", &SourceInfo::new("test.liquid", 1, 1)).unwrap();
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(20));
        let expr =
            parse_expression("xs.size", &SourceInfo::new("test.liquid", 1, 1)).unwrap();
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(2));
    }
}
