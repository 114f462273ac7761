//! The standard filter collection: string, list, and numeric filters,
//! plus `default` and `date`.
//!
//! Everything registers through the same dispatcher as host-defined
//! filters; nothing here is special-cased.  `sort`, `sort_natural`,
//! `map`, and `where` take expression-closure parameters.

use crate::error::Error;
use crate::filters::{Filter, FilterArg, ParamKind};
use crate::value::{Num, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use itertools::Itertools;
use std::cmp::Ordering;

pub fn standard_filters() -> Vec<(String, Filter)> {
    let mut filters: Vec<(String, Filter)> = Vec::new();
    let mut add = |name: &str, filter: Filter| filters.push((name.to_string(), filter));

    // -- string filters
    add("upcase", string_filter(|s| s.to_uppercase()));
    add("downcase", string_filter(|s| s.to_lowercase()));
    add("capitalize", string_filter(capitalize));
    add("strip", string_filter(|s| s.trim().to_string()));
    add("lstrip", string_filter(|s| s.trim_start().to_string()));
    add("rstrip", string_filter(|s| s.trim_end().to_string()));
    add(
        "strip_newlines",
        string_filter(|s| s.replace("\r\n", "").replace('\n', "")),
    );
    add(
        "newline_to_br",
        string_filter(|s| s.replace('\n', "<br />\n")),
    );
    add("escape", string_filter(escape));
    add(
        "append",
        Filter::new(|_, input, args| {
            Ok(Value::Str(format!("{}{}", input, first_string(args))))
        })
        .required(&[ParamKind::Str]),
    );
    add(
        "prepend",
        Filter::new(|_, input, args| {
            Ok(Value::Str(format!("{}{}", first_string(args), input)))
        })
        .required(&[ParamKind::Str]),
    );
    add(
        "replace",
        Filter::new(|_, input, args| {
            let (from, to) = two_strings(args);
            Ok(Value::Str(input.to_string().replace(&from, &to)))
        })
        .required(&[ParamKind::Str, ParamKind::Str]),
    );
    add(
        "replace_first",
        Filter::new(|_, input, args| {
            let (from, to) = two_strings(args);
            Ok(Value::Str(input.to_string().replacen(&from, &to, 1)))
        })
        .required(&[ParamKind::Str, ParamKind::Str]),
    );
    add(
        "remove",
        Filter::new(|_, input, args| {
            Ok(Value::Str(input.to_string().replace(&first_string(args), "")))
        })
        .required(&[ParamKind::Str]),
    );
    add(
        "remove_first",
        Filter::new(|_, input, args| {
            Ok(Value::Str(
                input.to_string().replacen(&first_string(args), "", 1),
            ))
        })
        .required(&[ParamKind::Str]),
    );
    add(
        "split",
        Filter::new(|_, input, args| {
            let text = input.to_string();
            let sep = first_string(args);
            let parts: Vec<Value> = if sep.is_empty() {
                text.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                text.split(&sep).map(Value::from).collect()
            };
            Ok(Value::List(parts))
        })
        .required(&[ParamKind::Str]),
    );
    add(
        "slice",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let start = next_int(&mut args, 0);
            let len = next_int(&mut args, 1);
            Ok(match input {
                Value::List(items) => {
                    let (from, to) = slice_bounds(start, len, items.len());
                    Value::List(items[from..to].to_vec())
                }
                other => {
                    let chars: Vec<char> = other.to_string().chars().collect();
                    let (from, to) = slice_bounds(start, len, chars.len());
                    Value::Str(chars[from..to].iter().collect())
                }
            })
        })
        .required(&[ParamKind::Integer])
        .optional(&[ParamKind::Integer]),
    );
    add(
        "truncate",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let max = next_int(&mut args, 0).max(0) as usize;
            let ellipsis = next_string(&mut args, "...");
            let text = input.to_string();
            let length = text.chars().count();
            if length <= max {
                return Ok(Value::Str(text));
            }
            let keep = max.saturating_sub(ellipsis.chars().count());
            let truncated: String = text.chars().take(keep).collect();
            Ok(Value::Str(truncated + &ellipsis))
        })
        .required(&[ParamKind::Integer])
        .optional(&[ParamKind::Str]),
    );
    add(
        "truncatewords",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let max = next_int(&mut args, 0).max(0) as usize;
            let ellipsis = next_string(&mut args, "...");
            let text = input.to_string();
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() <= max {
                return Ok(Value::Str(text));
            }
            Ok(Value::Str(words[..max].join(" ") + &ellipsis))
        })
        .required(&[ParamKind::Integer])
        .optional(&[ParamKind::Str]),
    );

    // -- list filters
    add(
        "size",
        Filter::new(|_, input, _| {
            Ok(match input.size() {
                Value::Nil => Value::Int(0),
                size => size,
            })
        }),
    );
    add(
        "first",
        Filter::new(|_, input, _| Ok(input.property("first"))),
    );
    add("last", Filter::new(|_, input, _| Ok(input.property("last"))));
    add(
        "join",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let sep = next_string(&mut args, ", ");
            Ok(Value::Str(
                as_list(input).iter().map(Value::to_string).join(&sep),
            ))
        })
        .optional(&[ParamKind::Str]),
    );
    add(
        "reverse",
        Filter::new(|_, input, _| {
            let mut items = as_list(input);
            items.reverse();
            Ok(Value::List(items))
        }),
    );
    add("sort", sort_filter(false));
    add("sort_natural", sort_filter(true));
    add(
        "uniq",
        Filter::new(|_, input, _| {
            let mut seen: Vec<Value> = Vec::new();
            for item in as_list(input) {
                if !seen.iter().any(|v| *v == item) {
                    seen.push(item);
                }
            }
            Ok(Value::List(seen))
        }),
    );
    add(
        "compact",
        Filter::new(|_, input, _| {
            let items = as_list(input)
                .into_iter()
                .filter(|v| *v != Value::Nil)
                .collect();
            Ok(Value::List(items))
        }),
    );
    add(
        "concat",
        Filter::new(|_, input, args| {
            let mut items = as_list(input);
            let mut args = args.into_iter();
            if let Some(arg) = args.next() {
                items.extend(as_list(arg.into_value()));
            }
            Ok(Value::List(items))
        })
        .required(&[ParamKind::List]),
    );
    add(
        "map",
        Filter::new(|ctx, input, args| {
            let closure = match args.first().and_then(FilterArg::as_closure) {
                Some(c) => c,
                None => return Ok(Value::Nil),
            };
            let mut mapped = Vec::new();
            for item in as_list(input) {
                mapped.push(closure.apply(&item, ctx)?);
            }
            Ok(Value::List(mapped))
        })
        .required(&[ParamKind::Closure]),
    );
    add(
        "where",
        Filter::new(|ctx, input, args| {
            let closure = match args.first().and_then(FilterArg::as_closure) {
                Some(c) => c,
                None => return Ok(Value::Nil),
            };
            let target = args.get(1).map(|a| match a {
                FilterArg::Value(v) => v.clone(),
                FilterArg::Closure(_) => Value::Nil,
            });
            let mut kept = Vec::new();
            for item in as_list(input) {
                let key = closure.apply(&item, ctx)?;
                let selected = match &target {
                    Some(target) => key == *target,
                    None => key.is_truthy(),
                };
                if selected {
                    kept.push(item);
                }
            }
            Ok(Value::List(kept))
        })
        .required(&[ParamKind::Closure])
        .optional(&[ParamKind::Value]),
    );

    // -- numeric filters
    add("plus", arithmetic(i64::checked_add, |a, b| a + b));
    add("minus", arithmetic(i64::checked_sub, |a, b| a - b));
    add("times", arithmetic(i64::checked_mul, |a, b| a * b));
    add(
        "divided_by",
        Filter::new(|_, input, args| {
            let a = input.to_num_lenient();
            let b = first_value(args).to_num_lenient();
            if b.as_f64() == 0.0 {
                return Err(Error::interpreter("division by zero"));
            }
            Ok(match (a, b) {
                (Num::Int(x), Num::Int(y)) => Value::Int(x / y),
                (x, y) => Value::Float(x.as_f64() / y.as_f64()),
            })
        })
        .required(&[ParamKind::Value]),
    );
    add(
        "modulo",
        Filter::new(|_, input, args| {
            let a = input.to_num_lenient();
            let b = first_value(args).to_num_lenient();
            if b.as_f64() == 0.0 {
                return Err(Error::interpreter("division by zero"));
            }
            Ok(match (a, b) {
                (Num::Int(x), Num::Int(y)) => Value::Int(x % y),
                (x, y) => Value::Float(x.as_f64() % y.as_f64()),
            })
        })
        .required(&[ParamKind::Value]),
    );
    add(
        "abs",
        Filter::new(|_, input, _| {
            Ok(match input.to_num_lenient() {
                Num::Int(n) => Value::Int(n.abs()),
                Num::Float(f) => Value::Float(f.abs()),
            })
        }),
    );
    add(
        "ceil",
        Filter::new(|_, input, _| Ok(Value::Int(input.to_num_lenient().as_f64().ceil() as i64))),
    );
    add(
        "floor",
        Filter::new(|_, input, _| Ok(Value::Int(input.to_num_lenient().as_f64().floor() as i64))),
    );
    add(
        "round",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let digits = next_int(&mut args, 0);
            let f = input.to_num_lenient().as_f64();
            Ok(if digits <= 0 {
                Value::Int(f.round() as i64)
            } else {
                let scale = 10f64.powi(digits as i32);
                Value::Float((f * scale).round() / scale)
            })
        })
        .optional(&[ParamKind::Integer]),
    );

    // -- everything else
    add(
        "default",
        Filter::new(|_, input, args| {
            Ok(if !input.is_truthy() || input.is_empty_value() {
                first_value(args)
            } else {
                input
            })
        })
        .required(&[ParamKind::Value]),
    );
    add(
        "date",
        Filter::new(|_, input, args| {
            let mut args = args.into_iter();
            let format = next_string(&mut args, "%a, %b %d, %y");
            let time = match parse_time(&input) {
                Some(time) => time,
                // Unparseable inputs pass through untouched.
                None => return Ok(input),
            };
            Ok(Value::Str(time.format(&format).to_string()))
        })
        .optional(&[ParamKind::Str]),
    );

    filters
}

fn string_filter<F>(f: F) -> Filter
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    Filter::new(move |_, input, _| Ok(Value::Str(f(&input.to_string()))))
}

fn arithmetic(int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> Filter {
    Filter::new(move |_, input, args| {
        let a = input.to_num_lenient();
        let b = first_value(args).to_num_lenient();
        Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => match int_op(x, y) {
                Some(n) => Value::Int(n),
                // Overflow promotes to float rather than wrapping.
                None => Value::Float(float_op(x as f64, y as f64)),
            },
            (x, y) => Value::Float(float_op(x.as_f64(), y.as_f64())),
        })
    })
    .required(&[ParamKind::Value])
}

fn sort_filter(natural: bool) -> Filter {
    Filter::new(move |ctx, input, args| {
        let items = as_list(input);
        let sorted = match args.first().and_then(FilterArg::as_closure) {
            Some(closure) => {
                let mut keyed = Vec::with_capacity(items.len());
                for item in items {
                    keyed.push((closure.apply(&item, ctx)?, item));
                }
                keyed.sort_by(|a, b| value_order(&a.0, &b.0, natural));
                keyed.into_iter().map(|(_, item)| item).collect()
            }
            None => {
                let mut items = items;
                items.sort_by(|a, b| value_order(a, b, natural));
                items
            }
        };
        Ok(Value::List(sorted))
    })
    .optional(&[ParamKind::Closure])
}

/// Sort order with nil grouped first; incomparable values keep their
/// relative order (the sort is stable).
fn value_order(a: &Value, b: &Value, natural: bool) -> Ordering {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ordering::Equal,
        (Value::Nil, _) => Ordering::Less,
        (_, Value::Nil) => Ordering::Greater,
        (Value::Str(x), Value::Str(y)) if natural => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        _ => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn as_list(input: Value) -> Vec<Value> {
    match input {
        Value::List(items) => items,
        Value::Nil => Vec::new(),
        single => vec![single],
    }
}

fn first_value(args: Vec<FilterArg>) -> Value {
    args.into_iter()
        .next()
        .map(FilterArg::into_value)
        .unwrap_or(Value::Nil)
}

fn first_string(args: Vec<FilterArg>) -> String {
    first_value(args).to_string()
}

fn two_strings(args: Vec<FilterArg>) -> (String, String) {
    let mut args = args.into_iter();
    let a = next_string(&mut args, "");
    let b = next_string(&mut args, "");
    (a, b)
}

fn next_string(args: &mut std::vec::IntoIter<FilterArg>, default: &str) -> String {
    match args.next() {
        Some(arg) => arg.into_value().to_string(),
        None => default.to_string(),
    }
}

fn next_int(args: &mut std::vec::IntoIter<FilterArg>, default: i64) -> i64 {
    match args.next() {
        Some(arg) => arg.into_value().to_int_lenient(),
        None => default,
    }
}

fn slice_bounds(start: i64, len: i64, total: usize) -> (usize, usize) {
    let start = if start < 0 { start + total as i64 } else { start };
    if start < 0 || start >= total as i64 || len <= 0 {
        return (0, 0);
    }
    let end = (start + len).min(total as i64);
    (start as usize, end as usize)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// The time reading of a value for the `date` filter.  Strings try a
/// few common formats; `"now"` and `"today"` give the current time.
fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Str(s) => {
            let s = s.trim();
            if s == "now" || s == "today" {
                return Some(Utc::now());
            }
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
                return Some(t.with_timezone(&Utc));
            }
            if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(Utc.from_utc_datetime(&t));
            }
            for format in &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"] {
                if let Ok(d) = NaiveDate::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
                }
            }
            None
        }
        _ => None,
    }
}
