//! The dynamic value type threaded through scanning, evaluation, and
//! rendering.
//!
//! Liquid is dynamically typed; the engine models that with one closed
//! tagged union.  Host types enter through the `From` conversions or,
//! for anything richer, through the [`Opaque`] trait.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A host-defined value the engine carries around without interpreting.
/// Property access on it yields nil and it renders via [`Opaque::render`].
pub trait Opaque: fmt::Debug + Send + Sync {
    /// The string form written for `{{ value }}`.
    fn render(&self) -> String {
        String::new()
    }
}

/// A Liquid runtime value.
///
/// `Map` preserves insertion order; iteration and `for` loops see keys
/// in the order they were inserted.  `Empty` and `Blank` are the
/// keyword values `empty` and `blank`, which only participate in
/// equality tests.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Time(DateTime<Utc>),
    Opaque(Arc<dyn Opaque>),
    Empty,
    Blank,
}

/// A number extracted from a value, for filter arithmetic.  Integer
/// arithmetic stays integral; anything involving a float goes float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn to_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(f) => Value::Float(f),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

impl Value {
    /// Liquid truthiness: only nil and false are false.  `0`, `""`,
    /// and the empty list are all true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Time(_) => "time",
            Value::Opaque(_) => "opaque",
            Value::Empty => "empty",
            Value::Blank => "blank",
        }
    }

    /// Zero-length test, used by `empty` and the `default` filter.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Empty => true,
            _ => false,
        }
    }

    /// `blank` additionally matches nil, false, and whitespace-only
    /// strings.
    pub fn is_blank_value(&self) -> bool {
        match self {
            Value::Nil | Value::Bool(false) | Value::Blank => true,
            Value::Str(s) => s.trim().is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Number of elements, characters, or entries; nil for scalars.
    pub fn size(&self) -> Value {
        match self {
            Value::Str(s) => Value::Int(s.chars().count() as i64),
            Value::List(l) => Value::Int(l.len() as i64),
            Value::Map(m) => Value::Int(m.len() as i64),
            _ => Value::Nil,
        }
    }

    /// Property access per Liquid: absent keys yield nil, never an
    /// error.  Only lists derive `size`/`first`/`last` and answer
    /// numeric keys; a map answers its own keys and nothing else.
    pub fn property(&self, key: &str) -> Value {
        match self {
            Value::Map(m) => m.get(key).cloned().unwrap_or(Value::Nil),
            Value::List(l) => match key {
                "size" => self.size(),
                "first" => l.first().cloned().unwrap_or(Value::Nil),
                "last" => l.last().cloned().unwrap_or(Value::Nil),
                _ => match key.parse::<i64>() {
                    Ok(n) => self.nth(n),
                    Err(_) => Value::Nil,
                },
            },
            _ => Value::Nil,
        }
    }

    /// Index access `base[expr]`.  Integer indices address lists
    /// (negative counts from the end); everything else goes through
    /// property lookup on the stringified key.
    pub fn index(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::List(_), Value::Int(n)) => self.nth(*n),
            (Value::List(_), Value::Float(f)) => self.nth(*f as i64),
            (_, Value::Str(k)) => self.property(k),
            (_, Value::Int(n)) => self.property(&n.to_string()),
            _ => Value::Nil,
        }
    }

    fn nth(&self, n: i64) -> Value {
        if let Value::List(l) = self {
            let idx = if n < 0 { n + l.len() as i64 } else { n };
            if idx >= 0 {
                return l.get(idx as usize).cloned().unwrap_or(Value::Nil);
            }
        }
        Value::Nil
    }

    /// `contains` per Liquid: substring on strings, membership by
    /// equality on lists, false everywhere else.
    pub fn contains(&self, needle: &Value) -> bool {
        match self {
            Value::Str(s) => s.contains(&needle.to_string()),
            Value::List(l) => l.iter().any(|v| v == needle),
            _ => false,
        }
    }

    /// Ordering for `<`/`<=`/`>`/`>=`.  Defined for numbers, strings,
    /// and times; `None` for any other mix, which the evaluator turns
    /// into `false` rather than an error.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            _ => match (self.as_num(), other.as_num()) {
                (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
                _ => None,
            },
        }
    }

    /// The numeric reading of a value, if it has one.  Strings parse
    /// as integers first, then floats.
    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(f) => Some(Num::Float(*f)),
            Value::Str(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    Some(Num::Int(n))
                } else {
                    s.parse::<f64>().ok().map(Num::Float)
                }
            }
            _ => None,
        }
    }

    /// Lenient numeric coercion: unparseable values count as zero.
    pub fn to_num_lenient(&self) -> Num {
        self.as_num().unwrap_or(Num::Int(0))
    }

    pub fn to_int_lenient(&self) -> i64 {
        match self.to_num_lenient() {
            Num::Int(n) => n,
            Num::Float(f) => f as i64,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl PartialEq for Value {
    /// Equality per Liquid: numeric types unified (`1 == 1.0`), the
    /// `empty`/`blank` keywords matched structurally, cross-type
    /// comparisons false.
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Empty, v) | (v, Empty) => v.is_empty_value(),
            (Blank, v) | (v, Blank) => v.is_blank_value(),
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Opaque(a), Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The string form written into rendered output.  Nil prints as
    /// nothing, floats keep one decimal when integral, lists print as
    /// the concatenation of their elements.
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil | Value::Empty | Value::Blank => Ok(()),
            Value::Bool(b) => write!(out, "{}", b),
            Value::Int(n) => write!(out, "{}", n),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    write!(out, "{:.1}", f)
                } else {
                    write!(out, "{}", f)
                }
            }
            Value::Str(s) => out.write_str(s),
            Value::List(l) => {
                for v in l {
                    write!(out, "{}", v)?;
                }
                Ok(())
            }
            Value::Map(m) => write!(
                out,
                "{{{}}}",
                m.iter()
                    .format_with(", ", |(k, v), f| f(&format_args!("{:?}=>{}", k, v)))
            ),
            Value::Time(t) => write!(out, "{}", t.format("%Y-%m-%d %H:%M:%S %z")),
            Value::Opaque(o) => out.write_str(&o.render()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}
impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Int(n as i64)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}
impl From<usize> for Value {
    fn from(n: usize) -> Value {
        Value::Int(n as i64)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}
impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Value {
        Value::List(l)
    }
}
impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Value {
        Value::Map(m)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Value {
        Value::Time(t)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn list(items: &[i64]) -> Value {
        Value::List(items.iter().map(|n| Value::Int(*n)).collect())
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    fn numbers_unify_in_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Str("1".into()));
    }

    #[test]
    fn empty_and_blank() {
        assert_eq!(Value::Str("".into()), Value::Empty);
        assert_ne!(Value::Nil, Value::Empty);
        assert_eq!(Value::Nil, Value::Blank);
        assert_eq!(Value::Str("  \t".into()), Value::Blank);
        assert_ne!(Value::Str("x".into()), Value::Empty);
    }

    #[test]
    fn mixed_comparison_is_undefined() {
        assert_eq!(Value::Int(1).compare(&Value::Str("x".into())), None);
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("1".into()).compare(&Value::Str("x".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn list_properties() {
        let l = list(&[10, 20, 30]);
        assert_eq!(l.property("size"), Value::Int(3));
        assert_eq!(l.property("first"), Value::Int(10));
        assert_eq!(l.property("last"), Value::Int(30));
        assert_eq!(l.index(&Value::Int(-1)), Value::Int(30));
        assert_eq!(l.index(&Value::Int(9)), Value::Nil);
    }

    #[test]
    fn map_property_absent_is_nil() {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Value::Int(1));
        let m = Value::Map(m);
        assert_eq!(m.property("a"), Value::Int(1));
        assert_eq!(m.property("b"), Value::Nil);
        // Derived properties are a list feature; maps and strings
        // answer only their own keys.
        assert_eq!(m.property("size"), Value::Nil);
        assert_eq!(Value::Str("abc".into()).property("size"), Value::Nil);
    }

    #[test]
    fn contains() {
        assert!(Value::Str("hello".into()).contains(&Value::Str("ell".into())));
        assert!(list(&[1, 2]).contains(&Value::Int(2)));
        assert!(!list(&[1, 2]).contains(&Value::Int(3)));
        assert!(!Value::Int(5).contains(&Value::Int(5)));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Nil.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(4.99).to_string(), "4.99");
        assert_eq!(list(&[1, 2, 3]).to_string(), "123");
    }

    #[test]
    fn string_numbers_parse() {
        assert_eq!(Value::Str(" 42 ".into()).to_num_lenient(), Num::Int(42));
        assert_eq!(Value::Str("2.5".into()).to_num_lenient(), Num::Float(2.5));
        assert_eq!(Value::Str("n/a".into()).to_num_lenient(), Num::Int(0));
    }
}
