//! The token layer of the expression sub-language: identifiers,
//! keywords, number and string literals, and whitespace handling.
//! Everything here is a plain nom parser over `&str`.

use crate::parseresult::PResult;
use crate::value::Value;
use nom::character::complete::{anychar, char, digit1, multispace0};
use nom::combinator::{not, opt, recognize, verify};
use nom::error::{VerboseError, VerboseErrorKind};
use nom::sequence::{delimited, pair, preceded, terminated};

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A variable or filter name: a letter or underscore followed by
/// letters, digits, and underscores.
pub fn identifier(input: &str) -> PResult<&str> {
    recognize(pair(
        verify(anychar, |c: &char| c.is_ascii_alphabetic() || *c == '_'),
        nom::bytes::complete::take_while(is_ident_char),
    ))(input)
}

/// A reserved word (`and`, `contains`, `true`, …) with a word
/// boundary after it, so `android` still lexes as an identifier.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        terminated(
            nom::bytes::complete::tag(word),
            not(verify(anychar, |c: &char| is_ident_char(*c))),
        )(input)
    }
}

/// Wrap a parser in optional whitespace on both sides.
pub fn ws<'a, O, P>(inner: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// An unsigned number literal.  `12` is an integer, `12.5` a float.
/// Integers too large for i64 fall back to float.
pub fn number(input: &str) -> PResult<Value> {
    let (rest, text) = recognize(pair(digit1, opt(preceded(char('.'), digit1))))(input)?;
    let value = if text.contains('.') {
        Value::Float(text.parse().unwrap_or(0.0))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(text.parse().unwrap_or(0.0)),
        }
    };
    Ok((rest, value))
}

/// A single- or double-quoted string literal.  `\'` and `\"` (and
/// `\\`) escape; any other backslash pair is kept as written.  An
/// unterminated literal is a hard failure so the error survives `alt`.
pub fn string_literal(input: &str) -> PResult<String> {
    match input.chars().next() {
        Some(q) if q == '\'' || q == '"' => quoted_tail(input, q),
        _ => Err(nom::Err::Error(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("expected string literal"))],
        })),
    }
}

fn quoted_tail(input: &str, quote: char) -> PResult<String> {
    let body = &input[quote.len_utf8()..];
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((&body[i + c.len_utf8()..], text));
        } else if c == '\\' {
            match chars.next() {
                Some((_, e)) if e == quote || e == '\\' => text.push(e),
                Some((_, e)) => {
                    text.push('\\');
                    text.push(e);
                }
                None => break,
            }
        } else {
            text.push(c);
        }
    }
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context("unterminated string literal"))],
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identifier_simple() {
        assert_eq!(identifier("foo_bar9 rest"), Ok((" rest", "foo_bar9")));
        assert_eq!(identifier("_x"), Ok(("", "_x")));
        assert!(identifier("9foo").is_err());
    }

    #[test]
    fn keyword_needs_boundary() {
        assert_eq!(keyword("and")("and b"), Ok((" b", "and")));
        assert!(keyword("and")("android").is_err());
        assert_eq!(keyword("or")("or"), Ok(("", "or")));
    }

    #[test]
    fn numbers() {
        assert_eq!(number("42)"), Ok((")", Value::Int(42))));
        assert_eq!(number("3.25 "), Ok((" ", Value::Float(3.25))));
        assert!(number("x").is_err());
    }

    #[test]
    fn strings_both_quotes() {
        assert_eq!(string_literal("'abc' x"), Ok((" x", "abc".to_string())));
        assert_eq!(string_literal("\"a b\""), Ok(("", "a b".to_string())));
        assert_eq!(string_literal("''"), Ok(("", String::new())));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            string_literal(r#"'don\'t'"#),
            Ok(("", "don't".to_string()))
        );
        assert_eq!(
            string_literal(r#""say \"hi\"""#),
            Ok(("", "say \"hi\"".to_string()))
        );
    }

    #[test]
    fn unterminated_string_is_failure() {
        match string_literal("'oops") {
            Err(nom::Err::Failure(_)) => (),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
