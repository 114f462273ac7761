//! Property tests for the engine's structural invariants.

use proptest::prelude::*;
use proptest::sample::select;
use sluice::{scan, Bindings, ChunkKind, Engine, Value};

/// A grab bag of representative runtime values.
fn any_value() -> impl Strategy<Value = Value> {
    select(vec![
        Value::Nil,
        Value::Bool(false),
        Value::Bool(true),
        Value::Int(0),
        Value::Int(7),
        Value::Float(0.0),
        Value::Str(String::new()),
        Value::Str("x".to_string()),
        Value::List(vec![]),
        Value::List(vec![Value::Int(1)]),
        Value::Map(indexmap::IndexMap::new()),
    ])
}

proptest! {
    /// Scanning either fails or partitions the input exactly.
    #[test]
    fn scanner_totality(source in ".*") {
        if let Ok(chunks) = scan(&source, "prop.liquid") {
            let rebuilt: String = chunks.iter().map(|c| c.source.as_str()).collect();
            prop_assert_eq!(rebuilt, source);
        }
    }

    /// Chunk line numbers never decrease.
    #[test]
    fn scanner_lines_monotonic(source in "[a-z{}%\n ]*") {
        if let Ok(chunks) = scan(&source, "prop.liquid") {
            for pair in chunks.windows(2) {
                prop_assert!(pair[0].info.line <= pair[1].info.line);
            }
        }
    }

    /// Text chunks never contain markup openers.
    #[test]
    fn scanner_text_has_no_markup(source in ".*") {
        if let Ok(chunks) = scan(&source, "prop.liquid") {
            for chunk in chunks.iter().filter(|c| c.kind == ChunkKind::Text) {
                prop_assert!(!chunk.source.contains("{{"));
                prop_assert!(!chunk.source.contains("{%"), "text chunk contains markup opener");
            }
        }
    }

    /// Liquid truthiness: only nil and false select the else branch.
    #[test]
    fn truthiness(value in any_value()) {
        let engine = Engine::new();
        let out = engine
            .render_source(
                "{% if x %}T{% else %}F{% endif %}",
                Bindings::new().set("x", value.clone()),
            )
            .unwrap();
        let expected = match value {
            Value::Nil | Value::Bool(false) => "F",
            _ => "T",
        };
        prop_assert_eq!(out, expected);
    }

    /// Deep property access never errors, whatever the base value is.
    #[test]
    fn property_access_is_total(value in any_value()) {
        let engine = Engine::new();
        let out = engine.render_source(
            "{{ a.b.c.d }}",
            Bindings::new().set("a", value),
        );
        prop_assert!(out.is_ok());
    }

    /// `forloop.length` is max(0, min(limit, n - offset)) and
    /// `forloop.last` fires exactly on the final iteration.
    #[test]
    fn for_loop_arithmetic(n in 0usize..12, offset in 0i64..15, limit in 0i64..15) {
        let items: Vec<Value> = (0..n as i64).map(Value::Int).collect();
        let engine = Engine::new();
        let out = engine
            .render_source(
                "{% for x in xs offset: o limit: l %}\
                 {{ forloop.length }}{% if forloop.last %}!{% endif %};{% endfor %}",
                Bindings::new()
                    .set("xs", Value::List(items))
                    .set("o", offset)
                    .set("l", limit),
            )
            .unwrap();
        let expected_len = (n as i64 - offset).max(0).min(limit) as usize;
        let mut expected = String::new();
        for i in 0..expected_len {
            expected.push_str(&expected_len.to_string());
            if i + 1 == expected_len {
                expected.push('!');
            }
            expected.push(';');
        }
        prop_assert_eq!(out, expected);
    }

    /// Ranges are inclusive, empty when inverted, and agree with
    /// `for` iteration counts.
    #[test]
    fn range_iteration(a in -5i64..6, b in -5i64..6) {
        let engine = Engine::new();
        let out = engine
            .render_source(
                "{% for i in (a..b) %}.{% endfor %}",
                Bindings::new().set("a", a).set("b", b),
            )
            .unwrap();
        let expected = if a <= b { (b - a + 1) as usize } else { 0 };
        prop_assert_eq!(out.len(), expected);
    }
}
