//! Table-driven coverage of the standard filter collection, evaluated
//! through full template rendering.

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use sluice::{Bindings, Engine, Value};

fn page(name: &str, category: Option<&str>) -> Value {
    let mut m = IndexMap::new();
    m.insert("name".to_string(), Value::from(name));
    if let Some(category) = category {
        m.insert("category".to_string(), Value::from(category));
    }
    Value::Map(m)
}

fn weighted(weight: Option<i64>) -> Value {
    let mut m = IndexMap::new();
    m.insert(
        "weight".to_string(),
        weight.map(Value::Int).unwrap_or(Value::Nil),
    );
    Value::Map(m)
}

fn bindings() -> Bindings {
    let mut article = IndexMap::new();
    article.insert(
        "published_at".to_string(),
        Value::Time(Utc.with_ymd_and_hms(2015, 7, 17, 15, 4, 5).unwrap()),
    );
    Bindings::new()
        .set(
            "animals",
            Value::List(
                ["zebra", "octopus", "giraffe", "Sally Snake"]
                    .iter()
                    .map(|s| Value::from(*s))
                    .collect(),
            ),
        )
        .set(
            "fruits",
            Value::List(
                ["apples", "oranges", "peaches", "plums"]
                    .iter()
                    .map(|s| Value::from(*s))
                    .collect(),
            ),
        )
        .set("empty_list", Value::List(vec![]))
        .set("article", Value::Map(article))
        .set(
            "pages",
            Value::List(vec![
                page("page 1", Some("business")),
                page("page 2", Some("celebrities")),
                page("page 3", None),
                page("page 4", Some("lifestyle")),
                page("page 5", Some("sports")),
                page("page 6", None),
                page("page 7", Some("technology")),
            ]),
        )
        .set(
            "sort_prop",
            Value::List(vec![
                weighted(Some(1)),
                weighted(Some(5)),
                weighted(Some(3)),
                weighted(None),
            ]),
        )
}

const CASES: &[(&str, &str)] = &[
    // values
    ("4.99 | default: 2.99", "4.99"),
    ("undefined | default: 2.99", "2.99"),
    ("false | default: 2.99", "2.99"),
    ("empty_list | default: 2.99", "2.99"),
    // date filters
    ("article.published_at | date", "Fri, Jul 17, 15"),
    ("article.published_at | date: \"%a, %b %d, %y\"", "Fri, Jul 17, 15"),
    ("article.published_at | date: \"%Y\"", "2015"),
    ("\"2015-07-17T15:04:05Z\" | date: \"%Y-%m-%d\"", "2015-07-17"),
    ("\"March 14, 2016\" | date: \"%b %d, %y\"", "Mar 14, 16"),
    ("\"not a date\" | date", "not a date"),
    // list filters
    (
        "pages | map: 'category' | join",
        "business, celebrities, , lifestyle, sports, , technology",
    ),
    (
        "pages | map: 'category' | compact | join",
        "business, celebrities, lifestyle, sports, technology",
    ),
    (
        "\"John, Paul, George, Ringo\" | split: \", \" | join: \" and \"",
        "John and Paul and George and Ringo",
    ),
    ("animals | sort | join: \", \"", "Sally Snake, giraffe, octopus, zebra"),
    (
        "sort_prop | sort: \"weight\" | map: 'weight' | join: \"/\"",
        "/1/3/5",
    ),
    ("fruits | reverse | join: \", \"", "plums, peaches, oranges, apples"),
    ("fruits | first", "apples"),
    ("fruits | last", "plums"),
    ("empty_list | first", ""),
    ("empty_list | last", ""),
    (
        "pages | where: 'category', 'sports' | map: 'name' | join",
        "page 5",
    ),
    ("pages | where: 'category' | size", "5"),
    ("fruits | concat: animals | size", "8"),
    ("animals | sort_natural | join: \", \"", "giraffe, octopus, Sally Snake, zebra"),
    // sequence filters
    ("\"Ground control to Major Tom.\" | size", "28"),
    ("\"apples, oranges, peaches, plums\" | split: \", \" | size", "4"),
    ("undefined | size", "0"),
    // string filters
    (
        "\"Take my protein pills and put my helmet on\" | replace: \"my\", \"your\"",
        "Take your protein pills and put your helmet on",
    ),
    (
        "\"Take my protein pills and put my helmet on\" | replace_first: \"my\", \"your\"",
        "Take your protein pills and put my helmet on",
    ),
    ("\"/my/fancy/url\" | append: \".html\"", "/my/fancy/url.html"),
    ("\"website.com\" | append: \"/index.html\"", "website.com/index.html"),
    ("\"title\" | capitalize", "Title"),
    ("\"my great title\" | capitalize", "My great title"),
    ("\"Parker Moore\" | downcase", "parker moore"),
    ("\"Parker Moore\" | upcase", "PARKER MOORE"),
    ("\"  So much room!  \" | strip", "So much room!"),
    ("\"  So much room!  \" | lstrip", "So much room!  "),
    ("\"  So much room!  \" | rstrip", "  So much room!"),
    (
        "\"apples, oranges, and bananas\" | prepend: \"Some fruit: \"",
        "Some fruit: apples, oranges, and bananas",
    ),
    (
        "\"I strained to see the train through the rain\" | remove: \"rain\"",
        "I sted to see the t through the ",
    ),
    (
        "\"I strained to see the train through the rain\" | remove_first: \"rain\"",
        "I sted to see the train through the rain",
    ),
    ("\"Liquid\" | slice: 0", "L"),
    ("\"Liquid\" | slice: 2", "q"),
    ("\"Liquid\" | slice: 2, 5", "quid"),
    ("\"Liquid\" | slice: -3, 2", "ui"),
    ("\"Ground control to Major Tom.\" | truncate: 20", "Ground control to..."),
    (
        "\"Ground control to Major Tom.\" | truncate: 25, \", and so on\"",
        "Ground control, and so on",
    ),
    ("\"Ground control to Major Tom.\" | truncate: 20, \"\"", "Ground control to Ma"),
    ("\"short\" | truncate: 20", "short"),
    (
        "\"Ground control to Major Tom.\" | truncatewords: 3",
        "Ground control to...",
    ),
    ("\"one two\" | truncatewords: 5", "one two"),
    ("\"a\nb\" | strip_newlines", "ab"),
    ("\"a\nb\" | newline_to_br", "a<br />\nb"),
    ("\"1 < 2 & 3\" | escape", "1 &lt; 2 &amp; 3"),
    // number filters
    ("-17 | abs", "17"),
    ("4 | abs", "4"),
    ("\"-19.86\" | abs", "19.86"),
    ("1.2 | ceil", "2"),
    ("2.0 | ceil", "2"),
    ("183.357 | ceil", "184"),
    ("\"3.5\" | ceil", "4"),
    ("1.2 | floor", "1"),
    ("183.357 | floor", "183"),
    ("4 | plus: 2", "6"),
    ("\"4\" | plus: \"2\"", "6"),
    ("1.5 | plus: 1", "2.5"),
    ("4 | minus: 6", "-2"),
    ("3 | times: 4", "12"),
    ("16 | divided_by: 4", "4"),
    ("5 | divided_by: 3", "1"),
    ("20 | divided_by: 7.0 | round: 2", "2.86"),
    ("7 | modulo: 3", "1"),
    ("183.357 | round", "183"),
    ("183.357 | round: 1", "183.4"),
    // filters on the end of chains
    ("fruits | join: \"+\" | upcase", "APPLES+ORANGES+PEACHES+PLUMS"),
];

#[test]
fn standard_filter_table() {
    let engine = Engine::new();
    for (expression, expected) in CASES {
        let template = format!("{{{{ {} }}}}", expression);
        let parsed = match engine.parse(&template, "filters.liquid") {
            Ok(t) => t,
            Err(e) => panic!("{}: parse failed: {}", expression, e),
        };
        match engine.render(&parsed, bindings()) {
            Ok(out) => assert_eq!(&out, expected, "{}", expression),
            Err(e) => panic!("{}: render failed: {}", expression, e),
        }
    }
}

#[test]
fn uniq_preserves_first_occurrence() {
    let engine = Engine::new();
    let out = engine
        .render_source(
            "{{ xs | uniq | join: ',' }}",
            Bindings::new().set(
                "xs",
                Value::List(vec![
                    Value::Int(1),
                    Value::Int(2),
                    Value::Int(1),
                    Value::Int(3),
                    Value::Int(2),
                ]),
            ),
        )
        .unwrap();
    assert_eq!(out, "1,2,3");
}

#[test]
fn sort_without_argument_orders_numbers() {
    let engine = Engine::new();
    let out = engine
        .render_source(
            "{{ xs | sort | join: ',' }}",
            Bindings::new().set(
                "xs",
                Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2)]),
            ),
        )
        .unwrap();
    assert_eq!(out, "1,2,3");
}

#[test]
fn arity_errors_name_the_filter() {
    let engine = Engine::new();
    let e = engine
        .render_source("{{ 'x' | replace: 'a' }}", Bindings::new())
        .unwrap_err();
    let message = e.to_string();
    assert!(message.contains("replace"), "{}", message);
    assert!(message.contains("2"), "{}", message);
}
