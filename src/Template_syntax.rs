// This module is only a chapter of the documentation.
//! This module describes the template syntax used by sluice.
//!
//! The syntax is that of the
//! [Liquid](https://shopify.github.io/liquid/) template language.
//! A template is plain text with two kinds of markup: objects,
//! `{{ … }}`, which write a value, and tags, `{% … %}`, which carry
//! control flow and assignments.
//!
//! ```text
//! Hello, {{ name }}!
//! {% if admin %}You may proceed.{% else %}Access denied.{% endif %}
//! ```
#![allow(non_snake_case)]

pub mod a_Objects_and_expressions {
    //! An object writes the value of an expression into the output.
    //!
    //! # Expressions
    //!
    //! An expression is a literal (`42`, `3.5`, `'text'`, `"text"`,
    //! `true`, `false`, `nil`), a variable, or a path into one:
    //!
    //! ```text
    //! {{ page.title }}
    //! {{ users[0].name }}
    //! {{ totals["march"] }}
    //! ```
    //!
    //! Lookup never fails: a missing variable or key is `nil`, and nil
    //! renders as nothing.  Lists additionally answer `size`, `first`,
    //! and `last`, and negative indexes count from the end.
    //!
    //! Conditions combine with `==`, `!=`, `<`, `<=`, `>`, `>=`,
    //! `contains`, `and`, `or`, and `not`.  Comparing values of
    //! incompatible types is `false`, never an error.  The keywords
    //! `empty` and `blank` match zero-length and effectively-missing
    //! values: `{% if items == empty %}`.
    //!
    //! `(1..5)` is the inclusive integer range, handy with `for`.
}

pub mod b_Filters {
    //! A filter transforms the value to its left; filters chain left
    //! to right with `|` and take arguments after a colon.
    //!
    //! ```text
    //! {{ title | upcase }}
    //! {{ price | times: 100 | round }}
    //! {{ "a,b,c" | split: "," | join: " / " }}
    //! ```
    //!
    //! The standard collection covers strings (`upcase`, `downcase`,
    //! `capitalize`, `append`, `prepend`, `replace`, `split`, `slice`,
    //! `truncate`, `escape`, …), lists (`join`, `sort`, `uniq`,
    //! `compact`, `map`, `where`, `reverse`, `first`, `last`, `size`),
    //! numbers (`plus`, `minus`, `times`, `divided_by`, `modulo`,
    //! `abs`, `ceil`, `floor`, `round`), and `default` and `date`.
    //!
    //! Some filters interpret a string argument as an expression over
    //! each element, so `{{ pages | map: 'category' }}` collects the
    //! `category` field of every page and
    //! `{{ items | sort: 'weight' }}` orders by field.
}

pub mod c_Tags {
    //! Tags carry control flow.  Block tags bracket a body and end
    //! with a matching `end` tag.
    //!
    //! # Conditionals
    //!
    //! ```text
    //! {% if x > 2 %}big{% elsif x == 2 %}mid{% else %}small{% endif %}
    //! {% unless done %}still working{% endunless %}
    //! {% case status %}
    //! {% when 'new', 'open' %}active
    //! {% when 'done' %}finished
    //! {% else %}unknown
    //! {% endcase %}
    //! ```
    //!
    //! # Loops
    //!
    //! `for` iterates lists, inclusive ranges, and maps (as
    //! `[key, value]` pairs).  `offset:`, `limit:`, and `reversed`
    //! adjust the iteration; `break` and `continue` work as expected;
    //! an `else` clause renders when there is nothing to iterate.
    //!
    //! ```text
    //! {% for entry in log offset: 2 limit: 10 reversed %}
    //!   {{ forloop.index }}/{{ forloop.length }}: {{ entry }}
    //! {% endfor %}
    //! ```
    //!
    //! Inside the body, `forloop` exposes `index`, `index0`, `rindex`,
    //! `rindex0`, `first`, `last`, and `length`.
    //!
    //! # Assignment
    //!
    //! ```text
    //! {% assign total = price | times: quantity %}
    //! {% capture header %}{{ site.name }}: {{ page.title }}{% endcapture %}
    //! {% increment visits %} {% decrement stock %}
    //! ```
    //!
    //! `assign` and `capture` write the root scope of the current
    //! render.  `increment`/`decrement` counters are per render and
    //! independent of assigned variables of the same name.
    //!
    //! # Includes
    //!
    //! ```text
    //! {% include 'footer' %}
    //! {% include 'card' with user %}
    //! {% include 'card' for users %}
    //! {% include 'card', title: 'Hi', width: 3 %}
    //! ```
    //!
    //! The engine asks its include resolver for the named template and
    //! renders it in a child scope; `with` and `for` bind the value
    //! under the template's base name.
}

pub mod d_Whitespace_control {
    //! A `-` tucked inside a delimiter eats the adjacent whitespace:
    //! `{{-` and `{%-` trim the text before the marker, `-}}` and
    //! `-%}` trim after it.
    //!
    //! ```text
    //! {% for x in xs -%}
    //!   {{- x -}}
    //! {%- endfor %}
    //! ```
    //!
    //! renders the values with no surrounding newlines or indentation.
}
