//! Textual shorthands expanded before parsing.
//!
//! Rows are applied in order, each over the output of the previous one, so the
//! `TRUE` and `FALSE` introduced by `AND` and `NOT` are expanded further down.
//! Matching ignores ASCII case; the names are reserved words.

const TABLE: &[(&str, &str)] = &[
    ("_", " "),
    ("AND", "λx10.λy10.((x10 y10) FALSE)"),
    ("NOT", "λx9.((x9 FALSE) TRUE)"),
    ("TRUE", "λx8.λy8.x8"),
    ("FALSE", "λx7.λy7.y7"),
    ("COND", "λa6.λb6.λc6.((c6 a6) b6)"),
];

pub fn expand(input: &str) -> String {
    TABLE
        .iter()
        .fold(input.to_string(), |text, (from, to)| {
            replace_ignore_case(&text, from, to)
        })
}

fn replace_ignore_case(text: &str, from: &str, to: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if rest
            .get(..from.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(from))
        {
            ret.push_str(to);
            rest = &rest[from.len()..];
        } else {
            ret.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    ret
}
