use chumsky::prelude::*;

use crate::{evaluator::Limits, prelude::*, term::Term};

pub trait SimpleParser<I: Clone + std::hash::Hash, O>: Parser<I, O, Error = Simple<I>> {}
impl<I: Clone + std::hash::Hash, O, T> SimpleParser<I, O> for T where
    T: Parser<I, O, Error = Simple<I>>
{
}

fn variable() -> impl SimpleParser<char, Identifier> {
    filter(|c: &char| c.is_ascii_alphanumeric() || *c == '\'')
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Identifier::new)
        .labelled("variable")
}

/// Whitespace is only meaningful between the subterms of an application.
fn whitespace() -> impl SimpleParser<char, Vec<char>> {
    one_of(" \t\n\r").repeated()
}

/// A term together with its depth, so nesting can be bounded while parsing.
type Measured = (Term, usize);

fn too_deep(span: Span, max_depth: usize) -> Simple<char> {
    Simple::custom(span, format!("Term is nested deeper than {max_depth} levels"))
}

fn term_parser(max_depth: usize) -> impl SimpleParser<char, Term> {
    let bounded = move |(term, depth): Measured, span: Span| {
        if depth > max_depth {
            Err(too_deep(span, max_depth))
        } else {
            Ok((term, depth))
        }
    };
    recursive(|term: Recursive<char, Measured, Simple<char>>| {
        let abs = one_of("λ\\")
            .ignore_then(variable())
            .then_ignore(just('.'))
            .then(term.clone())
            .map(|(x, (body, depth)): (Identifier, Measured)| {
                (Term::Abs(x, body.into()), depth + 1)
            })
            .try_map(bounded)
            .labelled("abstraction");

        // `(t1 t2 t3)` is read as `((t1 t2) t3)`; the depth is checked before
        // the spine is built
        let apply = term
            .clone()
            .then(whitespace().ignore_then(term).repeated().at_least(1))
            .try_map(move |(first, rest): (Measured, Vec<Measured>), span: Span| {
                let depth = rest
                    .iter()
                    .fold(first.1, |lhs, (_, rhs)| 1 + std::cmp::max(lhs, *rhs));
                if depth > max_depth {
                    return Err(too_deep(span, max_depth));
                }
                let (term, _) = rest.into_iter().fold(first, |(lhs, _), (rhs, _)| {
                    (Term::Apply(lhs.into(), rhs.into()), 0)
                });
                Ok((term, depth))
            })
            .delimited_by(just('('), just(')'))
            .labelled("application");

        choice((apply, abs, variable().map(|x| (Term::Var(x), 1))))
    })
    .map(|(term, _): Measured| term)
    .labelled("term")
}

/// Rejects input whose `(` and `λ` nesting alone already exceeds `max_depth`,
/// before the recursive parser descends into it.
fn check_nesting(s: &str, max_depth: usize) -> Result<(), ParseError> {
    let mut open = 0;
    // binders opened at each parenthesis level, outermost first
    let mut binders = vec![0usize];
    let mut prev: Option<char> = None;
    for (i, c) in s.chars().enumerate() {
        // a separator, or a `(` right after a complete subterm, closes every
        // binder opened since the last `(`
        let sibling = match c {
            ' ' | '\t' | '\n' | '\r' => true,
            '(' => matches!(prev, Some(p) if p == ')' || p == '\'' || p.is_ascii_alphanumeric()),
            _ => false,
        };
        prev = Some(c);
        if sibling {
            if let Some(n) = binders.last_mut() {
                open -= *n;
                *n = 0;
            }
        }
        match c {
            '(' => {
                open += 1;
                binders.push(0);
            }
            'λ' | '\\' => {
                open += 1;
                if let Some(n) = binders.last_mut() {
                    *n += 1;
                }
            }
            ')' => match binders.pop() {
                Some(n) if !binders.is_empty() => open -= n + 1,
                // unbalanced; the parser reports it
                _ => return Ok(()),
            },
            _ => continue,
        }
        if open >= max_depth {
            return Err(too_deep(i..i + 1, max_depth).map(|c| c.to_string()));
        }
    }
    Ok(())
}

pub fn parse(s: &str) -> Result<Term, Vec<ParseError>> {
    parse_within(s, Limits::default().max_depth)
}

/// Parses `s`, failing on terms deeper than `max_depth`.
pub fn parse_within(s: &str, max_depth: usize) -> Result<Term, Vec<ParseError>> {
    check_nesting(s, max_depth).map_err(|e| vec![e])?;
    term_parser(max_depth)
        .then_ignore(end())
        .parse(s)
        .map_err(|es| {
            es.into_iter()
                .map(|e| e.map(|c| c.to_string()))
                .collect::<Vec<_>>()
        })
}
