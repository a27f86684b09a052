use std::{collections::BTreeSet, rc::Rc};

use crate::prelude::*;

pub type TermRef = Rc<Term>;

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Term {
    /// `x`
    Var(Identifier),
    /// `λx.t`
    Abs(Identifier, TermRef),
    /// `(t t)`
    Apply(TermRef, TermRef),
}

impl Term {
    pub fn var(name: &str) -> Self {
        Term::Var(Identifier::new(name.to_string()))
    }

    pub fn abs(name: &str, body: impl Into<TermRef>) -> Self {
        Term::Abs(Identifier::new(name.to_string()), body.into())
    }

    pub fn apply(lhs: impl Into<TermRef>, rhs: impl Into<TermRef>) -> Self {
        Term::Apply(lhs.into(), rhs.into())
    }

    /// Number of nodes on the longest path from the root to a variable.
    pub fn depth(&self) -> usize {
        match self {
            Term::Var(_) => 1,
            Term::Abs(_, body) => 1 + body.depth(),
            Term::Apply(lhs, rhs) => 1 + std::cmp::max(lhs.depth(), rhs.depth()),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Term::Var(_) => 1,
            Term::Abs(_, body) => 1 + body.size(),
            Term::Apply(lhs, rhs) => 1 + lhs.size() + rhs.size(),
        }
    }

    /// Every name in the term, binders included.
    pub fn names(&self) -> BTreeSet<Identifier> {
        fn collect(term: &Term, names: &mut BTreeSet<Identifier>) {
            match term {
                Term::Var(x) => {
                    names.insert(x.clone());
                }
                Term::Abs(x, body) => {
                    names.insert(x.clone());
                    collect(body, names);
                }
                Term::Apply(lhs, rhs) => {
                    collect(lhs, names);
                    collect(rhs, names);
                }
            }
        }
        let mut names = BTreeSet::new();
        collect(self, &mut names);
        names
    }

    /// Equality up to consistent renaming of bound variables.
    pub fn alpha_eq(&self, other: &Term) -> bool {
        fn rec<'a>(lhs: &'a Term, rhs: &'a Term, bound: &mut Vec<(&'a str, &'a str)>) -> bool {
            match (lhs, rhs) {
                (Term::Var(x), Term::Var(y)) => {
                    let i = bound.iter().rev().position(|(b, _)| *b == x.as_str());
                    let j = bound.iter().rev().position(|(_, b)| *b == y.as_str());
                    match (i, j) {
                        (None, None) => x == y,
                        (i, j) => i == j,
                    }
                }
                (Term::Abs(x, lbody), Term::Abs(y, rbody)) => {
                    bound.push((x.as_str(), y.as_str()));
                    let eq = rec(lbody, rbody, bound);
                    bound.pop();
                    eq
                }
                (Term::Apply(l1, r1), Term::Apply(l2, r2)) => {
                    rec(l1, l2, bound) && rec(r1, r2, bound)
                }
                _ => false,
            }
        }
        rec(self, other, &mut vec![])
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Var(x) => f.write_str(x),
            Term::Abs(x, body) => f.write_fmt(format_args!("λ{x}.{body}")),
            Term::Apply(lhs, rhs) => f.write_fmt(format_args!("({lhs} {rhs})")),
        }
    }
}
