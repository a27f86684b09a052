use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    prelude::*,
    term::{Term, TermRef},
};

/// Whether `name` has an occurrence in `term` that no enclosing binder captures.
pub fn occurs_free(name: &str, term: &Term) -> bool {
    match term {
        Term::Var(x) => x.as_str() == name,
        Term::Abs(x, _) if x.as_str() == name => false,
        Term::Abs(_, body) => occurs_free(name, body),
        Term::Apply(lhs, rhs) => occurs_free(name, lhs) || occurs_free(name, rhs),
    }
}

pub fn free_vars(term: &Term) -> BTreeSet<Identifier> {
    fn rec<'a>(term: &'a Term, bound: &mut Vec<&'a str>, free: &mut BTreeSet<Identifier>) {
        match term {
            Term::Var(x) => {
                if !bound.contains(&x.as_str()) {
                    free.insert(x.clone());
                }
            }
            Term::Abs(x, body) => {
                bound.push(x.as_str());
                rec(body, bound, free);
                assert_eq!(Some(x.as_str()), bound.pop());
            }
            Term::Apply(lhs, rhs) => {
                rec(lhs, bound, free);
                rec(rhs, bound, free);
            }
        }
    }
    let mut free = BTreeSet::new();
    rec(term, &mut vec![], &mut free);
    free
}

/// Source of names for alpha-renaming: a prefix followed by a counter that only
/// ever grows, so a generator never hands out the same name twice.
#[derive(Clone, Debug)]
pub struct FreshNames {
    prefix: String,
    next: u64,
}

impl Default for FreshNames {
    fn default() -> Self {
        Self::with_prefix("a")
    }
}

impl FreshNames {
    /// `prefix` must consist of identifier characters, otherwise renamed terms
    /// no longer print as parseable text.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// How many candidates have been drawn so far, skipped ones included.
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// The next name of the sequence that is not in `taken`.
    pub fn next_avoiding(&mut self, taken: &BTreeSet<Identifier>) -> Result<Identifier> {
        loop {
            let candidate = format!("{}{}", self.prefix, self.next);
            self.next = self.next.checked_add(1).ok_or_else(|| {
                EvalError::InternalInvariantViolation("fresh name counter exhausted".to_string())
            })?;
            if !taken.contains(&candidate) {
                return Ok(Identifier::new(candidate));
            }
        }
    }
}

/// `term[name := value]`, renaming binders of `term` that would capture a free
/// variable of `value`.
pub fn substitute(
    fresh: &mut FreshNames,
    name: &str,
    value: &TermRef,
    term: &TermRef,
) -> Result<TermRef> {
    Ok(match term.as_ref() {
        Term::Var(x) if x.as_str() == name => value.clone(),
        Term::Var(_) => term.clone(),
        Term::Apply(lhs, rhs) => Term::Apply(
            substitute(fresh, name, value, lhs)?,
            substitute(fresh, name, value, rhs)?,
        )
        .into(),
        Term::Abs(x, _) if x.as_str() == name => term.clone(),
        Term::Abs(x, body) if occurs_free(x, value) => {
            let mut taken = value.names();
            taken.extend(body.names());
            taken.insert(Identifier::new(name.to_string()));
            let renamed = fresh.next_avoiding(&taken)?;
            trace!(from = %x, to = %renamed, "renaming binder to avoid capture");
            let body = substitute(fresh, x, &Term::Var(renamed.clone()).into(), body)?;
            Term::Abs(renamed, substitute(fresh, name, value, &body)?).into()
        }
        Term::Abs(x, body) => Term::Abs(x.clone(), substitute(fresh, name, value, body)?).into(),
    })
}
