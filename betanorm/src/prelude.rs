use std::rc::Rc;

use thiserror::Error;

pub type Identifier = Rc<String>;

pub type Span = std::ops::Range<usize>;
pub type ParseError = chumsky::error::Simple<String, Span>;

/// The ceiling a reduction ran into.
#[derive(PartialEq, Eq, Clone, Copy, derive_more::Display, Debug)]
pub enum Limit {
    #[display(fmt = "{} contractions", _0)]
    Steps(usize),
    #[display(fmt = "term depth {}", _0)]
    Depth(usize),
}

#[derive(PartialEq, Eq, Clone, Debug, Error)]
pub enum EvalError {
    #[error("No normal form reached within {0}")]
    ReductionLimitExceeded(Limit),
    #[error("Internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}
pub type Result<T, E = EvalError> = std::result::Result<T, E>;
