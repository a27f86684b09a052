pub mod evaluator;
pub mod macros;
pub mod parser;
pub mod prelude;
pub mod subst;
pub mod term;
