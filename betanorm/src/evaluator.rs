use tracing::{debug, warn};

use crate::{
    prelude::*,
    subst::{substitute, FreshNames},
    term::{Term, TermRef},
};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Limits {
    /// Contractions allowed in one call to [`Normalizer::normalize`].
    pub max_steps: usize,
    /// Deepest term, and deepest subterm position, the normalizer will enter.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_depth: 1_000,
        }
    }
}

/// A single contraction `(λx.b a) → b[x := a]`.
#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
#[display(fmt = "({} {})\t→\t{}", function, argument, contractum)]
pub struct TraceEntry {
    pub function: TermRef,
    pub argument: TermRef,
    pub contractum: TermRef,
}

impl TraceEntry {
    pub fn redex(&self) -> Term {
        Term::Apply(self.function.clone(), self.argument.clone())
    }
}

#[derive(Clone, Debug)]
pub struct Normalized {
    pub term: TermRef,
    pub trace: Vec<TraceEntry>,
}

/// Normal-order reducer. Arguments are passed unevaluated and abstraction
/// bodies are normalized too, so results are full beta-normal forms.
///
/// The fresh-name generator lives as long as the normalizer, so names invented
/// by one call are never invented again by a later one.
#[derive(Default, Debug)]
pub struct Normalizer {
    limits: Limits,
    fresh: FreshNames,
}

impl Normalizer {
    pub fn new(limits: Limits) -> Self {
        Self::with_fresh_names(limits, FreshNames::default())
    }

    pub fn with_fresh_names(limits: Limits, fresh: FreshNames) -> Self {
        Self { limits, fresh }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn normalize(&mut self, term: &TermRef) -> Result<Normalized> {
        let mut run = Run {
            limits: self.limits,
            fresh: &mut self.fresh,
            trace: vec![],
        };
        run.check_depth(term)?;
        let term = run.normalize(term, 0)?;
        debug!(steps = run.trace.len(), "reached normal form");
        Ok(Normalized {
            term,
            trace: run.trace,
        })
    }
}

struct Run<'a> {
    limits: Limits,
    fresh: &'a mut FreshNames,
    trace: Vec<TraceEntry>,
}

impl Run<'_> {
    fn normalize(&mut self, term: &TermRef, level: usize) -> Result<TermRef> {
        if level >= self.limits.max_depth {
            return Err(self.exceeded(Limit::Depth(self.limits.max_depth)));
        }
        let mut term = term.clone();
        loop {
            term = match term.as_ref() {
                Term::Var(_) => return Ok(term),
                Term::Abs(x, body) => {
                    let body = self.normalize(body, level + 1)?;
                    return Ok(Term::Abs(x.clone(), body).into());
                }
                Term::Apply(lhs, rhs) => {
                    if let Term::Abs(x, body) = lhs.as_ref() {
                        self.contract(lhs, x, body, rhs)?
                    } else {
                        let lhs = self.normalize(lhs, level + 1)?;
                        if let Term::Abs(x, body) = lhs.as_ref() {
                            self.contract(&lhs, x, body, rhs)?
                        } else {
                            let rhs = self.normalize(rhs, level + 1)?;
                            return Ok(Term::Apply(lhs, rhs).into());
                        }
                    }
                }
            };
        }
    }

    fn contract(
        &mut self,
        function: &TermRef,
        x: &Identifier,
        body: &TermRef,
        argument: &TermRef,
    ) -> Result<TermRef> {
        if self.trace.len() >= self.limits.max_steps {
            return Err(self.exceeded(Limit::Steps(self.limits.max_steps)));
        }
        let contractum = substitute(self.fresh, x, argument, body)?;
        self.check_depth(&contractum)?;
        let entry = TraceEntry {
            function: function.clone(),
            argument: argument.clone(),
            contractum: contractum.clone(),
        };
        debug!(
            step = self.trace.len() + 1,
            size = contractum.size(),
            "{entry}"
        );
        self.trace.push(entry);
        Ok(contractum)
    }

    fn check_depth(&self, term: &Term) -> Result<()> {
        if term.depth() > self.limits.max_depth {
            return Err(self.exceeded(Limit::Depth(self.limits.max_depth)));
        }
        Ok(())
    }

    fn exceeded(&self, limit: Limit) -> EvalError {
        warn!(steps = self.trace.len(), %limit, "gave up before reaching a normal form");
        EvalError::ReductionLimitExceeded(limit)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::{macros, parser::parse, term::arbitrary};

    macro_rules! var {
        ($x:expr) => {
            Term::var($x)
        };
    }
    macro_rules! lambda {
        ($x:expr, $body:expr) => {
            Term::abs($x, $body)
        };
    }
    macro_rules! apply {
        ($lhs:expr, $rhs:expr) => {
            Term::apply($lhs, $rhs)
        };
    }

    fn term(s: &str) -> TermRef {
        parse(s).unwrap().into()
    }

    fn normalize_with(limits: Limits, s: &str) -> Result<Normalized> {
        Normalizer::new(limits).normalize(&term(s))
    }

    fn normalize(s: &str) -> Normalized {
        normalize_with(Limits::default(), s).unwrap()
    }

    #[test]
    fn test_identity() {
        let Normalized { term, trace } = normalize("(λx.x y)");
        assert_eq!(*term, var!("y"));
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].to_string(), "(λx.x y)\t→\ty");
        assert_eq!(trace[0].redex(), apply!(lambda!("x", var!("x")), var!("y")));
    }

    #[test]
    fn test_constant() {
        let Normalized { term, trace } = normalize("(λx.λy.x a)");
        assert_eq!(*term, lambda!("y", var!("a")));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_boolean_macros() {
        let Normalized { term, trace } = normalize(&macros::expand("(AND TRUE FALSE)"));
        assert!(term.alpha_eq(&lambda!("a", lambda!("b", var!("b")))));
        assert!(term.alpha_eq(&parse(&macros::expand("FALSE")).unwrap()));
        assert_eq!(trace.len(), 4);

        let Normalized { term, .. } = normalize(&macros::expand("(AND TRUE TRUE)"));
        assert!(term.alpha_eq(&lambda!("a", lambda!("b", var!("a")))));

        let Normalized { term, .. } = normalize(&macros::expand("(NOT FALSE)"));
        assert!(term.alpha_eq(&parse(&macros::expand("TRUE")).unwrap()));

        let Normalized { term, .. } = normalize(&macros::expand("(COND yes no TRUE)"));
        assert_eq!(*term, var!("yes"));
        let Normalized { term, .. } = normalize(&macros::expand("(COND yes no FALSE)"));
        assert_eq!(*term, var!("no"));
    }

    #[test]
    fn test_capture_is_avoided() {
        let Normalized { term, trace } = normalize("(λx.λy.x y)");
        assert_eq!(*term, lambda!("a0", var!("y")));
        assert_eq!(term.to_string(), "λa0.y");
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_fresh_names_persist_across_calls() {
        let mut normalizer = Normalizer::default();
        let redex = term("(λx.λy.x y)");
        let first = normalizer.normalize(&redex).unwrap();
        let second = normalizer.normalize(&redex).unwrap();
        assert_eq!(first.term.to_string(), "λa0.y");
        assert_eq!(second.term.to_string(), "λa1.y");
    }

    #[test]
    fn test_independent_fresh_names() {
        let mut normalizer =
            Normalizer::with_fresh_names(Limits::default(), FreshNames::with_prefix("v"));
        let Normalized { term: result, .. } = normalizer.normalize(&term("(λx.λy.x y)")).unwrap();
        assert_eq!(result.to_string(), "λv0.y");
        let Normalized { term: result, .. } = Normalizer::default()
            .normalize(&term("(λx.λy.x y)"))
            .unwrap();
        assert_eq!(result.to_string(), "λa0.y");
    }

    #[test]
    fn test_fresh_names_skip_names_in_use() {
        let Normalized { term, .. } = normalize("(λx.λy.(x a0) y)");
        assert_eq!(term.to_string(), "λa1.(y a0)");
    }

    #[test]
    fn test_arguments_are_not_evaluated_first() {
        // the divergent argument is discarded without being touched
        let Normalized { term, trace } = normalize("(λx.y (λz.(z z) λz.(z z)))");
        assert_eq!(*term, var!("y"));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_normalizes_under_binders() {
        let Normalized { term, trace } = normalize("λf.(λx.x f)");
        assert_eq!(*term, lambda!("f", var!("f")));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_redex_behind_reducible_function() {
        let Normalized { term, trace } = normalize("((λf.f λx.x) z)");
        assert_eq!(*term, var!("z"));
        assert_eq!(
            trace.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["(λf.f λx.x)\t→\tλx.x", "(λx.x z)\t→\tz"]
        );
    }

    #[test]
    fn test_left_entries_before_right() {
        let Normalized { term, trace } = normalize("((λx.x a) (λy.y b))");
        assert_eq!(*term, apply!(var!("a"), var!("b")));
        assert_eq!(
            trace.iter().map(|e| e.redex().to_string()).collect::<Vec<_>>(),
            vec!["(λx.x a)", "(λy.y b)"]
        );
    }

    #[test]
    fn test_left_is_normalized_before_contraction() {
        // the body of the function is cleaned up before the argument arrives
        let Normalized { term, trace } = normalize("((λz.λw.(λi.i w) q) r)");
        assert_eq!(*term, var!("r"));
        assert_eq!(
            trace.iter().map(|e| e.redex().to_string()).collect::<Vec<_>>(),
            vec!["(λz.λw.(λi.i w) q)", "(λi.i w)", "(λw.w r)"]
        );
    }

    #[test]
    fn test_variables_and_stuck_terms() {
        for s in ["x", "λx.x", "(x λy.y)", "((x y) (z w))"] {
            let Normalized { term: result, trace } = normalize(s);
            assert_eq!(result, term(s));
            assert!(trace.is_empty());
        }
    }

    #[test]
    fn test_omega_hits_step_limit() {
        let limits = Limits {
            max_steps: 100,
            ..Limits::default()
        };
        assert_eq!(
            normalize_with(limits, "(λx.(x x) λx.(x x))").unwrap_err(),
            EvalError::ReductionLimitExceeded(Limit::Steps(100))
        );
    }

    #[test]
    fn test_step_limit_is_inclusive() {
        let exact = Limits {
            max_steps: 1,
            ..Limits::default()
        };
        assert_eq!(normalize_with(exact, "(λx.x y)").unwrap().trace.len(), 1);
        let none = Limits {
            max_steps: 0,
            ..Limits::default()
        };
        assert_eq!(
            normalize_with(none, "(λx.x y)").unwrap_err(),
            EvalError::ReductionLimitExceeded(Limit::Steps(0))
        );
    }

    #[test]
    fn test_growing_term_hits_depth_limit() {
        // each contraction wraps one more binder around the next redex
        let limits = Limits {
            max_depth: 20,
            ..Limits::default()
        };
        assert_eq!(
            normalize_with(limits, "(λx.(x x) λx.λy.(x x))").unwrap_err(),
            EvalError::ReductionLimitExceeded(Limit::Depth(20))
        );
    }

    #[test]
    fn test_deep_input_is_rejected() {
        let limits = Limits {
            max_depth: 3,
            ..Limits::default()
        };
        assert_eq!(
            normalize_with(limits, "λa.λb.λc.λd.x").unwrap_err(),
            EvalError::ReductionLimitExceeded(Limit::Depth(3))
        );
    }

    #[test]
    fn test_term_at_depth_limit_is_accepted() {
        let limits = Limits {
            max_depth: 4,
            ..Limits::default()
        };
        // depth 4
        let Normalized { term, trace } = normalize_with(limits, "λa.λb.λc.x").unwrap();
        assert_eq!(*term, lambda!("a", lambda!("b", lambda!("c", var!("x")))));
        assert!(trace.is_empty());

        // input of depth 4, contractum of depth 3
        let Normalized { term, trace } = normalize_with(limits, "(λx.λy.x λz.z)").unwrap();
        assert_eq!(*term, lambda!("y", lambda!("z", var!("z"))));
        assert_eq!(trace.len(), 1);

        assert_eq!(
            normalize_with(limits, "λa.λb.λc.λd.x").unwrap_err(),
            EvalError::ReductionLimitExceeded(Limit::Depth(4))
        );
    }

    #[test]
    fn test_failure_does_not_poison_normalizer() {
        let mut normalizer = Normalizer::new(Limits {
            max_steps: 10,
            ..Limits::default()
        });
        assert!(normalizer.normalize(&term("(λx.(x x) λx.(x x))")).is_err());
        let Normalized { term, trace } = normalizer.normalize(&term("(λx.x y)")).unwrap();
        assert_eq!(*term, var!("y"));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_church_arithmetic() {
        // 2 + 2 with Church numerals
        let two = "λf.λx.(f (f x))";
        let plus = "λm.λn.λf.λx.((m f) ((n f) x))";
        let Normalized { term, .. } = normalize(&format!("(({plus} {two}) {two})"));
        assert!(term.alpha_eq(&parse("λf.λx.(f (f (f (f x))))").unwrap()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn test_normal_forms_are_fixed_points(t in arbitrary::term("[xyz]")) {
            let limits = Limits { max_steps: 32, max_depth: 64 };
            if let Ok(Normalized { term: normal, trace }) = normalize_with(limits, &t.to_string()) {
                let again = Normalizer::new(limits).normalize(&normal).unwrap();
                prop_assert_eq!(&again.term, &normal);
                prop_assert!(again.trace.is_empty());
                prop_assert!(trace.iter().all(|e| matches!(e.function.as_ref(), Term::Abs(..))));
            }
        }
    }
}
