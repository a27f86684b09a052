use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use betanorm::{
    evaluator::{Limits, Normalized, Normalizer},
    macros, parser,
    prelude::*,
    subst,
    term::TermRef,
};
use clap::Parser as _;
use tracing::info;
use tracing_subscriber::EnvFilter;
use util::repl;

fn build_report(e: &ParseError) -> Report {
    use chumsky::error::SimpleReason;
    let report = Report::build(ReportKind::Error, (), e.span().start);
    match e.reason() {
        SimpleReason::Unexpected => {
            let found = e.found().map(String::as_str).unwrap_or("end of the input");
            let expected = e
                .expected()
                .map(|t| t.as_ref().map(String::as_str).unwrap_or("end of the input"))
                .collect::<Vec<_>>()
                .join(", ");
            let expected = if expected.is_empty() {
                "something else"
            } else {
                &expected
            };
            let report = report
                .with_message(format!("Unexpected {found}, expected {expected}"))
                .with_label(
                    Label::new(e.span())
                        .with_message(format!("Unexpected {}", found.fg(Color::Red)))
                        .with_color(Color::Red),
                );
            match e.label() {
                Some(label) => report.with_note(format!("while parsing {label}")),
                None => report,
            }
        }
        SimpleReason::Unclosed { span, delimiter } => report
            .with_message(format!("Unclosed delimiter {}", delimiter.fg(Color::Yellow)))
            .with_label(
                Label::new(span.clone())
                    .with_message(format!("Opened here {}", delimiter.fg(Color::Yellow)))
                    .with_color(Color::Yellow),
            )
            .with_label(
                Label::new(e.span())
                    .with_message(format!(
                        "Must be closed before this {}",
                        e.found()
                            .map(String::as_str)
                            .unwrap_or("end of the input")
                            .fg(Color::Red)
                    ))
                    .with_color(Color::Red),
            ),
        SimpleReason::Custom(msg) => report.with_message(msg).with_label(
            Label::new(e.span())
                .with_message(format!("{}", msg.fg(Color::Red)))
                .with_color(Color::Red),
        ),
    }
    .finish()
}

enum Failure {
    /// Errors point into `source`, the text after macro expansion.
    Parse {
        source: String,
        errors: Vec<ParseError>,
    },
    Eval(EvalError),
}

impl From<EvalError> for Failure {
    fn from(e: EvalError) -> Self {
        Failure::Eval(e)
    }
}

impl Failure {
    fn report(&self) -> std::io::Result<()> {
        match self {
            Failure::Parse { source, errors } => {
                for e in errors {
                    build_report(e).eprint(Source::from(source))?;
                }
            }
            Failure::Eval(e) => eprintln!("Error: {e}"),
        }
        Ok(())
    }
}

type CommandResult = Result<(), Failure>;

struct Session {
    normalizer: Normalizer,
    macros: bool,
    history: Option<PathBuf>,
}

impl Session {
    /// The text handed to the parser.
    fn source(&self, input: &str) -> String {
        if self.macros {
            macros::expand(input)
        } else {
            input.to_string()
        }
    }

    fn read(&self, input: &str) -> Result<TermRef, Failure> {
        let source = self.source(input);
        match parser::parse_within(&source, self.normalizer.limits().max_depth) {
            Ok(term) => Ok(term.into()),
            Err(errors) => Err(Failure::Parse { source, errors }),
        }
    }

    fn normalize(&mut self, input: &str) -> CommandResult {
        let term = self.read(input)?;
        let free = subst::free_vars(&term);
        if !free.is_empty() {
            info!(?free, "normalizing an open term");
        }
        let Normalized { term, trace } = self.normalizer.normalize(&term)?;
        for (i, entry) in trace.iter().enumerate() {
            println!("{:>4}  {entry}", i + 1);
        }
        println!("{term}");
        Ok(())
    }

    fn parse(&self, input: &str) -> CommandResult {
        let term = self.read(input)?;
        println!("{term}");
        Ok(())
    }

    fn free(&self, input: &str) -> CommandResult {
        let term = self.read(input)?;
        let free = subst::free_vars(&term);
        if free.is_empty() {
            println!("(closed)");
        } else {
            let names = free.iter().map(|x| x.as_str()).collect::<Vec<_>>();
            println!("{}", names.join(" "));
        }
        Ok(())
    }

    fn limits(&mut self, input: &str) {
        let mut limits = self.normalizer.limits();
        let mut args = input.split_whitespace();
        for (slot, arg) in [&mut limits.max_steps, &mut limits.max_depth]
            .into_iter()
            .zip(&mut args)
        {
            match arg.parse() {
                Ok(n) => *slot = n,
                Err(e) => {
                    eprintln!("Invalid limit {arg}: {e}");
                    return;
                }
            }
        }
        if args.next().is_some() {
            eprintln!("Expected at most two limits");
            return;
        }
        self.normalizer.set_limits(limits);
        println!(
            "max steps: {}, max depth: {}",
            limits.max_steps, limits.max_depth
        );
    }

    fn show_help() {
        println!(
            "{}",
            r#"
term                -- same as :eval term
:eval       term    -- show every contraction and the normal form
:parse      term    -- show the parsed term
:expand     term    -- show the term as the parser receives it
:free       term    -- show the free variables of the term
:limits [S [D]]     -- show or set the step and depth limits
:help               -- show this message

Type \ for λ. AND, NOT, TRUE, FALSE and COND are expanded, _ reads as a space.
        "#
            .trim()
        );
    }

    fn handle_repl_input(&mut self, input: &str) -> CommandResult {
        let (cmd, input) = if let Some(stripped) = input.strip_prefix(':') {
            stripped
                .trim_start()
                .split_once(' ')
                .map(|(cmd, input)| (cmd, input.trim()))
                .unwrap_or((stripped, ""))
        } else {
            ("", input)
        };
        match cmd {
            "" | "e" | "eval" => self.normalize(input)?,
            "p" | "parse" => self.parse(input)?,
            "x" | "expand" => println!("{}", self.source(input)),
            "f" | "free" => self.free(input)?,
            "l" | "limits" => self.limits(input),
            "h" | "help" => Self::show_help(),
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
            }
        }
        Ok(())
    }
}

impl repl::Repl for Session {
    type Error = anyhow::Error;
    fn history(&self) -> Option<&Path> {
        self.history.as_deref()
    }
    fn evaluate(&mut self, input: String) -> Result<(), Self::Error> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        if let Err(failure) = self.handle_repl_input(input) {
            failure.report()?;
        }
        Ok(())
    }
}

/// Reduce untyped lambda-calculus terms to beta-normal form, showing every
/// contraction on the way
#[derive(clap::Parser, Debug)]
#[command(name = "betanorm")]
struct Args {
    /// Term to normalize; starts a REPL when omitted
    #[arg(value_name = "TERM")]
    term: Option<String>,
    /// Give up after this many contractions
    #[arg(long, value_name = "N", default_value_t = Limits::default().max_steps)]
    max_steps: usize,
    /// Give up on terms nested deeper than this
    #[arg(long, value_name = "N", default_value_t = Limits::default().max_depth)]
    max_depth: usize,
    /// Parse input as written, without expanding AND, NOT, TRUE, FALSE, COND and _
    #[arg(long)]
    no_macros: bool,
    /// REPL history file
    #[arg(long, value_name = "PATH", default_value = "/tmp/betanorm.history")]
    history: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let limits = Limits {
        max_steps: args.max_steps,
        max_depth: args.max_depth,
    };
    let mut session = Session {
        normalizer: Normalizer::new(limits),
        macros: !args.no_macros,
        history: Some(args.history),
    };

    if let Some(term) = args.term {
        if let Err(failure) = session.normalize(&term) {
            failure.report()?;
            bail!("Could not normalize {term}");
        }
        return Ok(());
    }

    println!("Hi, this is an untyped lambda calculus normalizer. :h to show help");
    println!();
    repl::start_repl(session)?;
    Ok(())
}
