//! Shared data models: rule failures and aggregated lint output.

use crate::parser::meta::Position;
use serde::Serialize;
use std::fmt;

/// One rule violation at an exact source position.
///
/// Two failures are equal when both the position and the rendered message
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub pos: Position,
    pub message: String,
}

impl Failure {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }

    /// Render `template` by substituting each `%s` with the next argument.
    ///
    /// Arguments are inserted literally, so an empty argument renders as an
    /// empty string between the surrounding quotes.
    pub fn formatted(pos: Position, template: &str, args: &[&str]) -> Self {
        Self::new(pos, render_template(template, args))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pos, self.message)
    }
}

fn render_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(idx) = rest.find("%s") {
        out.push_str(&rest[..idx]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%s"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A failure tagged with the rule that produced it, ready for printing.
pub struct Issue {
    pub file: String,
    pub rule: String,
    pub severity: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub message: String,
    /// True when the issue was corrected on disk by a fix run.
    pub fixed: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
/// Aggregated lint summary used by printers.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub files: usize,
    pub fixed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
/// Lint results container.
pub struct LintResult {
    pub issues: Vec<Issue>,
    pub summary: Summary,
}

impl LintResult {
    /// Build a result and tally severities from `issues`.
    pub fn from_issues(issues: Vec<Issue>, files: usize) -> Self {
        let mut summary = Summary {
            files,
            ..Summary::default()
        };
        for is in &issues {
            match is.severity.as_str() {
                "error" => summary.errors += 1,
                "warning" | "warn" => summary.warnings += 1,
                _ => summary.infos += 1,
            }
            if is.fixed {
                summary.fixed += 1;
            }
        }
        LintResult { issues, summary }
    }
}
