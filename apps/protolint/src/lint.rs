//! Lint runner: file discovery, rule execution, and fix runs.
//!
//! Produces a `LintResult` with issues and a summary plus a list of
//! per-file errors (unreadable or unparsable files, failed fix writes).

use crate::config::{absolute, Effective};
use crate::models::{Failure, Issue, LintResult};
use crate::parser::parse_file;
use crate::rules::{self, Rule, RuleBuildError};
use anyhow::{bail, Context, Result};
use glob::glob;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Build the rules selected by `eff`, in catalog order.
pub fn build_rules(eff: &Effective) -> Result<Vec<Box<dyn Rule>>, RuleBuildError> {
    let all = rules::all_rules(&eff.rules_option, eff.fix)?;
    rules::select(all, &eff.selection)
}

/// Expand CLI inputs into the sorted, deduplicated list of `.proto` files.
///
/// Directories expand to `**/*.proto`; anything that is neither a file nor a
/// directory is treated as a glob pattern. Paths under any of `excludes`
/// (absolute, normalized) are dropped.
pub fn collect_targets(inputs: &[String], excludes: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut targets: Vec<PathBuf> = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let pattern = path.join("**").join("*.proto");
            expand(&pattern.to_string_lossy(), &mut targets)?;
        } else if path.is_file() {
            targets.push(path.to_path_buf());
        } else {
            let before = targets.len();
            expand(input, &mut targets)?;
            if targets.len() == before && !has_glob_meta(input) {
                bail!("no such file or directory: {}", input);
            }
        }
    }
    targets.retain(|t| {
        let abs = absolute(t);
        !excludes.iter().any(|ex| abs.starts_with(ex))
    });
    targets.sort();
    targets.dedup();
    Ok(targets)
}

fn expand(pattern: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = glob(pattern).with_context(|| format!("bad glob pattern: {}", pattern))?;
    for entry in entries.flatten() {
        if entry.is_file() {
            let entry = match entry.strip_prefix(".") {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => entry,
            };
            out.push(entry);
        }
    }
    Ok(())
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Lint `files` with the rules selected by `eff`.
///
/// Files are processed in parallel; issues keep each rule's order within a
/// file and files keep the order of `files`. In fix mode, issues from
/// fixable rules are marked `fixed`.
pub fn run_lint(
    files: &[PathBuf],
    eff: &Effective,
) -> Result<(LintResult, Vec<String>), RuleBuildError> {
    let rules = build_rules(eff)?;
    let per_file: Vec<(Vec<Issue>, Vec<String>)> = files
        .par_iter()
        .map(|path| lint_file(path, &rules, eff))
        .collect();

    let mut issues = Vec::new();
    let mut errors = Vec::new();
    for (mut file_issues, mut file_errors) in per_file {
        issues.append(&mut file_issues);
        errors.append(&mut file_errors);
    }
    issues.sort_by(|a, b| a.file.cmp(&b.file));
    Ok((LintResult::from_issues(issues, files.len()), errors))
}

/// Fix `files`, then lint them again in check mode.
///
/// The result holds what was fixed (marked `fixed`) followed, per file, by
/// whatever still fails afterwards.
pub fn run_fix(
    files: &[PathBuf],
    eff: &Effective,
) -> Result<(LintResult, Vec<String>), RuleBuildError> {
    let fix_eff = Effective {
        fix: true,
        ..eff.clone()
    };
    let (fixed, mut errors) = run_lint(files, &fix_eff)?;

    let check_eff = Effective {
        fix: false,
        ..eff.clone()
    };
    let (remaining, check_errors) = run_lint(files, &check_eff)?;
    for e in check_errors {
        if !errors.contains(&e) {
            errors.push(e);
        }
    }

    let mut issues: Vec<Issue> = fixed.issues.into_iter().filter(|i| i.fixed).collect();
    issues.extend(remaining.issues);
    issues.sort_by(|a, b| a.file.cmp(&b.file));
    Ok((LintResult::from_issues(issues, files.len()), errors))
}

fn lint_file(path: &Path, rules: &[Box<dyn Rule>], eff: &Effective) -> (Vec<Issue>, Vec<String>) {
    let proto = match parse_file(path) {
        Ok(p) => p,
        Err(e) => return (Vec::new(), vec![format!("{:#}", e)]),
    };

    let mut issues = Vec::new();
    let mut errors = Vec::new();
    for rule in rules {
        if eff.is_ignored(rule.id(), path) {
            continue;
        }
        match rule.apply(&proto) {
            Ok(failures) => issues.extend(
                failures
                    .into_iter()
                    .map(|f| to_issue(f, rule.as_ref(), eff)),
            ),
            Err(e) => errors.push(format!("{} ({}): {:#}", proto.filename, rule.id(), e)),
        }
    }
    (issues, errors)
}

fn to_issue(failure: Failure, rule: &dyn Rule, eff: &Effective) -> Issue {
    Issue {
        file: failure.pos.filename,
        rule: rule.id().to_string(),
        severity: eff.severity_of(rule.id()).to_string(),
        line: failure.pos.line,
        column: failure.pos.column,
        offset: failure.pos.offset,
        message: failure.message,
        fixed: eff.fix && rule.is_fixable(),
    }
}
