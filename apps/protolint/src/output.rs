//! Output rendering for lint results.
//!
//! Supports `human` (default), `plain` and `json` outputs. The JSON form is
//! the serialized `LintResult`: issues plus a top-level summary.

use crate::models::{Issue, LintResult};
use crate::utils::{colors_enabled, error_prefix, rel_to_wd};
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output == "human" && colors_enabled()
}

/// Print lint results in the requested format, followed by `errors` on
/// stderr.
pub fn print_lint(res: &LintResult, output: &str, errors: &[String]) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_lint_json(res)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", error_prefix(), e),
        },
        "plain" => {
            for is in &res.issues {
                println!("{}", plain_line(is));
            }
        }
        _ => print_human(res, use_colors(output)),
    }
    for e in errors {
        eprintln!("{} {}", error_prefix(), e);
    }
}

fn print_human(res: &LintResult, color: bool) {
    for is in &res.issues {
        let sev = match is.severity.as_str() {
            "error" => paint("⟦error⟧", color, |s| s.red().bold().to_string()),
            "warning" | "warn" => paint("⟦warn⟧", color, |s| s.yellow().bold().to_string()),
            _ => paint("⟦info⟧", color, |s| s.blue().bold().to_string()),
        };
        let icon = if is.fixed {
            paint("✔", color, |s| s.green().to_string())
        } else {
            match is.severity.as_str() {
                "error" => paint("✖", color, |s| s.red().to_string()),
                "warning" | "warn" => paint("▲", color, |s| s.yellow().to_string()),
                _ => paint("◆", color, |s| s.blue().to_string()),
            }
        };
        let loc = format!("{}:{}:{}", rel_to_wd(&is.file), is.line, is.column);
        let loc = paint(&loc, color, |s| s.bold().to_string());
        let fixed = if is.fixed { " (fixed)" } else { "" };
        println!("{} {} {} ❲{}❳ {}{}", icon, sev, loc, is.rule, is.message, fixed);
    }
    let s = &res.summary;
    let summary = format!(
        "Summary: errors={} warnings={} infos={} fixed={} files={}",
        s.errors, s.warnings, s.infos, s.fixed, s.files
    );
    println!("{}", paint(&summary, color, |s| s.bold().to_string()));
}

fn paint(text: &str, color: bool, f: fn(&str) -> String) -> String {
    if color {
        f(text)
    } else {
        text.to_string()
    }
}

/// `[file:line:col] message`, the classic protolint line.
pub fn plain_line(is: &Issue) -> String {
    format!(
        "[{}:{}:{}] {}",
        rel_to_wd(&is.file),
        is.line,
        is.column,
        is.message
    )
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(res: &LintResult) -> JsonVal {
    serde_json::to_value(res).unwrap_or(JsonVal::Null)
}
