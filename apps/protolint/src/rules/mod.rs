//! Rule contract and the built-in rule catalog.
//!
//! Every rule turns a parsed [`Proto`] into zero or more [`Failure`]s. Rules
//! are constructed once per run from [`RulesOption`] and are shared across
//! files, so they hold no per-file state.

mod enum_field_names_upper_snake_case;
mod indent;
mod max_line_length;

pub use enum_field_names_upper_snake_case::EnumFieldNamesUpperSnakeCaseRule;
pub use indent::IndentRule;
pub use max_line_length::MaxLineLengthRule;

use crate::models::Failure;
use crate::parser::ast::Proto;
use std::fmt;

/// A lint rule.
pub trait Rule: Send + Sync {
    /// Stable identifier used by configuration, e.g. `INDENT`.
    fn id(&self) -> &'static str;

    /// One-line description of what the rule enforces.
    fn purpose(&self) -> &'static str;

    /// Whether the rule belongs to the default set.
    fn is_official(&self) -> bool;

    /// Whether `apply` rewrites the source file when built in fix mode.
    fn is_fixable(&self) -> bool {
        false
    }

    /// Check `proto`. Failures come back in the order they were found.
    fn apply(&self, proto: &Proto) -> anyhow::Result<Vec<Failure>>;
}

/// Rejected rule configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleBuildError {
    InvalidIndentStyle(String),
    InvalidNewline(String),
    InvalidOption { rule: &'static str, message: String },
    UnknownRule(String),
}

impl fmt::Display for RuleBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleBuildError::InvalidIndentStyle(style) => write!(
                f,
                "indent style must contain only whitespace, got {:?}",
                style
            ),
            RuleBuildError::InvalidNewline(newline) => write!(
                f,
                "newline must be one of \"\\n\", \"\\r\\n\", \"\\r\", got {:?}",
                newline
            ),
            RuleBuildError::InvalidOption { rule, message } => {
                write!(f, "rule '{}': {}", rule, message)
            }
            RuleBuildError::UnknownRule(id) => write!(f, "unknown rule id '{}'", id),
        }
    }
}

impl std::error::Error for RuleBuildError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentOption {
    /// One indentation unit. Empty means a tab.
    pub style: String,
    pub newline: String,
}

impl Default for IndentOption {
    fn default() -> Self {
        Self {
            style: String::new(),
            newline: "\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLineLengthOption {
    pub max_chars: usize,
    pub tab_chars: usize,
}

impl Default for MaxLineLengthOption {
    fn default() -> Self {
        Self {
            max_chars: 80,
            tab_chars: 4,
        }
    }
}

/// Per-rule options gathered from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesOption {
    pub indent: IndentOption,
    pub max_line_length: MaxLineLengthOption,
}

/// Which rules to run.
///
/// Starting set: every rule when `all_default`, none when `no_default`,
/// otherwise the official ones. Then `add` enables and `remove` disables by
/// id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSelection {
    pub no_default: bool,
    pub all_default: bool,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// Build every known rule. `fix` enables rewriting for fixable rules.
pub fn all_rules(option: &RulesOption, fix: bool) -> Result<Vec<Box<dyn Rule>>, RuleBuildError> {
    Ok(vec![
        Box::new(EnumFieldNamesUpperSnakeCaseRule::new()?) as Box<dyn Rule>,
        Box::new(IndentRule::new(
            &option.indent.style,
            &option.indent.newline,
            fix,
        )?),
        Box::new(MaxLineLengthRule::new(
            option.max_line_length.max_chars,
            option.max_line_length.tab_chars,
        )?),
    ])
}

/// Keep the rules enabled by `selection`, preserving catalog order.
pub fn select(
    rules: Vec<Box<dyn Rule>>,
    selection: &RuleSelection,
) -> Result<Vec<Box<dyn Rule>>, RuleBuildError> {
    for id in selection.add.iter().chain(selection.remove.iter()) {
        if !rules.iter().any(|r| r.id() == id) {
            return Err(RuleBuildError::UnknownRule(id.clone()));
        }
    }
    Ok(rules
        .into_iter()
        .filter(|r| {
            let base = if selection.all_default {
                true
            } else if selection.no_default {
                false
            } else {
                r.is_official()
            };
            let id = r.id();
            (base || selection.add.iter().any(|a| a == id))
                && !selection.remove.iter().any(|x| x == id)
        })
        .collect())
}
