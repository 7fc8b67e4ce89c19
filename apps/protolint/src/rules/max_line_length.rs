use super::{Rule, RuleBuildError};
use crate::models::Failure;
use crate::parser::ast::Proto;
use crate::parser::meta::Position;

const ID: &str = "MAX_LINE_LENGTH";
const MESSAGE: &str = "The line length is %s, but it must be shorter than %s";

/// Flags lines wider than `max_chars`. A tab counts as `tab_chars` columns,
/// every other character as one.
#[derive(Debug, Clone)]
pub struct MaxLineLengthRule {
    max_chars: usize,
    tab_chars: usize,
}

impl MaxLineLengthRule {
    pub fn new(max_chars: usize, tab_chars: usize) -> Result<Self, RuleBuildError> {
        if max_chars == 0 {
            return Err(RuleBuildError::InvalidOption {
                rule: ID,
                message: "max_chars must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            max_chars,
            tab_chars,
        })
    }

    fn width(&self, line: &str) -> usize {
        line.chars()
            .map(|c| if c == '\t' { self.tab_chars } else { 1 })
            .sum()
    }
}

impl Rule for MaxLineLengthRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn purpose(&self) -> &'static str {
        "Enforces a maximum line length."
    }

    fn is_official(&self) -> bool {
        false
    }

    fn apply(&self, proto: &Proto) -> anyhow::Result<Vec<Failure>> {
        let mut failures = Vec::new();
        let mut offset = 0;
        for (idx, raw) in proto.source.split_inclusive('\n').enumerate() {
            let line = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');
            let width = self.width(line);
            if width > self.max_chars {
                failures.push(Failure::formatted(
                    Position::new(&proto.filename, offset, idx + 1, 1),
                    MESSAGE,
                    &[&width.to_string(), &self.max_chars.to_string()],
                ));
            }
            offset += raw.len();
        }
        Ok(failures)
    }
}
