use regex::Regex;

use super::{Rule, RuleBuildError};
use crate::models::Failure;
use crate::parser::ast::{EnumBody, Proto};

const ID: &str = "ENUM_FIELD_NAMES_UPPER_SNAKE_CASE";
const MESSAGE: &str = r#"EnumField name "%s" must be CAPITALS_WITH_UNDERSCORES"#;
const UPPER_SNAKE_CASE: &str = r"^[A-Z0-9]+(_[A-Z0-9]+)*$";

/// Enum value names must be CAPITALS_WITH_UNDERSCORES.
#[derive(Debug, Clone)]
pub struct EnumFieldNamesUpperSnakeCaseRule {
    pattern: Regex,
}

impl EnumFieldNamesUpperSnakeCaseRule {
    pub fn new() -> Result<Self, RuleBuildError> {
        let pattern = Regex::new(UPPER_SNAKE_CASE).map_err(|e| RuleBuildError::InvalidOption {
            rule: ID,
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }
}

impl Rule for EnumFieldNamesUpperSnakeCaseRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn purpose(&self) -> &'static str {
        "Verifies that all enum field names are CAPITALS_WITH_UNDERSCORES."
    }

    fn is_official(&self) -> bool {
        true
    }

    fn apply(&self, proto: &Proto) -> anyhow::Result<Vec<Failure>> {
        let mut failures = Vec::new();
        for e in proto.enums() {
            for item in &e.body {
                if let EnumBody::Field(field) = item {
                    if !self.pattern.is_match(&field.ident) {
                        failures.push(Failure::formatted(
                            field.meta.pos.clone(),
                            MESSAGE,
                            &[&field.ident],
                        ));
                    }
                }
            }
        }
        Ok(failures)
    }
}
