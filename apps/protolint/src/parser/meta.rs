//! Source positions attached to every syntax node.
//!
//! A `Position` is captured once by the lexer and threaded through the tree
//! and into diagnostics without ever being recomputed.

use serde::Serialize;
use std::fmt;

/// A point in a source file.
///
/// `offset` is a 0-based byte offset; `line` and `column` are 1-based, with
/// columns counted in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub filename: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(filename: impl Into<String>, offset: usize, line: usize, column: usize) -> Self {
        Self {
            filename: filename.into(),
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// Start and end of a statement.
///
/// For block nodes `last_pos` points at the closing `}`; for leaf statements
/// it points at the terminating `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub pos: Position,
    pub last_pos: Position,
}
