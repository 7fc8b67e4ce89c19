//! protolint core library.
//!
//! This crate exposes programmatic APIs for parsing `.proto` files, running
//! style rules over them, and fixing indentation in place.
//!
//! High-level modules:
//! - `parser`: Lexer, syntax tree and recursive-descent parser with exact positions.
//! - `rules`: The `Rule` contract, the rule catalog and selection.
//! - `fixer`: Whole-file line-buffer rewrites that keep permissions.
//! - `lint`: File discovery and the parallel lint/fix driver.
//! - `config`: Discovery and effective configuration resolution.
//! - `models`: Failures, issues and lint output structs.
//! - `output`: Human/plain/JSON printers.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod fixer;
pub mod lint;
pub mod models;
pub mod output;
pub mod parser;
pub mod rules;
pub mod utils;
