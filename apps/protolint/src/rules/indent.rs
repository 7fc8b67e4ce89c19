//! Indentation consistency for block bodies.
//!
//! Every statement start and every closing brace is expected to be indented
//! by the configured style repeated once per enclosing block. Lines that no
//! node starts on (blank lines, comments, continuation lines) are not
//! checked, and neither is a node that shares its line with an earlier
//! statement. Block comments in front of a node do not count as statements.

use std::path::Path;

use super::{Rule, RuleBuildError};
use crate::fixer::{self, FsLineWriter, LineWriter};
use crate::models::Failure;
use crate::parser::ast::*;
use crate::parser::meta::{Meta, Position};

const ID: &str = "INDENT";
const MESSAGE: &str = r#"Found an incorrect indentation style "%s". "%s" is correct."#;
const DEFAULT_STYLE: &str = "\t";

/// Checks and optionally fixes leading whitespace per nesting depth.
pub struct IndentRule {
    style: String,
    newline: String,
    fix: bool,
    writer: Box<dyn LineWriter>,
}

impl IndentRule {
    /// An empty `style` selects a tab. `newline` must be `\n`, `\r\n` or `\r`
    /// and should match the files being fixed.
    pub fn new(style: &str, newline: &str, fix: bool) -> Result<Self, RuleBuildError> {
        let style = if style.is_empty() { DEFAULT_STYLE } else { style };
        if !style.chars().all(|c| c.is_whitespace() && c != '\n' && c != '\r') {
            return Err(RuleBuildError::InvalidIndentStyle(style.to_string()));
        }
        if !matches!(newline, "\n" | "\r\n" | "\r") {
            return Err(RuleBuildError::InvalidNewline(newline.to_string()));
        }
        Ok(Self {
            style: style.to_string(),
            newline: newline.to_string(),
            fix,
            writer: Box::new(FsLineWriter),
        })
    }

    /// Replace the writer used to persist fixes.
    pub fn with_writer(mut self, writer: Box<dyn LineWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Compare `lines` against the expected indentation of `proto`.
    ///
    /// Returns the failures in document order and `lines` with every
    /// reported line re-indented. Nothing is read or written.
    pub fn inspect(&self, proto: &Proto, lines: Vec<String>) -> (Vec<Failure>, Vec<String>) {
        let mut pass = IndentPass {
            style: &self.style,
            leading: lines.iter().map(|l| leading_len(l)).collect(),
            lines,
            failures: Vec::new(),
        };
        pass.proto(proto);
        (pass.failures, pass.lines)
    }
}

impl Rule for IndentRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn purpose(&self) -> &'static str {
        "Enforces a consistent indentation style."
    }

    fn is_official(&self) -> bool {
        true
    }

    fn is_fixable(&self) -> bool {
        true
    }

    /// In fix mode the file is re-read from disk, corrected, and written back
    /// even when nothing changed; the returned failures describe what was
    /// fixed.
    fn apply(&self, proto: &Proto) -> anyhow::Result<Vec<Failure>> {
        if !self.fix {
            let lines = proto
                .source
                .split(self.newline.as_str())
                .map(str::to_string)
                .collect();
            let (failures, _) = self.inspect(proto, lines);
            return Ok(failures);
        }

        let path = Path::new(&proto.filename);
        let lines = fixer::read_lines(path, &self.newline)?;
        let (failures, fixed) = self.inspect(proto, lines);
        self.writer.write_lines(path, &fixed, &self.newline)?;
        Ok(failures)
    }
}

struct IndentPass<'a> {
    style: &'a str,
    lines: Vec<String>,
    /// Leading whitespace length of each line before any rewrite.
    leading: Vec<usize>,
    failures: Vec<Failure>,
}

impl IndentPass<'_> {
    fn proto(&mut self, proto: &Proto) {
        for item in &proto.body {
            match item {
                ProtoBody::Syntax(s) => self.check(&s.meta.pos, 0),
                ProtoBody::Edition(e) => self.check(&e.meta.pos, 0),
                ProtoBody::Package(p) => self.check(&p.meta.pos, 0),
                ProtoBody::Import(i) => self.check(&i.meta.pos, 0),
                ProtoBody::Option(o) => self.check(&o.meta.pos, 0),
                ProtoBody::Empty(e) => self.check(&e.meta.pos, 0),
                ProtoBody::Message(m) => self.block(&m.meta, &m.body, 0),
                ProtoBody::Enum(e) => self.enumeration(e, 0),
                ProtoBody::Service(s) => self.service(s, 0),
                ProtoBody::Extend(e) => self.block(&e.meta, &e.body, 0),
            }
        }
    }

    /// Opening line at `depth`, children at `depth + 1`, closing brace back
    /// at `depth`.
    fn block(&mut self, meta: &Meta, body: &[MessageBody], depth: usize) {
        self.check(&meta.pos, depth);
        for item in body {
            self.message_body(item, depth + 1);
        }
        self.check(&meta.last_pos, depth);
    }

    fn message_body(&mut self, item: &MessageBody, depth: usize) {
        match item {
            MessageBody::Field(f) => self.check(&f.meta.pos, depth),
            MessageBody::MapField(f) => self.check(&f.meta.pos, depth),
            MessageBody::Option(o) => self.check(&o.meta.pos, depth),
            MessageBody::Reserved(r) => self.check(&r.meta.pos, depth),
            MessageBody::Extensions(e) => self.check(&e.meta.pos, depth),
            MessageBody::Empty(e) => self.check(&e.meta.pos, depth),
            MessageBody::Message(m) => self.block(&m.meta, &m.body, depth),
            MessageBody::Oneof(o) => self.block(&o.meta, &o.body, depth),
            MessageBody::Group(g) => self.block(&g.meta, &g.body, depth),
            MessageBody::Extend(e) => self.block(&e.meta, &e.body, depth),
            MessageBody::Enum(e) => self.enumeration(e, depth),
        }
    }

    fn enumeration(&mut self, e: &Enum, depth: usize) {
        self.check(&e.meta.pos, depth);
        for item in &e.body {
            let pos = match item {
                EnumBody::Field(f) => &f.meta.pos,
                EnumBody::Option(o) => &o.meta.pos,
                EnumBody::Reserved(r) => &r.meta.pos,
                EnumBody::Empty(x) => &x.meta.pos,
            };
            self.check(pos, depth + 1);
        }
        self.check(&e.meta.last_pos, depth);
    }

    fn service(&mut self, s: &Service, depth: usize) {
        self.check(&s.meta.pos, depth);
        for item in &s.body {
            match item {
                ServiceBody::Rpc(r) => self.rpc(r, depth + 1),
                ServiceBody::Option(o) => self.check(&o.meta.pos, depth + 1),
                ServiceBody::Empty(e) => self.check(&e.meta.pos, depth + 1),
            }
        }
        self.check(&s.meta.last_pos, depth);
    }

    fn rpc(&mut self, rpc: &Rpc, depth: usize) {
        self.check(&rpc.meta.pos, depth);
        if rpc.has_body {
            for item in &rpc.body {
                let pos = match item {
                    RpcBody::Option(o) => &o.meta.pos,
                    RpcBody::Empty(e) => &e.meta.pos,
                };
                self.check(pos, depth + 1);
            }
            self.check(&rpc.meta.last_pos, depth);
        }
    }

    fn check(&mut self, pos: &Position, depth: usize) {
        let Some(idx) = pos.line.checked_sub(1) else {
            return;
        };
        let (Some(line), Some(&original)) = (self.lines.get_mut(idx), self.leading.get(idx)) else {
            return;
        };
        // only the first statement on a line has an expected indentation;
        // a rewrite touches leading whitespace only, so the rest of the line
        // still matches what the parser saw
        let Some(offset) = pos.column.checked_sub(original + 1) else {
            return;
        };
        let current = leading_len(line);
        let Some(before) = line.get(current..current + offset) else {
            return;
        };
        if !only_block_comments(before) {
            return;
        }

        let expected = self.style.repeat(depth);
        if line[..current] == expected {
            return;
        }
        self.failures.push(Failure::formatted(
            pos.clone(),
            MESSAGE,
            &[&line[..current], &expected],
        ));
        line.replace_range(..current, &expected);
    }
}

fn leading_len(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Whether `text` holds nothing but whitespace and complete `/* */` comments.
fn only_block_comments(mut text: &str) -> bool {
    loop {
        text = text.trim_start();
        if text.is_empty() {
            return true;
        }
        let Some(rest) = text.strip_prefix("/*") else {
            return false;
        };
        let Some(end) = rest.find("*/") else {
            return false;
        };
        text = &rest[end + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_file, parse_source};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const SPACE4: &str = "    ";

    type Writes = Arc<Mutex<Vec<(PathBuf, Vec<String>, String)>>>;

    struct Recorder(Writes);

    impl LineWriter for Recorder {
        fn write_lines(&self, path: &Path, lines: &[String], newline: &str) -> anyhow::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((path.to_path_buf(), lines.to_vec(), newline.to_string()));
            Ok(())
        }
    }

    fn check(style: &str, src: &str) -> Vec<Failure> {
        let proto = parse_source("t.proto", src).unwrap();
        IndentRule::new(style, "\n", false)
            .unwrap()
            .apply(&proto)
            .unwrap()
    }

    fn lines_of(failures: &[Failure]) -> Vec<usize> {
        failures.iter().map(|f| f.pos.line).collect()
    }

    #[test]
    fn test_syntax_only_has_no_failures() {
        assert!(check(SPACE4, "syntax = \"proto3\";\n").is_empty());
        assert!(check("", "syntax = \"proto3\";\n").is_empty());
    }

    #[test]
    fn test_under_indented_field() {
        let got = check(SPACE4, "message A {\n int32 x = 1;\n}\n");
        assert_eq!(
            got,
            vec![Failure::formatted(
                Position::new("t.proto", 13, 2, 2),
                MESSAGE,
                &[" ", SPACE4],
            )]
        );
    }

    #[test]
    fn test_top_level_statement_expects_empty_indentation() {
        let got = check(SPACE4, "syntax = \"proto3\";\n    package foo;\n");
        assert_eq!(got.len(), 1);
        assert_eq!(
            got[0].message,
            r#"Found an incorrect indentation style "    ". "" is correct."#
        );
    }

    #[test]
    fn test_failures_follow_document_order() {
        let src = "message A {\n    message B {\n    int32 x = 1;\n  }\n }\n";
        let got = check(SPACE4, src);
        assert_eq!(lines_of(&got), vec![3, 4, 5]);
        assert_eq!(got[0].message, Failure::formatted(got[0].pos.clone(), MESSAGE, &[SPACE4, "        "]).message);
        assert_eq!(got[2].message, Failure::formatted(got[2].pos.clone(), MESSAGE, &[" ", ""]).message);
    }

    #[test]
    fn test_empty_style_defaults_to_tab() {
        let rule = IndentRule::new("", "\n", false).unwrap();
        assert_eq!(rule.style(), "\t");

        let tabs = "message A {\n\tint32 x = 1;\n\tenum E {\n\t\tX = 0;\n\t}\n}\n";
        assert!(check("", tabs).is_empty());

        let spaces = "message A {\n    int32 x = 1;\n    int32 y = 2;\n}\n";
        let got = check("", spaces);
        assert_eq!(lines_of(&got), vec![2, 3]);
        assert_eq!(
            got[0].message,
            "Found an incorrect indentation style \"    \". \"\t\" is correct."
        );
    }

    #[test]
    fn test_zero_indentation_reports_empty_actual() {
        let got = check(SPACE4, "message A {\nint32 x = 1;\n}\n");
        assert_eq!(
            got[0].message,
            r#"Found an incorrect indentation style "". "    " is correct."#
        );
        assert_eq!(got[0].pos.column, 1);
    }

    #[test]
    fn test_inline_nodes_are_not_checked() {
        assert!(check(SPACE4, "message A { int32 x = 1; }\nmessage B {}\n").is_empty());
        // second statement on the line is skipped, first is checked
        let got = check(SPACE4, "message A {\n  int32 x = 1; int32 y = 2;\n}\n");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].pos.column, 3);
    }

    #[test]
    fn test_later_node_on_reindented_line_is_not_checked() {
        let got = check(SPACE4, "enum E {\nA=0;}\n");
        assert_eq!(
            got,
            vec![Failure::formatted(
                Position::new("t.proto", 9, 2, 1),
                MESSAGE,
                &["", SPACE4],
            )]
        );
    }

    #[test]
    fn test_fix_with_two_nodes_on_one_line_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.proto");
        fs::write(&path, "enum E {\nA=0;}\n").unwrap();
        let rule = IndentRule::new(SPACE4, "\n", true).unwrap();

        let first = rule.apply(&parse_file(&path).unwrap()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "enum E {\n    A=0;}\n");

        let second = rule.apply(&parse_file(&path).unwrap()).unwrap();
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "enum E {\n    A=0;}\n");
    }

    #[test]
    fn test_node_after_leading_block_comment_is_checked() {
        let src = "message A {\n  /* c */ int32 x = 1;\n    /* a */ /* b */ int32 y = 2;\n}\n";
        let got = check(SPACE4, src);
        assert_eq!(
            got,
            vec![Failure::formatted(
                Position::new("t.proto", 22, 2, 11),
                MESSAGE,
                &["  ", SPACE4],
            )]
        );

        let proto = parse_source("t.proto", src).unwrap();
        let rule = IndentRule::new(SPACE4, "\n", false).unwrap();
        let (_, fixed) = rule.inspect(&proto, src.split('\n').map(str::to_string).collect());
        assert_eq!(fixed[1], "    /* c */ int32 x = 1;");
    }

    #[test]
    fn test_comments_and_blank_lines_are_not_checked() {
        let src = "message A {\n        // odd comment\n\n    int32 x = 1;\n  /* block */\n}\n";
        assert!(check(SPACE4, src).is_empty());
    }

    #[test]
    fn test_service_rpc_bodies() {
        let src = "service S {\n    rpc A (Req) returns (Resp) {\n      option deprecated = true;\n    }\n  rpc B (Req) returns (Resp);\n}\n";
        let got = check(SPACE4, src);
        assert_eq!(lines_of(&got), vec![3, 5]);
    }

    #[test]
    fn test_rpc_body_empty_statements_are_checked() {
        let src = "service S {\n    rpc A (Req) returns (Resp) {\n        ;\n      ;\n    }\n}\n";
        let got = check(SPACE4, src);
        assert_eq!(lines_of(&got), vec![4]);
        assert_eq!((got[0].pos.offset, got[0].pos.column), (61, 7));
    }

    #[test]
    fn test_enum_oneof_and_extend_use_same_depth_rule() {
        let src = "enum E {\n    A = 0;\n}\nmessage M {\n    oneof o {\n        string s = 1;\n    }\n}\nextend Foo {\n    int32 bar = 100;\n}\n";
        assert!(check(SPACE4, src).is_empty());

        let bad = "enum E {\n  A = 0;\n}\nmessage M {\n    oneof o {\n      string s = 1;\n    }\n}\n";
        assert_eq!(lines_of(&check(SPACE4, bad)), vec![2, 6]);
    }

    #[test]
    fn test_crlf_source_with_crlf_newline() {
        let src = "message A {\r\n  int32 x = 1;\r\n}\r\n";
        let proto = parse_source("t.proto", src).unwrap();
        let got = IndentRule::new(SPACE4, "\r\n", false)
            .unwrap()
            .apply(&proto)
            .unwrap();
        assert_eq!(lines_of(&got), vec![2]);
    }

    #[test]
    fn test_cr_only_source_with_cr_newline() {
        let src = "message A {\r  int32 x = 1;\r}\r";
        let proto = parse_source("t.proto", src).unwrap();
        let got = IndentRule::new(SPACE4, "\r", false)
            .unwrap()
            .apply(&proto)
            .unwrap();
        assert_eq!(
            got,
            vec![Failure::formatted(
                Position::new("t.proto", 14, 2, 3),
                MESSAGE,
                &["  ", SPACE4],
            )]
        );
    }

    #[test]
    fn test_fix_cr_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.proto");
        fs::write(&path, "message A {\r  int32 x = 1;\r}\r").unwrap();
        let rule = IndentRule::new(SPACE4, "\r", true).unwrap();

        assert_eq!(rule.apply(&parse_file(&path).unwrap()).unwrap().len(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "message A {\r    int32 x = 1;\r}\r"
        );
        assert!(rule.apply(&parse_file(&path).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_inspect_returns_corrected_lines() {
        let src = "message A {\n  int32 x = 1;\n}";
        let proto = parse_source("t.proto", src).unwrap();
        let rule = IndentRule::new(SPACE4, "\n", false).unwrap();
        let lines = src.split('\n').map(str::to_string).collect();
        let (failures, fixed) = rule.inspect(&proto, lines);
        assert_eq!(failures.len(), 1);
        assert_eq!(fixed, vec!["message A {", "    int32 x = 1;", "}"]);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        assert_eq!(
            IndentRule::new("ab", "\n", false).err(),
            Some(RuleBuildError::InvalidIndentStyle("ab".into()))
        );
        assert_eq!(
            IndentRule::new(SPACE4, ";", false).err(),
            Some(RuleBuildError::InvalidNewline(";".into()))
        );
        assert!(IndentRule::new("  \n", "\n", false).is_err());
    }

    #[test]
    fn test_fix_mode_hands_corrected_lines_to_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.proto");
        fs::write(&path, "message A {\n  int32 x = 1;\n}\n").unwrap();
        let proto = parse_file(&path).unwrap();

        let writes: Writes = Arc::default();
        let rule = IndentRule::new(SPACE4, "\n", true)
            .unwrap()
            .with_writer(Box::new(Recorder(writes.clone())));
        let failures = rule.apply(&proto).unwrap();

        assert_eq!(failures.len(), 1);
        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, path);
        assert_eq!(writes[0].1, vec!["message A {", "    int32 x = 1;", "}", ""]);
        assert_eq!(writes[0].2, "\n");
    }

    #[test]
    fn test_fix_mode_writes_even_without_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.proto");
        fs::write(&path, "syntax = \"proto3\";\n").unwrap();
        let proto = parse_file(&path).unwrap();

        let writes: Writes = Arc::default();
        let rule = IndentRule::new(SPACE4, "\n", true)
            .unwrap()
            .with_writer(Box::new(Recorder(writes.clone())));
        assert!(rule.apply(&proto).unwrap().is_empty());
        assert_eq!(writes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fix_is_idempotent_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.proto");
        fs::write(
            &path,
            "syntax = \"proto3\";\n\nmessage A {\n  message B {\n      int32 x = 1;\n   }\n int32 y = 2;\n}\n",
        )
        .unwrap();
        let rule = IndentRule::new(SPACE4, "\n", true).unwrap();

        let first = rule.apply(&parse_file(&path).unwrap()).unwrap();
        assert_eq!(first.len(), 4);
        let after_first = fs::read_to_string(&path).unwrap();
        assert_eq!(
            after_first,
            "syntax = \"proto3\";\n\nmessage A {\n    message B {\n        int32 x = 1;\n    }\n    int32 y = 2;\n}\n"
        );

        let second = rule.apply(&parse_file(&path).unwrap()).unwrap();
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn test_fix_mode_read_failure_is_an_error() {
        let proto = parse_source("/nonexistent/dir/a.proto", "syntax = \"proto3\";\n").unwrap();
        let rule = IndentRule::new(SPACE4, "\n", true).unwrap();
        assert!(rule.apply(&proto).is_err());
    }
}
