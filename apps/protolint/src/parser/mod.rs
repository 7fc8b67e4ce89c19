//! Recursive-descent parser for `.proto` schema files.
//!
//! Produces a [`Proto`] whose nodes all carry exact source positions. Only
//! the syntactic shape is checked; types, imports, and field numbers are not
//! validated.

pub mod ast;
pub mod lexer;
pub mod meta;

use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::Path;

use ast::*;
use lexer::{Lexer, Token, TokenKind};
use meta::{Meta, Position};

/// A syntax error with the position of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Position) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Read and parse the file at `path`. The path string is recorded as the
/// filename of every position.
pub fn parse_file(path: impl AsRef<Path>) -> anyhow::Result<Proto> {
    let path = path.as_ref();
    let source =
        fs::read_to_string(path).with_context(|| format!("read proto: {}", path.display()))?;
    let proto = parse_source(&path.to_string_lossy(), &source)?;
    Ok(proto)
}

/// Parse `source` as if it had been read from `filename`.
pub fn parse_source(filename: &str, source: &str) -> Result<Proto, ParseError> {
    let tokens = Lexer::new(filename, source).tokenize()?;
    let (comments, tokens): (Vec<Token>, Vec<Token>) = tokens
        .into_iter()
        .partition(|t| t.kind == TokenKind::Comment);

    let mut parser = Parser {
        filename,
        source,
        tokens,
        cursor: 0,
    };
    let body = parser.proto_body()?;

    Ok(Proto {
        filename: filename.to_string(),
        source: source.to_string(),
        body,
        comments: comments
            .into_iter()
            .map(|t| Comment {
                raw: t.text.to_string(),
                pos: t.position(filename),
            })
            .collect(),
    })
}

struct Parser<'a> {
    filename: &'a str,
    source: &'a str,
    /// Comment-free token stream; always ends with `Eof`.
    tokens: Vec<Token<'a>>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Token<'a> {
        let idx = (self.cursor + n).min(self.tokens.len() - 1);
        self.tokens[idx]
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        tok
    }

    fn previous(&self) -> Token<'a> {
        self.tokens[self.cursor.saturating_sub(1)]
    }

    fn meta(&self, first: Token<'a>, last: Token<'a>) -> Meta {
        Meta {
            pos: first.position(self.filename),
            last_pos: last.position(self.filename),
        }
    }

    fn unexpected(&self, tok: Token<'a>, expected: &str) -> ParseError {
        let found = match tok.kind {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("{:?}", tok.text),
        };
        ParseError::new(
            format!("found {} but expected {}", found, expected),
            tok.position(self.filename),
        )
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<Token<'a>, ParseError> {
        let tok = self.peek();
        if tok.is_symbol(sym) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(tok, &format!("\"{}\"", sym)))
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<Token<'a>, ParseError> {
        let tok = self.peek();
        if tok.is_keyword(kw) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(tok, &format!("\"{}\"", kw)))
        }
    }

    fn expect_ident(&mut self) -> Result<Token<'a>, ParseError> {
        let tok = self.peek();
        if tok.kind == TokenKind::Ident {
            Ok(self.bump())
        } else {
            Err(self.unexpected(tok, "an identifier"))
        }
    }

    /// One or more adjacent string literals, unquoted and concatenated.
    fn expect_string(&mut self) -> Result<String, ParseError> {
        let tok = self.peek();
        if tok.kind != TokenKind::Str {
            return Err(self.unexpected(tok, "a string literal"));
        }
        let mut value = String::new();
        while self.peek().kind == TokenKind::Str {
            let t = self.bump();
            value.push_str(&t.text[1..t.text.len() - 1]);
        }
        Ok(value)
    }

    /// An integer literal with an optional leading minus sign.
    fn expect_number(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        if self.peek().is_symbol("-") {
            self.bump();
            out.push('-');
        }
        let tok = self.peek();
        if tok.kind != TokenKind::Number {
            return Err(self.unexpected(tok, "a number"));
        }
        out.push_str(self.bump().text);
        Ok(out)
    }

    /// `[.]ident{.ident}`
    fn full_ident(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        if self.peek().is_symbol(".") {
            self.bump();
            out.push('.');
        }
        out.push_str(self.expect_ident()?.text);
        while self.peek().is_symbol(".") && self.peek_at(1).kind == TokenKind::Ident {
            self.bump();
            out.push('.');
            out.push_str(self.bump().text);
        }
        Ok(out)
    }

    fn raw_between(&self, first: Token<'a>, last: Token<'a>) -> String {
        self.source[first.offset..last.end()].to_string()
    }

    /// True when the next statement is the declaration `kw`, not a field
    /// whose type happens to be spelled `kw`.
    fn at_declaration(&self, kw: &str) -> bool {
        self.peek().is_keyword(kw) && !self.peek_at(2).is_symbol("=")
    }

    fn proto_body(&mut self) -> Result<Vec<ProtoBody>, ParseError> {
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            let item = match (tok.kind, tok.text) {
                (TokenKind::Eof, _) => break,
                (TokenKind::Symbol, ";") => ProtoBody::Empty(self.empty_statement()?),
                (TokenKind::Ident, "syntax") => ProtoBody::Syntax(self.syntax()?),
                (TokenKind::Ident, "edition") => ProtoBody::Edition(self.edition()?),
                (TokenKind::Ident, "package") => ProtoBody::Package(self.package()?),
                (TokenKind::Ident, "import") => ProtoBody::Import(self.import()?),
                (TokenKind::Ident, "option") => ProtoBody::Option(self.option_statement()?),
                (TokenKind::Ident, "message") => ProtoBody::Message(self.message()?),
                (TokenKind::Ident, "enum") => ProtoBody::Enum(self.enumeration()?),
                (TokenKind::Ident, "service") => ProtoBody::Service(self.service()?),
                (TokenKind::Ident, "extend") => ProtoBody::Extend(self.extend()?),
                _ => return Err(self.unexpected(tok, "a top-level statement")),
            };
            body.push(item);
        }
        Ok(body)
    }

    fn empty_statement(&mut self) -> Result<EmptyStatement, ParseError> {
        let tok = self.expect_symbol(";")?;
        Ok(EmptyStatement {
            meta: self.meta(tok, tok),
        })
    }

    fn syntax(&mut self) -> Result<Syntax, ParseError> {
        let first = self.expect_keyword("syntax")?;
        self.expect_symbol("=")?;
        let proto_version = self.expect_string()?;
        let last = self.expect_symbol(";")?;
        Ok(Syntax {
            proto_version,
            meta: self.meta(first, last),
        })
    }

    fn edition(&mut self) -> Result<Edition, ParseError> {
        let first = self.expect_keyword("edition")?;
        self.expect_symbol("=")?;
        let edition = self.expect_string()?;
        let last = self.expect_symbol(";")?;
        Ok(Edition {
            edition,
            meta: self.meta(first, last),
        })
    }

    fn package(&mut self) -> Result<Package, ParseError> {
        let first = self.expect_keyword("package")?;
        let name = self.full_ident()?;
        let last = self.expect_symbol(";")?;
        Ok(Package {
            name,
            meta: self.meta(first, last),
        })
    }

    fn import(&mut self) -> Result<Import, ParseError> {
        let first = self.expect_keyword("import")?;
        let modifier = match self.peek().text {
            "weak" if self.peek_at(1).kind == TokenKind::Str => Some(ImportModifier::Weak),
            "public" if self.peek_at(1).kind == TokenKind::Str => Some(ImportModifier::Public),
            _ => None,
        };
        if modifier.is_some() {
            self.bump();
        }
        let location = self.expect_string()?;
        let last = self.expect_symbol(";")?;
        Ok(Import {
            modifier,
            location,
            meta: self.meta(first, last),
        })
    }

    /// `ident | "(" fullIdent ")"` joined by dots.
    fn option_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        loop {
            if self.peek().is_symbol("(") {
                self.bump();
                name.push('(');
                name.push_str(&self.full_ident()?);
                self.expect_symbol(")")?;
                name.push(')');
            } else {
                name.push_str(self.expect_ident()?.text);
            }
            if self.peek().is_symbol(".") {
                self.bump();
                name.push('.');
            } else {
                break;
            }
        }
        Ok(name)
    }

    /// A scalar constant or a `{ ... }` aggregate, returned as source text.
    fn constant(&mut self) -> Result<String, ParseError> {
        let first = self.peek();
        if first.is_symbol("{") {
            let last = self.aggregate()?;
            return Ok(self.raw_between(first, last));
        }
        if first.is_symbol("-") || first.is_symbol("+") {
            self.bump();
        }
        let tok = self.peek();
        match tok.kind {
            TokenKind::Str => {
                while self.peek().kind == TokenKind::Str {
                    self.bump();
                }
            }
            TokenKind::Number => {
                self.bump();
            }
            TokenKind::Ident => {
                self.full_ident()?;
            }
            _ => return Err(self.unexpected(tok, "a constant")),
        }
        Ok(self.raw_between(first, self.previous()))
    }

    /// Skip a balanced `{ ... }` and return the closing brace.
    fn aggregate(&mut self) -> Result<Token<'a>, ParseError> {
        let open = self.expect_symbol("{")?;
        let mut depth = 1usize;
        loop {
            let tok = self.bump();
            match tok.kind {
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        "unterminated aggregate value",
                        open.position(self.filename),
                    ))
                }
                TokenKind::Symbol if tok.text == "{" => depth += 1,
                TokenKind::Symbol if tok.text == "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(tok);
                    }
                }
                _ => {}
            }
        }
    }

    fn option_statement(&mut self) -> Result<OptionStmt, ParseError> {
        let first = self.expect_keyword("option")?;
        let name = self.option_name()?;
        self.expect_symbol("=")?;
        let constant = self.constant()?;
        let last = self.expect_symbol(";")?;
        Ok(OptionStmt {
            name,
            constant,
            meta: self.meta(first, last),
        })
    }

    fn field_options(&mut self) -> Result<Vec<FieldOption>, ParseError> {
        let mut options = Vec::new();
        if !self.peek().is_symbol("[") {
            return Ok(options);
        }
        self.bump();
        loop {
            let name = self.option_name()?;
            self.expect_symbol("=")?;
            let constant = self.constant()?;
            options.push(FieldOption { name, constant });
            if self.peek().is_symbol(",") {
                self.bump();
            } else {
                break;
            }
        }
        self.expect_symbol("]")?;
        Ok(options)
    }

    fn message(&mut self) -> Result<Message, ParseError> {
        let first = self.expect_keyword("message")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("{")?;
        let body = self.message_body()?;
        let last = self.expect_symbol("}")?;
        Ok(Message {
            name,
            body,
            meta: self.meta(first, last),
        })
    }

    /// Statements up to (not including) the closing brace.
    fn message_body(&mut self) -> Result<Vec<MessageBody>, ParseError> {
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            if tok.is_symbol("}") || tok.kind == TokenKind::Eof {
                break;
            }
            let item = if tok.is_symbol(";") {
                MessageBody::Empty(self.empty_statement()?)
            } else if self.at_declaration("message") {
                MessageBody::Message(self.message()?)
            } else if self.at_declaration("enum") {
                MessageBody::Enum(self.enumeration()?)
            } else if self.at_declaration("oneof") {
                MessageBody::Oneof(self.oneof()?)
            } else if self.at_declaration("extend") {
                MessageBody::Extend(self.extend()?)
            } else if tok.is_keyword("option") {
                MessageBody::Option(self.option_statement()?)
            } else if self.at_declaration("reserved") {
                MessageBody::Reserved(self.reserved()?)
            } else if self.at_declaration("extensions") {
                MessageBody::Extensions(self.extensions()?)
            } else if tok.is_keyword("map") && self.peek_at(1).is_symbol("<") {
                MessageBody::MapField(self.map_field()?)
            } else {
                self.field_or_group()?
            };
            body.push(item);
        }
        Ok(body)
    }

    fn field_or_group(&mut self) -> Result<MessageBody, ParseError> {
        let first = self.peek();
        let next = self.peek_at(1);
        let has_label = matches!(first.text, "repeated" | "optional" | "required")
            && first.kind == TokenKind::Ident
            && (next.kind == TokenKind::Ident || next.is_symbol("."))
            && !self.peek_at(2).is_symbol("=");
        let label = if has_label {
            Some(self.bump().text.to_string())
        } else {
            None
        };
        let type_name = self.full_ident()?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("=")?;
        let number = self.expect_number()?;
        let options = self.field_options()?;

        if type_name == "group" && self.peek().is_symbol("{") {
            self.bump();
            let body = self.message_body()?;
            let last = self.expect_symbol("}")?;
            return Ok(MessageBody::Group(Group {
                label,
                name,
                number,
                options,
                body,
                meta: self.meta(first, last),
            }));
        }

        let last = self.expect_symbol(";")?;
        Ok(MessageBody::Field(Field {
            label,
            type_name,
            name,
            number,
            options,
            meta: self.meta(first, last),
        }))
    }

    fn map_field(&mut self) -> Result<MapField, ParseError> {
        let first = self.expect_keyword("map")?;
        self.expect_symbol("<")?;
        let key_type = self.full_ident()?;
        self.expect_symbol(",")?;
        let value_type = self.full_ident()?;
        self.expect_symbol(">")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("=")?;
        let number = self.expect_number()?;
        let options = self.field_options()?;
        let last = self.expect_symbol(";")?;
        Ok(MapField {
            key_type,
            value_type,
            name,
            number,
            options,
            meta: self.meta(first, last),
        })
    }

    fn oneof(&mut self) -> Result<Oneof, ParseError> {
        let first = self.expect_keyword("oneof")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("{")?;
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            if tok.is_symbol("}") || tok.kind == TokenKind::Eof {
                break;
            }
            let item = if tok.is_symbol(";") {
                MessageBody::Empty(self.empty_statement()?)
            } else if tok.is_keyword("option") {
                MessageBody::Option(self.option_statement()?)
            } else {
                self.field_or_group()?
            };
            body.push(item);
        }
        let last = self.expect_symbol("}")?;
        Ok(Oneof {
            name,
            body,
            meta: self.meta(first, last),
        })
    }

    fn extend(&mut self) -> Result<Extend, ParseError> {
        let first = self.expect_keyword("extend")?;
        let message_type = self.full_ident()?;
        self.expect_symbol("{")?;
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            if tok.is_symbol("}") || tok.kind == TokenKind::Eof {
                break;
            }
            let item = if tok.is_symbol(";") {
                MessageBody::Empty(self.empty_statement()?)
            } else {
                self.field_or_group()?
            };
            body.push(item);
        }
        let last = self.expect_symbol("}")?;
        Ok(Extend {
            message_type,
            body,
            meta: self.meta(first, last),
        })
    }

    /// `range {"," range}` where range is `int [to (int|max)]`.
    fn ranges(&mut self) -> Result<Vec<String>, ParseError> {
        let mut ranges = Vec::new();
        loop {
            let start = self.expect_number()?;
            if self.peek().is_keyword("to") {
                self.bump();
                let end = if self.peek().is_keyword("max") {
                    self.bump();
                    "max".to_string()
                } else {
                    self.expect_number()?
                };
                ranges.push(format!("{} to {}", start, end));
            } else {
                ranges.push(start);
            }
            if self.peek().is_symbol(",") {
                self.bump();
            } else {
                break;
            }
        }
        Ok(ranges)
    }

    fn reserved(&mut self) -> Result<Reserved, ParseError> {
        let first = self.expect_keyword("reserved")?;
        let mut ranges = Vec::new();
        let mut field_names = Vec::new();
        match self.peek().kind {
            TokenKind::Str | TokenKind::Ident => loop {
                let tok = self.peek();
                if tok.kind == TokenKind::Str {
                    field_names.push(self.expect_string()?);
                } else {
                    field_names.push(self.expect_ident()?.text.to_string());
                }
                if self.peek().is_symbol(",") {
                    self.bump();
                } else {
                    break;
                }
            },
            _ => ranges = self.ranges()?,
        }
        let last = self.expect_symbol(";")?;
        Ok(Reserved {
            ranges,
            field_names,
            meta: self.meta(first, last),
        })
    }

    fn extensions(&mut self) -> Result<Extensions, ParseError> {
        let first = self.expect_keyword("extensions")?;
        let ranges = self.ranges()?;
        let options = self.field_options()?;
        let last = self.expect_symbol(";")?;
        Ok(Extensions {
            ranges,
            options,
            meta: self.meta(first, last),
        })
    }

    fn enumeration(&mut self) -> Result<Enum, ParseError> {
        let first = self.expect_keyword("enum")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("{")?;
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            if tok.is_symbol("}") || tok.kind == TokenKind::Eof {
                break;
            }
            let item = if tok.is_symbol(";") {
                EnumBody::Empty(self.empty_statement()?)
            } else if tok.is_keyword("option") {
                EnumBody::Option(self.option_statement()?)
            } else if self.at_declaration("reserved") {
                EnumBody::Reserved(self.reserved()?)
            } else {
                EnumBody::Field(self.enum_field()?)
            };
            body.push(item);
        }
        let last = self.expect_symbol("}")?;
        Ok(Enum {
            name,
            body,
            meta: self.meta(first, last),
        })
    }

    fn enum_field(&mut self) -> Result<EnumField, ParseError> {
        let first = self.expect_ident()?;
        self.expect_symbol("=")?;
        let number = self.expect_number()?;
        let options = self.field_options()?;
        let last = self.expect_symbol(";")?;
        Ok(EnumField {
            ident: first.text.to_string(),
            number,
            options,
            meta: self.meta(first, last),
        })
    }

    fn service(&mut self) -> Result<Service, ParseError> {
        let first = self.expect_keyword("service")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect_symbol("{")?;
        let mut body = Vec::new();
        loop {
            let tok = self.peek();
            let item = match (tok.kind, tok.text) {
                (TokenKind::Symbol, "}") | (TokenKind::Eof, _) => break,
                (TokenKind::Symbol, ";") => ServiceBody::Empty(self.empty_statement()?),
                (TokenKind::Ident, "option") => ServiceBody::Option(self.option_statement()?),
                (TokenKind::Ident, "rpc") => ServiceBody::Rpc(self.rpc()?),
                _ => return Err(self.unexpected(tok, "\"rpc\" or \"option\"")),
            };
            body.push(item);
        }
        let last = self.expect_symbol("}")?;
        Ok(Service {
            name,
            body,
            meta: self.meta(first, last),
        })
    }

    fn rpc_type(&mut self) -> Result<RpcType, ParseError> {
        self.expect_symbol("(")?;
        let tok = self.peek();
        let next = self.peek_at(1);
        // `stream .pkg.Msg` is a streaming type; `stream.Msg` is a type path.
        let stream = tok.is_keyword("stream")
            && (next.kind == TokenKind::Ident || (next.is_symbol(".") && next.offset > tok.end()));
        if stream {
            self.bump();
        }
        let message_type = self.full_ident()?;
        self.expect_symbol(")")?;
        Ok(RpcType {
            stream,
            message_type,
        })
    }

    fn rpc(&mut self) -> Result<Rpc, ParseError> {
        let first = self.expect_keyword("rpc")?;
        let name = self.expect_ident()?.text.to_string();
        let request = self.rpc_type()?;
        self.expect_keyword("returns")?;
        let response = self.rpc_type()?;

        let mut body = Vec::new();
        let has_body = self.peek().is_symbol("{");
        let last = if has_body {
            self.bump();
            loop {
                let tok = self.peek();
                match (tok.kind, tok.text) {
                    (TokenKind::Symbol, "}") => break,
                    (TokenKind::Symbol, ";") => body.push(RpcBody::Empty(self.empty_statement()?)),
                    (TokenKind::Ident, "option") => body.push(RpcBody::Option(self.option_statement()?)),
                    _ => return Err(self.unexpected(tok, "\"option\" or \"}\"")),
                }
            }
            self.expect_symbol("}")?
        } else {
            self.expect_symbol(";")?
        };

        Ok(Rpc {
            name,
            request,
            response,
            body,
            has_body,
            meta: self.meta(first, last),
        })
    }
}
