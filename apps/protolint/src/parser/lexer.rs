//! Hand-written lexer for protocol buffer schema files.
//!
//! Tokens borrow their text from the source and record the byte offset,
//! line, and column where they start. Comments are emitted as tokens so the
//! parser can keep them on the document.

use super::meta::Position;
use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Symbol,
    Comment,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn is_symbol(&self, sym: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == sym
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == kw
    }

    /// Byte offset just past the token.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn position(&self, filename: &str) -> Position {
        Position::new(filename, self.offset, self.line, self.column)
    }
}

pub struct Lexer<'a> {
    filename: &'a str,
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole source. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, ParseError> {
        let mut tokens = Vec::with_capacity(self.source.len() / 4 + 1);
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        self.skip_whitespace();
        let (start, line, column) = (self.pos, self.line, self.column);

        let Some(c) = self.peek() else {
            return Ok(self.make_token(TokenKind::Eof, start, line, column));
        };

        let kind = match c {
            b'/' if self.peek_next() == Some(b'/') => {
                self.line_comment();
                TokenKind::Comment
            }
            b'/' if self.peek_next() == Some(b'*') => {
                self.block_comment(start, line, column)?;
                TokenKind::Comment
            }
            b'"' | b'\'' => {
                self.string(c, start, line, column)?;
                TokenKind::Str
            }
            b'.' if self.peek_next().is_some_and(|n| n.is_ascii_digit()) => {
                self.number(start);
                TokenKind::Number
            }
            c if c.is_ascii_digit() => {
                self.number(start);
                TokenKind::Number
            }
            c if is_ident_start(c) => {
                self.identifier();
                TokenKind::Ident
            }
            b'{' | b'}' | b'[' | b']' | b'(' | b')' | b'<' | b'>' | b';' | b',' | b'=' | b'.'
            | b'-' | b'+' | b':' => {
                self.advance();
                TokenKind::Symbol
            }
            _ => {
                let ch = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::new(
                    format!("unexpected character {:?}", ch),
                    Position::new(self.filename, start, line, column),
                ));
            }
        };

        Ok(self.make_token(kind, start, line, column))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        // "\r\n" breaks once, on its "\n"; a lone "\r" is a break of its own
        if b == b'\n' || (b == b'\r' && self.peek() != Some(b'\n')) {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        b
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.source[start..self.pos],
            offset: start,
            line,
            column,
        }
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            self.advance();
        }
    }

    fn block_comment(&mut self, start: usize, line: usize, column: usize) -> Result<(), ParseError> {
        // opening "/*"
        self.advance();
        self.advance();
        while self.peek().is_some() {
            if self.peek() == Some(b'*') && self.peek_next() == Some(b'/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
        Err(ParseError::new(
            "unterminated block comment",
            Position::new(self.filename, start, line, column),
        ))
    }

    fn string(&mut self, quote: u8, start: usize, line: usize, column: usize) -> Result<(), ParseError> {
        self.advance();
        while let Some(c) = self.peek() {
            match c {
                b'\\' => {
                    self.advance();
                    if self.peek().is_some_and(|n| n != b'\n' && n != b'\r') {
                        self.advance();
                    }
                }
                b'\n' | b'\r' => break,
                c if c == quote => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    self.advance();
                }
            }
        }
        Err(ParseError::new(
            "unterminated string literal",
            Position::new(self.filename, start, line, column),
        ))
    }

    fn number(&mut self, start: usize) {
        let mut prev = 0u8;
        while let Some(c) = self.peek() {
            let is_hex = {
                let lexeme = &self.source[start..self.pos];
                lexeme.starts_with("0x") || lexeme.starts_with("0X")
            };
            let exponent_sign = matches!(c, b'+' | b'-') && matches!(prev, b'e' | b'E') && !is_hex;
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || exponent_sign {
                prev = c;
                self.advance();
            } else {
                break;
            }
        }
    }

    fn identifier(&mut self) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new("t.proto", src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let toks = kinds("syntax = \"proto3\";");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Ident, "syntax"),
                (TokenKind::Symbol, "="),
                (TokenKind::Str, "\"proto3\""),
                (TokenKind::Symbol, ";"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let toks = Lexer::new("t.proto", "message A {\n    int32 x = 1;\n}\n")
            .tokenize()
            .unwrap();
        let int32 = toks.iter().find(|t| t.text == "int32").unwrap();
        assert_eq!((int32.offset, int32.line, int32.column), (16, 2, 5));
        let close = toks.iter().find(|t| t.text == "}").unwrap();
        assert_eq!((close.offset, close.line, close.column), (29, 3, 1));
    }

    #[test]
    fn test_lone_cr_and_crlf_each_break_one_line() {
        for src in ["message A {\r  int32 x = 1;\r}\r", "message A {\r\n  int32 x = 1;\r\n}\r\n"] {
            let toks = Lexer::new("t.proto", src).tokenize().unwrap();
            let int32 = toks.iter().find(|t| t.text == "int32").unwrap();
            assert_eq!((int32.line, int32.column), (2, 3), "{:?}", src);
            let close = toks.iter().find(|t| t.text == "}").unwrap();
            assert_eq!((close.line, close.column), (3, 1), "{:?}", src);
        }
    }

    #[test]
    fn test_line_comment_ends_at_cr() {
        let toks = kinds("// hi\rx\r\n// there\r\ny");
        assert_eq!(toks[0], (TokenKind::Comment, "// hi"));
        assert_eq!(toks[1], (TokenKind::Ident, "x"));
        assert_eq!(toks[2], (TokenKind::Comment, "// there"));
        assert_eq!(toks[3], (TokenKind::Ident, "y"));
    }

    #[test]
    fn test_comments_are_tokens() {
        let toks = kinds("// hi\n/* a\nb */ x");
        assert_eq!(toks[0], (TokenKind::Comment, "// hi"));
        assert_eq!(toks[1], (TokenKind::Comment, "/* a\nb */"));
        assert_eq!(toks[2], (TokenKind::Ident, "x"));
    }

    #[test]
    fn test_numbers_with_exponent_and_hex() {
        let toks = kinds("1.5e-3 0x1F -2");
        assert_eq!(toks[0], (TokenKind::Number, "1.5e-3"));
        assert_eq!(toks[1], (TokenKind::Number, "0x1F"));
        assert_eq!(toks[2], (TokenKind::Symbol, "-"));
        assert_eq!(toks[3], (TokenKind::Number, "2"));
    }

    #[test]
    fn test_string_escapes_and_single_quotes() {
        let toks = kinds(r#"'it\'s' "a\"b""#);
        assert_eq!(toks[0], (TokenKind::Str, r#"'it\'s'"#));
        assert_eq!(toks[1], (TokenKind::Str, r#""a\"b""#));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Lexer::new("t.proto", "x = \"abc\n").tokenize().unwrap_err();
        assert_eq!(err.pos.line, 1);
        assert_eq!(err.pos.column, 5);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("t.proto", "\n  @").tokenize().unwrap_err();
        assert_eq!((err.pos.offset, err.pos.line, err.pos.column), (3, 2, 3));
    }
}
