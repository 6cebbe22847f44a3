//! Tokeniser (§4.1, component A).
//!
//! Produces a flat `Vec<Token>` from source text. The lexer does not know
//! about precedence or statement structure; that is the parser's job.

use crate::error::{LexError, Position};

const BINARY_CHARS: &str = "+-*/\\~<>=&|@%,?!";

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Float(f64),
    String(String),
    /// `#foo` or `#at:put:` — an interned literal symbol.
    Symbol(String),
    Identifier(String),
    /// `foo:` — one keyword fragment of a (possibly compound) keyword selector.
    Keyword(String),
    BinaryOp(String),
    Assign,
    Return,
    MethodDefine,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Pipe,
    Period,
    Semicolon,
    /// A lone `:`, used before a block parameter name (`[:x | ...]`).
    Colon,
    /// `#(` opening an array literal.
    ArrayOpen,
    /// `#{` opening a table literal.
    TableOpen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    /// True when a newline (with no intervening period) separates this
    /// token from the previous one; the parser uses this for statement
    /// separation and keyword-chain line continuation (§4.2).
    pub preceded_by_newline: bool,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    saw_newline: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1, saw_newline: false }
    }

    /// Tokenises the entire source, appending a trailing `Eof` token.
    ///
    /// # Errors
    /// Returns `LexError` on an unterminated string or an invalid character.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let position = self.current_position();
            let preceded_by_newline = std::mem::take(&mut self.saw_newline);
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, position, preceded_by_newline });
                break;
            };
            let kind = self.lex_one(c, position)?;
            tokens.push(Token { kind, position, preceded_by_newline });
        }
        Ok(tokens)
    }

    fn current_position(&self) -> Position {
        Position { line: self.line, column: self.column }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b'\n') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'#') if self.is_comment_start() => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// A `#` starts a comment when followed by whitespace or one of
    /// `= - * / . | & @ !` (§4.1); otherwise it starts a symbol literal.
    fn is_comment_start(&self) -> bool {
        match self.peek_at(1) {
            None => true,
            Some(c) => c.is_ascii_whitespace() || b"=-*/.|&@!".contains(&c),
        }
    }

    fn lex_one(&mut self, c: u8, start: Position) -> Result<TokenKind, LexError> {
        match c {
            b'"' => self.lex_string(start),
            b'#' if self.peek_at(1) == Some(b'(') => {
                self.advance();
                self.advance();
                Ok(TokenKind::ArrayOpen)
            }
            b'#' if self.peek_at(1) == Some(b'{') => {
                self.advance();
                self.advance();
                Ok(TokenKind::TableOpen)
            }
            b'#' => self.lex_symbol(),
            b':' if self.peek_at(1) == Some(b'=') => {
                self.advance();
                self.advance();
                Ok(TokenKind::Assign)
            }
            b':' => {
                self.advance();
                Ok(TokenKind::Colon)
            }
            b'{' => {
                self.advance();
                Ok(TokenKind::LeftBrace)
            }
            b'}' => {
                self.advance();
                Ok(TokenKind::RightBrace)
            }
            b'^' => {
                self.advance();
                Ok(TokenKind::Return)
            }
            b'[' => {
                self.advance();
                Ok(TokenKind::LeftBracket)
            }
            b']' => {
                self.advance();
                Ok(TokenKind::RightBracket)
            }
            b'(' => {
                self.advance();
                Ok(TokenKind::LeftParen)
            }
            b')' => {
                self.advance();
                Ok(TokenKind::RightParen)
            }
            b'|' => {
                self.advance();
                Ok(TokenKind::Pipe)
            }
            b'.' => {
                self.advance();
                Ok(TokenKind::Period)
            }
            b';' => {
                self.advance();
                Ok(TokenKind::Semicolon)
            }
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_ascii_alphabetic() || c == b'_' => self.lex_identifier_or_keyword(),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.advance();
                self.advance();
                Ok(TokenKind::MethodDefine)
            }
            c if BINARY_CHARS.as_bytes().contains(&c) => self.lex_binary_op(),
            _ => Err(LexError { message: format!("invalid character '{}'", c as char), position: start }),
        }
    }

    fn lex_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError { message: "unterminated string".to_owned(), position: start }),
                Some(b'"') => {
                    self.advance();
                    if self.peek() == Some(b'"') {
                        // `""` is an escaped quote.
                        self.advance();
                        value.push('"');
                    } else {
                        break;
                    }
                }
                Some(_) => {
                    // Safe: we only ever advance one UTF-8 byte at a time, but
                    // since the language's strings are byte sequences we
                    // decode lazily at the end instead of per-byte.
                    let b = self.advance().expect("peeked Some");
                    value.push(b as char);
                }
            }
        }
        Ok(TokenKind::String(value))
    }

    fn lex_symbol(&mut self) -> Result<TokenKind, LexError> {
        self.advance(); // '#'
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') {
            let mut name = String::new();
            loop {
                match self.peek() {
                    Some(c) if c.is_ascii_alphanumeric() || c == b'_' => {
                        name.push(c as char);
                        self.advance();
                    }
                    Some(b':') => {
                        name.push(':');
                        self.advance();
                    }
                    _ => break,
                }
            }
            Ok(TokenKind::Symbol(name))
        } else {
            // `#+` style symbols over the binary alphabet.
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if BINARY_CHARS.as_bytes().contains(&c) {
                    name.push(c as char);
                    self.advance();
                } else {
                    break;
                }
            }
            Ok(TokenKind::Symbol(name))
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().expect("peeked Some") as char);
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().expect("peeked Some") as char);
            }
        }
        if is_float {
            Ok(TokenKind::Float(text.parse().expect("validated digits")))
        } else {
            match text.parse::<i64>() {
                Ok(n) => Ok(TokenKind::Integer(n)),
                // Falls back to float on overflow; the parser/interpreter
                // promote integer literals that don't fit i64 separately
                // if ever produced via arithmetic, but a literal this large
                // is rare enough that float is an acceptable presentation.
                Err(_) => Ok(TokenKind::Float(text.parse().unwrap_or(f64::INFINITY))),
            }
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> Result<TokenKind, LexError> {
        let mut name = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            name.push(self.advance().expect("peeked Some") as char);
        }
        if self.peek() == Some(b':') && self.peek_at(1) != Some(b'=') {
            self.advance();
            name.push(':');
            Ok(TokenKind::Keyword(name))
        } else {
            Ok(TokenKind::Identifier(name))
        }
    }

    fn lex_binary_op(&mut self) -> Result<TokenKind, LexError> {
        let mut op = String::new();
        op.push(self.advance().expect("peeked Some") as char);
        if op != ":"
            && let Some(c) = self.peek()
            && BINARY_CHARS.as_bytes().contains(&c)
        {
            op.push(self.advance().expect("peeked Some") as char);
        }
        Ok(TokenKind::BinaryOp(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_arithmetic() {
        assert_eq!(
            kinds("3 + 4"),
            vec![TokenKind::Integer(3), TokenKind::BinaryOp("+".to_owned()), TokenKind::Integer(4), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_keyword_message() {
        assert_eq!(
            kinds("p at: #x put: 3"),
            vec![
                TokenKind::Identifier("p".to_owned()),
                TokenKind::Keyword("at:".to_owned()),
                TokenKind::Symbol("x".to_owned()),
                TokenKind::Keyword("put:".to_owned()),
                TokenKind::Integer(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        assert_eq!(kinds("1. # a comment\n2"), vec![
            TokenKind::Integer(1),
            TokenKind::Period,
            TokenKind::Integer(2),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn hash_followed_by_letter_is_symbol_not_comment() {
        assert_eq!(kinds("#foo"), vec![TokenKind::Symbol("foo".to_owned()), TokenKind::Eof]);
    }

    #[test]
    fn escaped_quote_in_string() {
        assert_eq!(kinds(r#""a""b""#), vec![TokenKind::String("a\"b".to_owned()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }

    #[test]
    fn method_define_arrow() {
        assert_eq!(
            kinds("Point>>sum"),
            vec![
                TokenKind::Identifier("Point".to_owned()),
                TokenKind::MethodDefine,
                TokenKind::Identifier("sum".to_owned()),
                TokenKind::Eof
            ]
        );
    }
}
