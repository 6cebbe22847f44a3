//! Pratt-style, precedence-aware parser (§4.2, component B).
//!
//! Precedence within a single statement is unary > binary > keyword.
//! Statement separation is a period **or** a newline, except a newline that
//! would end a keyword-chain is absorbed when the next non-blank token is
//! itself a keyword fragment, so keyword chains may span lines. Newlines
//! never continue a binary or unary chain.

use crate::{
    ast::{Block, Cascade, Expr, Literal, MethodLiteral, Program},
    error::{ParseError, Position},
    lexer::{Lexer, Token, TokenKind},
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    /// Lexes and parses a whole source file into a top-level statement
    /// sequence (§6).
    ///
    /// # Errors
    /// Returns `ParseError` (via `crate::error::NemoError::Lex` wrapping) on
    /// malformed source; lex errors are surfaced as-is by the caller.
    pub fn parse_program(source: &str) -> Result<Program, crate::error::NemoError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        Ok(Program { statements: parser.statements_until_eof()? })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn position(&self) -> Position {
        self.peek().position
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("unexpected token {:?}", self.peek_kind()), Some(what.to_owned())))
        }
    }

    fn error(&self, message: String, expected: Option<String>) -> ParseError {
        ParseError { message, position: self.position(), expected }
    }

    fn statements_until_eof(&mut self) -> PResult<Vec<Expr>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !matches!(self.peek_kind(), TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Period) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> PResult<Expr> {
        if let TokenKind::Return = self.peek_kind() {
            let position = self.position();
            self.advance();
            let value = self.parse_expression()?;
            return Ok(Expr::Return { value: Box::new(value), position });
        }
        if self.looks_like_method_definition() {
            return self.parse_method_definition();
        }
        self.parse_expression()
    }

    /// Detects `Identifier>>...` / `Identifier classMethod>>...` sugar by
    /// scanning ahead for a `MethodDefine` token before a statement
    /// boundary, without consuming anything on failure.
    fn looks_like_method_definition(&self) -> bool {
        let mut i = self.pos;
        // Only a single primary expression (no message sends) may precede
        // `>>` — in practice an identifier, possibly with a unary "class" tail.
        while let Some(tok) = self.tokens.get(i) {
            match &tok.kind {
                TokenKind::Identifier(_) => i += 1,
                TokenKind::MethodDefine => return true,
                _ => return false,
            }
            if i - self.pos > 2 {
                return false;
            }
        }
        false
    }

    fn parse_method_definition(&mut self) -> PResult<Expr> {
        let position = self.position();
        let target = self.parse_primary()?;
        let mut is_class_side = false;
        if let TokenKind::Identifier(name) = self.peek_kind() {
            if name == "class" {
                self.advance();
                is_class_side = true;
            } else {
                return Err(self.error("expected '>>' after class expression".to_owned(), None));
            }
        }
        self.expect(&TokenKind::MethodDefine, ">>")?;
        let (selector, params) = self.parse_method_signature()?;
        let (temporaries, body) = self.parse_block_body_braceless()?;
        Ok(Expr::MethodDefinition {
            target_class: Box::new(target),
            is_class_side,
            method: MethodLiteral { selector, params, temporaries, body, position },
        })
    }

    /// Parses `selector` (unary), `+ arg` (binary) or `kw: a kw2: b`
    /// (keyword), returning `(selector, formal-parameter-names)`.
    fn parse_method_signature(&mut self) -> PResult<(String, Vec<String>)> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(_) => {
                let mut selector = String::new();
                let mut params = Vec::new();
                while let TokenKind::Keyword(kw) = self.peek_kind().clone() {
                    self.advance();
                    selector.push_str(&kw);
                    params.push(self.parse_param_name()?);
                }
                Ok((selector, params))
            }
            TokenKind::BinaryOp(op) => {
                self.advance();
                let param = self.parse_param_name()?;
                Ok((op, vec![param]))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok((name, Vec::new()))
            }
            _ => Err(self.error("expected a method selector".to_owned(), Some("selector".to_owned()))),
        }
    }

    fn parse_param_name(&mut self) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a parameter name".to_owned(), Some("identifier".to_owned()))),
        }
    }

    /// Parses `[ ...body... ]`-free body used by the `>>` sugar, which
    /// writes `selector params [ body ]` so the body is still bracketed.
    fn parse_block_body_braceless(&mut self) -> PResult<(Vec<String>, Vec<Expr>)> {
        self.expect(&TokenKind::LeftBracket, "[")?;
        let temporaries = self.parse_optional_temporaries()?;
        let body = self.parse_statements_until_right_bracket()?;
        self.expect(&TokenKind::RightBracket, "]")?;
        Ok((temporaries, body))
    }

    fn parse_optional_temporaries(&mut self) -> PResult<Vec<String>> {
        if !matches!(self.peek_kind(), TokenKind::Pipe) {
            return Ok(Vec::new());
        }
        self.advance();
        let mut names = Vec::new();
        while let TokenKind::Identifier(name) = self.peek_kind().clone() {
            names.push(name);
            self.advance();
        }
        self.expect(&TokenKind::Pipe, "|")?;
        Ok(names)
    }

    fn parse_statements_until_right_bracket(&mut self) -> PResult<Vec<Expr>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !matches!(self.peek_kind(), TokenKind::RightBracket | TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(statements)
    }

    // -- Expression grammar ------------------------------------------------

    fn parse_expression(&mut self) -> PResult<Expr> {
        if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            // Lookahead for `name := expr`.
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Assign)) {
                let position = self.position();
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Expr::Assign { name, value: Box::new(value), position });
            }
        }
        self.parse_keyword_message()
    }

    fn parse_keyword_message(&mut self) -> PResult<Expr> {
        let position = self.position();
        let receiver = self.parse_binary_message()?;
        let send = if let TokenKind::Keyword(_) = self.peek_kind() {
            let mut selector = String::new();
            let mut args = Vec::new();
            loop {
                let TokenKind::Keyword(kw) = self.peek_kind().clone() else { break };
                self.advance();
                selector.push_str(&kw);
                args.push(self.parse_binary_message()?);
                if !self.continues_keyword_chain() {
                    break;
                }
            }
            let (receiver, super_scope) = Self::strip_super(receiver);
            Expr::MessageSend {
                receiver: Box::new(receiver),
                selector,
                args,
                super_scope,
                cascades: Vec::new(),
                position,
            }
        } else {
            receiver
        };
        if matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.attach_cascades(send)
        } else {
            Ok(send)
        }
    }

    /// Cascades (`;`) send further messages to the receiver of the message
    /// send that precedes the `;` (§4.2 "Cascades"); a cascade after a
    /// non-send expression is a parse error.
    fn attach_cascades(&mut self, send: Expr) -> PResult<Expr> {
        let Expr::MessageSend { receiver, selector, args, super_scope, position, .. } = send else {
            return Err(self.error("cascade (';') requires a preceding message send".to_owned(), None));
        };
        let cascades = self.parse_cascades()?;
        Ok(Expr::MessageSend { receiver, selector, args, super_scope, cascades, position })
    }

    /// A keyword chain may continue onto the next line: a newline is only a
    /// statement boundary here if the following token is *not* itself a
    /// keyword fragment (§4.2 "Statement separation").
    fn continues_keyword_chain(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(_))
    }

    fn parse_binary_message(&mut self) -> PResult<Expr> {
        let position = self.position();
        let mut receiver = self.parse_unary_message()?;
        while let TokenKind::BinaryOp(op) = self.peek_kind().clone() {
            if self.peek().preceded_by_newline {
                break;
            }
            self.advance();
            let rhs = self.parse_unary_message()?;
            let (recv, super_scope) = Self::strip_super(receiver);
            receiver = Expr::MessageSend {
                receiver: Box::new(recv),
                selector: op,
                args: vec![rhs],
                super_scope,
                cascades: Vec::new(),
                position,
            };
        }
        Ok(receiver)
    }

    fn parse_unary_message(&mut self) -> PResult<Expr> {
        let position = self.position();
        let mut receiver = self.parse_primary()?;
        loop {
            let TokenKind::Identifier(name) = self.peek_kind().clone() else { break };
            if self.peek().preceded_by_newline {
                break;
            }
            self.advance();
            let (recv, super_scope) = Self::strip_super(receiver);
            receiver = Expr::MessageSend {
                receiver: Box::new(recv),
                selector: name,
                args: Vec::new(),
                super_scope,
                cascades: Vec::new(),
                position,
            };
        }
        Ok(receiver)
    }

    /// `super` and `super<Parent>` are only meaningful as the receiver of a
    /// send; once we know we're building a `MessageSend` we peel the marker
    /// back off the identifier AST node produced by `parse_primary`.
    fn strip_super(expr: Expr) -> (Expr, Option<crate::ast::SuperKind>) {
        if let Expr::Identifier(name) = &expr {
            if name == "super" {
                return (Expr::Identifier("self".to_owned()), Some(crate::ast::SuperKind::Super));
            }
            if let Some(parent) = name.strip_prefix("super<").and_then(|s| s.strip_suffix('>')) {
                return (Expr::Identifier("self".to_owned()), Some(crate::ast::SuperKind::Scoped(parent.to_owned())));
            }
        }
        (expr, None)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let position = self.position();
        match self.peek_kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Symbol(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Symbol(s)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if name == "super" {
                    if matches!(self.peek_kind(), TokenKind::BinaryOp(op) if op == "<") {
                        self.advance();
                        let TokenKind::Identifier(parent) = self.peek_kind().clone() else {
                            return Err(self.error("expected parent class name".to_owned(), Some(">".to_owned())));
                        };
                        self.advance();
                        if !matches!(self.peek_kind(), TokenKind::BinaryOp(op) if op == ">") {
                            return Err(self.error("expected '>' to close super<Parent>".to_owned(), None));
                        }
                        self.advance();
                        return Ok(Expr::Identifier(format!("super<{parent}>")));
                    }
                }
                Ok(Expr::Identifier(name))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen, ")")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_block(position),
            TokenKind::ArrayOpen => self.parse_array_literal(),
            TokenKind::TableOpen => self.parse_table_literal(),
            other => Err(self.error(format!("unexpected token {other:?}"), Some("an expression".to_owned()))),
        }
    }

    /// `#(1 2 3)` — elements are literals or bare identifiers (no nested
    /// message sends inside the array-literal shorthand), matching the
    /// common Smalltalk convention; a general array is built with `Array
    /// new` plus `add:` when expressions are needed.
    fn parse_array_literal(&mut self) -> PResult<Expr> {
        self.advance(); // '#('
        let mut elements = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RightParen | TokenKind::Eof) {
            elements.push(self.parse_array_literal_element()?);
        }
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(Expr::ArrayLiteral(elements))
    }

    fn parse_array_literal_element(&mut self) -> PResult<Expr> {
        match self.peek_kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Symbol(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Symbol(s)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                // Bare words inside an array literal denote symbols, per
                // the common Smalltalk convention `#(foo bar)` == `#(#foo #bar)`.
                Ok(Expr::Literal(Literal::Symbol(name)))
            }
            TokenKind::ArrayOpen => self.parse_array_literal(),
            other => Err(self.error(format!("unexpected token {other:?} in array literal"), None)),
        }
    }

    /// `#{ key1 -> value1. key2 -> value2 }` table literal.
    fn parse_table_literal(&mut self) -> PResult<Expr> {
        self.advance(); // '#{'
        let mut pairs = Vec::new();
        self.skip_separators();
        while !matches!(self.peek_kind(), TokenKind::RightBrace | TokenKind::Eof) {
            let key = self.parse_binary_message()?;
            if !matches!(self.peek_kind(), TokenKind::BinaryOp(op) if op == "->") {
                return Err(self.error("expected '->' in table literal entry".to_owned(), None));
            }
            self.advance();
            let value = self.parse_binary_message()?;
            pairs.push((key, value));
            self.skip_separators();
        }
        self.expect(&TokenKind::RightBrace, "}")?;
        Ok(Expr::TableLiteral(pairs))
    }

    fn parse_block(&mut self, position: Position) -> PResult<Expr> {
        self.advance(); // '['
        let mut params = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Colon) {
            self.advance();
            params.push(self.parse_param_name()?);
        }
        let temporaries = self.parse_optional_temporaries()?;
        let body = self.parse_statements_until_right_bracket()?;
        self.expect(&TokenKind::RightBracket, "]")?;
        Ok(Expr::Block(Block { params, temporaries, body, position }))
    }

    fn parse_cascades(&mut self) -> PResult<Vec<Cascade>> {
        let mut cascades = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.advance();
            match self.peek_kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    cascades.push(Cascade { selector: name, args: Vec::new() });
                }
                TokenKind::BinaryOp(op) => {
                    self.advance();
                    let arg = self.parse_unary_message()?;
                    cascades.push(Cascade { selector: op, args: vec![arg] });
                }
                TokenKind::Keyword(_) => {
                    let mut selector = String::new();
                    let mut args = Vec::new();
                    while let TokenKind::Keyword(kw) = self.peek_kind().clone() {
                        self.advance();
                        selector.push_str(&kw);
                        args.push(self.parse_binary_message()?);
                    }
                    cascades.push(Cascade { selector, args });
                }
                _ => return Err(self.error("expected a cascaded message".to_owned(), None)),
            }
        }
        Ok(cascades)
    }
}
