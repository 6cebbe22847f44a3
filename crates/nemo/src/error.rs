//! Error taxonomy for the lexer, parser, and interpreter (§7).
//!
//! Runtime errors are modelled as Smalltalk exceptions (§4.8) rather than
//! Rust panics: every `ErrorKind` below doubles as the class name consulted
//! by `on:do:` handler matching (see `exception.rs`). Lex/parse failures
//! never reach a handler — they abort loading before any process exists.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Position in source text, 1-based line/column, used by lex and parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure while tokenising source text (§4.1 "Failure mode").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LexError at {}: {}", self.position, self.message)
    }
}

/// Failure while building the AST (§4.2 "Failure mode").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
    pub expected: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError at {}: {}", self.position, self.message)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected {expected})")?;
        }
        Ok(())
    }
}

/// Error kinds from §7, minus `Lex/ParseError` which are reported before any
/// process or activation exists and so never need to be raised as a runtime
/// `Exception`.
///
/// Doubles as the runtime class name an `on:do:` handler names to match: the
/// string form (via `strum`) is exactly the class name the bootstrap library
/// registers under (`Error`, `MessageNotUnderstood`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// The generic root; `signal:`/`error:` with no more specific type.
    Error,
    /// Unbound identifier at runtime (globals and locals both empty).
    NameError,
    /// Wrong argument count to a method or block.
    ArityError,
    /// No method for selector and no `doesNotUnderstand:` override.
    MessageNotUnderstood,
    /// Multiple-inheritance conflict with no override or scoped super.
    AmbiguousMethod,
    /// Slot name collision between parents introduced by `addParent:`.
    SlotConflict,
    /// 1-based index outside `[1, size]`.
    SubscriptOutOfBounds,
    /// Integer or float division by zero.
    DivisionByZero,
    /// Primitive received a receiver/argument of the wrong kind.
    TypeError,
    /// Non-local return to a home activation that already returned.
    BlockContextExpired,
    /// Activation depth exceeded the configured ceiling.
    StackOverflow,
    /// Allocation failed (surfaced for parity with the taxonomy; the arena
    /// itself does not impose a cap).
    OutOfMemory,
    /// Misuse of process lifecycle primitives (double terminate, etc).
    ProcessError,
}

impl ErrorKind {
    /// Ancestor-first walk used by handler matching in `on:do:` (§4.8): a
    /// handler declared for an ancestor of the signalled kind also catches
    /// it. `Error` is the root of every kind.
    #[must_use]
    pub fn is_a(self, other: Self) -> bool {
        self == other || other == Self::Error
    }
}

/// Top-level error returned by the public entry points (`Interpreter::run_source`,
/// `Lexer::tokenize`, `Parser::parse`).
#[derive(Debug)]
pub enum NemoError {
    Lex(LexError),
    Parse(ParseError),
    /// An exception signalled while running and never caught by any `on:do:`,
    /// carrying the diagnostic call stack captured at the signal point.
    Unhandled { kind: ErrorKind, message: String, trace: Vec<String> },
}

impl fmt::Display for NemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Unhandled { kind, message, trace } => {
                writeln!(f, "{kind}: {message}")?;
                for frame in trace {
                    writeln!(f, "    {frame}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for NemoError {}

impl From<LexError> for NemoError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for NemoError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
