//! Control-flow result types threaded through evaluation and dispatch
//! (§10.3). Catchable signals and non-local returns both unwind the Rust
//! call stack via `Err`, never via `panic!`.

use crate::{activation::HomeContext, error::ErrorKind, value::Value};

/// A catchable runtime exception in flight, searching outward through
/// enclosing `on:do:` frames for a handler whose class the kind matches
/// (§4.8).
#[derive(Debug, Clone)]
pub struct Signal {
    pub kind: ErrorKind,
    pub message: String,
    /// The signalled value itself (an `Exception` instance), passed to a
    /// matching handler block and available to `resume:`/`return:`/`retry`.
    pub payload: Value,
    /// Human-readable call-stack frames captured at the signal point, used
    /// to build `NemoError::Unhandled::trace` if nothing catches it.
    pub trace: Vec<String>,
}

/// Why evaluation is unwinding the Rust call stack instead of returning a
/// plain `Value` (§4.6 "non-local return", §4.8 "signal").
#[derive(Debug, Clone)]
pub enum Unwind {
    Signal(Signal),
    /// `^value` inside a block: unwinds until it reaches the activation
    /// named by `home`, which becomes that activation's return value.
    NonLocalReturn { home: HomeContext, value: Value },
    /// `anException retry` sent from inside a handler block: unwinds to the
    /// `on:do:` activation named by `home`, which re-evaluates its protected
    /// block from the start instead of returning (§4.8).
    Retry { home: HomeContext },
}

pub type RunResult<T> = Result<T, Unwind>;

impl Unwind {
    #[must_use]
    pub fn signal(kind: ErrorKind, message: impl Into<String>, payload: Value) -> Self {
        Self::Signal(Signal { kind, message: message.into(), payload, trace: Vec::new() })
    }
}
