//! Exception engine: `on:do:`, `signal`, `resume:`, `pass`, `retry`,
//! `return:` (§4.8).
//!
//! `Interpreter::signal` (used by `Exception signal`/`anObject error:`) does
//! not unwind the Rust call stack looking for a handler the way a plain
//! error would. It walks the handler stack searching for a match and, on a
//! hit, calls the handler block *right there*, still nested inside every
//! frame between the signal point and the matching `on:do:`. That is what
//! makes `resume:` possible in that case: the handler can hand back a value
//! and `signal` simply returns it to its caller as if nothing happened,
//! because nothing has been unwound yet.
//!
//! A built-in primitive error (division by zero, a type error, ...) instead
//! raises via the bare `Unwind::signal` constructor and propagates as an
//! ordinary `Err` through `?`, with no handler-stack search at the raise
//! point; `prim_on_do` performs that search itself the moment such an unwind
//! reaches it, so `resume:` on one of these hands a value back to the
//! nearest enclosing `on:do:` rather than to the exact expression that
//! raised it. `return:` (and a handler block that just falls off the end)
//! is the one case that always unwinds, via the ordinary
//! `Unwind::NonLocalReturn` machinery targeted at the `on:do:` activation's
//! own home. `retry` unwinds the same way but tells `on:do:` to re-run its
//! protected block instead of returning.

use std::rc::Rc;

use crate::{
    activation::{ActivationId, HomeContext},
    control::{RunResult, Signal, Unwind},
    error::ErrorKind,
    interpreter::Interpreter,
    value::Value,
};

/// One installed `on:do:` handler (§4.8).
struct HandlerFrame {
    /// Class name the handler was declared for (`on: NameError do: ...`);
    /// matching walks `ErrorKind::is_a` against the signal's kind.
    matcher: ErrorKind,
    handler_block: crate::heap::HeapId,
    /// Home of the activation that sent `on:do:`; `return:`/`retry`/a
    /// handler block falling through all unwind to this.
    home: HomeContext,
}

/// Bookkeeping for a handler block currently running, consulted by
/// `resume:`/`retry`/`pass`/`return:` sent from inside it. These only make
/// sense while their handler is on the stack, which this stack enforces:
/// `active_signals.last()` is always the innermost one.
#[derive(Clone)]
struct ActiveSignalFrame {
    /// Ephemeral unwind target that only `resume:` aims at; `dispatch_signal`
    /// recognizes its own marker and turns the unwind back into an `Ok`.
    resume_home: HomeContext,
    ondo_home: HomeContext,
    /// Position in `handler_stack` the matching handler was found at, so
    /// `pass` resumes the search strictly further out.
    matched_index: usize,
    sig: Signal,
}

#[derive(Default)]
pub struct ExceptionState {
    handler_stack: Vec<HandlerFrame>,
    active_signals: Vec<ActiveSignalFrame>,
}

impl Interpreter {
    /// Raises `kind` as a catchable signal and returns whatever the nearest
    /// matching handler ultimately resolves it to (a resumed value, or the
    /// handler's/`return:`'s value surfacing as an `Unwind::NonLocalReturn`
    /// through the caller chain). Returns `Err(Unwind::Signal(sig))`
    /// unchanged when nothing catches it, for `run_program`/`run_statement`
    /// to report as `NemoError::Unhandled`.
    pub fn signal(&mut self, kind: ErrorKind, message: impl Into<String>, payload: Value) -> RunResult<Value> {
        let sig = Signal { kind, message: message.into(), payload, trace: self.capture_trace() };
        let ceiling = self.exceptions.handler_stack.len();
        self.dispatch_signal(sig, ceiling)
    }

    fn capture_trace(&self) -> Vec<String> {
        Vec::new()
    }

    /// Searches `handler_stack[..ceiling]` from the top down for a match.
    pub(crate) fn dispatch_signal(&mut self, sig: Signal, ceiling: usize) -> RunResult<Value> {
        let mut idx = ceiling;
        while idx > 0 {
            idx -= 1;
            if !self.exceptions.handler_stack[idx].matcher.is_a(sig.kind) && !sig.kind.is_a(self.exceptions.handler_stack[idx].matcher) {
                continue;
            }
            let ondo_home = self.exceptions.handler_stack[idx].home.clone();
            let handler_block = self.exceptions.handler_stack[idx].handler_block;
            let resume_home = HomeContext { activation: ActivationId::next(), alive: Rc::new(std::cell::Cell::new(true)) };
            self.exceptions.active_signals.push(ActiveSignalFrame {
                resume_home: resume_home.clone(),
                ondo_home: ondo_home.clone(),
                matched_index: idx,
                sig: sig.clone(),
            });
            let result = self.invoke_block(handler_block, &[sig.payload.clone()]);
            self.exceptions.active_signals.pop();
            return match result {
                Ok(v) => Err(Unwind::NonLocalReturn { home: ondo_home, value: v }),
                Err(Unwind::NonLocalReturn { home, value }) if home == resume_home => Ok(value),
                other => other,
            };
        }
        Err(Unwind::Signal(sig))
    }
}

/// `[protected] on: ExceptionClass do: [:e | handler]` (§4.8).
pub fn prim_on_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Block(protected) = receiver else {
        return Err(Unwind::signal(ErrorKind::TypeError, "on:do: sent to a non-block", Value::Nil));
    };
    let Value::Block(handler_block) = args[1] else {
        return Err(Unwind::signal(ErrorKind::TypeError, "on:do:'s second argument must be a block", Value::Nil));
    };
    let matcher = exception_class_name(interp, &args[0])
        .and_then(|name| name.parse::<ErrorKind>().ok())
        .ok_or_else(|| Unwind::signal(ErrorKind::TypeError, "on:do:'s first argument must name a known exception class", Value::Nil))?;

    let ondo_home = interp.current_activation_home();
    let handler_index = interp.exceptions.handler_stack.len();
    interp.exceptions.handler_stack.push(HandlerFrame { matcher, handler_block, home: ondo_home.clone() });

    loop {
        let mut result = interp.invoke_block(protected, &[]);
        // A primitive (division by zero, a type error, ...) raises via the
        // plain `Unwind::signal` constructor and just returns `Err` up the
        // Rust stack rather than searching `handler_stack` itself, so the
        // search has to happen here instead, at the nearest `on:do:` the
        // unwind passes through. `dispatch_signal` still walks outward from
        // our own frame, so an outer handler further up the stack matches
        // exactly as if the search had started there; fed back through the
        // same match below so a `retry` aimed at this `on:do:` still loops.
        if let Err(Unwind::Signal(sig)) = result {
            let ceiling = interp.exceptions.handler_stack.len();
            result = interp.dispatch_signal(sig, ceiling);
        }
        match result {
            Ok(v) => {
                interp.exceptions.handler_stack.truncate(handler_index);
                return Ok(v);
            }
            Err(Unwind::Retry { home }) if home == ondo_home => {}
            Err(Unwind::NonLocalReturn { home, value }) if home == ondo_home => {
                interp.exceptions.handler_stack.truncate(handler_index);
                return Ok(value);
            }
            Err(other) => {
                interp.exceptions.handler_stack.truncate(handler_index);
                return Err(other);
            }
        }
    }
}

fn exception_class_name(interp: &Interpreter, value: &Value) -> Option<String> {
    match value {
        Value::Class(id) => Some(interp.heap.class(*id).name.clone()),
        Value::Symbol(s) | Value::String(s) => Some(s.to_string()),
        _ => None,
    }
}

/// `anObject error: 'message'` and `anExceptionClass new signal`/
/// `signal: 'message'` (§4.8) funnel through here with `kind` already
/// resolved from the receiver/class involved.
pub fn prim_signal(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let kind = exception_class_name(interp, &receiver).and_then(|n| n.parse::<ErrorKind>().ok()).unwrap_or(ErrorKind::Error);
    let message = args.first().map_or_else(String::new, |v| display_value(v));
    interp.signal(kind, message, receiver)
}

pub fn prim_error(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let message = args.first().map_or_else(String::new, |v| display_value(v));
    interp.signal(ErrorKind::Error, message, receiver)
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) | Value::Symbol(s) => s.to_string(),
        other => other.class_name().to_owned(),
    }
}

pub fn prim_resume(interp: &mut Interpreter, _receiver: Value, args: &[Value]) -> RunResult<Value> {
    let value = args.first().cloned().unwrap_or(Value::Nil);
    let frame = active_frame(interp, "resume:")?;
    Err(Unwind::NonLocalReturn { home: frame.resume_home, value })
}

pub fn prim_retry(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let frame = active_frame(interp, "retry")?;
    Err(Unwind::Retry { home: frame.ondo_home })
}

pub fn prim_return(interp: &mut Interpreter, _receiver: Value, args: &[Value]) -> RunResult<Value> {
    let value = args.first().cloned().unwrap_or(Value::Nil);
    let frame = active_frame(interp, "return:")?;
    Err(Unwind::NonLocalReturn { home: frame.ondo_home, value })
}

pub fn prim_pass(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let frame = active_frame(interp, "pass")?;
    interp.dispatch_signal(frame.sig, frame.matched_index)
}

fn active_frame(interp: &Interpreter, selector: &str) -> RunResult<ActiveSignalFrame> {
    interp.exceptions.active_signals.last().cloned().ok_or_else(|| {
        Unwind::signal(ErrorKind::Error, format!("'{selector}' sent outside an active exception handler"), Value::Nil)
    })
}
