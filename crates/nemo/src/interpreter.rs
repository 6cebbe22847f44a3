//! Owns the heap, global namespace, and process scheduler, and drives
//! top-level execution (§3 "Interpreter", §6 "Source file format").
//!
//! The top-level statement sequence of a loaded source file runs directly,
//! synchronously, on `main_stack` — it is not itself scheduled as a
//! `Process`. Only blocks explicitly `fork:`ed go through the cooperative
//! scheduler (`scheduler.rs`); that quantum loop only starts once the
//! top-level sequence has finished, mirroring how a Smalltalk "doit" runs to
//! completion before background processes get a turn.

use std::rc::Rc;

use crate::{
    activation::{Activation, ActivationId, Frame, HomeContext},
    ast::Program,
    control::Unwind,
    dispatch::DEFAULT_STACK_DEPTH,
    error::NemoError,
    exception::ExceptionState,
    heap::{Heap, HeapData},
    namespace::Namespace,
    parser::Parser,
    process::ProcessId,
    scheduler::Scheduler,
    value::Value,
};

pub struct Interpreter {
    pub heap: Heap,
    pub globals: Namespace,
    pub scheduler: Scheduler,
    pub stack_limit: usize,
    pub(crate) exceptions: ExceptionState,
    main_stack: Vec<Activation>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            globals: Namespace::new(),
            scheduler: Scheduler::new(),
            stack_limit: DEFAULT_STACK_DEPTH,
            exceptions: ExceptionState::default(),
            main_stack: Vec::new(),
        }
    }

    /// An interpreter with the core class library already installed;
    /// what every entry point other than a bootstrap-development test wants.
    #[must_use]
    pub fn bootstrapped() -> Self {
        let mut interp = Self::new();
        crate::bootstrap::install(&mut interp);
        interp
    }

    /// Parses and runs a whole source file's top-level statements (§6),
    /// then drains any processes it forked.
    ///
    /// # Errors
    /// Returns the lex/parse error as-is, or `NemoError::Unhandled` for a
    /// signal that escaped every `on:do:` in the top-level sequence.
    pub fn run_source(&mut self, source: &str) -> Result<Value, NemoError> {
        let program = Parser::parse_program(source)?;
        self.run_program(&program)
    }

    /// Runs one already-parsed top-level statement without restarting the
    /// scheduler drain; used by the REPL, which wants one error per
    /// statement instead of aborting the whole session (§6).
    pub fn run_statement(&mut self, expr: &crate::ast::Expr) -> Result<Value, NemoError> {
        self.ensure_main_stack();
        let home = self.main_stack.last().expect("ensure_main_stack just pushed one").home_context();
        match self.eval_expr(expr, &home) {
            Ok(v) => Ok(v),
            Err(Unwind::Signal(sig)) => Err(NemoError::Unhandled { kind: sig.kind, message: sig.message, trace: sig.trace }),
            Err(_) => Err(NemoError::Unhandled {
                kind: crate::error::ErrorKind::Error,
                message: "non-local return or retry with no enclosing activation".to_owned(),
                trace: Vec::new(),
            }),
        }
    }

    fn ensure_main_stack(&mut self) {
        if self.main_stack.is_empty() {
            let frame = Frame::root(Value::Nil);
            self.main_stack.push(Activation::new(None, Value::Nil, "top-level".to_owned(), frame, None));
        }
    }

    pub fn run_program(&mut self, program: &Program) -> Result<Value, NemoError> {
        let frame = Frame::root(Value::Nil);
        let activation = Activation::new(None, Value::Nil, "top-level".to_owned(), frame, None);
        let this_id = activation.id;
        let home = activation.home_context();
        self.main_stack.push(activation);

        let result = self.eval_sequence(&program.statements, &home);
        self.main_stack.pop();

        let value = match result {
            Ok(v) => v,
            Err(Unwind::NonLocalReturn { home: target, value }) if target.activation == this_id => value,
            Err(Unwind::Signal(sig)) => return Err(NemoError::Unhandled { kind: sig.kind, message: sig.message, trace: sig.trace }),
            Err(_) => {
                return Err(NemoError::Unhandled {
                    kind: crate::error::ErrorKind::Error,
                    message: "control-flow escape past the top-level sequence".to_owned(),
                    trace: Vec::new(),
                });
            }
        };
        self.run_scheduler_to_completion();
        Ok(value)
    }

    fn run_scheduler_to_completion(&mut self) {
        while self.scheduler.has_runnable_work() {
            let Some(pid) = self.scheduler.begin_turn() else { break };
            self.run_quantum(pid);
            self.scheduler.end_turn();
        }
    }

    /// Runs up to `scheduler.quantum` statements of `pid`'s forked block,
    /// resuming at `next_stmt`, stopping early if `Processor yield` set
    /// `yield_requested` (§4.9).
    fn run_quantum(&mut self, pid: ProcessId) {
        self.scheduler.yield_requested = false;
        let quantum = self.scheduler.quantum;
        let block_id = self.scheduler.process(pid).block;
        let (body, captured_frame, defining_class) = {
            let HeapData::Block(b) = self.heap.get(block_id) else {
                log::error!("process block vanished from the heap");
                self.scheduler.terminate(pid);
                return;
            };
            (Rc::clone(&b.body), Rc::clone(&b.captured_frame), b.defining_class.clone())
        };
        if self.scheduler.process(pid).stack.is_empty() {
            let self_value = Frame::self_value(&captured_frame);
            let frame = Frame::child(self_value.clone(), captured_frame);
            let name = self.scheduler.process(pid).name.clone();
            self.scheduler.process_mut(pid).stack.push(Activation::new(None, self_value, name, frame, defining_class));
        }
        let activation_home = self.scheduler.process(pid).stack.last().expect("just ensured non-empty").home_context();

        let mut ran = 0;
        while ran < quantum && !self.scheduler.yield_requested {
            let idx = self.scheduler.process(pid).next_stmt;
            let Some(stmt) = body.get(idx).cloned() else {
                self.scheduler.terminate(pid);
                return;
            };
            match self.eval_expr(&stmt, &activation_home) {
                Ok(v) => {
                    let p = self.scheduler.process_mut(pid);
                    p.last_result = v;
                    p.next_stmt += 1;
                }
                Err(Unwind::NonLocalReturn { home, value }) if home == activation_home => {
                    self.scheduler.process_mut(pid).last_result = value;
                    self.scheduler.terminate(pid);
                    return;
                }
                Err(Unwind::Signal(sig)) => {
                    log::error!("process '{}' terminated with unhandled {}: {}", self.scheduler.process(pid).name, sig.kind, sig.message);
                    self.scheduler.terminate(pid);
                    return;
                }
                Err(other) => {
                    log::error!("process '{}' terminated with a stray control-flow escape: {other:?}", self.scheduler.process(pid).name);
                    self.scheduler.terminate(pid);
                    return;
                }
            }
            ran += 1;
        }
    }

    pub(crate) fn push_activation(&mut self, activation: Activation) {
        self.stack_mut().push(activation);
    }

    pub(crate) fn pop_activation(&mut self) -> Option<Activation> {
        self.stack_mut().pop()
    }

    pub(crate) fn stack_depth(&self) -> usize {
        self.stack().len()
    }

    pub(crate) fn current_activation_id(&self) -> Option<ActivationId> {
        self.stack().last().map(|a| a.id)
    }

    pub(crate) fn current_frame(&self) -> Rc<std::cell::RefCell<Frame>> {
        self.stack().last().map(|a| Rc::clone(&a.frame)).expect("no active activation")
    }

    pub(crate) fn current_self(&self) -> Value {
        self.stack().last().map_or(Value::Nil, |a| a.receiver.clone())
    }

    pub(crate) fn current_defining_class(&self) -> Option<String> {
        self.stack().last().and_then(|a| a.defining_class.clone())
    }

    /// Home of whichever activation is currently running; `on:do:` uses this
    /// as the unwind target for `return:`/`retry`/a handler falling through
    /// (§4.8). Native primitives run without a frame of their own, so this
    /// is the activation that *sent* `on:do:`, exactly as intended.
    pub(crate) fn current_activation_home(&self) -> HomeContext {
        self.stack().last().expect("on:do: always runs inside some activation").home_context()
    }

    fn stack(&self) -> &Vec<Activation> {
        match self.scheduler.current {
            Some(pid) => &self.scheduler.process(pid).stack,
            None => &self.main_stack,
        }
    }

    fn stack_mut(&mut self) -> &mut Vec<Activation> {
        match self.scheduler.current {
            Some(pid) => &mut self.scheduler.process_mut(pid).stack,
            None => &mut self.main_stack,
        }
    }
}
