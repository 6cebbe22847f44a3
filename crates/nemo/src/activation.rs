//! Per-process call stack: activations and the lexical frames that block
//! closures capture (§3 "Activation", §4.4 "Activation records").

use std::{cell::Cell, cell::RefCell, collections::HashMap, rc::Rc};

use crate::value::Value;

thread_local! {
    static NEXT_ACTIVATION_ID: Cell<u64> = const { Cell::new(1) };
}

/// Identifies an activation uniquely for the lifetime of the process that
/// created it; used to target non-local returns and to detect a block whose
/// home activation has already returned (`ErrorKind::BlockContextExpired`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationId(u64);

impl ActivationId {
    pub fn next() -> Self {
        NEXT_ACTIVATION_ID.with(|c| {
            let id = c.get();
            c.set(id + 1);
            Self(id)
        })
    }
}

/// A block's binding to the method activation a non-local return (`^`)
/// inside it must unwind to. `alive` is shared with that `Activation`; once
/// the activation returns it is flipped to `false` and any later attempt to
/// execute the block's `^` raises `BlockContextExpired` instead of
/// corrupting an unrelated, later activation that happens to reuse the id.
#[derive(Debug, Clone)]
pub struct HomeContext {
    pub activation: ActivationId,
    pub alive: Rc<Cell<bool>>,
}

impl PartialEq for HomeContext {
    fn eq(&self, other: &Self) -> bool {
        self.activation == other.activation
    }
}

impl Eq for HomeContext {}

/// Lexical variable scope for one activation. Blocks chain their frame's
/// `parent` to the frame active at the point the block literal was
/// evaluated, which is how captured variables stay visible after the
/// defining activation has otherwise finished running its own statements.
#[derive(Debug)]
pub struct Frame {
    pub locals: HashMap<String, Value>,
    pub self_value: Value,
    pub parent: Option<Rc<RefCell<Frame>>>,
}

impl Frame {
    #[must_use]
    pub fn root(self_value: Value) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { locals: HashMap::new(), self_value, parent: None }))
    }

    #[must_use]
    pub fn child(self_value: Value, parent: Rc<RefCell<Self>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { locals: HashMap::new(), self_value, parent: Some(parent) }))
    }

    /// Walks the lexical chain for `name` (locals and block parameters
    /// before outer scopes). Returning `None` means the interpreter should
    /// fall back to instance slots, then the global namespace.
    pub fn lookup(frame: &Rc<RefCell<Self>>, name: &str) -> Option<Value> {
        let this = frame.borrow();
        if let Some(v) = this.locals.get(name) {
            return Some(v.clone());
        }
        let parent = this.parent.clone();
        drop(this);
        parent.and_then(|p| Self::lookup(&p, name))
    }

    /// Assigns to the nearest enclosing scope that already declares `name`.
    /// Returns `false` when no enclosing scope declares it, so the caller
    /// can fall back to an instance slot or global.
    pub fn assign(frame: &Rc<RefCell<Self>>, name: &str, value: Value) -> bool {
        if frame.borrow().locals.contains_key(name) {
            frame.borrow_mut().locals.insert(name.to_owned(), value);
            return true;
        }
        let parent = frame.borrow().parent.clone();
        match parent {
            Some(parent) => Self::assign(&parent, name, value),
            None => false,
        }
    }

    pub fn declare(frame: &Rc<RefCell<Self>>, name: &str, value: Value) {
        frame.borrow_mut().locals.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn self_value(frame: &Rc<RefCell<Self>>) -> Value {
        frame.borrow().self_value.clone()
    }
}

/// One entry in a process's activation chain (§3 "Activation").
#[derive(Debug)]
pub struct Activation {
    pub id: ActivationId,
    pub sender: Option<ActivationId>,
    pub receiver: Value,
    /// Selector of the running method, or a descriptive label for blocks and
    /// the top-level statement sequence; used for traces (§7) only.
    pub description: String,
    pub frame: Rc<RefCell<Frame>>,
    /// Class that owns the running method, consulted by plain `super`
    /// sends; `None` for a block (which defers to its home activation) and
    /// for top-level statements.
    pub defining_class: Option<String>,
    pub alive: Rc<Cell<bool>>,
}

impl Activation {
    #[must_use]
    pub fn new(
        sender: Option<ActivationId>,
        receiver: Value,
        description: String,
        frame: Rc<RefCell<Frame>>,
        defining_class: Option<String>,
    ) -> Self {
        Self { id: ActivationId::next(), sender, receiver, description, frame, defining_class, alive: Rc::new(Cell::new(true)) }
    }

    #[must_use]
    pub fn home_context(&self) -> HomeContext {
        HomeContext { activation: self.id, alive: Rc::clone(&self.alive) }
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}
