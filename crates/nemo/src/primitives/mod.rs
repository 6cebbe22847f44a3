//! Core primitive methods, organised by class (§4.7), mirroring the
//! teacher's one-file-per-builtin `builtins/` layout but grouped by the
//! receiver class a message-passing runtime actually dispatches on instead
//! of by free function.

mod block;
mod boolean;
mod collections;
mod numeric;
mod object;
mod process;
mod text;

use std::rc::Rc;

use crate::{heap::Method, interpreter::Interpreter, value::Value};

pub use crate::dispatch::NativeFn;

/// Installs a native method on an already-bootstrapped class. Parameter
/// names are cosmetic placeholders (native methods never read the AST-level
/// `params` list; the dispatcher only consults its length for arity
/// checking), so they're generated rather than meaningful.
pub(crate) fn install(interp: &mut Interpreter, class_name: &str, selector: &str, arity: usize, class_side: bool, native: NativeFn) {
    let Some(Value::Class(id)) = interp.globals.get(class_name) else {
        panic!("bootstrap order error: class '{class_name}' not registered before installing '{selector}'");
    };
    let params = (0..arity).map(|i| format!("arg{i}")).collect();
    let method = Rc::new(Method { selector: selector.to_owned(), params, temporaries: Vec::new(), body: Rc::from([]), native: Some(native), owner: class_name.to_owned() });
    let class = interp.heap.class_mut(id);
    if class_side {
        class.own_class_methods.insert(selector.to_owned(), method);
    } else {
        class.own_methods.insert(selector.to_owned(), method);
    }
}

/// Installs every core primitive onto its already-`derive:`d class. Must run
/// after `bootstrap::create_classes` and before any merged-table recompute.
pub(crate) fn install_all(interp: &mut Interpreter) {
    object::install(interp);
    boolean::install(interp);
    numeric::install(interp);
    text::install(interp);
    collections::install(interp);
    block::install(interp);
    process::install(interp);
}

/// `printString` for any value, usable by front ends that need to render a
/// result without sending an actual message (the REPL, `-e`/`--eval`).
pub fn print_string(interp: &mut Interpreter, value: &Value) -> crate::control::RunResult<String> {
    object::print_string(interp, value)
}

/// Shared helper: a one-argument type error for a primitive that got a
/// receiver or argument of the wrong kind.
pub(crate) fn type_error(expected: &str, got: &Value) -> crate::control::Unwind {
    crate::control::Unwind::signal(
        crate::error::ErrorKind::TypeError,
        format!("expected {expected}, got {}", got.class_name()),
        Value::Nil,
    )
}
