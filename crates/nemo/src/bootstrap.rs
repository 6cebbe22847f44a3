//! Loads the core library the rest of the language depends on (§6 "core
//! library contract"): first every built-in class and primitive, then the
//! exception hierarchy every `on:do:`/`signal` matches against by name.
//!
//! `FileStream` and `TestCase` are listed as optional in the contract this
//! was distilled from; neither is installed here (see `DESIGN.md`).

use crate::{
    heap::{ClassObject, HeapData},
    interpreter::Interpreter,
    value::Value,
};

/// Every `ErrorKind` other than the root, in declaration order, each
/// becoming a direct `Error` subclass (§4.8, §7). Kept as a literal list
/// instead of deriving an iterator over `ErrorKind`: the taxonomy is flat
/// and closed, so one more class-name string costs less than a dependency.
const EXCEPTION_SUBCLASSES: &[&str] = &[
    "NameError",
    "ArityError",
    "MessageNotUnderstood",
    "AmbiguousMethod",
    "SlotConflict",
    "SubscriptOutOfBounds",
    "DivisionByZero",
    "TypeError",
    "BlockContextExpired",
    "StackOverflow",
    "OutOfMemory",
    "ProcessError",
];

pub fn install(interp: &mut Interpreter) {
    crate::primitives::install_all(interp);

    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => unreachable!("primitives::install_all always creates Object first"),
    };
    let error_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Error".to_owned(), vec![object_id])));
    interp.globals.set("Error", Value::Class(error_id));
    interp.recompute_and_propagate(error_id);

    for name in EXCEPTION_SUBCLASSES {
        let id = interp.heap.allocate(HeapData::Class(ClassObject::new((*name).to_owned(), vec![error_id])));
        interp.globals.set(*name, Value::Class(id));
        interp.recompute_and_propagate(id);
    }
}
