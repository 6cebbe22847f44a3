//! `Boolean` primitives (§4.7). `true` and `false` share one class — nothing
//! in the core primitive set dispatches differently per truth value, so
//! there is no behavioural reason to split `True`/`False` the way historical
//! Smalltalk does; every primitive below just branches on the underlying
//! `bool` directly. See `DESIGN.md`.

use crate::{control::RunResult, heap::{ClassObject, HeapData}, interpreter::Interpreter, value::Value};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => panic!("Object must be bootstrapped before Boolean"),
    };
    let id = interp.heap.allocate(HeapData::Class(ClassObject::new("Boolean".to_owned(), vec![object_id])));
    interp.globals.set("Boolean", Value::Class(id));

    super::install(interp, "Boolean", "ifTrue:", 1, false, prim_if_true);
    super::install(interp, "Boolean", "ifFalse:", 1, false, prim_if_false);
    super::install(interp, "Boolean", "ifTrue:ifFalse:", 2, false, prim_if_true_if_false);
    super::install(interp, "Boolean", "ifFalse:ifTrue:", 2, false, prim_if_false_if_true);
    super::install(interp, "Boolean", "and:", 1, false, prim_and);
    super::install(interp, "Boolean", "or:", 1, false, prim_or);
    super::install(interp, "Boolean", "not", 0, false, prim_not);
    super::install(interp, "Boolean", "&", 1, false, prim_bitand);
    super::install(interp, "Boolean", "|", 1, false, prim_bitor);

    interp.recompute_and_propagate(id);
}

fn as_bool(v: &Value) -> RunResult<bool> {
    match v {
        Value::Boolean(b) => Ok(*b),
        other => Err(super::type_error("Boolean", other)),
    }
}

fn as_block(v: &Value) -> RunResult<crate::heap::HeapId> {
    match v {
        Value::Block(id) => Ok(*id),
        other => Err(super::type_error("Block", other)),
    }
}

fn prim_if_true(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    if as_bool(&receiver)? { interp.invoke_block(as_block(&args[0])?, &[]) } else { Ok(Value::Nil) }
}

fn prim_if_false(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    if as_bool(&receiver)? { Ok(Value::Nil) } else { interp.invoke_block(as_block(&args[0])?, &[]) }
}

fn prim_if_true_if_false(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let branch = if as_bool(&receiver)? { &args[0] } else { &args[1] };
    interp.invoke_block(as_block(branch)?, &[])
}

fn prim_if_false_if_true(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let branch = if as_bool(&receiver)? { &args[1] } else { &args[0] };
    interp.invoke_block(as_block(branch)?, &[])
}

fn prim_and(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    if as_bool(&receiver)? { interp.invoke_block(as_block(&args[0])?, &[]) } else { Ok(Value::Boolean(false)) }
}

fn prim_or(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    if as_bool(&receiver)? { Ok(Value::Boolean(true)) } else { interp.invoke_block(as_block(&args[0])?, &[]) }
}

fn prim_not(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(!as_bool(&receiver)?))
}

fn prim_bitand(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(as_bool(&receiver)? && as_bool(&args[0])?))
}

fn prim_bitor(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(as_bool(&receiver)? || as_bool(&args[0])?))
}
