//! `Block` primitives: invocation (`value`, `value:`, …), the `whileTrue:`/
//! `whileFalse:` loop forms built directly on repeated invocation rather than
//! as special syntax, `on:do:` (delegated to the exception engine), and
//! `ensure:`/`ifCurtailed:` for cleanup actions (§4.6, §4.9 cancellation).

use crate::{
    control::RunResult,
    heap::{ClassObject, HeapData},
    interpreter::Interpreter,
    value::Value,
};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => panic!("Object must be bootstrapped before Block"),
    };
    let id = interp.heap.allocate(HeapData::Class(ClassObject::new("Block".to_owned(), vec![object_id])));
    interp.globals.set("Block", Value::Class(id));

    super::install(interp, "Block", "value", 0, false, prim_value);
    super::install(interp, "Block", "value:", 1, false, prim_value);
    super::install(interp, "Block", "value:value:", 2, false, prim_value);
    super::install(interp, "Block", "value:value:value:", 3, false, prim_value);
    super::install(interp, "Block", "valueWithArguments:", 1, false, prim_value_with_arguments);
    super::install(interp, "Block", "numArgs", 0, false, prim_num_args);
    super::install(interp, "Block", "whileTrue:", 1, false, prim_while_true);
    super::install(interp, "Block", "whileFalse:", 1, false, prim_while_false);
    super::install(interp, "Block", "whileTrue", 0, false, prim_while_true_bare);
    super::install(interp, "Block", "whileFalse", 0, false, prim_while_false_bare);
    super::install(interp, "Block", "repeat", 0, false, prim_repeat);
    super::install(interp, "Block", "on:do:", 2, false, crate::exception::prim_on_do);
    super::install(interp, "Block", "ensure:", 1, false, prim_ensure);
    super::install(interp, "Block", "ifCurtailed:", 1, false, prim_if_curtailed);

    interp.recompute_and_propagate(id);
}

fn as_block(v: &Value) -> RunResult<crate::heap::HeapId> {
    match v {
        Value::Block(id) => Ok(*id),
        other => Err(super::type_error("Block", other)),
    }
}

fn prim_value(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    interp.invoke_block(as_block(&receiver)?, args)
}

fn prim_value_with_arguments(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Array(arr) = args[0] else { return Err(super::type_error("Array", &args[0])) };
    let HeapData::Array(items) = interp.heap.get(arr) else { return Err(super::type_error("Array", &args[0])) };
    let items = items.clone();
    interp.invoke_block(as_block(&receiver)?, &items)
}

fn prim_num_args(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = as_block(&receiver)?;
    let HeapData::Block(b) = interp.heap.get(id) else { unreachable!() };
    Ok(Value::from(b.params.len() as i64))
}

/// `[cond] whileTrue: [body]`: not special syntax, just repeated invocation
/// of both blocks until the condition returns `false` (§4.6).
fn prim_while_true(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let cond = as_block(&receiver)?;
    let body = as_block(&args[0])?;
    loop {
        match interp.invoke_block(cond, &[])? {
            Value::Boolean(true) => {
                interp.invoke_block(body, &[])?;
            }
            Value::Boolean(false) => return Ok(Value::Nil),
            other => return Err(super::type_error("Boolean", &other)),
        }
    }
}

fn prim_while_false(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let cond = as_block(&receiver)?;
    let body = as_block(&args[0])?;
    loop {
        match interp.invoke_block(cond, &[])? {
            Value::Boolean(false) => {
                interp.invoke_block(body, &[])?;
            }
            Value::Boolean(true) => return Ok(Value::Nil),
            other => return Err(super::type_error("Boolean", &other)),
        }
    }
}

fn prim_while_true_bare(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let cond = as_block(&receiver)?;
    loop {
        match interp.invoke_block(cond, &[])? {
            Value::Boolean(true) => {}
            Value::Boolean(false) => return Ok(Value::Nil),
            other => return Err(super::type_error("Boolean", &other)),
        }
    }
}

fn prim_while_false_bare(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let cond = as_block(&receiver)?;
    loop {
        match interp.invoke_block(cond, &[])? {
            Value::Boolean(false) => {}
            Value::Boolean(true) => return Ok(Value::Nil),
            other => return Err(super::type_error("Boolean", &other)),
        }
    }
}

fn prim_repeat(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let body = as_block(&receiver)?;
    loop {
        interp.invoke_block(body, &[])?;
    }
}

/// Runs `cleanup` after the receiver, whether it returned normally or the
/// evaluation unwound past it (a signal, a non-local return, a `retry`);
/// the cleanup's own result is discarded either way (§4.9 cancellation note).
fn prim_ensure(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let protected = as_block(&receiver)?;
    let cleanup = as_block(&args[0])?;
    let result = interp.invoke_block(protected, &[]);
    interp.invoke_block(cleanup, &[])?;
    result
}

/// Like `ensure:` but only runs `cleanup` when the receiver is curtailed
/// (unwound abnormally), not on an ordinary return.
fn prim_if_curtailed(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let protected = as_block(&receiver)?;
    let cleanup = as_block(&args[0])?;
    match interp.invoke_block(protected, &[]) {
        Ok(v) => Ok(v),
        Err(err) => {
            interp.invoke_block(cleanup, &[])?;
            Err(err)
        }
    }
}
