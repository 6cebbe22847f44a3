//! `String` and `Symbol` primitives (§4.7 "String"). Symbols get the same
//! size/concatenation/comparison behaviour as strings since both are
//! `Rc<str>` at the value level; only `asSymbol`/`asString`/printing differ.

use std::rc::Rc;

use crate::{
    control::{RunResult, Unwind},
    error::ErrorKind,
    heap::{ClassObject, HeapData},
    interpreter::Interpreter,
    value::{Integer, Value},
};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => panic!("Object must be bootstrapped first"),
    };
    let string_id = interp.heap.allocate(HeapData::Class(ClassObject::new("String".to_owned(), vec![object_id])));
    interp.globals.set("String", Value::Class(string_id));

    let symbol_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Symbol".to_owned(), vec![object_id])));
    interp.globals.set("Symbol", Value::Class(symbol_id));

    for class in ["String", "Symbol"] {
        super::install(interp, class, "size", 0, false, prim_size);
        super::install(interp, class, "at:", 1, false, prim_at);
        super::install(interp, class, ",", 1, false, prim_concat);
        super::install(interp, class, "=", 1, false, prim_eq);
        super::install(interp, class, "asSymbol", 0, false, prim_as_symbol);
        super::install(interp, class, "asString", 0, false, prim_as_string);
        super::install(interp, class, "asInteger", 0, false, prim_as_integer);
        super::install(interp, class, "repeat:", 1, false, prim_repeat);
        super::install(interp, class, "println", 0, false, prim_println);
        super::install(interp, class, "do:", 1, false, prim_do);
        super::install(interp, class, "isEmpty", 0, false, prim_is_empty);
    }

    interp.recompute_and_propagate(string_id);
    interp.recompute_and_propagate(symbol_id);
}

fn as_str(v: &Value) -> RunResult<Rc<str>> {
    match v {
        Value::String(s) | Value::Symbol(s) => Ok(Rc::clone(s)),
        other => Err(super::type_error("String", other)),
    }
}

fn prim_size(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::from(as_str(&receiver)?.chars().count() as i64))
}

fn prim_is_empty(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(as_str(&receiver)?.is_empty()))
}

/// 1-based; returns a one-character string (§4.7).
fn prim_at(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let s = as_str(&receiver)?;
    let Value::Integer(Integer::Small(idx)) = args[0] else { return Err(super::type_error("Integer", &args[0])) };
    let chars: Vec<char> = s.chars().collect();
    if idx < 1 || idx as usize > chars.len() {
        return Err(Unwind::signal(ErrorKind::SubscriptOutOfBounds, format!("index {idx} out of bounds for a String of size {}", chars.len()), Value::Nil));
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(Value::String(Rc::from(chars[idx as usize - 1].to_string().as_str())))
}

fn prim_concat(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let a = as_str(&receiver)?;
    let b = as_str(&args[0])?;
    Ok(Value::String(Rc::from(format!("{a}{b}").as_str())))
}

fn prim_eq(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Ok(other) = as_str(&args[0]) else { return Ok(Value::Boolean(false)) };
    Ok(Value::Boolean(*as_str(&receiver)? == *other))
}

fn prim_as_symbol(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Symbol(as_str(&receiver)?))
}

fn prim_as_string(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::String(as_str(&receiver)?))
}

fn prim_as_integer(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let s = as_str(&receiver)?;
    s.trim().parse::<i64>().map(Value::from).map_err(|_| {
        Unwind::signal(ErrorKind::TypeError, format!("'{s}' is not a valid integer"), Value::Nil)
    })
}

fn prim_repeat(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let s = as_str(&receiver)?;
    let Value::Integer(Integer::Small(n)) = args[0] else { return Err(super::type_error("Integer", &args[0])) };
    #[allow(clippy::cast_sign_loss)]
    Ok(Value::String(Rc::from(s.repeat(n.max(0) as usize).as_str())))
}

fn prim_println(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    println!("{}", as_str(&receiver)?);
    Ok(receiver)
}

fn prim_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let s = as_str(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for ch in s.chars() {
        interp.invoke_block(block, &[Value::String(Rc::from(ch.to_string().as_str()))])?;
    }
    Ok(receiver)
}
