//! `Array` and `Table` primitives (§4.7). Arrays are 1-indexed throughout,
//! matching every other indexed access in the language.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    control::{RunResult, Unwind},
    error::ErrorKind,
    heap::{ClassObject, HeapData, HeapId},
    interpreter::Interpreter,
    value::{Integer, Value},
};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => panic!("Object must be bootstrapped first"),
    };
    let array_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Array".to_owned(), vec![object_id])));
    interp.globals.set("Array", Value::Class(array_id));

    let table_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Table".to_owned(), vec![object_id])));
    interp.globals.set("Table", Value::Class(table_id));

    super::install(interp, "Array", "new", 0, true, prim_array_new);
    super::install(interp, "Array", "size", 0, false, prim_array_size);
    super::install(interp, "Array", "at:", 1, false, prim_array_at);
    super::install(interp, "Array", "at:put:", 2, false, prim_array_at_put);
    super::install(interp, "Array", "add:", 1, false, prim_array_add);
    super::install(interp, "Array", "do:", 1, false, prim_array_do);
    super::install(interp, "Array", "collect:", 1, false, prim_array_collect);
    super::install(interp, "Array", "select:", 1, false, prim_array_select);
    super::install(interp, "Array", "detect:", 1, false, prim_array_detect);
    super::install(interp, "Array", "inject:into:", 2, false, prim_array_inject_into);
    super::install(interp, "Array", "join:", 1, false, prim_array_join);
    super::install(interp, "Array", "isEmpty", 0, false, prim_array_is_empty);

    super::install(interp, "Table", "new", 0, true, prim_table_new);
    super::install(interp, "Table", "at:", 1, false, prim_table_at);
    super::install(interp, "Table", "at:put:", 2, false, prim_table_at_put);
    super::install(interp, "Table", "keys", 0, false, prim_table_keys);
    super::install(interp, "Table", "includesKey:", 1, false, prim_table_includes_key);
    super::install(interp, "Table", "do:", 1, false, prim_table_do);
    super::install(interp, "Table", "keysAndValuesDo:", 1, false, prim_table_keys_and_values_do);
    super::install(interp, "Table", "size", 0, false, prim_table_size);

    interp.recompute_and_propagate(array_id);
    interp.recompute_and_propagate(table_id);
}

fn as_array(v: &Value) -> RunResult<HeapId> {
    match v {
        Value::Array(id) => Ok(*id),
        other => Err(super::type_error("Array", other)),
    }
}

fn as_table(v: &Value) -> RunResult<HeapId> {
    match v {
        Value::Table(id) => Ok(*id),
        other => Err(super::type_error("Table", other)),
    }
}

fn as_index(v: &Value, len: usize) -> RunResult<usize> {
    let Value::Integer(Integer::Small(idx)) = v else { return Err(super::type_error("Integer", v)) };
    if *idx < 1 || *idx as usize > len {
        return Err(Unwind::signal(ErrorKind::SubscriptOutOfBounds, format!("index {idx} out of bounds for size {len}"), Value::Nil));
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(*idx as usize - 1)
}

/// Overrides `Object class>>new`: an `Array` is a `HeapData::Array`, not an
/// `InstanceObject` with zero slots, so the generic allocator doesn't fit.
fn prim_array_new(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Array(interp.heap.allocate(HeapData::Array(Vec::new()))))
}

fn prim_array_size(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() };
    Ok(Value::from(items.len() as i64))
}

fn prim_array_is_empty(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() };
    Ok(Value::Boolean(items.is_empty()))
}

fn prim_array_at(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() };
    let idx = as_index(&args[0], items.len())?;
    Ok(items[idx].clone())
}

fn prim_array_at_put(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let len = { let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() }; items.len() };
    let idx = as_index(&args[0], len)?;
    let HeapData::Array(items) = interp.heap.get_mut(id) else { unreachable!() };
    items[idx] = args[1].clone();
    Ok(args[1].clone())
}

fn prim_array_add(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let HeapData::Array(items) = interp.heap.get_mut(id) else { unreachable!() };
    items.push(args[0].clone());
    Ok(args[0].clone())
}

fn snapshot(interp: &Interpreter, id: HeapId) -> Vec<Value> {
    let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() };
    items.clone()
}

fn prim_array_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for item in snapshot(interp, id) {
        interp.invoke_block(block, &[item])?;
    }
    Ok(receiver)
}

fn prim_array_collect(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    let mut result = Vec::new();
    for item in snapshot(interp, id) {
        result.push(interp.invoke_block(block, &[item])?);
    }
    Ok(Value::Array(interp.heap.allocate(HeapData::Array(result))))
}

fn prim_array_select(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    let mut result = Vec::new();
    for item in snapshot(interp, id) {
        if matches!(interp.invoke_block(block, &[item.clone()])?, Value::Boolean(true)) {
            result.push(item);
        }
    }
    Ok(Value::Array(interp.heap.allocate(HeapData::Array(result))))
}

fn prim_array_detect(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for item in snapshot(interp, id) {
        if matches!(interp.invoke_block(block, &[item.clone()])?, Value::Boolean(true)) {
            return Ok(item);
        }
    }
    Err(Unwind::signal(ErrorKind::Error, "detect: found no matching element", Value::Nil))
}

fn prim_array_inject_into(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let Value::Block(block) = args[1] else { return Err(super::type_error("Block", &args[1])) };
    let mut acc = args[0].clone();
    for item in snapshot(interp, id) {
        acc = interp.invoke_block(block, &[acc, item])?;
    }
    Ok(acc)
}

fn prim_array_join(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_array(&receiver)?;
    let sep = match &args[0] {
        Value::String(s) | Value::Symbol(s) => s.to_string(),
        other => return Err(super::type_error("String", other)),
    };
    let mut parts = Vec::new();
    for item in snapshot(interp, id) {
        parts.push(super::object::print_string(interp, &item)?);
    }
    Ok(Value::from(parts.join(&sep).as_str()))
}

fn table_key(v: &Value) -> RunResult<Rc<str>> {
    match v {
        Value::Symbol(s) | Value::String(s) => Ok(Rc::clone(s)),
        other => Err(super::type_error("Symbol", other)),
    }
}

/// Overrides `Object class>>new` for the same reason `Array` does.
fn prim_table_new(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Table(interp.heap.allocate(HeapData::Table(IndexMap::new()))))
}

fn prim_table_size(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let HeapData::Table(t) = interp.heap.get(id) else { unreachable!() };
    Ok(Value::from(t.len() as i64))
}

fn prim_table_at(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let key = table_key(&args[0])?;
    let HeapData::Table(t) = interp.heap.get(id) else { unreachable!() };
    t.get(&key).cloned().ok_or_else(|| Unwind::signal(ErrorKind::SubscriptOutOfBounds, format!("key '{key}' not found"), Value::Nil))
}

fn prim_table_at_put(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let key = table_key(&args[0])?;
    let HeapData::Table(t) = interp.heap.get_mut(id) else { unreachable!() };
    t.insert(key, args[1].clone());
    Ok(args[1].clone())
}

fn prim_table_keys(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let HeapData::Table(t) = interp.heap.get(id) else { unreachable!() };
    let keys: Vec<Value> = t.keys().map(|k| Value::Symbol(Rc::clone(k))).collect();
    Ok(Value::Array(interp.heap.allocate(HeapData::Array(keys))))
}

fn prim_table_includes_key(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let key = table_key(&args[0])?;
    let HeapData::Table(t) = interp.heap.get(id) else { unreachable!() };
    Ok(Value::Boolean(t.contains_key(&key)))
}

fn table_snapshot(interp: &Interpreter, id: HeapId) -> Vec<(Rc<str>, Value)> {
    let HeapData::Table(t) = interp.heap.get(id) else { unreachable!() };
    t.iter().map(|(k, v)| (Rc::clone(k), v.clone())).collect()
}

fn prim_table_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for (_, v) in table_snapshot(interp, id) {
        interp.invoke_block(block, &[v])?;
    }
    Ok(receiver)
}

fn prim_table_keys_and_values_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let id = as_table(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for (k, v) in table_snapshot(interp, id) {
        interp.invoke_block(block, &[Value::Symbol(k), v])?;
    }
    Ok(receiver)
}
