//! `Object` primitives: identity, reflection, and the class-side allocation
//! and inheritance-declaration messages every other class inherits (§4.7
//! "Object", §4.3 "Object & Class Model").

use std::rc::Rc;

use crate::{
    control::{RunResult, Unwind},
    error::ErrorKind,
    heap::{ClassObject, HeapData, InstanceObject},
    interpreter::Interpreter,
    value::Value,
};

pub(super) fn install(interp: &mut Interpreter) {
    let id = interp.heap.allocate(HeapData::Class(ClassObject::new("Object".to_owned(), Vec::new())));
    interp.globals.set("Object", Value::Class(id));

    super::install(interp, "Object", "class", 0, false, prim_class);
    super::install(interp, "Object", "printString", 0, false, prim_print_string);
    super::install(interp, "Object", "printNl", 0, false, prim_print_nl);
    super::install(interp, "Object", "println", 0, false, prim_print_nl);
    super::install(interp, "Object", "==", 1, false, prim_identity_eq);
    super::install(interp, "Object", "=", 1, false, prim_identity_eq);
    super::install(interp, "Object", "~=", 1, false, prim_not_eq);
    super::install(interp, "Object", "isNil", 0, false, prim_is_nil);
    super::install(interp, "Object", "notNil", 0, false, prim_not_nil);
    super::install(interp, "Object", "respondsTo:", 1, false, prim_responds_to);
    super::install(interp, "Object", "at:", 1, false, prim_at);
    super::install(interp, "Object", "at:put:", 2, false, prim_at_put);
    super::install(interp, "Object", "perform:", 1, false, prim_perform);
    super::install(interp, "Object", "perform:with:", 2, false, prim_perform_with);
    super::install(interp, "Object", "perform:withArguments:", 2, false, prim_perform_with_arguments);
    super::install(interp, "Object", "error:", 1, false, crate::exception::prim_error);
    super::install(interp, "Object", "signal:", 1, false, crate::exception::prim_signal);
    super::install(interp, "Object", "signal", 0, false, crate::exception::prim_signal);
    super::install(interp, "Object", "resume:", 1, false, crate::exception::prim_resume);
    super::install(interp, "Object", "retry", 0, false, crate::exception::prim_retry);
    super::install(interp, "Object", "pass", 0, false, crate::exception::prim_pass);
    super::install(interp, "Object", "return:", 1, false, crate::exception::prim_return);

    super::install(interp, "Object", "new", 0, true, prim_new);
    super::install(interp, "Object", "derive", 0, true, prim_derive);
    super::install(interp, "Object", "derive:", 1, true, prim_derive_slots);
    super::install(interp, "Object", "derive:parents:", 2, true, prim_derive_slots_parents);
    super::install(interp, "Object", "addParent:", 1, true, prim_add_parent);
    super::install(interp, "Object", "name", 0, true, prim_class_name);

    interp.heap.recompute_merged(id);
}

fn prim_class(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Class(interp.class_of(&receiver)?))
}

fn prim_class_name(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Class(id) = receiver else { return Err(super::type_error("Class", &receiver)) };
    Ok(Value::from(interp.heap.class(id).name.as_str()))
}

pub(crate) fn print_string(interp: &mut Interpreter, value: &Value) -> RunResult<String> {
    Ok(match value {
        Value::Nil => "nil".to_owned(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.to_string(),
        Value::Symbol(s) => format!("#{s}"),
        Value::Class(id) => interp.heap.class(*id).name.clone(),
        Value::Array(id) => {
            let HeapData::Array(items) = interp.heap.get(*id) else { unreachable!() };
            let items = items.clone();
            let parts = items.iter().map(|v| print_string(interp, v)).collect::<RunResult<Vec<_>>>()?;
            format!("(#({}))", parts.join(" "))
        }
        Value::Table(id) => {
            let HeapData::Table(table) = interp.heap.get(*id) else { unreachable!() };
            let pairs: Vec<(Rc<str>, Value)> = table.iter().map(|(k, v)| (Rc::clone(k), v.clone())).collect();
            let mut parts = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                parts.push(format!("{k} -> {}", print_string(interp, &v)?));
            }
            format!("#{{{}}}", parts.join(". "))
        }
        Value::Block(_) => "a Block".to_owned(),
        Value::Instance(id) => {
            let HeapData::Instance(inst) = interp.heap.get(*id) else { unreachable!() };
            format!("a {}", interp.heap.class(inst.class).name)
        }
    })
}

fn prim_print_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::from(print_string(interp, &receiver)?.as_str()))
}

fn prim_print_nl(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    println!("{}", print_string(interp, &receiver)?);
    Ok(receiver)
}

fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::String(x) | Value::Symbol(x), Value::String(y) | Value::Symbol(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::Array(x), Value::Array(y))
        | (Value::Table(x), Value::Table(y))
        | (Value::Block(x), Value::Block(y))
        | (Value::Class(x), Value::Class(y))
        | (Value::Instance(x), Value::Instance(y)) => x == y,
        _ => false,
    }
}

fn prim_identity_eq(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(values_identical(&receiver, &args[0])))
}

fn prim_not_eq(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(!values_identical(&receiver, &args[0])))
}

fn prim_is_nil(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(receiver.is_nil()))
}

fn prim_not_nil(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(!receiver.is_nil()))
}

fn selector_of(value: &Value) -> RunResult<String> {
    match value {
        Value::Symbol(s) | Value::String(s) => Ok(s.to_string()),
        other => Err(super::type_error("Symbol", other)),
    }
}

fn prim_responds_to(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let selector = selector_of(&args[0])?;
    let class_side = matches!(receiver, Value::Class(_));
    let root = interp.class_of(&receiver)?;
    let class = interp.heap.class(root);
    let found = if class_side { class.merged_class_methods.contains_key(&selector) } else { class.merged_methods.contains_key(&selector) };
    Ok(Value::Boolean(found))
}

/// Generic instance-slot access by name (§4.3): `anObject at: #x` / `anObject
/// at: #x put: 3`. `Array`/`Table` each install their own `at:`/`at:put:`
/// that shadow this one via ordinary method lookup, since an indexed
/// position and a slot name share no representation here.
fn prim_at(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let name = selector_of(&args[0])?;
    let Value::Instance(id) = receiver else { return Err(super::type_error("Instance", &receiver)) };
    let HeapData::Instance(inst) = interp.heap.get(id) else { unreachable!() };
    let class = interp.heap.class(inst.class);
    let Some(idx) = class.slot_index(&name) else {
        return Err(Unwind::signal(ErrorKind::NameError, format!("no slot named '{name}'"), Value::Nil));
    };
    Ok(inst.slots[idx].clone())
}

fn prim_at_put(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let name = selector_of(&args[0])?;
    let Value::Instance(id) = receiver else { return Err(super::type_error("Instance", &receiver)) };
    let class_id = {
        let HeapData::Instance(inst) = interp.heap.get(id) else { unreachable!() };
        inst.class
    };
    let Some(idx) = interp.heap.class(class_id).slot_index(&name) else {
        return Err(Unwind::signal(ErrorKind::NameError, format!("no slot named '{name}'"), Value::Nil));
    };
    let HeapData::Instance(inst) = interp.heap.get_mut(id) else { unreachable!() };
    inst.slots[idx] = args[1].clone();
    Ok(receiver)
}

fn prim_perform(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let selector = selector_of(&args[0])?;
    interp.send(receiver, &selector, &[], None, None)
}

fn prim_perform_with(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let selector = selector_of(&args[0])?;
    interp.send(receiver, &selector, std::slice::from_ref(&args[1]), None, None)
}

fn prim_perform_with_arguments(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let selector = selector_of(&args[0])?;
    let Value::Array(id) = args[1] else { return Err(super::type_error("Array", &args[1])) };
    let HeapData::Array(extra) = interp.heap.get(id) else { unreachable!() };
    let extra = extra.clone();
    interp.send(receiver, &selector, &extra, None, None)
}

fn prim_new(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Class(id) = receiver else { return Err(super::type_error("Class", &receiver)) };
    let slot_count = interp.heap.class(id).merged_slots.len();
    let instance = InstanceObject { class: id, slots: vec![Value::Nil; slot_count] };
    Ok(Value::Instance(interp.heap.allocate(HeapData::Instance(instance))))
}

fn prim_derive(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    derive_with(interp, receiver, &[], &[])
}

fn prim_derive_slots(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let slots = array_of_symbols(interp, &args[0])?;
    derive_with(interp, receiver, &slots, &[])
}

fn prim_derive_slots_parents(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let slots = array_of_symbols(interp, &args[0])?;
    let Value::Array(id) = args[1] else { return Err(super::type_error("Array", &args[1])) };
    let HeapData::Array(items) = interp.heap.get(id) else { unreachable!() };
    let items = items.clone();
    let mut parents = Vec::with_capacity(items.len());
    for item in items {
        let Value::Class(parent_id) = item else { return Err(super::type_error("Class", &item)) };
        parents.push(parent_id);
    }
    derive_with(interp, receiver, &slots, &parents)
}

fn array_of_symbols(interp: &Interpreter, value: &Value) -> RunResult<Vec<String>> {
    let Value::Array(id) = value else { return Err(super::type_error("Array", value)) };
    let HeapData::Array(items) = interp.heap.get(*id) else { unreachable!() };
    items.iter().map(|v| selector_of(v)).collect()
}

fn derive_with(interp: &mut Interpreter, receiver: Value, slots: &[String], extra_parents: &[crate::heap::HeapId]) -> RunResult<Value> {
    let Value::Class(parent_id) = receiver else { return Err(super::type_error("Class", &receiver)) };
    let mut superclasses = vec![parent_id];
    superclasses.extend_from_slice(extra_parents);
    // Named on first assignment to a global, matching `Point := Object derive: #(x y)`
    // (see `Interpreter::eval_expr`'s `Assign` arm); empty until then.
    let mut class = ClassObject::new(String::new(), superclasses);
    class.own_slots = slots.to_vec();
    let id = interp.heap.allocate(HeapData::Class(class));
    interp.recompute_and_propagate(id);
    Ok(Value::Class(id))
}

fn prim_add_parent(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Class(id) = receiver else { return Err(super::type_error("Class", &receiver)) };
    let Value::Class(parent_id) = args[0] else { return Err(super::type_error("Class", &args[0])) };
    interp.heap.class_mut(id).superclasses.push(parent_id);
    interp.recompute_and_propagate(id);
    Ok(receiver)
}

