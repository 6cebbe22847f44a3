//! `Integer` and `Float` primitives (§4.7 "Integer / Float"). Both classes
//! derive from an abstract `Number` that carries no primitives of its own —
//! every core arithmetic/comparison selector is implemented per concrete
//! representation since mixed Integer/Float arithmetic needs its own
//! coercion rule at each operation, not a single shared formula.

use crate::{
    control::{RunResult, Unwind},
    error::ErrorKind,
    heap::{ClassObject, HeapData},
    interpreter::Interpreter,
    value::{Integer, Value},
};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = class_id(interp, "Object");
    let number_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Number".to_owned(), vec![object_id])));
    interp.globals.set("Number", Value::Class(number_id));
    interp.recompute_and_propagate(number_id);

    let integer_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Integer".to_owned(), vec![number_id])));
    interp.globals.set("Integer", Value::Class(integer_id));

    let float_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Float".to_owned(), vec![number_id])));
    interp.globals.set("Float", Value::Class(float_id));

    for class in ["Integer", "Float"] {
        super::install(interp, class, "+", 1, false, prim_add);
        super::install(interp, class, "-", 1, false, prim_sub);
        super::install(interp, class, "*", 1, false, prim_mul);
        super::install(interp, class, "/", 1, false, prim_div);
        super::install(interp, class, "//", 1, false, prim_floor_div);
        super::install(interp, class, "%", 1, false, prim_mod);
        super::install(interp, class, "\\\\", 1, false, prim_mod);
        super::install(interp, class, "<", 1, false, prim_lt);
        super::install(interp, class, ">", 1, false, prim_gt);
        super::install(interp, class, "<=", 1, false, prim_le);
        super::install(interp, class, ">=", 1, false, prim_ge);
        super::install(interp, class, "=", 1, false, prim_num_eq);
        super::install(interp, class, "negated", 0, false, prim_negated);
        super::install(interp, class, "asFloat", 0, false, prim_as_float);
        super::install(interp, class, "asString", 0, false, prim_as_string);
        super::install(interp, class, "abs", 0, false, prim_abs);
    }
    super::install(interp, "Integer", "asInteger", 0, false, |_, r, _| Ok(r));
    super::install(interp, "Float", "asInteger", 0, false, prim_float_as_integer);
    super::install(interp, "Integer", "to:do:", 2, false, prim_to_do);
    super::install(interp, "Integer", "to:by:do:", 3, false, prim_to_by_do);
    super::install(interp, "Integer", "timesRepeat:", 1, false, prim_times_repeat);

    interp.recompute_and_propagate(integer_id);
    interp.recompute_and_propagate(float_id);
}

fn class_id(interp: &Interpreter, name: &str) -> crate::heap::HeapId {
    match interp.globals.get(name) {
        Some(Value::Class(id)) => id,
        _ => panic!("'{name}' must be bootstrapped first"),
    }
}

/// Number operands coerce to `f64` the moment either side is a `Float`;
/// otherwise both stay `Integer` arithmetic (§10.5 overflow promotion).
enum Operand {
    Int(Integer),
    Float(f64),
}

fn operand(v: &Value) -> RunResult<Operand> {
    match v {
        Value::Integer(n) => Ok(Operand::Int(n.clone())),
        Value::Float(f) => Ok(Operand::Float(*f)),
        other => Err(super::type_error("Number", other)),
    }
}

fn prim_add(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => Ok(Value::Integer(a.checked_add(&b))),
        (a, b) => Ok(Value::Float(to_f64(a) + to_f64(b))),
    }
}

fn prim_sub(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => Ok(Value::Integer(a.checked_sub(&b))),
        (a, b) => Ok(Value::Float(to_f64(a) - to_f64(b))),
    }
}

fn prim_mul(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => Ok(Value::Integer(a.checked_mul(&b))),
        (a, b) => Ok(Value::Float(to_f64(a) * to_f64(b))),
    }
}

fn to_f64(op: Operand) -> f64 {
    match op {
        Operand::Int(n) => n.to_f64(),
        Operand::Float(f) => f,
    }
}

fn div_by_zero() -> Unwind {
    Unwind::signal(ErrorKind::DivisionByZero, "division by zero", Value::Nil)
}

/// `/` produces a `Float` unless both operands are `Integer` and the
/// division is exact, matching §4.7's "`/` producing Float on non-divisible
/// integers".
fn prim_div(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => {
            if b.is_zero() {
                return Err(div_by_zero());
            }
            let q = a.div_floor(&b);
            if q.checked_mul(&b) == a {
                Ok(Value::Integer(q))
            } else {
                Ok(Value::Float(a.to_f64() / b.to_f64()))
            }
        }
        (a, b) => {
            let b = to_f64(b);
            if b == 0.0 {
                return Err(div_by_zero());
            }
            Ok(Value::Float(to_f64(a) / b))
        }
    }
}

fn prim_floor_div(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => {
            if b.is_zero() {
                return Err(div_by_zero());
            }
            Ok(Value::Integer(a.div_floor(&b)))
        }
        (a, b) => {
            let b = to_f64(b);
            if b == 0.0 {
                return Err(div_by_zero());
            }
            Ok(Value::Float((to_f64(a) / b).floor()))
        }
    }
}

fn prim_mod(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    match (operand(&receiver)?, operand(&args[0])?) {
        (Operand::Int(a), Operand::Int(b)) => {
            if b.is_zero() {
                return Err(div_by_zero());
            }
            Ok(Value::Integer(a.mod_floor(&b)))
        }
        (a, b) => {
            let a = to_f64(a);
            let b = to_f64(b);
            if b == 0.0 {
                return Err(div_by_zero());
            }
            Ok(Value::Float(a - b * (a / b).floor()))
        }
    }
}

fn compare(receiver: &Value, arg: &Value) -> RunResult<std::cmp::Ordering> {
    match (operand(receiver)?, operand(arg)?) {
        (Operand::Int(a), Operand::Int(b)) => Ok(a.cmp(&b)),
        (a, b) => to_f64(a).partial_cmp(&to_f64(b)).ok_or_else(|| Unwind::signal(ErrorKind::TypeError, "NaN is not ordered", Value::Nil)),
    }
}

fn prim_lt(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(compare(&receiver, &args[0])?.is_lt()))
}

fn prim_gt(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(compare(&receiver, &args[0])?.is_gt()))
}

fn prim_le(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(compare(&receiver, &args[0])?.is_le()))
}

fn prim_ge(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    Ok(Value::Boolean(compare(&receiver, &args[0])?.is_ge()))
}

fn prim_num_eq(_interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Ok(other) = operand(&args[0]) else { return Ok(Value::Boolean(false)) };
    match (operand(&receiver)?, other) {
        (Operand::Int(a), Operand::Int(b)) => Ok(Value::Boolean(a == b)),
        (a, b) => Ok(Value::Boolean((to_f64(a) - to_f64(b)).abs() == 0.0)),
    }
}

fn prim_negated(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    match operand(&receiver)? {
        Operand::Int(n) => Ok(Value::Integer(n.neg())),
        Operand::Float(f) => Ok(Value::Float(-f)),
    }
}

fn prim_abs(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    match operand(&receiver)? {
        Operand::Int(n) if n.cmp(&Integer::small(0)).is_lt() => Ok(Value::Integer(n.neg())),
        Operand::Int(n) => Ok(Value::Integer(n)),
        Operand::Float(f) => Ok(Value::Float(f.abs())),
    }
}

fn prim_as_float(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Float(to_f64(operand(&receiver)?)))
}

fn prim_float_as_integer(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Float(f) = receiver else { return Err(super::type_error("Float", &receiver)) };
    #[allow(clippy::cast_possible_truncation)]
    Ok(Value::Integer(Integer::small(f.trunc() as i64)))
}

fn prim_as_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::from(super::object::print_string(interp, &receiver)?.as_str()))
}

fn as_i64(v: &Value) -> RunResult<i64> {
    match v {
        Value::Integer(Integer::Small(n)) => Ok(*n),
        other => Err(super::type_error("Integer", other)),
    }
}

fn prim_to_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let start = as_i64(&receiver)?;
    let end = as_i64(&args[0])?;
    let Value::Block(block) = args[1] else { return Err(super::type_error("Block", &args[1])) };
    let mut i = start;
    while i <= end {
        interp.invoke_block(block, &[Value::from(i)])?;
        i += 1;
    }
    Ok(receiver)
}

fn prim_to_by_do(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let start = as_i64(&receiver)?;
    let end = as_i64(&args[0])?;
    let step = as_i64(&args[1])?;
    if step == 0 {
        return Err(Unwind::signal(ErrorKind::TypeError, "to:by:do: step must not be zero", Value::Nil));
    }
    let Value::Block(block) = args[2] else { return Err(super::type_error("Block", &args[2])) };
    let mut i = start;
    while (step > 0 && i <= end) || (step < 0 && i >= end) {
        interp.invoke_block(block, &[Value::from(i)])?;
        i += step;
    }
    Ok(receiver)
}

fn prim_times_repeat(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let n = as_i64(&receiver)?;
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    for _ in 0..n {
        interp.invoke_block(block, &[])?;
    }
    Ok(receiver)
}
