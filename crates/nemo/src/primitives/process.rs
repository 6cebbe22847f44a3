//! `Processor` (class-side scheduler control) and `Process` (a handle onto a
//! forked green thread) primitives (§4.9).
//!
//! A `Process` instance carries its `ProcessId` in its one slot, smuggled
//! through as a plain `Integer` — the scheduler itself has no notion of
//! `Value` at all, so this is the seam where the two meet.

use crate::{
    control::RunResult,
    heap::{ClassObject, HeapData, InstanceObject},
    interpreter::Interpreter,
    process::{ProcessId, ProcessState},
    value::{Integer, Value},
};

pub(super) fn install(interp: &mut Interpreter) {
    let object_id = match interp.globals.get("Object") {
        Some(Value::Class(id)) => id,
        _ => panic!("Object must be bootstrapped before Processor/Process"),
    };

    let processor_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Processor".to_owned(), vec![object_id])));
    interp.globals.set("Processor", Value::Class(processor_id));

    let process_id = interp.heap.allocate(HeapData::Class(ClassObject::new("Process".to_owned(), vec![object_id])));
    interp.heap.class_mut(process_id).own_slots.push("pid".to_owned());
    interp.globals.set("Process", Value::Class(process_id));

    super::install(interp, "Processor", "fork:", 1, true, prim_fork);
    super::install(interp, "Processor", "yield", 0, true, prim_yield);
    super::install(interp, "Processor", "activeProcess", 0, true, prim_active_process);

    super::install(interp, "Process", "pid", 0, false, prim_pid);
    super::install(interp, "Process", "name", 0, false, prim_name);
    super::install(interp, "Process", "state", 0, false, prim_state);
    super::install(interp, "Process", "suspend", 0, false, prim_suspend);
    super::install(interp, "Process", "resume", 0, false, prim_resume);
    super::install(interp, "Process", "terminate", 0, false, prim_terminate);

    interp.recompute_and_propagate(processor_id);
    interp.recompute_and_propagate(process_id);
}

fn process_class_id(interp: &Interpreter) -> crate::heap::HeapId {
    match interp.globals.get("Process") {
        Some(Value::Class(id)) => id,
        _ => panic!("Process must be bootstrapped"),
    }
}

fn wrap(interp: &mut Interpreter, pid: ProcessId) -> Value {
    let class = process_class_id(interp);
    let instance = InstanceObject { class, slots: vec![Value::from(pid.index() as i64)] };
    Value::Instance(interp.heap.allocate(HeapData::Instance(instance)))
}

fn unwrap(interp: &Interpreter, v: &Value) -> RunResult<ProcessId> {
    let Value::Instance(id) = v else { return Err(super::type_error("Process", v)) };
    let HeapData::Instance(obj) = interp.heap.get(*id) else { return Err(super::type_error("Process", v)) };
    if obj.class != process_class_id(interp) {
        return Err(super::type_error("Process", v));
    }
    let Value::Integer(Integer::Small(n)) = obj.slots[0] else { return Err(super::type_error("Process", v)) };
    #[allow(clippy::cast_sign_loss)]
    Ok(ProcessId::new(n as u64))
}

/// `Processor fork: aBlock` (§4.9): a fresh `Process` with state = Ready,
/// queued behind whatever is already runnable.
fn prim_fork(interp: &mut Interpreter, _receiver: Value, args: &[Value]) -> RunResult<Value> {
    let Value::Block(block) = args[0] else { return Err(super::type_error("Block", &args[0])) };
    let pid = interp.scheduler.fork(block, "a Process".to_owned(), 0);
    Ok(wrap(interp, pid))
}

/// `Processor yield` ends the current process's quantum early, giving other
/// ready processes a turn before it resumes at the next statement (§4.9).
fn prim_yield(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    interp.scheduler.yield_requested = true;
    Ok(Value::Nil)
}

fn prim_active_process(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    match interp.scheduler.current {
        Some(pid) => Ok(wrap(interp, pid)),
        None => Ok(Value::Nil),
    }
}

fn prim_pid(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::from(unwrap(interp, &receiver)?.index() as i64))
}

fn prim_name(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let pid = unwrap(interp, &receiver)?;
    Ok(Value::from(interp.scheduler.process(pid).name.as_str()))
}

fn prim_state(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let pid = unwrap(interp, &receiver)?;
    let name = match interp.scheduler.process(pid).state {
        ProcessState::Ready => "ready",
        ProcessState::Running => "running",
        ProcessState::Blocked => "blocked",
        ProcessState::Suspended => "suspended",
        ProcessState::Terminated => "terminated",
    };
    Ok(Value::Symbol(std::rc::Rc::from(name)))
}

fn prim_suspend(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let pid = unwrap(interp, &receiver)?;
    interp.scheduler.suspend(pid);
    Ok(receiver)
}

fn prim_resume(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let pid = unwrap(interp, &receiver)?;
    interp.scheduler.resume(pid);
    Ok(receiver)
}

/// Terminates the target process (§4.9 "Cancellation"). This scheduler
/// discards the activation stack wholesale rather than running `ensure:`
/// blocks found on it; `ensure:`/`ifCurtailed:` only fire for unwinds that
/// pass through them on the same call stack; a future revision would need
/// the stack walked here to honor the LIFO cleanup guarantee exactly.
fn prim_terminate(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let pid = unwrap(interp, &receiver)?;
    interp.scheduler.terminate(pid);
    interp.scheduler.process_mut(pid).stack.clear();
    Ok(receiver)
}
