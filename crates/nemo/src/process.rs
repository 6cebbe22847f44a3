//! A single cooperative green thread (§3 "Process", §4.9).

use crate::{activation::Activation, heap::HeapId, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn index(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Suspended,
    Terminated,
}

/// A process's green-thread state (§3 "Process"). Its activation stack is
/// empty between quanta; the block it runs supplies the statements resumed
/// one at a time from `next_stmt`.
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub state: ProcessState,
    pub priority: i32,
    pub block: HeapId,
    pub next_stmt: usize,
    pub stack: Vec<Activation>,
    pub last_result: Value,
}

impl Process {
    #[must_use]
    pub fn new(id: ProcessId, name: String, priority: i32, block: HeapId) -> Self {
        Self { id, name, state: ProcessState::Ready, priority, block, next_stmt: 0, stack: Vec::new(), last_result: Value::Nil }
    }
}
