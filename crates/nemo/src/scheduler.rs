//! Cooperative, quantum-based round-robin scheduler (§4.9).
//!
//! The interpreter is a recursive AST walker, not a bytecode machine with an
//! explicit instruction pointer, so a process cannot be paused mid-expression
//! the way a real Smalltalk image suspends a process mid-bytecode. Instead,
//! a process's runnable unit is its forked block's top-level statement
//! sequence: the scheduler resumes it at `next_stmt` and runs up to `quantum`
//! statements before handing control back, and `Processor yield` ends the
//! current quantum early by setting a flag the statement loop checks after
//! every statement. This is coarser than true preemption but is sufficient
//! for the cooperative semantics this specification asks for (§5 excludes
//! preemptive scheduling outright).

use std::collections::VecDeque;

use crate::{heap::HeapId, process::{Process, ProcessId, ProcessState}};

/// §4.9 defines a quantum as one message send by default; the closest this
/// statement-granular scheduler can get to that is one top-level statement,
/// since a typical `Processor yield`-loop body sends exactly one message
/// per statement anyway (see the S6 fairness scenario). Configurable via
/// `Scheduler::quantum` for callers that want coarser throughput.
pub const DEFAULT_QUANTUM: usize = 1;

#[derive(Default)]
pub struct Scheduler {
    processes: Vec<Process>,
    ready: VecDeque<ProcessId>,
    pub current: Option<ProcessId>,
    next_id: u64,
    pub quantum: usize,
    pub yield_requested: bool,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self { processes: Vec::new(), ready: VecDeque::new(), current: None, next_id: 0, quantum: DEFAULT_QUANTUM, yield_requested: false }
    }

    pub fn fork(&mut self, block: HeapId, name: String, priority: i32) -> ProcessId {
        let id = ProcessId::new(self.next_id);
        self.next_id += 1;
        self.processes.push(Process::new(id, name, priority, block));
        self.ready.push_back(id);
        id
    }

    fn index_of(&self, id: ProcessId) -> usize {
        self.processes.iter().position(|p| p.id == id).expect("process id always refers to a live slot")
    }

    #[must_use]
    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[self.index_of(id)]
    }

    pub fn process_mut(&mut self, id: ProcessId) -> &mut Process {
        let i = self.index_of(id);
        &mut self.processes[i]
    }

    #[must_use]
    pub fn current_process(&self) -> Option<&Process> {
        self.current.map(|id| self.process(id))
    }

    pub fn current_process_mut(&mut self) -> Option<&mut Process> {
        self.current.map(|id| self.process_mut(id))
    }

    /// Picks the next `Ready` process, highest priority first, ties broken
    /// by ready-queue order (round robin within a priority band).
    fn pick_next(&mut self) -> Option<ProcessId> {
        let mut best: Option<(usize, i32)> = None;
        for (i, &pid) in self.ready.iter().enumerate() {
            let p = self.process(pid);
            if p.state != ProcessState::Ready {
                continue;
            }
            if best.is_none_or(|(_, prio)| p.priority > prio) {
                best = Some((i, p.priority));
            }
        }
        let (i, _) = best?;
        self.ready.remove(i)
    }

    pub fn suspend(&mut self, id: ProcessId) {
        self.process_mut(id).state = ProcessState::Suspended;
        self.ready.retain(|&p| p != id);
    }

    pub fn resume(&mut self, id: ProcessId) {
        let p = self.process_mut(id);
        if p.state == ProcessState::Suspended || p.state == ProcessState::Blocked {
            p.state = ProcessState::Ready;
            if !self.ready.contains(&id) {
                self.ready.push_back(id);
            }
        }
    }

    pub fn block(&mut self, id: ProcessId) {
        self.process_mut(id).state = ProcessState::Blocked;
        self.ready.retain(|&p| p != id);
    }

    pub fn terminate(&mut self, id: ProcessId) {
        self.process_mut(id).state = ProcessState::Terminated;
        self.ready.retain(|&p| p != id);
    }

    pub fn requeue(&mut self, id: ProcessId) {
        if self.process(id).state == ProcessState::Ready && !self.ready.contains(&id) {
            self.ready.push_back(id);
        }
    }

    #[must_use]
    pub fn has_runnable_work(&self) -> bool {
        self.processes.iter().any(|p| p.state == ProcessState::Ready)
    }

    /// Begins a scheduling turn: picks the next ready process, marks it
    /// `Running`, and returns its id. Returns `None` when nothing is ready.
    pub fn begin_turn(&mut self) -> Option<ProcessId> {
        let id = self.pick_next()?;
        self.process_mut(id).state = ProcessState::Running;
        self.current = Some(id);
        Some(id)
    }

    /// Ends the current turn: re-queues the process if it's still runnable,
    /// otherwise leaves it in whatever terminal/blocked state it reached.
    pub fn end_turn(&mut self) {
        let Some(id) = self.current.take() else { return };
        let p = self.process_mut(id);
        if p.state == ProcessState::Running {
            p.state = ProcessState::Ready;
            self.ready.push_back(id);
        }
    }
}
