//! Arena for cyclic, identity-bearing runtime objects — arrays, tables,
//! blocks, classes, instances (§9 "Design notes").
//!
//! The teacher's heap (`ouros::heap`) tracks a manual reference count per
//! slot and panics in debug builds if a `Value::Ref` is dropped without
//! going through `drop_with_heap`. That scheme earns its keep there because
//! the interpreter must reclaim memory for long-running sandboxed scripts.
//! Nothing in this specification requires reclaiming memory during a run,
//! so this heap instead just grows: `allocate` pushes and never frees.
//! `HeapId` stays a stable, `Copy` index either way, which is the only
//! property the rest of the interpreter relies on.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;

use crate::{ast::Expr, dispatch::NativeFn, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(usize);

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user- or bootstrap-defined method (§3 "Method").
#[derive(Debug)]
pub struct Method {
    pub selector: String,
    pub params: Vec<String>,
    pub temporaries: Vec<String>,
    pub body: Rc<[Expr]>,
    /// Primitives (arithmetic, collection internals, process control) carry
    /// no AST body; the dispatcher calls this instead. Invariant (§3): a
    /// method with a native handle ignores `body`.
    pub native: Option<NativeFn>,
    /// Name of the class this method is installed on, consulted for trace
    /// frames and for `super` in a method with no lexically enclosing class
    /// (shouldn't happen, but keeps dispatch total).
    pub owner: String,
}

impl Method {
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Resolution of one selector in a class's merged method table (§4.3, §4.5).
#[derive(Debug, Clone)]
pub enum MergedMethod {
    Unique(Rc<Method>),
    /// Two or more superclasses provide distinct methods for this selector
    /// and neither this class nor a scoped `super<Parent>` picks a winner;
    /// dispatching it raises `ErrorKind::AmbiguousMethod`.
    Ambiguous { contributors: Vec<String> },
}

/// A class (§3 "Class"). Instance and class-side method tables are each
/// merged independently; slots are merged into one flattened, ordered list.
#[derive(Debug)]
pub struct ClassObject {
    pub name: String,
    pub own_slots: Vec<String>,
    /// Superclasses in declaration order (`derive:parents:`, `addParent:`).
    pub superclasses: Vec<HeapId>,
    pub own_methods: IndexMap<String, Rc<Method>>,
    pub own_class_methods: IndexMap<String, Rc<Method>>,
    pub tags: Vec<String>,

    pub merged_slots: Vec<String>,
    pub merged_methods: IndexMap<String, MergedMethod>,
    pub merged_class_methods: IndexMap<String, MergedMethod>,
}

impl ClassObject {
    #[must_use]
    pub fn new(name: String, superclasses: Vec<HeapId>) -> Self {
        Self {
            name,
            own_slots: Vec::new(),
            superclasses,
            own_methods: IndexMap::new(),
            own_class_methods: IndexMap::new(),
            tags: Vec::new(),
            merged_slots: Vec::new(),
            merged_methods: IndexMap::new(),
            merged_class_methods: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.merged_slots.iter().position(|s| s == name)
    }
}

/// A heap-allocated instance of a class (§3 "Instance").
#[derive(Debug)]
pub struct InstanceObject {
    pub class: HeapId,
    pub slots: Vec<Value>,
}

/// A block closure (§3 "Block (closure)").
#[derive(Debug)]
pub struct BlockObject {
    pub params: Vec<String>,
    pub temporaries: Vec<String>,
    pub body: Rc<[Expr]>,
    pub captured_frame: Rc<RefCell<crate::activation::Frame>>,
    /// Target activation for a `^` inside this block's body. Every block has
    /// one, including a block created directly in a process's top-level
    /// statement sequence: the process driver pushes a synthetic root
    /// activation before running any statement precisely so this never needs
    /// to be optional (§4.4).
    pub home: crate::activation::HomeContext,
    /// Class that owned the method lexically enclosing this block, copied
    /// from the creating activation so a `super` send inside the block
    /// resolves exactly as it would have inside that method (§4.5).
    pub defining_class: Option<String>,
}

#[derive(Debug)]
pub enum HeapData {
    Array(Vec<Value>),
    /// Insertion order is not part of the language's observable contract
    /// (§3), but `IndexMap` gives deterministic iteration for free and the
    /// teacher reaches for it everywhere a hash map would otherwise do.
    Table(IndexMap<Rc<str>, Value>),
    Block(BlockObject),
    Class(ClassObject),
    Instance(InstanceObject),
}

impl HeapData {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Array(_) => "Array",
            Self::Table(_) => "Table",
            Self::Block(_) => "Block",
            Self::Class(_) => "Class",
            Self::Instance(_) => "Object",
        }
    }
}

pub struct Heap {
    data: Vec<HeapData>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn allocate(&mut self, data: HeapData) -> HeapId {
        let id = HeapId(self.data.len());
        self.data.push(data);
        id
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.data[id.0]
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.data[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn class(&self, id: HeapId) -> &ClassObject {
        match self.get(id) {
            HeapData::Class(c) => c,
            other => panic!("HeapId {id} expected to be a class, found {}", other.type_name()),
        }
    }

    pub fn class_mut(&mut self, id: HeapId) -> &mut ClassObject {
        match self.get_mut(id) {
            HeapData::Class(c) => c,
            other => panic!("HeapId {id} expected to be a class, found {}", other.type_name()),
        }
    }

    /// Recomputes `id`'s merged slot list and merged method/class-method
    /// tables from its own members and its superclasses' *already merged*
    /// tables (§4.3). Superclasses must be recomputed first; callers that
    /// change an ancestor recompute bottom-up, then every existing subclass
    /// transitively (§10.5).
    pub fn recompute_merged(&mut self, id: HeapId) {
        let (name, own_slots, superclasses, own_methods, own_class_methods) = {
            let c = self.class(id);
            (c.name.clone(), c.own_slots.clone(), c.superclasses.clone(), c.own_methods.clone(), c.own_class_methods.clone())
        };

        let merged_slots = self.merge_slots(&name, &own_slots, &superclasses);
        let merged_methods = self.merge_methods(&own_methods, &superclasses, |c| &c.merged_methods);
        let merged_class_methods = self.merge_methods(&own_class_methods, &superclasses, |c| &c.merged_class_methods);

        let c = self.class_mut(id);
        c.merged_slots = merged_slots;
        c.merged_methods = merged_methods;
        c.merged_class_methods = merged_class_methods;
    }

    fn merge_slots(&self, name: &str, own_slots: &[String], superclasses: &[HeapId]) -> Vec<String> {
        let mut result = Vec::new();
        let mut owner_of: AHashMap<String, String> = AHashMap::new();
        for &sup in superclasses {
            let sup_class = self.class(sup);
            for slot in &sup_class.merged_slots {
                match owner_of.get(slot) {
                    Some(prev) if prev != &sup_class.name => {
                        log::warn!("slot '{slot}' inherited from both {prev} and {} into {name}", sup_class.name);
                    }
                    Some(_) => {}
                    None => {
                        owner_of.insert(slot.clone(), sup_class.name.clone());
                        result.push(slot.clone());
                    }
                }
            }
        }
        for slot in own_slots {
            if !result.contains(slot) {
                result.push(slot.clone());
            }
        }
        result
    }

    fn merge_methods(
        &self,
        own: &IndexMap<String, Rc<Method>>,
        superclasses: &[HeapId],
        table_of: impl Fn(&ClassObject) -> &IndexMap<String, MergedMethod>,
    ) -> IndexMap<String, MergedMethod> {
        let mut result: IndexMap<String, MergedMethod> = IndexMap::new();
        let mut seen_selectors: AHashSet<String> = AHashSet::new();
        for &sup in superclasses {
            for (selector, _) in table_of(self.class(sup)) {
                seen_selectors.insert(selector.clone());
            }
        }
        for selector in seen_selectors {
            let mut unique_methods: Vec<(String, Rc<Method>)> = Vec::new();
            let mut already_ambiguous = false;
            let mut contributor_names: Vec<String> = Vec::new();
            for &sup in superclasses {
                let sup_class = self.class(sup);
                match table_of(sup_class).get(&selector) {
                    Some(MergedMethod::Unique(m)) => {
                        if !unique_methods.iter().any(|(_, existing)| Rc::ptr_eq(existing, m)) {
                            unique_methods.push((sup_class.name.clone(), Rc::clone(m)));
                        }
                        contributor_names.push(sup_class.name.clone());
                    }
                    Some(MergedMethod::Ambiguous { .. }) => {
                        already_ambiguous = true;
                        contributor_names.push(sup_class.name.clone());
                    }
                    None => {}
                }
            }
            let merged = if !already_ambiguous && unique_methods.len() == 1 {
                MergedMethod::Unique(unique_methods.into_iter().next().unwrap().1)
            } else {
                MergedMethod::Ambiguous { contributors: contributor_names }
            };
            result.insert(selector, merged);
        }
        for (selector, method) in own {
            result.insert(selector.clone(), MergedMethod::Unique(Rc::clone(method)));
        }
        result
    }

    /// Every class currently on the heap whose `superclasses` transitively
    /// includes `ancestor`; used to propagate a merge-table recomputation
    /// after `addParent:` changes an already-subclassed class (§10.5).
    #[must_use]
    pub fn subclasses_of(&self, ancestor: HeapId) -> Vec<HeapId> {
        let mut result = Vec::new();
        for (i, data) in self.data.iter().enumerate() {
            if let HeapData::Class(c) = data {
                let id = HeapId(i);
                if self.is_subclass(id, ancestor, c) {
                    result.push(id);
                }
            }
        }
        result
    }

    fn is_subclass(&self, id: HeapId, ancestor: HeapId, class: &ClassObject) -> bool {
        if id == ancestor {
            return false;
        }
        let mut stack = class.superclasses.clone();
        let mut visited = AHashSet::new();
        while let Some(sup) = stack.pop() {
            if sup == ancestor {
                return true;
            }
            if visited.insert(sup) {
                stack.extend(self.class(sup).superclasses.clone());
            }
        }
        false
    }

    /// Finds a class registered in the heap by name. Linear scan is fine:
    /// class count is small and this only runs during bootstrap wiring and
    /// `addParent:`, never on the message-send hot path.
    #[must_use]
    pub fn find_class_by_name(&self, name: &str) -> Option<HeapId> {
        self.data.iter().position(|d| matches!(d, HeapData::Class(c) if c.name == name)).map(HeapId)
    }
}
