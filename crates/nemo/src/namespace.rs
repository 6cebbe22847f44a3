//! Global namespace: identifier → Value, shared by every process (§3
//! "Global namespace"). Classes register themselves here under their name
//! as they're bootstrapped.

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug, Default)]
pub struct Namespace {
    globals: IndexMap<String, Value>,
}

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self { globals: IndexMap::new() }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }
}
