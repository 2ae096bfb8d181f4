use super::Symbol;
use indexmap::{IndexMap, IndexSet};

/// Names visible at the current point of the parse.
/// Each block remembers what it declared and drops it again on `leave`.
/// Procedures live in their own namespace.
#[derive(Debug, Default)]
pub struct Scope {
    names: IndexMap<String, Symbol>,
    procs: IndexSet<String>,
    blocks: Vec<Frame>,
}

#[derive(Debug, Default)]
struct Frame {
    names: Vec<String>,
    procs: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self) {
        self.blocks.push(Frame::default());
    }

    pub fn leave(&mut self) {
        if let Some(frame) = self.blocks.pop() {
            for name in frame.names {
                self.names.shift_remove(&name);
            }
            for name in frame.procs {
                self.procs.shift_remove(&name);
            }
        }
    }

    /// Returns false if the name is already visible.
    pub fn declare(&mut self, symbol: Symbol) -> bool {
        let name = symbol.name().to_string();
        if self.names.contains_key(&name) {
            return false;
        }
        if let Some(frame) = self.blocks.last_mut() {
            frame.names.push(name.clone());
        }
        self.names.insert(name, symbol);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.names.get(name)
    }

    /// Makes a procedure callable until the current block ends.
    /// Returns false if it is already visible.
    pub fn declare_proc(&mut self, name: &str) -> bool {
        if !self.procs.insert(name.to_string()) {
            return false;
        }
        if let Some(frame) = self.blocks.last_mut() {
            frame.procs.push(name.to_string());
        }
        true
    }

    pub fn has_proc(&self, name: &str) -> bool {
        self.procs.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{Var, Width};

    fn var(name: &str) -> Symbol {
        Symbol::Scalar(Var {
            name: name.to_string(),
            width: Width::Nibble,
            addr: 0,
            block: String::new(),
            temp: false,
        })
    }

    #[test]
    fn locals_disappear_on_leave() {
        let mut scope = Scope::new();
        scope.enter();
        assert!(scope.declare(var("g")));
        scope.enter();
        assert!(scope.declare(var("l")));
        assert!(!scope.declare(var("g")));
        scope.leave();
        assert!(scope.get("l").is_none());
        assert!(scope.get("g").is_some());
        assert!(scope.declare(var("l")));
    }

    #[test]
    fn procedures_follow_blocks() {
        let mut scope = Scope::new();
        scope.enter();
        assert!(scope.declare_proc("outer"));
        scope.enter();
        assert!(scope.declare_proc("inner"));
        assert!(!scope.declare_proc("outer"));
        assert!(scope.has_proc("outer"));
        scope.leave();
        assert!(!scope.has_proc("inner"));
        assert!(scope.has_proc("outer"));
        assert!(scope.declare(var("inner")));
    }
}
