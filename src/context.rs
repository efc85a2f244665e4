//! Lexically-scoped symbol tables and call-stack contexts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::position::Position;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Value>,
    parent: Option<Rc<RefCell<SymbolTable>>>,
}

impl SymbolTable {
    pub fn new(parent: Option<Rc<RefCell<SymbolTable>>>) -> Self {
        SymbolTable { symbols: HashMap::new(), parent }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.symbols.get(name) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.borrow().get(name)),
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_string(), value);
    }

    /// Removes `name` only if bound in this table (not a parent), returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.symbols.remove(name).is_some()
    }
}

/// A call-stack frame: who's executing, where they were called from, and their bindings.
#[derive(Debug)]
pub struct Context {
    pub display_name: String,
    pub parent: Option<Rc<Context>>,
    pub parent_entry_pos: Option<Position>,
    pub symbol_table: Rc<RefCell<SymbolTable>>,
}

impl Context {
    pub fn new_global(symbol_table: Rc<RefCell<SymbolTable>>) -> Rc<Context> {
        Rc::new(Context { display_name: "<program>".to_string(), parent: None, parent_entry_pos: None, symbol_table })
    }

    pub fn new_child(
        display_name: String,
        parent: Rc<Context>,
        parent_entry_pos: Position,
        symbol_table: Rc<RefCell<SymbolTable>>,
    ) -> Rc<Context> {
        Rc::new(Context { display_name, parent: Some(parent), parent_entry_pos: Some(parent_entry_pos), symbol_table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn lookup_walks_parents_but_set_is_local() {
        let parent = Rc::new(RefCell::new(SymbolTable::new(None)));
        parent.borrow_mut().set("x", Value::int(1));

        let mut child = SymbolTable::new(Some(parent.clone()));
        assert_eq!(child.get("x"), Some(Value::int(1)));

        child.set("x", Value::int(2));
        assert_eq!(child.get("x"), Some(Value::int(2)));
        assert_eq!(parent.borrow().get("x"), Some(Value::int(1)));
    }
}
