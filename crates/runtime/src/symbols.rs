use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;

use tools::errors::Position;

use crate::values::RuntimeVal;

pub type SymbolId = usize;

/// Kind of region a scope stands for. The label is only for display, the
/// language rules look at the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function(String),
    For,
    Switch,
    IfBlock,
    ElseBlock,
    Block,
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global"),
            ScopeKind::Function(name) => write!(f, "function:{name}"),
            ScopeKind::For => write!(f, "for"),
            ScopeKind::Switch => write!(f, "switch"),
            ScopeKind::IfBlock => write!(f, "if-block"),
            ScopeKind::ElseBlock => write!(f, "else-block"),
            ScopeKind::Block => write!(f, "block"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub identifier: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub scope: String,
    pub value: String,
    pub line: u32,
    pub column: u32,
    pub order: usize,
}

// A declaration is identified by its name, scope and place in the source
type DeclarationKey = (String, String, Position);

#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<DeclarationKey, SymbolId>,
    scopes: Vec<ScopeKind>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self {
            symbols: vec![],
            index: HashMap::new(),
            scopes: vec![ScopeKind::Global],
        }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(kind);
    }

    // The global scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn current_scope(&self) -> &ScopeKind {
        self.scopes.last().unwrap_or(&ScopeKind::Global)
    }

    /// Records a declaration in the current scope. Evaluating the same
    /// declaration again (a loop body) updates its entry.
    pub fn declare(
        &mut self,
        identifier: &str,
        type_label: String,
        value: &RuntimeVal,
        pos: Position,
    ) -> SymbolId {
        let scope = self.current_scope().to_string();
        let key = (identifier.to_string(), scope.clone(), pos);

        if let Some(&id) = self.index.get(&key) {
            self.symbols[id].type_label = type_label;
            self.symbols[id].value = value.to_string();
            return id;
        }

        let id = self.symbols.len();
        self.symbols.push(Symbol {
            identifier: identifier.to_string(),
            type_label,
            scope,
            value: value.to_string(),
            line: pos.line,
            column: pos.column,
            order: id,
        });
        self.index.insert(key, id);

        id
    }

    pub fn update(&mut self, id: SymbolId, value: &RuntimeVal) {
        if let Some(symbol) = self.symbols.get_mut(id) {
            symbol.value = value.to_string();
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    // Searching outward, a function scope is a barrier
    fn find_enclosing(&self, accept: impl Fn(&ScopeKind) -> bool) -> bool {
        for scope in self.scopes.iter().rev() {
            if accept(scope) {
                return true;
            }
            if matches!(scope, ScopeKind::Function(_)) {
                return false;
            }
        }

        false
    }

    pub fn can_break(&self) -> bool {
        self.find_enclosing(|s| matches!(s, ScopeKind::For | ScopeKind::Switch))
    }

    pub fn can_continue(&self) -> bool {
        self.find_enclosing(|s| matches!(s, ScopeKind::For))
    }

    pub fn can_return(&self) -> bool {
        self.find_enclosing(|s| matches!(s, ScopeKind::Function(_)))
    }

    pub fn at_global_scope(&self) -> bool {
        matches!(self.current_scope(), ScopeKind::Global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn declarations_are_keyed_by_position() {
        let mut table = SymbolTable::new();
        table.push_scope(ScopeKind::Function("main".into()));
        table.push_scope(ScopeKind::For);

        let first = table.declare("i", "int32".into(), &RuntimeVal::Int32(0), Position::new(2, 9));
        table.pop_scope();
        table.push_scope(ScopeKind::For);
        let second = table.declare("i", "int32".into(), &RuntimeVal::Int32(0), Position::new(5, 9));
        // Same declaration evaluated again
        let again = table.declare("i", "int32".into(), &RuntimeVal::Int32(0), Position::new(5, 9));

        assert_ne!(first, second);
        assert_eq!(second, again);
        assert_eq!(table.symbols().len(), 2);
        assert_eq!(table.symbols()[1].scope, "for");
    }

    #[test]
    fn update_refreshes_the_value() {
        let mut table = SymbolTable::new();
        let id = table.declare("x", "int32".into(), &RuntimeVal::Int32(10), Position::new(1, 5));
        table.update(id, &RuntimeVal::Int32(42));

        assert_eq!(
            table.symbols()[0],
            Symbol {
                identifier: "x".into(),
                type_label: "int32".into(),
                scope: "global".into(),
                value: "42".into(),
                line: 1,
                column: 5,
                order: 0,
            }
        );
    }

    #[test]
    fn control_flow_placement() {
        let mut table = SymbolTable::new();
        assert!(!table.can_return());
        assert!(table.at_global_scope());

        table.push_scope(ScopeKind::Function("main".into()));
        table.push_scope(ScopeKind::For);
        table.push_scope(ScopeKind::Switch);
        table.push_scope(ScopeKind::IfBlock);

        assert!(table.can_break());
        assert!(table.can_continue());
        assert!(table.can_return());

        // A call made from the loop does not see the loop
        table.push_scope(ScopeKind::Function("f".into()));
        assert!(!table.can_break());
        assert!(!table.can_continue());
        assert!(table.can_return());
        assert_eq!(table.current_scope().to_string(), "function:f");
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut table = SymbolTable::new();
        table.pop_scope();
        assert!(table.at_global_scope());

        table.push_scope(ScopeKind::IfBlock);
        table.pop_scope();
        table.pop_scope();
        assert!(table.at_global_scope());
        assert_eq!(table.current_scope().to_string(), "global");
    }
}
