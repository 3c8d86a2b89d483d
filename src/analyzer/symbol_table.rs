use std::collections::HashMap;

use tracing::trace;

use super::Ty;

#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Variable { ty: Ty, initialized: bool },
    Procedure { params: Vec<Ty> },
    Function { params: Vec<Ty>, ret: Ty },
}

impl Symbol {
    pub fn variable(ty: Ty, initialized: bool) -> Self {
        Symbol::Variable { ty, initialized }
    }

    pub fn var_type(&self) -> Option<&Ty> {
        match self {
            Symbol::Variable { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Variable { .. } => "variable",
            Symbol::Procedure { .. } => "procedure",
            Symbol::Function { .. } => "function",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Clone, Debug)]
struct Scope {
    symbols: HashMap<String, Symbol>,
    parent: Option<ScopeId>,
    level: usize,
}

/// Every scope ever created lives in one arena; a scope that is no longer
/// current is abandoned, not dropped, so later passes can still query it.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
    subprogram_scopes: HashMap<String, ScopeId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                symbols: HashMap::new(),
                parent: None,
                level: 0,
            }],
            current: ScopeId::GLOBAL,
            subprogram_scopes: HashMap::new(),
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn level(&self) -> usize {
        self.scopes[self.current.0].level
    }

    /// Duplicates silently replace; callers check `lookup_current_scope`.
    pub fn add(&mut self, name: &str, symbol: Symbol) {
        self.scopes[self.current.0]
            .symbols
            .insert(name.to_ascii_lowercase(), symbol);
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_from(self.current, name)
    }

    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        let id = self.resolve(scope, &key)?;
        self.scopes[id.0].symbols.get(&key)
    }

    /// Nearest binding of `name` as a call target. Inside a function body
    /// the function's own name is its return slot; that one binding is
    /// looked past so recursive calls still find the function.
    pub fn lookup_callable(&self, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let s = &self.scopes[id.0];
            match s.symbols.get(&key) {
                Some(Symbol::Variable { .. }) if self.is_return_slot(id, &key) => {}
                Some(sym) => return Some(sym),
                None => {}
            }
            scope = s.parent;
        }
        None
    }

    fn is_return_slot(&self, scope: ScopeId, key: &str) -> bool {
        if self.subprogram_scopes.get(key) != Some(&scope) {
            return false;
        }
        let declared_in = self.scopes[scope.0].parent;
        matches!(
            declared_in.and_then(|p| self.scopes[p.0].symbols.get(key)),
            Some(Symbol::Function { .. })
        )
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let key = name.to_ascii_lowercase();
        let id = self.resolve(self.current, &key)?;
        self.scopes[id.0].symbols.get_mut(&key)
    }

    pub fn lookup_current_scope(&self, name: &str) -> Option<&Symbol> {
        self.scopes[self.current.0]
            .symbols
            .get(&name.to_ascii_lowercase())
    }

    fn resolve(&self, from: ScopeId, key: &str) -> Option<ScopeId> {
        let mut scope = Some(from);
        while let Some(id) = scope {
            let s = &self.scopes[id.0];
            if s.symbols.contains_key(key) {
                return Some(id);
            }
            scope = s.parent;
        }
        None
    }

    pub fn create_child_scope(&mut self, parent: ScopeId) -> ScopeId {
        let level = self.scopes[parent.0].level + 1;
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            parent: Some(parent),
            level,
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn enter_scope(&mut self) -> ScopeId {
        self.current = self.create_child_scope(self.current);
        trace!(level = self.level(), "enter scope");
        self.current
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            trace!(level = self.level(), "exit scope");
            self.current = parent;
        }
    }

    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(Symbol::Variable { initialized, .. }) = self.lookup_mut(name) {
            *initialized = true;
        }
    }

    pub fn bind_subprogram_scope(&mut self, name: &str, scope: ScopeId) {
        self.subprogram_scopes
            .insert(name.to_ascii_lowercase(), scope);
    }

    /// Scope a subprogram's body was analyzed in, if it was analyzed.
    pub fn subprogram_scope(&self, name: &str) -> Option<ScopeId> {
        self.subprogram_scopes
            .get(&name.to_ascii_lowercase())
            .copied()
    }
}
