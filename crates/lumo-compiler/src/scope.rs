//! Scope management for variable resolution
//!
//! Every compile-time scope is paired with a runtime scope object, created by
//! a `NEWSCOPE` instruction into [`Scope::register`]. Scoped reads and writes
//! address the innermost runtime scope and walk outwards at runtime, the same
//! way [`ScopeChain::lookup`] walks outwards here.

use lumo_bytecode::Register;
use rustc_hash::FxHashMap;

/// Index of a scope inside its [`ScopeChain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// A variable binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Register holding the most recent value defined for the name
    pub register: Register,
}

/// A lexical scope
#[derive(Debug)]
pub struct Scope {
    /// Parent scope (None for the root)
    pub parent: Option<ScopeId>,
    /// Bindings in this scope
    pub bindings: FxHashMap<String, Binding>,
    /// Register holding the runtime scope object
    pub register: Register,
    /// Scope depth (0 = root)
    pub depth: usize,
}

/// Result of resolving a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// Scope the binding lives in
    pub scope: ScopeId,
    /// Number of parent links walked to find it
    pub hops: usize,
    /// The binding itself
    pub binding: Binding,
}

/// Scope chain for variable resolution
#[derive(Debug, Default)]
pub struct ScopeChain {
    /// All scopes ever entered; exited scopes stay allocated
    scopes: Vec<Scope>,
    /// Current scope
    current: Option<ScopeId>,
}

impl ScopeChain {
    /// Create an empty scope chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a child of the current scope (or the root scope when there is
    /// none) whose runtime object lives in `register`
    pub fn enter(&mut self, register: Register) -> ScopeId {
        let depth = self.current.map_or(0, |id| self.scopes[id.0].depth + 1);
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: self.current,
            bindings: FxHashMap::default(),
            register,
            depth,
        });
        self.current = Some(id);
        id
    }

    /// Exit the current scope
    pub fn exit(&mut self) {
        if let Some(id) = self.current {
            self.current = self.scopes[id.0].parent;
        }
    }

    /// Current scope
    pub fn current(&self) -> Option<&Scope> {
        self.current.map(|id| &self.scopes[id.0])
    }

    /// Register of the current runtime scope object
    pub fn current_register(&self) -> Option<Register> {
        self.current().map(|scope| scope.register)
    }

    /// Scope by id
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Resolve `name` from the current scope outwards
    pub fn lookup(&self, name: &str) -> Option<ResolvedBinding> {
        self.lookup_from(self.current?, name)
    }

    /// Resolve `name` starting at `start` and walking parent links
    pub fn lookup_from(&self, start: ScopeId, name: &str) -> Option<ResolvedBinding> {
        let mut id = start;
        let mut hops = 0;

        loop {
            let scope = &self.scopes[id.0];

            if let Some(binding) = scope.bindings.get(name) {
                return Some(ResolvedBinding {
                    scope: id,
                    hops,
                    binding: binding.clone(),
                });
            }

            id = scope.parent?;
            hops += 1;
        }
    }

    /// Define `name` as held in `register`.
    ///
    /// A name already bound somewhere in the chain is updated in the scope
    /// that holds it; otherwise it is inserted into the current scope.
    /// Returns the scope written to, or None when no scope has been entered.
    pub fn define(&mut self, name: &str, register: Register) -> Option<ScopeId> {
        let current = self.current?;
        let target = self
            .lookup_from(current, name)
            .map_or(current, |resolved| resolved.scope);

        self.scopes[target.0]
            .bindings
            .insert(name.to_string(), Binding { register });

        Some(target)
    }

    /// Depth of the current scope
    pub fn depth(&self) -> usize {
        self.current().map_or(0, |scope| scope.depth)
    }
}
