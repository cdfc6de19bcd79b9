#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::error::{DeclareError, LookupError};
use crate::symbol::{Callable, CallableState, Symbol, SymbolKind};
use crate::types::EvaluatedType;

/// Handle to a scope stored in a [`ScopeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

/// All scopes of one analysis. Scopes are never removed; semantic nodes
/// refer to them by [`ScopeId`].
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        tracing::trace!(scope = id.0, parent = parent.0, "scope created");
        id
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0].parent
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Symbols bound directly in `id`, in declaration order.
    pub fn symbols(&self, id: ScopeId) -> &[Symbol] {
        &self.scopes[id.0].symbols
    }

    pub fn get_local(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let scope = &self.scopes[id.0];
        scope.by_name.get(name).map(|&i| &scope.symbols[i])
    }

    fn get_local_mut(&mut self, id: ScopeId, name: &str) -> Option<&mut Symbol> {
        let scope = &mut self.scopes[id.0];
        let i = *scope.by_name.get(name)?;
        Some(&mut scope.symbols[i])
    }

    /// Binds `symbol` in `id`. The first binding of a name wins.
    pub fn declare(&mut self, id: ScopeId, symbol: Symbol) -> Result<(), DeclareError> {
        if let Some(existing) = self.get_local(id, &symbol.name().node) {
            return Err(DeclareError::Redefined {
                name: existing.name().node.clone(),
                new_kind: symbol.kind_name(),
                existing_kind: existing.kind_name(),
            });
        }
        let scope = &mut self.scopes[id.0];
        scope
            .by_name
            .insert(symbol.name().node.clone(), scope.symbols.len());
        scope.symbols.push(symbol);
        Ok(())
    }

    /// Nearest binding of `name`, walking up from `id`.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(id);
        while let Some(scope) = current {
            if let Some(symbol) = self.get_local(scope, name) {
                return Some(symbol);
            }
            current = self.parent(scope);
        }
        None
    }

    /// Nearest binding of `name`, which must be of `kind`. A binding of
    /// another kind shadows outer ones.
    pub fn lookup_kind(
        &self,
        id: ScopeId,
        name: &str,
        kind: SymbolKind,
    ) -> Result<&Symbol, LookupError> {
        match self.lookup(id, name) {
            Some(symbol) if kind.accepts(symbol) => Ok(symbol),
            found => Err(lookup_error(name, found, kind)),
        }
    }

    pub fn lookup_callable(&self, id: ScopeId, name: &str) -> Result<&Callable, LookupError> {
        match self.lookup(id, name) {
            Some(Symbol::Callable(c)) => Ok(c),
            found => Err(lookup_error(name, found, SymbolKind::Callable)),
        }
    }

    pub fn lookup_type_alias(
        &self,
        id: ScopeId,
        name: &str,
    ) -> Result<&EvaluatedType, LookupError> {
        match self.lookup(id, name) {
            Some(Symbol::TypeAlias { target, .. }) => Ok(target),
            found => Err(lookup_error(name, found, SymbolKind::TypeAlias)),
        }
    }

    pub fn callable_state(&self, id: ScopeId, name: &str) -> CallableState {
        match self.get_local(id, name) {
            Some(Symbol::Callable(c)) => c.state,
            _ => CallableState::NotDeclared,
        }
    }

    /// Forward declaration. Repeating an identical signature is a no-op.
    pub fn declare_callable(
        &mut self,
        id: ScopeId,
        mut callable: Callable,
    ) -> Result<(), DeclareError> {
        match self.get_local(id, &callable.name.node) {
            None => {
                tracing::debug!(name = %callable.name.node, "callable declared");
                callable.state = CallableState::Declared;
                self.declare(id, Symbol::Callable(callable))
            }
            Some(Symbol::Callable(existing)) if existing.signature_equals(&callable) => Ok(()),
            Some(Symbol::Callable(existing)) => Err(DeclareError::SignatureMismatch {
                name: callable.name.node.clone(),
                kind: callable.kind,
                previous: existing.span,
            }),
            Some(existing) => Err(DeclareError::Redefined {
                name: callable.name.node.clone(),
                new_kind: callable.kind.as_str(),
                existing_kind: existing.kind_name(),
            }),
        }
    }

    /// Definition, with or without a prior declaration. A callable is
    /// defined at most once.
    pub fn define_callable(
        &mut self,
        id: ScopeId,
        mut callable: Callable,
    ) -> Result<(), DeclareError> {
        let name = callable.name.node.clone();
        match self.get_local_mut(id, &name) {
            None => {
                tracing::debug!(%name, "callable defined without prior declaration");
                callable.state = CallableState::Defined;
                self.declare(id, Symbol::Callable(callable))
            }
            Some(Symbol::Callable(existing)) => {
                if existing.state == CallableState::Defined {
                    Err(DeclareError::Redefined {
                        name,
                        new_kind: callable.kind.as_str(),
                        existing_kind: existing.kind.as_str(),
                    })
                } else if existing.signature_equals(&callable) {
                    tracing::debug!(%name, "callable defined");
                    existing.state = CallableState::Defined;
                    Ok(())
                } else {
                    Err(DeclareError::SignatureMismatch {
                        name,
                        kind: callable.kind,
                        previous: existing.span,
                    })
                }
            }
            Some(existing) => Err(DeclareError::Redefined {
                name,
                new_kind: callable.kind.as_str(),
                existing_kind: existing.kind_name(),
            }),
        }
    }

    /// Callables of `id` declared but never defined, in declaration order.
    pub fn undefined_callables(&self, id: ScopeId) -> impl Iterator<Item = &Callable> {
        self.symbols(id).iter().filter_map(|s| match s {
            Symbol::Callable(c) if c.state == CallableState::Declared => Some(c),
            _ => None,
        })
    }
}

fn lookup_error(name: &str, found: Option<&Symbol>, expected: SymbolKind) -> LookupError {
    match found {
        Some(symbol) => LookupError::WrongKind {
            name: name.to_string(),
            actual: symbol.kind_name(),
            expected: expected.as_str(),
        },
        None => LookupError::Undefined {
            name: name.to_string(),
            expected: expected.as_str(),
        },
    }
}
