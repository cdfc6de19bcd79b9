#![forbid(unsafe_code)]

use psdc_ast::{CallableKind, Ident, ParameterMode, Span};

use crate::types::EvaluatedType;
use crate::value::Value;

#[derive(Clone, Debug)]
pub enum Symbol {
    Variable {
        name: Ident,
        ty: EvaluatedType,
    },
    Constant {
        name: Ident,
        ty: EvaluatedType,
        value: Value,
    },
    Parameter {
        name: Ident,
        ty: EvaluatedType,
        mode: ParameterMode,
    },
    TypeAlias {
        name: Ident,
        target: EvaluatedType,
    },
    Callable(Callable),
}

impl Symbol {
    pub fn name(&self) -> &Ident {
        match self {
            Symbol::Variable { name, .. }
            | Symbol::Constant { name, .. }
            | Symbol::Parameter { name, .. }
            | Symbol::TypeAlias { name, .. } => name,
            Symbol::Callable(c) => &c.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Variable { .. } => "local variable",
            Symbol::Constant { .. } => "constant",
            Symbol::Parameter { .. } => "parameter",
            Symbol::TypeAlias { .. } => "type alias",
            Symbol::Callable(c) => c.kind.as_str(),
        }
    }

    /// Type of a variable-like symbol.
    pub fn value_type(&self) -> Option<&EvaluatedType> {
        match self {
            Symbol::Variable { ty, .. }
            | Symbol::Constant { ty, .. }
            | Symbol::Parameter { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

/// Kind requested by a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Anything holding a value: variables, constants and parameters.
    Variable,
    TypeAlias,
    Callable,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::TypeAlias => "type alias",
            SymbolKind::Callable => "function or procedure",
        }
    }

    pub fn accepts(self, symbol: &Symbol) -> bool {
        match self {
            SymbolKind::Variable => symbol.value_type().is_some(),
            SymbolKind::TypeAlias => matches!(symbol, Symbol::TypeAlias { .. }),
            SymbolKind::Callable => matches!(symbol, Symbol::Callable(_)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallableState {
    NotDeclared,
    Declared,
    Defined,
}

#[derive(Clone, Debug)]
pub struct CallableParameter {
    pub name: Ident,
    pub mode: ParameterMode,
    pub ty: EvaluatedType,
}

#[derive(Clone, Debug)]
pub struct Callable {
    pub name: Ident,
    /// Extent of the signature.
    pub span: Span,
    pub kind: CallableKind,
    pub parameters: Vec<CallableParameter>,
    pub return_type: EvaluatedType,
    pub state: CallableState,
}

impl Callable {
    /// Same kind, name, return type and parameters (name, mode and type).
    pub fn signature_equals(&self, other: &Callable) -> bool {
        self.kind == other.kind
            && self.name.node == other.name.node
            && self.return_type.semantically_equals(&other.return_type)
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| {
                    a.name.node == b.name.node && a.mode == b.mode && a.ty.semantically_equals(&b.ty)
                })
    }
}
