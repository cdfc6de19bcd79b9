#![forbid(unsafe_code)]

//! Semantic tree: the syntax tree with every name resolved, every type
//! evaluated and every expression valued.

use psdc_ast::{BinaryOp, CallableKind, Ident, Literal, ParameterMode, Span, Spanned, UnaryOp};

use crate::scope::ScopeId;
use crate::types::EvaluatedType;
use crate::value::Value;

/// Scope a node was analyzed in, and its source extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Meta {
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Algorithm {
    pub meta: Meta,
    pub leading_directives: Vec<Directive>,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug)]
pub enum Declaration {
    Constant {
        meta: Meta,
        ty: EvaluatedType,
        name: Ident,
        init: Initializer,
    },
    TypeAlias {
        meta: Meta,
        name: Ident,
        target: EvaluatedType,
    },
    MainProgram {
        meta: Meta,
        body: Block,
    },
    CallableDeclaration {
        meta: Meta,
        signature: Signature,
    },
    CallableDefinition {
        meta: Meta,
        signature: Signature,
        body: Block,
    },
    Directive(Directive),
}

#[derive(Clone, Debug)]
pub struct Signature {
    pub meta: Meta,
    pub kind: CallableKind,
    pub name: Ident,
    pub parameters: Vec<FormalParameter>,
    pub return_type: EvaluatedType,
}

#[derive(Clone, Debug)]
pub struct FormalParameter {
    pub meta: Meta,
    pub mode: ParameterMode,
    pub name: Ident,
    pub ty: EvaluatedType,
}

/// Statements owning their own scope.
#[derive(Clone, Debug)]
pub struct Block {
    pub meta: Meta,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Nop(Meta),
    Expr(Expr),
    Alternative {
        meta: Meta,
        if_clause: Clause,
        else_ifs: Vec<Clause>,
        else_block: Option<Block>,
    },
    Assignment {
        meta: Meta,
        target: Expr,
        value: Expr,
    },
    Builtin {
        meta: Meta,
        name: &'static str,
        args: Vec<Expr>,
    },
    DoWhile(ConditionalLoop),
    RepeatUntil(ConditionalLoop),
    While(ConditionalLoop),
    For {
        meta: Meta,
        variant: Expr,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },
    LocalVariable {
        meta: Meta,
        ty: EvaluatedType,
        names: Vec<Ident>,
        init: Option<Initializer>,
    },
    Return {
        meta: Meta,
        value: Option<Expr>,
    },
    Switch {
        meta: Meta,
        scrutinee: Expr,
        cases: Vec<Case>,
    },
    Directive(Directive),
}

#[derive(Clone, Debug)]
pub struct Clause {
    pub meta: Meta,
    pub condition: Expr,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub struct ConditionalLoop {
    pub meta: Meta,
    pub condition: Expr,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub enum Case {
    Value { meta: Meta, value: Expr, body: Block },
    Default { meta: Meta, body: Block },
}

#[derive(Clone, Debug)]
pub enum Directive {
    Assert {
        meta: Meta,
        expr: Expr,
        message: Option<Expr>,
    },
    EvalExpr {
        meta: Meta,
        expr: Expr,
    },
    EvalType {
        meta: Meta,
        ty: EvaluatedType,
    },
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub meta: Meta,
    pub value: Value,
    pub kind: ExprKind,
}

impl Expr {
    pub fn ty(&self) -> &EvaluatedType {
        &self.value.ty
    }
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Literal),
    Paren(Box<Expr>),
    Binary {
        op: Spanned<BinaryOp>,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: Spanned<UnaryOp>,
        operand: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<ActualParameter>,
    },
    Fdf(Box<Expr>),
    Cast {
        target: EvaluatedType,
        value: Box<Expr>,
    },
    VariableReference(Ident),
    ArraySubscript {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ComponentAccess {
        structure: Box<Expr>,
        component: Ident,
    },
}

#[derive(Clone, Debug)]
pub struct ActualParameter {
    pub meta: Meta,
    pub mode: ParameterMode,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub enum Initializer {
    Expr(Expr),
    Braced {
        meta: Meta,
        /// Aggregate built from the items over the target type's default.
        value: Value,
        items: Vec<BracedItem>,
    },
}

impl Initializer {
    pub fn value(&self) -> &Value {
        match self {
            Initializer::Expr(e) => &e.value,
            Initializer::Braced { value, .. } => value,
        }
    }

    pub fn meta(&self) -> Meta {
        match self {
            Initializer::Expr(e) => e.meta,
            Initializer::Braced { meta, .. } => *meta,
        }
    }
}

#[derive(Clone, Debug)]
pub enum BracedItem {
    Value(InitializerItem),
    Directive(Directive),
}

#[derive(Clone, Debug)]
pub struct InitializerItem {
    pub meta: Meta,
    pub designators: Vec<Designator>,
    pub value: Initializer,
}

#[derive(Clone, Debug)]
pub enum Designator {
    Index { meta: Meta, index: Expr },
    Component { meta: Meta, name: Ident },
}
