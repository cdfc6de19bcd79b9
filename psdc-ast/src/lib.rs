#![forbid(unsafe_code)]

//! Syntax tree of the pseudocode language, as delivered by the parser.
//!
//! Every node carries the source extent it was parsed from. The tree is
//! immutable input to semantic analysis.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Smallest span covering both `a` and `b`.
pub fn span_join(a: Span, b: Span) -> Span {
    let start = a.offset().min(b.offset());
    let end = (a.offset() + a.len()).max(b.offset() + b.len());
    span_between(start, end)
}

pub type Ident = Spanned<String>;

/// Identity of an expression node.
///
/// Ids are unique for the lifetime of the process; a cloned node keeps the
/// id of its original.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(0);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Root node: leading compiler directives followed by the declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct Algorithm {
    pub span: Span,
    pub leading_directives: Vec<CompilerDirective>,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    Constant(ConstantDecl),
    TypeAlias(TypeAliasDecl),
    MainProgram(MainProgram),
    /// Forward declaration of a function or procedure.
    CallableDeclaration(Signature),
    CallableDefinition(CallableDefinition),
    Directive(CompilerDirective),
}

impl Declaration {
    pub fn span(&self) -> Span {
        match self {
            Declaration::Constant(d) => d.span,
            Declaration::TypeAlias(d) => d.span,
            Declaration::MainProgram(d) => d.span,
            Declaration::CallableDeclaration(d) => d.span,
            Declaration::CallableDefinition(d) => d.span,
            Declaration::Directive(d) => d.span,
        }
    }
}

/// `constante entier X := 5;`
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDecl {
    pub span: Span,
    pub ty: TypeExpr,
    pub name: Ident,
    pub value: Initializer,
}

/// `type Point = structure début ... fin`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasDecl {
    pub span: Span,
    pub name: Ident,
    pub target: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MainProgram {
    pub span: Span,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Function,
    Procedure,
}

impl CallableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallableKind::Function => "function",
            CallableKind::Procedure => "procedure",
        }
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub span: Span,
    pub kind: CallableKind,
    pub name: Ident,
    pub parameters: Vec<FormalParameter>,
    /// `None` for procedures.
    pub return_type: Option<TypeExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallableDefinition {
    pub span: Span,
    pub signature: Signature,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// Keyword used in a formal parameter list.
    pub fn formal(self) -> &'static str {
        match self {
            ParameterMode::In => "entF",
            ParameterMode::Out => "sortF",
            ParameterMode::InOut => "entF/sortF",
        }
    }

    /// Keyword used at a call site.
    pub fn actual(self) -> &'static str {
        match self {
            ParameterMode::In => "entE",
            ParameterMode::Out => "sortE",
            ParameterMode::InOut => "entE/sortE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormalParameter {
    pub span: Span,
    pub mode: ParameterMode,
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActualParameter {
    pub span: Span,
    pub mode: ParameterMode,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Nop(Span),
    Expr(Expr),
    Alternative(Alternative),
    Assignment(Assignment),
    Builtin(BuiltinStmt),
    DoWhile(ConditionalLoop),
    RepeatUntil(ConditionalLoop),
    While(ConditionalLoop),
    For(ForLoop),
    LocalVariable(LocalVariable),
    Return(ReturnStmt),
    Switch(Switch),
    Directive(CompilerDirective),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Nop(span) => *span,
            Stmt::Expr(e) => e.span,
            Stmt::Alternative(s) => s.span,
            Stmt::Assignment(s) => s.span,
            Stmt::Builtin(s) => s.span,
            Stmt::DoWhile(s) | Stmt::RepeatUntil(s) | Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::LocalVariable(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Directive(s) => s.span,
        }
    }
}

/// `si ... alors ... sinonsi ... sinon ... finsi`
#[derive(Clone, Debug, PartialEq)]
pub struct Alternative {
    pub span: Span,
    pub if_clause: Clause,
    pub else_ifs: Vec<Clause>,
    pub else_body: Option<Vec<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub span: Span,
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub span: Span,
    pub target: Lvalue,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltinStmt {
    pub span: Span,
    pub kind: Builtin,
}

/// File and console builtins of the pseudocode standard library.
#[derive(Clone, Debug, PartialEq)]
pub enum Builtin {
    /// `assigner(f, nom)`
    Assigner { file: Lvalue, name: Expr },
    /// `ecrire(f, expr)`
    Ecrire { file: Expr, value: Expr },
    /// `ecrireEcran(expr, ...)`
    EcrireEcran { args: Vec<Expr> },
    /// `fermer(f)`
    Fermer { file: Expr },
    /// `lire(f, lvalue)`
    Lire { file: Expr, target: Lvalue },
    /// `lireClavier(lvalue)`
    LireClavier { target: Lvalue },
    /// `ouvrirAjout(f)`
    OuvrirAjout { file: Expr },
    /// `ouvrirEcriture(f)`
    OuvrirEcriture { file: Expr },
    /// `ouvrirLecture(f)`
    OuvrirLecture { file: Expr },
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Assigner { .. } => "assigner",
            Builtin::Ecrire { .. } => "ecrire",
            Builtin::EcrireEcran { .. } => "ecrireEcran",
            Builtin::Fermer { .. } => "fermer",
            Builtin::Lire { .. } => "lire",
            Builtin::LireClavier { .. } => "lireClavier",
            Builtin::OuvrirAjout { .. } => "ouvrirAjout",
            Builtin::OuvrirEcriture { .. } => "ouvrirEcriture",
            Builtin::OuvrirLecture { .. } => "ouvrirLecture",
        }
    }
}

/// Shared shape of `faire ... tant que`, `répéter ... jusqu'à` and `tant que ... faire`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalLoop {
    pub span: Span,
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// `pour i de 1 à n pas 2 faire ... finfaire`
#[derive(Clone, Debug, PartialEq)]
pub struct ForLoop {
    pub span: Span,
    pub variant: Lvalue,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// `entier a, b := 5;`
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    pub span: Span,
    pub ty: TypeExpr,
    pub names: Vec<Ident>,
    pub initializer: Option<Initializer>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
    pub span: Span,
    pub scrutinee: Expr,
    pub cases: Vec<Case>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Case {
    Value {
        span: Span,
        value: Expr,
        body: Vec<Stmt>,
    },
    Default {
        span: Span,
        body: Vec<Stmt>,
    },
}

impl Case {
    pub fn span(&self) -> Span {
        match self {
            Case::Value { span, .. } | Case::Default { span, .. } => *span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompilerDirective {
    pub span: Span,
    pub kind: DirectiveKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveKind {
    /// `#assert expr` or `#assert expr, "message"`
    Assert { expr: Expr, message: Option<Expr> },
    /// `#eval expr expr`
    EvalExpr(Expr),
    /// `#eval type type`
    EvalType(TypeExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self {
            id: NodeId::fresh(),
            span,
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
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
    /// `FdF(f)`: end-of-file test.
    Fdf(Box<Expr>),
    /// `(entier) x`
    Cast {
        target: TypeExpr,
        value: Box<Expr>,
    },
    Lvalue(Lvalue),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Character(char),
    Integer(i32),
    Real(f64),
    String(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lvalue {
    pub id: NodeId,
    pub span: Span,
    pub kind: LvalueKind,
}

impl Lvalue {
    pub fn new(span: Span, kind: LvalueKind) -> Self {
        Self {
            id: NodeId::fresh(),
            span,
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LvalueKind {
    VariableReference(Ident),
    ArraySubscript { array: Box<Expr>, index: Box<Expr> },
    ComponentAccess { structure: Box<Expr>, component: Ident },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "ET",
            BinaryOp::Or => "OU",
            BinaryOp::Xor => "XOR",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "NON",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub span: Span,
    pub kind: TypeKind,
}

impl TypeExpr {
    pub fn new(span: Span, kind: TypeKind) -> Self {
        Self { span, kind }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    Boolean,
    Character,
    Integer,
    Real,
    File,
    String,
    /// `chaîne(N)`
    LengthedString(Box<Expr>),
    Alias(Ident),
    /// `tableau[d1, d2, ...] de T`
    Array {
        element: Box<TypeExpr>,
        dimensions: Vec<Expr>,
    },
    Structure(Vec<Component>),
}

/// `a, b : entier;` inside a structure type.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub span: Span,
    pub names: Vec<Ident>,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    Braced(BracedInitializer),
}

impl Initializer {
    pub fn span(&self) -> Span {
        match self {
            Initializer::Expr(e) => e.span,
            Initializer::Braced(b) => b.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BracedInitializer {
    pub span: Span,
    pub items: Vec<BracedItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BracedItem {
    Value(InitializerItem),
    /// Takes no position in the aggregate.
    Directive(CompilerDirective),
}

impl BracedItem {
    pub fn span(&self) -> Span {
        match self {
            BracedItem::Value(item) => item.span,
            BracedItem::Directive(d) => d.span,
        }
    }
}

/// One item of a braced initializer, optionally preceded by designators:
/// `[2][1] := x` or `.nom := "a"`.
#[derive(Clone, Debug, PartialEq)]
pub struct InitializerItem {
    pub span: Span,
    pub designators: Vec<Designator>,
    pub value: Initializer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Designator {
    pub span: Span,
    pub kind: DesignatorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DesignatorKind {
    Index(Expr),
    Component(Ident),
}
