//! Syntax tree builders standing in for the parser.

use psdc_ast::*;

pub fn sp() -> Span {
    span(0, 0)
}

pub fn id(name: &str) -> Ident {
    Spanned::new(sp(), name.to_string())
}

// Expressions

fn lit(l: Literal) -> Expr {
    Expr::new(sp(), ExprKind::Literal(l))
}

pub fn int(n: i32) -> Expr {
    lit(Literal::Integer(n))
}

pub fn real(x: f64) -> Expr {
    lit(Literal::Real(x))
}

pub fn boolean(b: bool) -> Expr {
    lit(Literal::Boolean(b))
}

pub fn chr(c: char) -> Expr {
    lit(Literal::Character(c))
}

pub fn string(s: &str) -> Expr {
    lit(Literal::String(s.to_string()))
}

pub fn lvar(name: &str) -> Lvalue {
    Lvalue::new(sp(), LvalueKind::VariableReference(id(name)))
}

pub fn lindex(array: Expr, index: Expr) -> Lvalue {
    Lvalue::new(
        sp(),
        LvalueKind::ArraySubscript {
            array: Box::new(array),
            index: Box::new(index),
        },
    )
}

pub fn lfield(structure: Expr, component: &str) -> Lvalue {
    Lvalue::new(
        sp(),
        LvalueKind::ComponentAccess {
            structure: Box::new(structure),
            component: id(component),
        },
    )
}

pub fn lv(lvalue: Lvalue) -> Expr {
    Expr::new(lvalue.span, ExprKind::Lvalue(lvalue))
}

pub fn var(name: &str) -> Expr {
    lv(lvar(name))
}

pub fn index(array: Expr, i: Expr) -> Expr {
    lv(lindex(array, i))
}

pub fn field(structure: Expr, component: &str) -> Expr {
    lv(lfield(structure, component))
}

pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::new(
        sp(),
        ExprKind::Binary {
            op: Spanned::new(sp(), op),
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

pub fn un(op: UnaryOp, operand: Expr) -> Expr {
    Expr::new(
        sp(),
        ExprKind::Unary {
            op: Spanned::new(sp(), op),
            operand: Box::new(operand),
        },
    )
}

pub fn paren(e: Expr) -> Expr {
    Expr::new(sp(), ExprKind::Paren(Box::new(e)))
}

pub fn call(name: &str, args: Vec<(ParameterMode, Expr)>) -> Expr {
    Expr::new(
        sp(),
        ExprKind::Call {
            callee: id(name),
            args: args
                .into_iter()
                .map(|(mode, value)| ActualParameter {
                    span: sp(),
                    mode,
                    value,
                })
                .collect(),
        },
    )
}

pub fn cast(target: TypeExpr, value: Expr) -> Expr {
    Expr::new(
        sp(),
        ExprKind::Cast {
            target,
            value: Box::new(value),
        },
    )
}

pub fn fdf(file: Expr) -> Expr {
    Expr::new(sp(), ExprKind::Fdf(Box::new(file)))
}

// Types

fn ty(kind: TypeKind) -> TypeExpr {
    TypeExpr::new(sp(), kind)
}

pub fn t_int() -> TypeExpr {
    ty(TypeKind::Integer)
}

pub fn t_real() -> TypeExpr {
    ty(TypeKind::Real)
}

pub fn t_bool() -> TypeExpr {
    ty(TypeKind::Boolean)
}

pub fn t_char() -> TypeExpr {
    ty(TypeKind::Character)
}

pub fn t_string() -> TypeExpr {
    ty(TypeKind::String)
}

pub fn t_file() -> TypeExpr {
    ty(TypeKind::File)
}

pub fn t_lstring(len: Expr) -> TypeExpr {
    ty(TypeKind::LengthedString(Box::new(len)))
}

pub fn t_alias(name: &str) -> TypeExpr {
    ty(TypeKind::Alias(id(name)))
}

pub fn t_array(element: TypeExpr, dimensions: Vec<Expr>) -> TypeExpr {
    ty(TypeKind::Array {
        element: Box::new(element),
        dimensions,
    })
}

pub fn t_struct(components: Vec<(&str, TypeExpr)>) -> TypeExpr {
    t_struct_groups(
        components
            .into_iter()
            .map(|(name, ty)| (vec![name], ty))
            .collect(),
    )
}

/// Structure whose components may declare several names at once.
pub fn t_struct_groups(components: Vec<(Vec<&str>, TypeExpr)>) -> TypeExpr {
    ty(TypeKind::Structure(
        components
            .into_iter()
            .map(|(names, ty)| Component {
                span: sp(),
                names: names.into_iter().map(id).collect(),
                ty,
            })
            .collect(),
    ))
}

// Initializers

pub fn init(e: Expr) -> Initializer {
    Initializer::Expr(e)
}

pub fn braced(items: Vec<InitializerItem>) -> Initializer {
    braced_entries(items.into_iter().map(BracedItem::Value).collect())
}

/// Braced initializer that may interleave compiler directives with items.
pub fn braced_entries(items: Vec<BracedItem>) -> Initializer {
    Initializer::Braced(BracedInitializer { span: sp(), items })
}

pub fn item(value: Initializer) -> InitializerItem {
    item_at(Vec::new(), value)
}

pub fn item_at(designators: Vec<Designator>, value: Initializer) -> InitializerItem {
    InitializerItem {
        span: sp(),
        designators,
        value,
    }
}

pub fn d_index(e: Expr) -> Designator {
    Designator {
        span: sp(),
        kind: DesignatorKind::Index(e),
    }
}

pub fn d_field(name: &str) -> Designator {
    Designator {
        span: sp(),
        kind: DesignatorKind::Component(id(name)),
    }
}

/// `{a, b, c}` over integer literals.
pub fn ints(values: &[i32]) -> Initializer {
    braced(values.iter().map(|&n| item(init(int(n)))).collect())
}

// Declarations

pub fn program(declarations: Vec<Declaration>) -> Algorithm {
    Algorithm {
        span: sp(),
        leading_directives: Vec::new(),
        declarations,
    }
}

pub fn constant(ty: TypeExpr, name: &str, value: Initializer) -> Declaration {
    Declaration::Constant(ConstantDecl {
        span: sp(),
        ty,
        name: id(name),
        value,
    })
}

pub fn type_alias(name: &str, target: TypeExpr) -> Declaration {
    Declaration::TypeAlias(TypeAliasDecl {
        span: sp(),
        name: id(name),
        target,
    })
}

pub fn main_program(body: Vec<Stmt>) -> Declaration {
    Declaration::MainProgram(MainProgram { span: sp(), body })
}

pub fn param(mode: ParameterMode, name: &str, ty: TypeExpr) -> FormalParameter {
    FormalParameter {
        span: sp(),
        mode,
        name: id(name),
        ty,
    }
}

pub fn procedure(name: &str, parameters: Vec<FormalParameter>) -> Signature {
    Signature {
        span: sp(),
        kind: CallableKind::Procedure,
        name: id(name),
        parameters,
        return_type: None,
    }
}

pub fn function(name: &str, parameters: Vec<FormalParameter>, return_type: TypeExpr) -> Signature {
    Signature {
        span: sp(),
        kind: CallableKind::Function,
        name: id(name),
        parameters,
        return_type: Some(return_type),
    }
}

pub fn declare(signature: Signature) -> Declaration {
    Declaration::CallableDeclaration(signature)
}

pub fn define(signature: Signature, body: Vec<Stmt>) -> Declaration {
    Declaration::CallableDefinition(CallableDefinition {
        span: sp(),
        signature,
        body,
    })
}

// Statements

pub fn local(ty: TypeExpr, names: &[&str], initializer: Option<Initializer>) -> Stmt {
    Stmt::LocalVariable(LocalVariable {
        span: sp(),
        ty,
        names: names.iter().map(|n| id(n)).collect(),
        initializer,
    })
}

pub fn assign(target: Lvalue, value: Expr) -> Stmt {
    Stmt::Assignment(Assignment {
        span: sp(),
        target,
        value,
    })
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt { span: sp(), value })
}

pub fn expr_stmt(e: Expr) -> Stmt {
    Stmt::Expr(e)
}

pub fn si(condition: Expr, body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
    Stmt::Alternative(Alternative {
        span: sp(),
        if_clause: Clause {
            span: sp(),
            condition,
            body,
        },
        else_ifs: Vec::new(),
        else_body,
    })
}

pub fn tant_que(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(ConditionalLoop {
        span: sp(),
        condition,
        body,
    })
}

pub fn pour(variant: Lvalue, start: Expr, end: Expr, step: Option<Expr>, body: Vec<Stmt>) -> Stmt {
    Stmt::For(ForLoop {
        span: sp(),
        variant,
        start,
        end,
        step,
        body,
    })
}

pub fn selon(scrutinee: Expr, cases: Vec<Case>) -> Stmt {
    Stmt::Switch(Switch {
        span: sp(),
        scrutinee,
        cases,
    })
}

pub fn case(value: Expr, body: Vec<Stmt>) -> Case {
    Case::Value {
        span: sp(),
        value,
        body,
    }
}

pub fn default_case(body: Vec<Stmt>) -> Case {
    Case::Default { span: sp(), body }
}

pub fn builtin(kind: Builtin) -> Stmt {
    Stmt::Builtin(BuiltinStmt { span: sp(), kind })
}

pub fn directive(kind: DirectiveKind) -> CompilerDirective {
    CompilerDirective { span: sp(), kind }
}

pub fn assert_directive(expr: Expr, message: Option<Expr>) -> Stmt {
    Stmt::Directive(directive(DirectiveKind::Assert { expr, message }))
}
