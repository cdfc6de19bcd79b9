#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::mem;

use psdc_ast as ast;
use psdc_ast::{Ident, NodeId, Span};

use crate::config::AnalyzerConfig;
use crate::diagnostics::{Code, Diagnostic, DiagnosticSink, FilterSink, SeverityCounts};
use crate::error::{DeclareError, LookupError};
use crate::fold::{self, CastKind, OperationMessage};
use crate::initializer::{self, DesignatorError, InitializerPath, PathStep};
use crate::scope::{ScopeArena, ScopeId};
use crate::symbol::{Callable, CallableParameter, CallableState, Symbol, SymbolKind};
use crate::tree::{self, Meta};
use crate::types::EvaluatedType;
use crate::value::Value;

/// Resolved type of every analyzed expression, keyed by syntax node.
#[derive(Clone, Debug, Default)]
pub struct InferredTypes {
    types: HashMap<NodeId, EvaluatedType>,
}

impl InferredTypes {
    pub fn get(&self, id: NodeId) -> Option<&EvaluatedType> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn record(&mut self, id: NodeId, ty: &EvaluatedType) {
        self.types.entry(id).or_insert_with(|| ty.clone());
    }
}

/// Output of one analysis.
#[derive(Debug)]
pub struct Analysis {
    pub algorithm: tree::Algorithm,
    pub scopes: ScopeArena,
    pub inferred_types: InferredTypes,
    /// Diagnostics forwarded to the sink, per severity.
    pub counts: SeverityCounts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MainProgramStatus {
    NotYet,
    Inside,
    Seen,
}

/// What a `retourne` statement returns from.
#[derive(Clone, Debug)]
enum ReturnContext {
    Nothing,
    MainProgram,
    Callable(EvaluatedType),
}

/// Single-pass, syntax-directed semantic analyzer. One instance analyzes
/// one algorithm.
pub struct Analyzer<'a> {
    config: &'a AnalyzerConfig,
    source: Option<&'a str>,
    sink: FilterSink<'a>,
    scopes: ScopeArena,
    inferred: InferredTypes,
    main_program: MainProgramStatus,
    return_context: ReturnContext,
    /// Extents of integer operations whose comptime result overflowed.
    overflows: Vec<Span>,
}

fn encloses(outer: Span, inner: Span) -> bool {
    inner.offset() >= outer.offset() && inner.offset() + inner.len() <= outer.offset() + outer.len()
}

fn coerce(value: &Value, target: &EvaluatedType) -> Value {
    if value.ty.is_assignable_to(target) {
        value.converted_to(target)
    } else {
        target.invalid_value()
    }
}

fn literal_value(lit: &ast::Literal) -> Value {
    match lit {
        ast::Literal::Boolean(b) => Value::boolean(*b),
        ast::Literal::Character(c) => Value::character(*c),
        ast::Literal::Integer(n) => Value::integer(*n),
        ast::Literal::Real(x) => Value::real(*x),
        ast::Literal::String(s) => Value::string(s.clone()),
    }
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a AnalyzerConfig, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            config,
            source: None,
            sink: FilterSink::new(sink, &config.suppressed),
            scopes: ScopeArena::new(),
            inferred: InferredTypes::default(),
            main_program: MainProgramStatus::NotYet,
            return_context: ReturnContext::Nothing,
            overflows: Vec::new(),
        }
    }

    /// Source text the spans refer to, quoted in some messages.
    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    #[tracing::instrument(skip_all, fields(declarations = algorithm.declarations.len()))]
    pub fn analyze(mut self, algorithm: &ast::Algorithm) -> Analysis {
        let root = self.scopes.root();

        let leading_directives = algorithm
            .leading_directives
            .iter()
            .map(|d| self.directive(root, d))
            .collect();
        let declarations = algorithm
            .declarations
            .iter()
            .map(|d| self.declaration(root, d))
            .collect();

        let undefined: Vec<Callable> = self.scopes.undefined_callables(root).cloned().collect();
        for callable in undefined {
            self.report(
                Diagnostic::new(
                    Code::CallableNotDefined,
                    callable.span,
                    format!(
                        "{} `{}` declared but not defined",
                        callable.kind, callable.name.node
                    ),
                )
                .with_advice(format!("provide a definition for `{}`", callable.name.node)),
            );
        }

        let counts = self.sink.counts();
        tracing::debug!(
            errors = counts.errors,
            warnings = counts.warnings,
            hints = counts.hints,
            scopes = self.scopes.len(),
            "analysis finished"
        );

        Analysis {
            algorithm: tree::Algorithm {
                meta: Meta {
                    scope: root,
                    span: algorithm.span,
                },
                leading_directives,
                declarations,
            },
            scopes: self.scopes,
            inferred_types: self.inferred,
            counts,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let enabled = match diagnostic.code {
            Code::UnofficialFeature => self.config.report_unofficial_features,
            Code::EvaluateExpression | Code::EvaluateType => self.config.report_debug,
            _ => true,
        };
        if enabled {
            self.sink.report(diagnostic);
        }
    }

    fn error(&mut self, code: Code, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::new(code, span, message));
    }

    fn constant_expected(&mut self, span: Span) {
        let mut d = Diagnostic::new(
            Code::ConstantExpressionExpected,
            span,
            "constant expression expected",
        );
        if self.overflows.iter().any(|&o| encloses(span, o)) {
            d = d.with_advice("integer overflow");
        }
        self.report(d);
    }

    fn unofficial_feature(&mut self, span: Span, feature: &str, alternative: Option<&str>) {
        let mut d = Diagnostic::new(
            Code::UnofficialFeature,
            span,
            format!("language feature '{feature}' is not official"),
        );
        if let Some(alternative) = alternative {
            d = d.with_advice(alternative);
        }
        self.report(d);
    }

    fn report_lookup(&mut self, err: LookupError, span: Span) {
        self.error(Code::UndefinedSymbol, span, err.to_string());
    }

    fn report_declare(&mut self, err: DeclareError, span: Span) {
        match &err {
            DeclareError::Redefined { .. } => self.error(Code::RedefinedSymbol, span, err.to_string()),
            DeclareError::SignatureMismatch { previous, .. } => {
                let quoted = self.source_text(*previous);
                let message = match quoted {
                    Some(text) => format!("{err} (`{text}`)"),
                    None => err.to_string(),
                };
                self.error(Code::SignatureMismatch, span, message);
            }
        }
    }

    fn source_text(&self, span: Span) -> Option<String> {
        let source = self.source?;
        source
            .get(span.offset()..span.offset() + span.len())
            .map(str::to_string)
    }

    fn wrong_type(&mut self, span: Span, expected: &EvaluatedType, actual: &EvaluatedType) {
        self.error(
            Code::ExpressionHasWrongType,
            span,
            format!(
                "can't convert expression of type '{}' to '{}'",
                actual.display(),
                expected.display()
            ),
        );
    }

    /// Reports unless `expr` implicitly converts to `target`.
    fn check_convertible(&mut self, expr: &tree::Expr, target: &EvaluatedType) -> bool {
        if expr.ty().is_convertible_to(target) {
            true
        } else {
            self.wrong_type(expr.meta.span, target, expr.ty());
            false
        }
    }

    fn check_assignable(&mut self, expr: &tree::Expr, target: &EvaluatedType) -> bool {
        if expr.ty().is_assignable_to(target) {
            true
        } else {
            self.wrong_type(expr.meta.span, target, expr.ty());
            false
        }
    }

    // Declarations

    fn declaration(&mut self, scope: ScopeId, decl: &ast::Declaration) -> tree::Declaration {
        let meta = Meta {
            scope,
            span: decl.span(),
        };
        match decl {
            ast::Declaration::Constant(c) => {
                let ty = self.evaluate_type(scope, &c.ty);
                let init = self.initializer(scope, &c.value, &ty);
                let value = init.value();
                if !value.is_comptime() && !value.is_invalid() {
                    self.constant_expected(c.value.span());
                }
                let value = coerce(value, &ty);
                let symbol = Symbol::Constant {
                    name: c.name.clone(),
                    ty: ty.clone(),
                    value,
                };
                if let Err(e) = self.scopes.declare(scope, symbol) {
                    self.report_declare(e, c.name.span);
                }
                tree::Declaration::Constant {
                    meta,
                    ty,
                    name: c.name.clone(),
                    init,
                }
            }
            ast::Declaration::TypeAlias(t) => {
                let target = self.evaluate_type(scope, &t.target);
                let symbol = Symbol::TypeAlias {
                    name: t.name.clone(),
                    target: target.clone(),
                };
                if let Err(e) = self.scopes.declare(scope, symbol) {
                    self.report_declare(e, t.name.span);
                }
                tree::Declaration::TypeAlias {
                    meta,
                    name: t.name.clone(),
                    target,
                }
            }
            ast::Declaration::MainProgram(m) => {
                if self.main_program == MainProgramStatus::Seen {
                    self.error(Code::RedefinedMainProgram, m.span, "more than one main program");
                }
                self.main_program = MainProgramStatus::Inside;
                let outer = mem::replace(&mut self.return_context, ReturnContext::MainProgram);
                let body = self.block(scope, &m.body, m.span);
                self.return_context = outer;
                self.main_program = MainProgramStatus::Seen;
                tree::Declaration::MainProgram { meta, body }
            }
            ast::Declaration::CallableDeclaration(sig) => {
                let (signature, callable) = self.signature(scope, sig);
                if let Err(e) = self.scopes.declare_callable(scope, callable) {
                    self.report_declare(e, sig.span);
                }
                tree::Declaration::CallableDeclaration { meta, signature }
            }
            ast::Declaration::CallableDefinition(def) => {
                let (signature, callable) = self.signature(scope, &def.signature);
                if let Err(e) = self.scopes.define_callable(scope, callable) {
                    self.report_declare(e, def.signature.span);
                }

                let body_scope = self.scopes.push(scope);
                for p in &signature.parameters {
                    let symbol = Symbol::Parameter {
                        name: p.name.clone(),
                        ty: p.ty.clone(),
                        mode: p.mode,
                    };
                    if let Err(e) = self.scopes.declare(body_scope, symbol) {
                        self.report_declare(e, p.name.span);
                    }
                }

                let outer = mem::replace(
                    &mut self.return_context,
                    ReturnContext::Callable(signature.return_type.clone()),
                );
                let stmts = self.stmts(body_scope, &def.body);
                self.return_context = outer;

                tree::Declaration::CallableDefinition {
                    meta,
                    signature,
                    body: tree::Block {
                        meta: Meta {
                            scope: body_scope,
                            span: def.span,
                        },
                        stmts,
                    },
                }
            }
            ast::Declaration::Directive(d) => tree::Declaration::Directive(self.directive(scope, d)),
        }
    }

    fn signature(&mut self, scope: ScopeId, sig: &ast::Signature) -> (tree::Signature, Callable) {
        let parameters: Vec<tree::FormalParameter> = sig
            .parameters
            .iter()
            .map(|p| tree::FormalParameter {
                meta: Meta {
                    scope,
                    span: p.span,
                },
                mode: p.mode,
                name: p.name.clone(),
                ty: self.evaluate_type(scope, &p.ty),
            })
            .collect();
        let return_type = match &sig.return_type {
            Some(t) => self.evaluate_type(scope, t),
            None => EvaluatedType::Void,
        };

        let callable = Callable {
            name: sig.name.clone(),
            span: sig.span,
            kind: sig.kind,
            parameters: parameters
                .iter()
                .map(|p| CallableParameter {
                    name: p.name.clone(),
                    mode: p.mode,
                    ty: p.ty.clone(),
                })
                .collect(),
            return_type: return_type.clone(),
            state: CallableState::NotDeclared,
        };
        let signature = tree::Signature {
            meta: Meta {
                scope,
                span: sig.span,
            },
            kind: sig.kind,
            name: sig.name.clone(),
            parameters,
            return_type,
        };
        (signature, callable)
    }

    fn directive(&mut self, scope: ScopeId, d: &ast::CompilerDirective) -> tree::Directive {
        let meta = Meta {
            scope,
            span: d.span,
        };
        self.unofficial_feature(d.span, "compiler directives", None);
        match &d.kind {
            ast::DirectiveKind::Assert { expr, message } => {
                let expr = self.expr(scope, expr);
                let is_boolean = self.check_convertible(&expr, &EvaluatedType::Boolean);
                let message = message.as_ref().map(|m| self.expr(scope, m));
                if let Some(m) = &message {
                    self.check_convertible(m, &EvaluatedType::String);
                }
                match expr.value.as_boolean() {
                    _ if !is_boolean => {}
                    Some(true) => {}
                    Some(false) => {
                        let text = match message.as_ref().and_then(|m| m.value.as_str()) {
                            Some(m) => format!("compile-time assertion failed: {m}"),
                            None => "compile-time assertion failed".to_string(),
                        };
                        self.error(Code::AssertionFailed, d.span, text);
                    }
                    None if expr.value.is_invalid() => {}
                    None => self.constant_expected(expr.meta.span),
                }
                tree::Directive::Assert {
                    meta,
                    expr,
                    message,
                }
            }
            ast::DirectiveKind::EvalExpr(e) => {
                let expr = self.expr(scope, e);
                self.error(
                    Code::EvaluateExpression,
                    d.span,
                    format!("evaluated value: {}", expr.value),
                );
                tree::Directive::EvalExpr { meta, expr }
            }
            ast::DirectiveKind::EvalType(t) => {
                let ty = self.evaluate_type(scope, t);
                self.error(
                    Code::EvaluateType,
                    d.span,
                    format!("evaluated type: {}", ty.display_full()),
                );
                tree::Directive::EvalType { meta, ty }
            }
        }
    }

    // Statements

    fn block(&mut self, parent: ScopeId, stmts: &[ast::Stmt], span: Span) -> tree::Block {
        let scope = self.scopes.push(parent);
        tree::Block {
            meta: Meta { scope, span },
            stmts: self.stmts(scope, stmts),
        }
    }

    fn stmts(&mut self, scope: ScopeId, stmts: &[ast::Stmt]) -> Vec<tree::Stmt> {
        stmts.iter().map(|s| self.stmt(scope, s)).collect()
    }

    fn condition(&mut self, scope: ScopeId, e: &ast::Expr) -> tree::Expr {
        let e = self.expr(scope, e);
        self.check_convertible(&e, &EvaluatedType::Boolean);
        e
    }

    fn clause(&mut self, scope: ScopeId, c: &ast::Clause) -> tree::Clause {
        tree::Clause {
            meta: Meta {
                scope,
                span: c.span,
            },
            condition: self.condition(scope, &c.condition),
            body: self.block(scope, &c.body, c.span),
        }
    }

    fn conditional_loop(&mut self, scope: ScopeId, l: &ast::ConditionalLoop) -> tree::ConditionalLoop {
        tree::ConditionalLoop {
            meta: Meta {
                scope,
                span: l.span,
            },
            condition: self.condition(scope, &l.condition),
            body: self.block(scope, &l.body, l.span),
        }
    }

    fn stmt(&mut self, scope: ScopeId, stmt: &ast::Stmt) -> tree::Stmt {
        let meta = Meta {
            scope,
            span: stmt.span(),
        };
        match stmt {
            ast::Stmt::Nop(_) => tree::Stmt::Nop(meta),
            ast::Stmt::Expr(e) => {
                let e = self.expr(scope, e);
                if !e.ty().is_convertible_to(&EvaluatedType::Void) {
                    self.error(Code::ExpressionValueUnused, e.meta.span, "value of expression unused");
                }
                tree::Stmt::Expr(e)
            }
            ast::Stmt::Alternative(a) => tree::Stmt::Alternative {
                meta,
                if_clause: self.clause(scope, &a.if_clause),
                else_ifs: a.else_ifs.iter().map(|c| self.clause(scope, c)).collect(),
                else_block: a
                    .else_body
                    .as_ref()
                    .map(|body| self.block(scope, body, a.span)),
            },
            ast::Stmt::Assignment(a) => {
                let target = self.lvalue(scope, &a.target);
                if let ast::LvalueKind::VariableReference(name) = &a.target.kind {
                    let constant = matches!(
                        self.scopes.lookup(scope, &name.node),
                        Some(Symbol::Constant { .. })
                    );
                    if constant {
                        self.error(
                            Code::ConstantAssignment,
                            a.span,
                            format!("reassigning constant `{}`", name.node),
                        );
                    }
                }
                let value = self.expr(scope, &a.value);
                self.check_assignable(&value, target.ty());
                tree::Stmt::Assignment {
                    meta,
                    target,
                    value,
                }
            }
            ast::Stmt::Builtin(b) => {
                let args = self.builtin_args(scope, &b.kind);
                tree::Stmt::Builtin {
                    meta,
                    name: b.kind.name(),
                    args,
                }
            }
            ast::Stmt::DoWhile(l) => tree::Stmt::DoWhile(self.conditional_loop(scope, l)),
            ast::Stmt::RepeatUntil(l) => tree::Stmt::RepeatUntil(self.conditional_loop(scope, l)),
            ast::Stmt::While(l) => tree::Stmt::While(self.conditional_loop(scope, l)),
            ast::Stmt::For(f) => {
                let variant = self.lvalue(scope, &f.variant);
                let start = self.expr(scope, &f.start);
                self.check_assignable(&start, variant.ty());
                let end = self.expr(scope, &f.end);
                self.check_convertible(&end, variant.ty());
                let step = f.step.as_ref().map(|s| self.expr(scope, s));
                if let Some(step) = &step {
                    self.check_convertible(step, variant.ty());
                }
                let body = self.block(scope, &f.body, f.span);
                tree::Stmt::For {
                    meta,
                    variant,
                    start,
                    end,
                    step,
                    body,
                }
            }
            ast::Stmt::LocalVariable(v) => {
                let ty = self.evaluate_type(scope, &v.ty);
                let init = v
                    .initializer
                    .as_ref()
                    .map(|i| self.initializer(scope, i, &ty));
                if let Some(i) = &v.initializer {
                    if self.config.hint_scalar_initializers && !ty.is_aggregate() {
                        self.unofficial_feature(
                            i.span(),
                            "scalar initializers",
                            Some("consider separating the initialization from the declaration in an assignment statement"),
                        );
                    }
                }
                for name in &v.names {
                    let symbol = Symbol::Variable {
                        name: name.clone(),
                        ty: ty.clone(),
                    };
                    if let Err(e) = self.scopes.declare(scope, symbol) {
                        self.report_declare(e, name.span);
                    }
                }
                tree::Stmt::LocalVariable {
                    meta,
                    ty,
                    names: v.names.clone(),
                    init,
                }
            }
            ast::Stmt::Return(r) => self.return_stmt(scope, meta, r),
            ast::Stmt::Switch(s) => self.switch(scope, meta, s),
            ast::Stmt::Directive(d) => tree::Stmt::Directive(self.directive(scope, d)),
        }
    }

    fn file_arg(&mut self, scope: ScopeId, e: &ast::Expr) -> tree::Expr {
        let e = self.expr(scope, e);
        self.check_convertible(&e, &EvaluatedType::File);
        e
    }

    fn builtin_args(&mut self, scope: ScopeId, builtin: &ast::Builtin) -> Vec<tree::Expr> {
        use ast::Builtin as B;
        match builtin {
            B::Assigner { file, name } => {
                let file = self.lvalue(scope, file);
                self.check_convertible(&file, &EvaluatedType::File);
                let name = self.expr(scope, name);
                self.check_convertible(&name, &EvaluatedType::String);
                vec![file, name]
            }
            B::Ecrire { file, value } => {
                let file = self.file_arg(scope, file);
                vec![file, self.expr(scope, value)]
            }
            B::EcrireEcran { args } => args.iter().map(|a| self.expr(scope, a)).collect(),
            B::Fermer { file }
            | B::OuvrirAjout { file }
            | B::OuvrirEcriture { file }
            | B::OuvrirLecture { file } => vec![self.file_arg(scope, file)],
            B::Lire { file, target } => {
                let file = self.file_arg(scope, file);
                vec![file, self.lvalue(scope, target)]
            }
            B::LireClavier { target } => vec![self.lvalue(scope, target)],
        }
    }

    fn return_stmt(&mut self, scope: ScopeId, meta: Meta, r: &ast::ReturnStmt) -> tree::Stmt {
        let expected = match &self.return_context {
            ReturnContext::Nothing => None,
            ReturnContext::MainProgram => Some(EvaluatedType::Integer),
            ReturnContext::Callable(ty) => Some(ty.clone()),
        };
        let value = r.value.as_ref().map(|v| self.expr(scope, v));

        match (&expected, &value) {
            (None, _) => self.error(
                Code::ReturnInNonReturnable,
                r.span,
                "return in something not a function, a procedure or a main program",
            ),
            (Some(expected), Some(value)) => {
                self.check_convertible(value, expected);
            }
            (Some(expected), None) => {
                if !expected.semantically_equals(&EvaluatedType::Void) {
                    self.error(
                        Code::ReturnExpectsValue,
                        r.span,
                        format!("return here requires a value of type '{}'", expected.display()),
                    );
                }
            }
        }
        tree::Stmt::Return { meta, value }
    }

    fn switch(&mut self, scope: ScopeId, meta: Meta, s: &ast::Switch) -> tree::Stmt {
        let scrutinee = self.expr(scope, &s.scrutinee);
        if scrutinee.ty().is_string_like() {
            self.error(
                Code::CannotSwitchOnString,
                scrutinee.meta.span,
                "cannot switch on string",
            );
        }

        let last = s.cases.len().saturating_sub(1);
        let mut cases = Vec::with_capacity(s.cases.len());
        for (i, case) in s.cases.iter().enumerate() {
            match case {
                ast::Case::Value { span, value, body } => {
                    let value = self.expr(scope, value);
                    self.check_convertible(&value, scrutinee.ty());
                    if !value.value.is_comptime() && !value.value.is_invalid() {
                        self.constant_expected(value.meta.span);
                    }
                    let body = self.block(scope, body, *span);
                    cases.push(tree::Case::Value {
                        meta: Meta { scope, span: *span },
                        value,
                        body,
                    });
                }
                ast::Case::Default { span, body } => {
                    if i != last {
                        self.report(
                            Diagnostic::new(
                                Code::SwitchDefaultIsNotLast,
                                *span,
                                "default not last in switch; all cases below are unreachable",
                            )
                            .with_advice("move the default case to the end of the switch statement"),
                        );
                    }
                    let body = self.block(scope, body, *span);
                    cases.push(tree::Case::Default {
                        meta: Meta { scope, span: *span },
                        body,
                    });
                }
            }
        }
        tree::Stmt::Switch {
            meta,
            scrutinee,
            cases,
        }
    }

    // Expressions

    fn expr(&mut self, scope: ScopeId, e: &ast::Expr) -> tree::Expr {
        let meta = Meta {
            scope,
            span: e.span,
        };
        let (value, kind) = match &e.kind {
            ast::ExprKind::Literal(lit) => (literal_value(lit), tree::ExprKind::Literal(lit.clone())),
            ast::ExprKind::Paren(inner) => {
                let inner = self.expr(scope, inner);
                (inner.value.clone(), tree::ExprKind::Paren(Box::new(inner)))
            }
            ast::ExprKind::Binary { op, left, right } => {
                let left = self.expr(scope, left);
                let right = self.expr(scope, right);
                let operation = fold::evaluate_binary(op.node, &left.value, &right.value, e.span);
                for message in &operation.messages {
                    let unsupported = format!(
                        "unsupported operand types for {}: '{}' and '{}'",
                        op.node.symbol(),
                        left.ty().display(),
                        right.ty().display()
                    );
                    self.report_operation(*message, e.span, unsupported);
                }
                (
                    operation.value,
                    tree::ExprKind::Binary {
                        op: op.clone(),
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                )
            }
            ast::ExprKind::Unary { op, operand } => {
                let operand = self.expr(scope, operand);
                let operation = fold::evaluate_unary(op.node, &operand.value, e.span);
                for message in &operation.messages {
                    let unsupported = format!(
                        "unsupported operand type for {}: '{}'",
                        op.node.symbol(),
                        operand.ty().display()
                    );
                    self.report_operation(*message, e.span, unsupported);
                }
                (
                    operation.value,
                    tree::ExprKind::Unary {
                        op: op.clone(),
                        operand: Box::new(operand),
                    },
                )
            }
            ast::ExprKind::Call { callee, args } => self.call(scope, e.span, callee, args),
            ast::ExprKind::Fdf(file) => {
                let file = self.file_arg(scope, file);
                (
                    EvaluatedType::Boolean.runtime_value(),
                    tree::ExprKind::Fdf(Box::new(file)),
                )
            }
            ast::ExprKind::Cast { target, value } => {
                let target = self.evaluate_type(scope, target);
                let value = self.expr(scope, value);
                self.unofficial_feature(e.span, "type casts", None);
                let outcome = fold::evaluate_cast(&value.value, &target);
                match outcome.kind {
                    CastKind::Explicit => {}
                    CastKind::Redundant => self.error(
                        Code::RedundantCast,
                        e.span,
                        format!(
                            "redundant cast from '{}' to '{}': an implicit conversion exists",
                            value.ty().display(),
                            target.display()
                        ),
                    ),
                    CastKind::Invalid => self.error(
                        Code::InvalidCast,
                        e.span,
                        format!(
                            "invalid cast: there is no implicit or explicit conversion from '{}' to '{}'",
                            value.ty().display(),
                            target.display()
                        ),
                    ),
                }
                (
                    outcome.value,
                    tree::ExprKind::Cast {
                        target,
                        value: Box::new(value),
                    },
                )
            }
            ast::ExprKind::Lvalue(lv) => {
                let lvalue = self.lvalue(scope, lv);
                self.inferred.record(e.id, lvalue.ty());
                return lvalue;
            }
        };
        self.inferred.record(e.id, &value.ty);
        tree::Expr { meta, value, kind }
    }

    fn report_operation(&mut self, message: OperationMessage, span: Span, unsupported: String) {
        match message {
            OperationMessage::DivisionByZero => {
                self.error(Code::DivisionByZero, span, "division by zero will cause runtime error")
            }
            OperationMessage::FloatingPointEquality => self.report(
                Diagnostic::new(
                    Code::FloatingPointEquality,
                    span,
                    "floating point equality may be inaccurate",
                )
                .with_advice("consider comparing absolute difference to an epsilon value instead"),
            ),
            OperationMessage::IntegerOverflow => self.overflows.push(span),
            OperationMessage::UnsupportedOperation => {
                self.error(Code::UnsupportedOperation, span, unsupported)
            }
        }
    }

    fn call(
        &mut self,
        scope: ScopeId,
        span: Span,
        callee: &Ident,
        args: &[ast::ActualParameter],
    ) -> (Value, tree::ExprKind) {
        let args: Vec<tree::ActualParameter> = args
            .iter()
            .map(|a| tree::ActualParameter {
                meta: Meta {
                    scope,
                    span: a.span,
                },
                mode: a.mode,
                value: self.expr(scope, &a.value),
            })
            .collect();

        let value = match self.scopes.lookup_callable(scope, &callee.node).cloned() {
            Err(e) => {
                self.report_lookup(e, callee.span);
                Value::invalid(EvaluatedType::Unknown(span))
            }
            Ok(callable) => {
                let mut problems = Vec::new();
                if callable.parameters.len() != args.len() {
                    let expected = callable.parameters.len();
                    problems.push(format!(
                        "expected {expected} argument{}, got {}",
                        if expected == 1 { "" } else { "s" },
                        args.len()
                    ));
                }
                for (formal, actual) in callable.parameters.iter().zip(&args) {
                    if formal.mode != actual.mode {
                        problems.push(format!(
                            "wrong mode for `{}`: expected '{}', got '{}'",
                            formal.name.node,
                            formal.mode.actual(),
                            actual.mode.actual()
                        ));
                    }
                    if !actual.value.ty().is_convertible_to(&formal.ty) {
                        problems.push(format!(
                            "wrong type for `{}`: expected '{}', got '{}'",
                            formal.name.node,
                            formal.ty.display(),
                            actual.value.ty().display()
                        ));
                    }
                }
                if !problems.is_empty() {
                    let mut d = Diagnostic::new(
                        Code::CallParameterMismatch,
                        span,
                        format!(
                            "call to {} `{}` does not correspond to signature",
                            callable.kind, callable.name.node
                        ),
                    );
                    d.advice = problems;
                    self.report(d);
                }
                callable.return_type.runtime_value()
            }
        };

        (
            value,
            tree::ExprKind::Call {
                callee: callee.clone(),
                args,
            },
        )
    }

    fn lvalue(&mut self, scope: ScopeId, lv: &ast::Lvalue) -> tree::Expr {
        let meta = Meta {
            scope,
            span: lv.span,
        };
        let (value, kind) = match &lv.kind {
            ast::LvalueKind::VariableReference(name) => {
                let found = self
                    .scopes
                    .lookup_kind(scope, &name.node, SymbolKind::Variable)
                    .map(|symbol| match symbol {
                        Symbol::Constant { value, .. } => value.clone(),
                        other => other
                            .value_type()
                            .map_or_else(|| Value::invalid(EvaluatedType::Unknown(name.span)), EvaluatedType::runtime_value),
                    });
                let value = match found {
                    Ok(value) => value,
                    Err(e) => {
                        self.report_lookup(e, name.span);
                        Value::invalid(EvaluatedType::Unknown(name.span))
                    }
                };
                (value, tree::ExprKind::VariableReference(name.clone()))
            }
            ast::LvalueKind::ArraySubscript { array, index } => {
                let array = self.expr(scope, array);
                let index = self.expr(scope, index);
                let value = self.subscript(lv.span, &array, &index);
                (
                    value,
                    tree::ExprKind::ArraySubscript {
                        array: Box::new(array),
                        index: Box::new(index),
                    },
                )
            }
            ast::LvalueKind::ComponentAccess {
                structure,
                component,
            } => {
                let structure = self.expr(scope, structure);
                let value = self.component_access(lv.span, &structure, component);
                (
                    value,
                    tree::ExprKind::ComponentAccess {
                        structure: Box::new(structure),
                        component: component.clone(),
                    },
                )
            }
        };
        self.inferred.record(lv.id, &value.ty);
        tree::Expr { meta, value, kind }
    }

    fn subscript(&mut self, span: Span, array: &tree::Expr, index: &tree::Expr) -> Value {
        if !index.ty().is_convertible_to(&EvaluatedType::Integer) {
            self.error(
                Code::NonIntegerIndex,
                index.meta.span,
                format!("non integer ('{}') array index", index.ty().display()),
            );
        }
        match array.ty().unaliased() {
            EvaluatedType::Unknown(_) => Value::invalid(array.ty().clone()),
            EvaluatedType::Array { item, length } => match index.value.as_integer() {
                Some(n) => match usize::try_from(n) {
                    Ok(i) if (1..=*length).contains(&i) => array
                        .value
                        .elements()
                        .and_then(|items| items.get(i - 1))
                        .cloned()
                        .unwrap_or_else(|| item.runtime_value()),
                    _ => {
                        self.report(
                            Diagnostic::new(
                                Code::IndexOutOfBounds,
                                index.meta.span,
                                "index out of bounds for array",
                            )
                            .with_advice(format!("indexed at {n}, length is {length}")),
                        );
                        item.invalid_value()
                    }
                },
                None if array.value.is_invalid() || index.value.is_invalid() => item.invalid_value(),
                None => item.runtime_value(),
            },
            _ => {
                self.error(
                    Code::SubscriptOfNonArray,
                    array.meta.span,
                    format!(
                        "subscripted value ('{}') is not an array",
                        array.ty().display()
                    ),
                );
                Value::invalid(EvaluatedType::Unknown(span))
            }
        }
    }

    fn component_access(&mut self, span: Span, structure: &tree::Expr, component: &Ident) -> Value {
        match structure.ty().unaliased() {
            EvaluatedType::Unknown(_) => Value::invalid(structure.ty().clone()),
            EvaluatedType::Structure(components) => {
                match components.iter().find(|(n, _)| *n == component.node) {
                    Some((_, ty)) => structure
                        .value
                        .component(&component.node)
                        .cloned()
                        .unwrap_or_else(|| {
                            if structure.value.is_invalid() {
                                ty.invalid_value()
                            } else {
                                ty.runtime_value()
                            }
                        }),
                    None => {
                        let message = match structure.ty() {
                            EvaluatedType::Alias { .. } => format!(
                                "'{}' has no component named `{}`",
                                structure.ty().display(),
                                component.node
                            ),
                            _ => format!("no component named `{}` in structure", component.node),
                        };
                        self.error(Code::StructureComponentDoesntExist, component.span, message);
                        Value::invalid(EvaluatedType::Unknown(component.span))
                    }
                }
            }
            _ => {
                self.error(
                    Code::ComponentAccessOfNonStruct,
                    span,
                    format!(
                        "request for component `{}` in something ('{}') not a structure",
                        component.node,
                        structure.ty().display()
                    ),
                );
                Value::invalid(EvaluatedType::Unknown(span))
            }
        }
    }

    // Types

    fn evaluate_type(&mut self, scope: ScopeId, t: &ast::TypeExpr) -> EvaluatedType {
        match &t.kind {
            ast::TypeKind::Boolean => EvaluatedType::Boolean,
            ast::TypeKind::Character => EvaluatedType::Character,
            ast::TypeKind::Integer => EvaluatedType::Integer,
            ast::TypeKind::Real => EvaluatedType::Real,
            ast::TypeKind::File => EvaluatedType::File,
            ast::TypeKind::String => EvaluatedType::String,
            ast::TypeKind::LengthedString(len) => match self.comptime_length(scope, len) {
                Some(n) => EvaluatedType::LengthedString(n),
                None => EvaluatedType::Unknown(t.span),
            },
            ast::TypeKind::Alias(name) => {
                match self.scopes.lookup_type_alias(scope, &name.node).cloned() {
                    Ok(target) => EvaluatedType::alias(name.node.clone(), target),
                    Err(e) => {
                        self.report_lookup(e, name.span);
                        EvaluatedType::Unknown(t.span)
                    }
                }
            }
            ast::TypeKind::Array {
                element,
                dimensions,
            } => {
                let item = self.evaluate_type(scope, element);
                let mut lengths = Vec::with_capacity(dimensions.len());
                let mut all_known = true;
                for d in dimensions {
                    match self.comptime_length(scope, d) {
                        Some(n) => lengths.push(n),
                        None => all_known = false,
                    }
                }
                if !all_known {
                    return EvaluatedType::Unknown(t.span);
                }
                // Innermost dimension wraps the element type first.
                lengths
                    .into_iter()
                    .rev()
                    .fold(item, |inner, n| EvaluatedType::array(inner, n))
            }
            ast::TypeKind::Structure(components) => {
                let mut evaluated: Vec<(String, EvaluatedType)> = Vec::new();
                for component in components {
                    let ty = self.evaluate_type(scope, &component.ty);
                    for name in &component.names {
                        if evaluated.iter().any(|(n, _)| *n == name.node) {
                            self.error(
                                Code::StructureDuplicateComponent,
                                name.span,
                                format!("duplicate component `{}` in structure is ignored", name.node),
                            );
                        } else {
                            evaluated.push((name.node.clone(), ty.clone()));
                        }
                    }
                }
                EvaluatedType::Structure(evaluated)
            }
        }
    }

    /// Array dimension or string length: a positive comptime integer.
    fn comptime_length(&mut self, scope: ScopeId, e: &ast::Expr) -> Option<usize> {
        let e = self.expr(scope, e);
        if !self.check_convertible(&e, &EvaluatedType::Integer) {
            return None;
        }
        match e.value.as_integer() {
            Some(n) => match usize::try_from(n) {
                Ok(len) if len > 0 => Some(len),
                _ => {
                    self.error(
                        Code::NonPositiveLength,
                        e.meta.span,
                        format!("length must be positive, got {n}"),
                    );
                    None
                }
            },
            None => {
                if !e.value.is_invalid() {
                    self.constant_expected(e.meta.span);
                }
                None
            }
        }
    }

    // Initializers

    fn initializer(
        &mut self,
        scope: ScopeId,
        init: &ast::Initializer,
        target: &EvaluatedType,
    ) -> tree::Initializer {
        match init {
            ast::Initializer::Expr(e) => {
                let e = self.expr(scope, e);
                self.check_assignable(&e, target);
                tree::Initializer::Expr(e)
            }
            ast::Initializer::Braced(b) => self.braced_initializer(scope, b, target),
        }
    }

    fn braced_initializer(
        &mut self,
        scope: ScopeId,
        b: &ast::BracedInitializer,
        target: &EvaluatedType,
    ) -> tree::Initializer {
        let meta = Meta {
            scope,
            span: b.span,
        };

        if !target.is_aggregate() {
            if !target.is_unknown() {
                self.error(
                    Code::UnsupportedInitializer,
                    b.span,
                    format!("unsupported initializer for type `{}`", target.display()),
                );
            }
            let items = b
                .items
                .iter()
                .map(|entry| match entry {
                    ast::BracedItem::Value(item) => {
                        tree::BracedItem::Value(self.free_item(scope, item))
                    }
                    ast::BracedItem::Directive(d) => {
                        tree::BracedItem::Directive(self.directive(scope, d))
                    }
                })
                .collect();
            return tree::Initializer::Braced {
                meta,
                value: target.invalid_value(),
                items,
            };
        }

        let mut value = target.default_value();
        let mut cursor: Option<InitializerPath> = None;
        let mut items = Vec::with_capacity(b.items.len());

        for entry in &b.items {
            let item = match entry {
                ast::BracedItem::Value(item) => item,
                ast::BracedItem::Directive(d) => {
                    items.push(tree::BracedItem::Directive(self.directive(scope, d)));
                    continue;
                }
            };
            let (designators, path) = if item.designators.is_empty() {
                let next = match &cursor {
                    None => InitializerPath::first_object(target),
                    Some(current) => current.advance(target),
                };
                if next.is_none() {
                    self.error(
                        Code::ExcessElementInInitializer,
                        item.span,
                        "excess element in initializer",
                    );
                }
                (Vec::new(), next)
            } else {
                self.designated_path(scope, target, &item.designators)
            };

            let item_value = match &path {
                Some(path) => {
                    let init = self.initializer(scope, &item.value, path.ty());
                    path.set_value(&mut value, coerce(init.value(), path.ty()));
                    init
                }
                None => self.initializer(scope, &item.value, &EvaluatedType::Unknown(item.span)),
            };
            if path.is_some() {
                cursor = path;
            }

            items.push(tree::BracedItem::Value(tree::InitializerItem {
                meta: Meta {
                    scope,
                    span: item.span,
                },
                designators,
                value: item_value,
            }));
        }

        tree::Initializer::Braced { meta, value, items }
    }

    /// Item of an initializer whose target has no shape to fill.
    fn free_item(&mut self, scope: ScopeId, item: &ast::InitializerItem) -> tree::InitializerItem {
        let designators = item
            .designators
            .iter()
            .map(|d| self.designator(scope, d))
            .collect();
        let value = self.initializer(scope, &item.value, &EvaluatedType::Unknown(item.span));
        tree::InitializerItem {
            meta: Meta {
                scope,
                span: item.span,
            },
            designators,
            value,
        }
    }

    fn designator(&mut self, scope: ScopeId, d: &ast::Designator) -> tree::Designator {
        let meta = Meta {
            scope,
            span: d.span,
        };
        match &d.kind {
            ast::DesignatorKind::Index(e) => tree::Designator::Index {
                meta,
                index: self.expr(scope, e),
            },
            ast::DesignatorKind::Component(name) => tree::Designator::Component {
                meta,
                name: name.clone(),
            },
        }
    }

    /// Resolves a designator chain into a path replacing the cursor. `None`
    /// if any designator fails; every designator is still analyzed.
    fn designated_path(
        &mut self,
        scope: ScopeId,
        target: &EvaluatedType,
        designators: &[ast::Designator],
    ) -> (Vec<tree::Designator>, Option<InitializerPath>) {
        let mut nodes = Vec::with_capacity(designators.len());
        let mut steps = Vec::with_capacity(designators.len());
        let mut current = Some(target.clone());

        for d in designators {
            let node = self.designator(scope, d);
            if let Some(aggregate) = current.take() {
                current = self.resolve_designator(&node, &aggregate).map(|(step, ty)| {
                    steps.push(step);
                    ty
                });
            }
            nodes.push(node);
        }

        let path = current.and_then(|leaf| InitializerPath::from_steps(steps, leaf));
        (nodes, path)
    }

    fn resolve_designator(
        &mut self,
        node: &tree::Designator,
        aggregate: &EvaluatedType,
    ) -> Option<(PathStep, EvaluatedType)> {
        if aggregate.is_unknown() {
            return None;
        }
        let (span, resolved) = match node {
            tree::Designator::Index { meta, index } => {
                if !index.ty().is_convertible_to(&EvaluatedType::Integer) {
                    self.error(
                        Code::NonIntegerIndex,
                        index.meta.span,
                        format!("non integer ('{}') array index", index.ty().display()),
                    );
                    return None;
                }
                let Some(n) = index.value.as_integer() else {
                    if !index.value.is_invalid() {
                        self.constant_expected(index.meta.span);
                    }
                    return None;
                };
                (meta.span, initializer::index_step(aggregate, n))
            }
            tree::Designator::Component { meta, name } => {
                let resolved = initializer::component_step(aggregate, &name.node);
                if matches!(resolved, Err(DesignatorError::NoSuchComponent)) {
                    self.error(
                        Code::StructureComponentDoesntExist,
                        name.span,
                        format!("no component named `{}` in structure", name.node),
                    );
                    return None;
                }
                (meta.span, resolved)
            }
        };

        match resolved {
            Ok((step, ty)) => Some((step, ty.clone())),
            Err(DesignatorError::IndexOutOfBounds { index, length }) => {
                self.report(
                    Diagnostic::new(Code::IndexOutOfBounds, span, "index out of bounds for array")
                        .with_advice(format!("indexed at {index}, length is {length}")),
                );
                None
            }
            Err(DesignatorError::NoSuchComponent | DesignatorError::WrongAggregate) => {
                self.error(
                    Code::UnsupportedDesignator,
                    span,
                    format!("unsupported designator in '{}' initializer", aggregate.display()),
                );
                None
            }
        }
    }
}
