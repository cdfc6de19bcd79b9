#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;

use miette::{LabeledSpan, SourceSpan};
use psdc_ast::Span;
use thiserror::Error;

/// Diagnostic code.
///
/// Numeric values are stable. The thousands digit selects the severity:
/// errors occupy `0..1000`, warnings `1000..2000`, hints `2000..3000` and
/// debug messages `3000..4000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Code {
    UndefinedSymbol = 0,
    RedefinedSymbol = 1,
    RedefinedMainProgram = 2,
    SignatureMismatch = 3,
    CallableNotDefined = 4,
    ConstantAssignment = 5,
    CallParameterMismatch = 6,
    ConstantExpressionExpected = 7,
    StructureDuplicateComponent = 8,
    StructureComponentDoesntExist = 9,
    ComponentAccessOfNonStruct = 10,
    SubscriptOfNonArray = 11,
    UnsupportedOperation = 12,
    ExpressionHasWrongType = 13,
    NonIntegerIndex = 14,
    IndexOutOfBounds = 15,
    ExcessElementInInitializer = 16,
    UnsupportedInitializer = 17,
    UnsupportedDesignator = 18,
    ReturnInNonReturnable = 19,
    ReturnExpectsValue = 20,
    CannotSwitchOnString = 21,
    SwitchDefaultIsNotLast = 22,
    InvalidCast = 23,
    AssertionFailed = 24,
    NonPositiveLength = 25,

    DivisionByZero = 1000,
    FloatingPointEquality = 1001,

    UnofficialFeature = 2000,
    RedundantCast = 2001,
    ExpressionValueUnused = 2002,

    EvaluateExpression = 3000,
    EvaluateType = 3001,
}

impl Code {
    pub fn number(self) -> u16 {
        self as u16
    }

    pub fn severity(self) -> Severity {
        match self.number() / 1000 {
            0 => Severity::Error,
            1 => Severity::Warning,
            2 => Severity::Hint,
            _ => Severity::Debug,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Code::UndefinedSymbol => "undefined-symbol",
            Code::RedefinedSymbol => "redefined-symbol",
            Code::RedefinedMainProgram => "redefined-main-program",
            Code::SignatureMismatch => "signature-mismatch",
            Code::CallableNotDefined => "callable-not-defined",
            Code::ConstantAssignment => "constant-assignment",
            Code::CallParameterMismatch => "call-parameter-mismatch",
            Code::ConstantExpressionExpected => "constant-expression-expected",
            Code::StructureDuplicateComponent => "structure-duplicate-component",
            Code::StructureComponentDoesntExist => "structure-component-doesnt-exist",
            Code::ComponentAccessOfNonStruct => "component-access-of-non-struct",
            Code::SubscriptOfNonArray => "subscript-of-non-array",
            Code::UnsupportedOperation => "unsupported-operation",
            Code::ExpressionHasWrongType => "expression-has-wrong-type",
            Code::NonIntegerIndex => "non-integer-index",
            Code::IndexOutOfBounds => "index-out-of-bounds",
            Code::ExcessElementInInitializer => "excess-element-in-initializer",
            Code::UnsupportedInitializer => "unsupported-initializer",
            Code::UnsupportedDesignator => "unsupported-designator",
            Code::ReturnInNonReturnable => "return-in-non-returnable",
            Code::ReturnExpectsValue => "return-expects-value",
            Code::CannotSwitchOnString => "cannot-switch-on-string",
            Code::SwitchDefaultIsNotLast => "switch-default-is-not-last",
            Code::InvalidCast => "invalid-cast",
            Code::AssertionFailed => "assertion-failed",
            Code::NonPositiveLength => "non-positive-length",
            Code::DivisionByZero => "division-by-zero",
            Code::FloatingPointEquality => "floating-point-equality",
            Code::UnofficialFeature => "unofficial-feature",
            Code::RedundantCast => "redundant-cast",
            Code::ExpressionValueUnused => "expression-value-unused",
            Code::EvaluateExpression => "evaluate-expression",
            Code::EvaluateType => "evaluate-type",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:04}", self.number())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Hint,
    Debug,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
            Severity::Debug => "debug",
        }
    }
}

/// A message produced by semantic analysis.
///
/// Renders through miette: the code becomes `psdc::<name>`, advice strings
/// become the help text and the span is the primary label.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub code: Code,
    pub message: String,
    pub advice: Vec<String>,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: Code, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            advice: Vec::new(),
            span,
        }
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice.push(advice.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("psdc::{}", self.code.name())))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.code.severity() {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Hint | Severity::Debug => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if self.advice.is_empty() {
            None
        } else {
            Some(Box::new(self.advice.join("\n")))
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span: SourceSpan = self.span;
        Some(Box::new(std::iter::once(LabeledSpan::underline(span))))
    }
}

/// Append-only destination for diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Drops diagnostics whose code is in `suppressed`, forwards the rest and
/// tallies what it forwarded.
pub struct FilterSink<'a> {
    inner: &'a mut dyn DiagnosticSink,
    suppressed: &'a BTreeSet<Code>,
    counts: SeverityCounts,
}

impl<'a> FilterSink<'a> {
    pub fn new(inner: &'a mut dyn DiagnosticSink, suppressed: &'a BTreeSet<Code>) -> Self {
        Self {
            inner,
            suppressed,
            counts: SeverityCounts::default(),
        }
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }
}

impl DiagnosticSink for FilterSink<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.suppressed.contains(&diagnostic.code) {
            self.counts.add(diagnostic.severity());
            self.inner.report(diagnostic);
        }
    }
}

/// Per-severity tally of a diagnostic list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub hints: usize,
    pub debug: usize,
}

impl SeverityCounts {
    pub fn of<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        let mut counts = Self::default();
        for d in diagnostics {
            counts.add(d.severity());
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Hint => self.hints += 1,
            Severity::Debug => self.debug += 1,
        }
    }
}
