#![forbid(unsafe_code)]

mod config;
mod diagnostics;
mod error;
mod scope;
mod sema;
mod symbol;
mod types;
mod value;
pub mod fold;
pub mod initializer;
pub mod tree;

use rayon::prelude::*;

pub use config::AnalyzerConfig;
pub use diagnostics::{Code, Diagnostic, DiagnosticSink, FilterSink, Severity, SeverityCounts};
pub use error::{DeclareError, LookupError};
pub use scope::{ScopeArena, ScopeId};
pub use sema::{Analysis, Analyzer, InferredTypes};
pub use symbol::{Callable, CallableParameter, CallableState, Symbol, SymbolKind};
pub use types::EvaluatedType;
pub use value::{Comptime, ComptimeArray, Value, ValueStatus};

/// Analyzes `algorithm` with the default configuration.
pub fn analyze(algorithm: &psdc_ast::Algorithm, sink: &mut dyn DiagnosticSink) -> Analysis {
    analyze_with_config(algorithm, &AnalyzerConfig::default(), sink)
}

pub fn analyze_with_config(
    algorithm: &psdc_ast::Algorithm,
    config: &AnalyzerConfig,
    sink: &mut dyn DiagnosticSink,
) -> Analysis {
    Analyzer::new(config, sink).analyze(algorithm)
}

/// Analyzes independent algorithms in parallel. Results are in input order,
/// each with its own diagnostics.
#[tracing::instrument(skip_all, fields(programs = algorithms.len()))]
pub fn analyze_many(
    algorithms: &[psdc_ast::Algorithm],
    config: &AnalyzerConfig,
) -> Vec<(Analysis, Vec<Diagnostic>)> {
    algorithms
        .par_iter()
        .map(|algorithm| {
            let mut diagnostics = Vec::new();
            let analysis = analyze_with_config(algorithm, config, &mut diagnostics);
            (analysis, diagnostics)
        })
        .collect()
}
