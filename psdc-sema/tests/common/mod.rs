#![allow(dead_code)]

pub mod builders;

use psdc_ast::Algorithm;
use psdc_sema::{Analysis, AnalyzerConfig, Code, Diagnostic};

pub fn run(algorithm: &Algorithm) -> (Analysis, Vec<Diagnostic>) {
    run_with(algorithm, &AnalyzerConfig::default())
}

pub fn run_with(algorithm: &Algorithm, config: &AnalyzerConfig) -> (Analysis, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let analysis = psdc_sema::analyze_with_config(algorithm, config, &mut diagnostics);
    (analysis, diagnostics)
}

/// Errors and warnings only, so tests are not coupled to hints.
pub fn run_quiet(algorithm: &Algorithm) -> (Analysis, Vec<Diagnostic>) {
    run_with(algorithm, &AnalyzerConfig::quiet())
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<Code> {
    diagnostics.iter().map(|d| d.code).collect()
}

pub fn find(diagnostics: &[Diagnostic], code: Code) -> &Diagnostic {
    diagnostics
        .iter()
        .find(|d| d.code == code)
        .unwrap_or_else(|| panic!("no {code} among {:?}", codes(diagnostics)))
}
