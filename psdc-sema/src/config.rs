#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::diagnostics::Code;

/// Analysis options.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Hint when a program relies on language features outside the official
    /// pseudocode (casts, compiler directives, scalar initializers).
    pub report_unofficial_features: bool,
    /// Emit the debug messages requested by `#eval` directives.
    pub report_debug: bool,
    /// Hint on local variables of scalar type declared with an initializer.
    pub hint_scalar_initializers: bool,
    /// Codes never forwarded to the caller's sink.
    pub suppressed: BTreeSet<Code>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            report_unofficial_features: true,
            report_debug: true,
            hint_scalar_initializers: true,
            suppressed: BTreeSet::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Only errors and warnings.
    pub fn quiet() -> Self {
        Self {
            report_unofficial_features: false,
            report_debug: false,
            hint_scalar_initializers: false,
            suppressed: [
                Code::RedundantCast,
                Code::ExpressionValueUnused,
                Code::UnofficialFeature,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn suppress(mut self, code: Code) -> Self {
        self.suppressed.insert(code);
        self
    }
}
