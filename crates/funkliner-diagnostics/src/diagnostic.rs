//! Diagnostics produced while parsing and inlining.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Something was left untouched; usually expected
    Hint,
    /// The output is valid but may not behave like the input
    Warning,
    /// No output could be produced
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes, grouped by category letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse (P)
    /// Library or snippet failed to parse
    ParseError,

    // Unsupported shapes (U)
    /// Expression cannot be turned into a dotted path
    UnsupportedPath,
    /// Statement copied without substituting inside it
    UnsupportedStatement,

    // Resolution (R)
    /// Callee has no callable binding in the environment
    UnresolvedCallee,
    /// A call argument has no usable source text
    UnresolvedArgument,

    // Arguments (A)
    /// Call passes more arguments than the callee declares
    ExtraArguments,

    // Limits (L)
    /// Loop would unroll into too many copies
    UnrollLimit,
    /// Per-pass expansion budget exhausted
    ExpansionLimit,

    // Internal (I)
    InternalError,
}

impl DiagnosticCode {
    /// Every known code, in display order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::ParseError,
        Self::UnsupportedPath,
        Self::UnsupportedStatement,
        Self::UnresolvedCallee,
        Self::UnresolvedArgument,
        Self::ExtraArguments,
        Self::UnrollLimit,
        Self::ExpansionLimit,
        Self::InternalError,
    ];

    /// Get the code string (e.g., "R001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::UnsupportedPath => "U001",
            Self::UnsupportedStatement => "U002",
            Self::UnresolvedCallee => "R001",
            Self::UnresolvedArgument => "R002",
            Self::ExtraArguments => "A001",
            Self::UnrollLimit => "L001",
            Self::ExpansionLimit => "L002",
            Self::InternalError => "I001",
        }
    }

    /// Look a code up by its string form, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError | Self::InternalError => Severity::Error,

            Self::ExtraArguments | Self::UnrollLimit | Self::ExpansionLimit => Severity::Warning,

            Self::UnsupportedPath
            | Self::UnsupportedStatement
            | Self::UnresolvedCallee
            | Self::UnresolvedArgument => Severity::Hint,
        }
    }

    /// Short title used by `funkliner explain`.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ParseError => "Parse Error",
            Self::UnsupportedPath => "Unsupported Path Shape",
            Self::UnsupportedStatement => "Statement Copied Verbatim",
            Self::UnresolvedCallee => "Unresolved Callee",
            Self::UnresolvedArgument => "Unresolvable Argument",
            Self::ExtraArguments => "Extra Arguments Dropped",
            Self::UnrollLimit => "Unroll Limit Reached",
            Self::ExpansionLimit => "Expansion Limit Reached",
            Self::InternalError => "Internal Error",
        }
    }

    /// Longer description used by `funkliner explain`.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ParseError => {
                "The library or the snippet is not valid JavaScript. Nothing is rewritten."
            }
            Self::UnsupportedPath => {
                "Only identifiers, `this`, member and index access, numeric literals, \
                 increments and `%` can name a value. Calls through any other expression \
                 are left as written."
            }
            Self::UnsupportedStatement => {
                "The statement was copied into the inlined body without substituting \
                 parameters inside it (for example a nested function declaration)."
            }
            Self::UnresolvedCallee => {
                "No function is known at the callee's path, so the call is left as written."
            }
            Self::UnresolvedArgument => {
                "An argument is neither a literal nor a path. Inlining it could duplicate or \
                 reorder its side effects, so the call is left as written."
            }
            Self::ExtraArguments => {
                "The call passes more arguments than the function declares. The extra \
                 arguments are dropped from the inlined output, together with any side \
                 effects they had."
            }
            Self::UnrollLimit => {
                "The loop would need at least as many copies as the unroll limit allows, so \
                 it is left unchanged."
            }
            Self::ExpansionLimit => {
                "The pass already inlined as many calls as the expansion limit allows. \
                 Remaining calls are left as written; this also stops recursive functions \
                 from expanding forever."
            }
            Self::InternalError => "The rewriter reached a state it should not be in.",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported condition.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Optional help line
    pub explanation: Option<String>,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                explanation: None,
                span: Span::DUMMY,
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.explanation = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    /// Count diagnostics carrying `code`.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    /// Keep only diagnostics at or above `severity`.
    pub fn retain_at_least(&mut self, severity: Severity) {
        self.items.retain(|d| d.severity >= severity);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in DiagnosticCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate {}", code);
        }
    }

    #[test]
    fn test_from_code() {
        assert_eq!(
            DiagnosticCode::from_code("r001"),
            Some(DiagnosticCode::UnresolvedCallee)
        );
        assert_eq!(DiagnosticCode::from_code("X999"), None);
    }

    #[test]
    fn test_retain_at_least() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(DiagnosticCode::UnresolvedCallee, "alert").build());
        diags.push(Diagnostic::new(DiagnosticCode::UnrollLimit, "loop").build());
        diags.push(Diagnostic::new(DiagnosticCode::ParseError, "bad").build());
        assert_eq!(diags.hint_count(), 1);

        diags.retain_at_least(Severity::Warning);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count_code(DiagnosticCode::UnrollLimit), 1);
        assert!(diags.has_errors());
    }
}
