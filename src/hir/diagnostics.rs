//! Diagnostics: error reporting for every pipeline phase.
//!
//! Syntax, semantic and resolution passes each produce their own list of
//! [`Diagnostic`]s. [`aggregate`] merges them into the stable, sorted report
//! a document publishes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::base::{FileId, LineCol, LineIndex, TextRange};
use crate::parser::SyntaxError;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
        }
    }

    /// Sort rank: errors first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

/// The pipeline stage that produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Syntax,
    Semantic,
    Resolution,
    Internal,
}

impl Phase {
    pub fn order(&self) -> u8 {
        match self {
            Phase::Syntax => 0,
            Phase::Semantic => 1,
            Phase::Resolution => 2,
            Phase::Internal => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Syntax => "syntax",
            Phase::Semantic => "semantic",
            Phase::Resolution => "resolution",
            Phase::Internal => "internal",
        })
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: TextRange,
    /// Start position; filled in by [`Diagnostic::located`].
    pub start: LineCol,
    /// End position; filled in by [`Diagnostic::located`].
    pub end: LineCol,
    pub severity: Severity,
    pub phase: Phase,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub file: FileId,
    pub range: TextRange,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        phase: Phase,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            range,
            start: LineCol::default(),
            end: LineCol::default(),
            severity,
            phase,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(phase: Phase, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, phase, range, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(phase: Phase, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, phase, range, message)
    }

    pub fn info(phase: Phase, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Info, phase, range, message)
    }

    /// The single report left when analysis of a document fails.
    pub fn internal(range: TextRange, message: &str) -> Self {
        Self::error(
            Phase::Internal,
            range,
            format!("internal error while analyzing document: {message}"),
        )
        .with_code(codes::INTERNAL_FAULT)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    /// Fill in line/column positions from the document's line index.
    pub fn located(mut self, line_index: &LineIndex) -> Self {
        let (start, end) = line_index.range(self.range);
        self.start = start;
        self.end = end;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn sort_key_cmp(&self, other: &Self) -> Ordering {
        self.range
            .start()
            .cmp(&other.range.start())
            .then_with(|| self.severity.rank().cmp(&other.severity.rank()))
            .then_with(|| self.phase.order().cmp(&other.phase.order()))
            .then_with(|| self.range.end().cmp(&other.range.end()))
            .then_with(|| self.code.cmp(&other.code))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(error: &SyntaxError) -> Self {
        Diagnostic::error(Phase::Syntax, error.range, error.message.as_str())
            .with_code(codes::SYNTAX_ERROR)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        match &self.code {
            Some(code) => write!(f, "{}: {level}[{code}]: {}", self.start, self.message),
            None => write!(f, "{}: {level}: {}", self.start, self.message),
        }
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Standard diagnostic codes.
pub mod codes {
    /// Malformed syntax.
    pub const SYNTAX_ERROR: &str = "S0001";
    /// Undefined reference (name not found).
    pub const UNDEFINED_REFERENCE: &str = "E0001";
    /// Several imports make different declarations visible.
    pub const AMBIGUOUS_IMPORT: &str = "E0002";
    /// Reference resolved to the wrong kind of declaration.
    pub const TYPE_MISMATCH: &str = "E0003";
    /// Duplicate definition.
    pub const DUPLICATE_DEFINITION: &str = "E0004";
    /// Two parameters of one operation share a name.
    pub const DUPLICATE_PARAMETER: &str = "E0005";

    /// Naming convention violation.
    pub const NAMING_CONVENTION: &str = "W0003";

    /// Service declares no operations.
    pub const EMPTY_SERVICE: &str = "I0001";

    /// The analysis pipeline failed on this document.
    pub const INTERNAL_FAULT: &str = "E9000";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during semantic analysis.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Report a duplicate definition on the shadowed declaration.
    pub fn duplicate_definition(
        &mut self,
        name_range: TextRange,
        qualified_name: &str,
        winner_file: FileId,
        winner_range: TextRange,
    ) {
        self.add(
            Diagnostic::error(
                Phase::Semantic,
                name_range,
                format!("duplicate definition: '{qualified_name}' is declared again later"),
            )
            .with_code(codes::DUPLICATE_DEFINITION)
            .with_related(RelatedInfo {
                file: winner_file,
                range: winner_range,
                message: Arc::from(format!("later definition of '{qualified_name}'")),
            }),
        );
    }

    pub fn duplicate_parameter(&mut self, range: TextRange, name: &str, operation: &str) {
        self.add(
            Diagnostic::error(
                Phase::Semantic,
                range,
                format!("duplicate parameter '{name}' in operation '{operation}'"),
            )
            .with_code(codes::DUPLICATE_PARAMETER),
        );
    }

    pub fn naming_convention(&mut self, range: TextRange, kind: &str, name: &str) {
        self.add(
            Diagnostic::warning(
                Phase::Semantic,
                range,
                format!("{kind} name '{name}' should start with an uppercase letter"),
            )
            .with_code(codes::NAMING_CONVENTION),
        );
    }

    pub fn empty_service(&mut self, range: TextRange, name: &str) {
        self.add(
            Diagnostic::info(
                Phase::Semantic,
                range,
                format!("service '{name}' declares no operations"),
            )
            .with_code(codes::EMPTY_SERVICE),
        );
    }

    pub fn undefined_reference(&mut self, range: TextRange, path: &str) {
        self.add(
            Diagnostic::error(
                Phase::Resolution,
                range,
                format!("undefined reference: '{path}'"),
            )
            .with_code(codes::UNDEFINED_REFERENCE),
        );
    }

    pub fn ambiguous_import(&mut self, range: TextRange, path: &str, candidates: &[&str]) {
        self.add(
            Diagnostic::error(
                Phase::Resolution,
                range,
                format!(
                    "ambiguous reference: '{path}' could be: {}",
                    candidates.join(", ")
                ),
            )
            .with_code(codes::AMBIGUOUS_IMPORT),
        );
    }

    pub fn type_mismatch(&mut self, range: TextRange, path: &str, expected: &str, found: &str) {
        self.add(
            Diagnostic::error(
                Phase::Resolution,
                range,
                format!("type mismatch: '{path}' refers to {found}, expected {expected}"),
            )
            .with_code(codes::TYPE_MISMATCH),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Merge per-phase diagnostic lists into one sorted report.
///
/// Ordering is by start offset, severity, phase, end offset, code and
/// message, so the result depends only on the set of inputs. Exact
/// duplicates are collapsed.
pub fn aggregate<'a, I>(parts: I, line_index: &LineIndex) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = &'a [Diagnostic]>,
{
    let mut all: Vec<Diagnostic> = parts
        .into_iter()
        .flatten()
        .map(|d| d.clone().located(line_index))
        .collect();
    all.sort_by(Diagnostic::sort_key_cmp);
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_diagnostic_with_code() {
        let diag = Diagnostic::error(Phase::Resolution, range(0, 1), "test")
            .with_code(codes::UNDEFINED_REFERENCE);
        assert_eq!(diag.code.as_deref(), Some("E0001"));
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Warning.to_lsp(), 2);
        assert_eq!(Severity::Info.to_lsp(), 3);
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.undefined_reference(range(0, 1), "A");
        collector.undefined_reference(range(2, 3), "B");
        collector.naming_convention(range(4, 5), "type", "t");

        assert_eq!(collector.error_count(), 2);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.take().len(), 3);
        assert!(collector.diagnostics().is_empty());
    }

    #[test]
    fn test_from_syntax_error() {
        let error = SyntaxError::new("expected `}`", range(3, 4));
        let diag = Diagnostic::from(&error);
        assert_eq!(diag.phase, Phase::Syntax);
        assert_eq!(diag.range, range(3, 4));
        assert_eq!(diag.code.as_deref(), Some(codes::SYNTAX_ERROR));
    }

    #[test]
    fn test_aggregate_sort_order() {
        let text = "ab\ncd\nef";
        let index = LineIndex::new(text);

        let syntax = vec![Diagnostic::error(Phase::Syntax, range(3, 4), "syntax")];
        let semantic = vec![
            Diagnostic::info(Phase::Semantic, range(0, 2), "info"),
            Diagnostic::error(Phase::Semantic, range(3, 5), "semantic"),
        ];
        let resolution = vec![Diagnostic::warning(Phase::Resolution, range(0, 1), "warn")];

        let result = aggregate(
            [&syntax[..], &semantic[..], &resolution[..]],
            &index,
        );
        let messages: Vec<_> = result.iter().map(|d| d.message.as_ref()).collect();
        assert_eq!(messages, vec!["warn", "info", "syntax", "semantic"]);

        assert_eq!(result[2].start, LineCol { line: 1, col: 0 });
        assert_eq!(result[3].end, LineCol { line: 1, col: 2 });
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let index = LineIndex::new("service A {}");
        let parts = vec![
            Diagnostic::warning(Phase::Semantic, range(8, 9), "b"),
            Diagnostic::error(Phase::Syntax, range(0, 7), "a"),
            Diagnostic::error(Phase::Syntax, range(0, 7), "a"),
        ];
        let first = aggregate([&parts[..]], &index);
        let second = aggregate([&first[..]], &index);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
