//! Diagnostics returned by every lifecycle operation.
//!
//! Operations never fail with `Err`: problems are collected here so the
//! caller sees every validation error at once and can tell warnings from
//! errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Operation did not achieve its goal.
    Error,
    /// Operation succeeded, but something needs attention.
    Warning,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Declared configuration is invalid; nothing was sent to Metabase.
    Validation,
    /// A remote call failed.
    Transport,
    /// A resource was created but a follow-up call failed.
    PartialFailure,
    /// The database engine is not on the known list.
    UnrecognizedEngine,
    /// A value could not be encoded or decoded.
    Serialization,
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Category
    pub kind: DiagnosticKind,
    /// One-line summary
    pub summary: String,
    /// Longer explanation
    pub detail: String,
    /// Attribute the diagnostic is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error.
    pub fn error(kind: DiagnosticKind, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Create a warning.
    pub fn warning(
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Attach the attribute this diagnostic is about.
    pub fn at(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}", self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " ({attribute})")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// An ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append an error.
    pub fn add_error(
        &mut self,
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::error(kind, summary, detail));
    }

    /// Append a warning.
    pub fn add_warning(
        &mut self,
        kind: DiagnosticKind,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(kind, summary, detail));
    }

    /// Append a transport error for a failed remote call.
    pub fn add_transport_error(&mut self, summary: impl Into<String>, err: &metabase_api::Error) {
        self.add_error(
            DiagnosticKind::Transport,
            summary,
            format!("An unexpected error occurred: {err}"),
        );
    }

    /// Append every diagnostic from `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Whether any diagnostic is an error.
    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.0.len() - self.error_count()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_error());

        diags.add_warning(DiagnosticKind::UnrecognizedEngine, "w", "");
        assert!(!diags.has_error());
        assert_eq!(diags.warning_count(), 1);

        diags.add_error(DiagnosticKind::Validation, "e", "detail");
        assert!(diags.has_error());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_transport_error_keeps_cause() {
        let mut diags = Diagnostics::new();
        diags.add_transport_error(
            "Failed to get user with ID 3",
            &metabase_api::Error::status(500, "boom"),
        );
        let d = diags.iter().next().unwrap();
        assert_eq!(d.kind, DiagnosticKind::Transport);
        assert!(d.detail.contains("boom"));
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::error(DiagnosticKind::Validation, "Must not be empty string", "")
            .at("email");
        assert_eq!(d.to_string(), "error: Must not be empty string (email)");
    }

    #[test]
    fn test_extend_and_filter() {
        let mut a = Diagnostics::new();
        a.add_error(DiagnosticKind::Validation, "a", "");
        let mut b = Diagnostics::new();
        b.add_warning(DiagnosticKind::PartialFailure, "b", "");
        a.extend(b);
        assert_eq!(a.of_kind(DiagnosticKind::PartialFailure).count(), 1);
    }
}
