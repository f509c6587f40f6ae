//! Structured diagnostics for analysis failures.
//!
//! Every failure mode in the analysis is reported as a structured diagnostic
//! recorded against the declaration being analyzed. Diagnostics never abort
//! the run; the single exception is `InconsistentGraph`, which signals a
//! precondition violation from the external parser and is fatal.

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// The closed set of analysis failure kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Name lookup found no declaration.
    NameNotFound,
    /// Name lookup found more than one non-overloadable declaration.
    AmbiguousName,
    /// A type was used in a way that requires its definition, but only
    /// forward declarations were observed.
    IncompleteType,
    /// Two or more overload candidates with no strict ordering.
    AmbiguousOverload,
    /// No overload candidate is viable for the call site.
    NoViableOverload,
    /// A default-argument expression has observable side effects and cannot
    /// be pre-evaluated safely.
    NotFoldable,
    /// A template parameter could not be determined from the arguments.
    DeductionFailure,
    /// Two unrelated base classes declare the same member name.
    InheritedNameAmbiguous,
    /// A deprecated declaration was selected or exposed.
    Deprecated,
    /// The input graph violates its own invariants. Fatal.
    InconsistentGraph,
}

impl DiagnosticKind {
    /// Fatal diagnostics abort the whole run; everything else is local to
    /// one declaration.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InconsistentGraph)
    }

    pub const fn default_severity(self) -> Severity {
        match self {
            Self::Deprecated => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameNotFound => "NameNotFound",
            Self::AmbiguousName => "AmbiguousName",
            Self::IncompleteType => "IncompleteType",
            Self::AmbiguousOverload => "AmbiguousOverload",
            Self::NoViableOverload => "NoViableOverload",
            Self::NotFoldable => "NotFoldable",
            Self::DeductionFailure => "DeductionFailure",
            Self::InheritedNameAmbiguous => "InheritedNameAmbiguous",
            Self::Deprecated => "Deprecated",
            Self::InconsistentGraph => "InconsistentGraph",
        }
    }
}

/// A single diagnostic: kind, offending declaration, human-readable
/// explanation, optional source location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Qualified name of the declaration the diagnostic is recorded against.
    pub subject: String,
    pub message: String,
    /// Pre-rendered "file:line" when the location is known.
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}: {} [{}] {}",
                loc,
                self.subject,
                self.kind.as_str(),
                self.message
            ),
            None => write!(f, "{} [{}] {}", self.subject, self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}
