//! Parse report: non-fatal diagnostics collected while building a design.
//!
//! Parsers never abort on recoverable problems (duplicate reference
//! designators, dangling net connections, unknown block markers). They record
//! a [`Diagnostic`] here and keep going; callers inspect the report alongside
//! the resulting design.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Where in the input a diagnostic was raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub line: Option<usize>,
    pub offset: Option<usize>,
}

impl Location {
    pub fn line(line: usize) -> Self {
        Location {
            line: Some(line),
            offset: None,
        }
    }

    pub fn offset(offset: usize) -> Self {
        Location {
            line: None,
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.offset) {
            (Some(line), _) => write!(f, "line {}", line),
            (None, Some(offset)) => write!(f, "byte {}", offset),
            (None, None) => write!(f, "unknown location"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {} ({})", self.severity, self.message, loc),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Accumulator for diagnostics raised while parsing one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>, location: Option<Location>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location,
        });
    }

    pub fn error(&mut self, message: impl Into<String>, location: Option<Location>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            location,
        });
    }

    pub fn extend(&mut self, other: ParseReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_accumulates() {
        let mut report = ParseReport::new();
        report.warn("dangling reference", Some(Location::line(12)));
        report.error("duplicate reference R1", None);

        assert_eq!(report.len(), 2);
        assert!(report.has_errors());
        assert_eq!(report.warnings().count(), 1);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            severity: Severity::Warning,
            message: "unknown block $Bitmap".to_string(),
            location: Some(Location::line(42)),
        };
        assert_eq!(d.to_string(), "warning: unknown block $Bitmap (line 42)");
    }
}
