//! Structured diagnostics raised while building the operation model.
//!
//! Codes:
//! - `W001` parameter needs a body or nested schema
//! - `W002` file upload parameter
//! - `W003` parameter definition is invalid
//! - `W004` parameter `$ref` cannot be resolved

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Parameter (or other element) the diagnostic is about.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: &'static str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]: {}: {}", level, self.code, self.subject, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_subject() {
        let diag = Diagnostic::warning("W001", "payload", "unsupported schema parameter");
        assert_eq!(
            diag.to_string(),
            "warning[W001]: payload: unsupported schema parameter"
        );
    }
}
