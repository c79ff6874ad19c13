//! Driving every operation of a collection against the live API.
//!
//! Operations run one at a time in [`EndpointCollection::iter_operations`]
//! order. Each ends up passed, failed or skipped; per-operation errors are
//! recorded in the report and never stop the run.

use std::fmt;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::client::ApiClient;
use crate::endpoints::EndpointCollection;
use crate::operation::OperationTemplate;
use crate::types::Method;
use crate::validator::{check_response, ValidationLevel};
use crate::values::{values_for, Fixtures};

/// Options for a run.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub level: ValidationLevel,
    /// Also send optional parameters (synthesized when no fixture is given).
    pub include_optional: bool,
    pub fixtures: Fixtures,
}

impl DriverOptions {
    /// Status-only checks, required parameters only, no fixtures.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    pub fn include_optional(mut self, include_optional: bool) -> Self {
        self.include_optional = include_optional;
        self
    }

    pub fn fixtures(mut self, fixtures: Fixtures) -> Self {
        self.fixtures = fixtures;
        self
    }
}

/// Terminal state of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

/// Result of exercising one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    pub method: Method,
    pub path: String,
    /// Status code received, if a request was sent and answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregated results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<OperationReport>,
}

impl TestReport {
    /// Returns true if no operation failed.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    fn record(&mut self, report: OperationReport) {
        match report.outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
        self.results.push(report);
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            let status = r.status.map(|s| format!(" [{}]", s)).unwrap_or_default();
            match &r.outcome {
                Outcome::Passed => writeln!(f, "  PASS {} {}{}", r.method, r.path, status)?,
                Outcome::Failed(reason) => {
                    writeln!(f, "  FAIL {} {}{}: {}", r.method, r.path, status, reason)?
                }
                Outcome::Skipped(reason) => writeln!(f, "  SKIP {} {}: {}", r.method, r.path, reason)?,
            }
        }
        write!(
            f,
            "{} operations: {} passed, {} failed, {} skipped",
            self.total(),
            self.passed,
            self.failed,
            self.skipped
        )
    }
}

/// Exercises operation templates and records outcomes.
#[derive(Debug, Clone, Default)]
pub struct Driver {
    options: DriverOptions,
}

impl Driver {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Run every operation of `endpoints` through `client`.
    pub fn run(&self, endpoints: &EndpointCollection, client: &ApiClient) -> TestReport {
        let mut report = TestReport::default();
        for operation in endpoints.iter_operations() {
            report.record(self.run_operation(operation, client));
        }
        info!(
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "run finished"
        );
        report
    }

    /// Exercise a single operation.
    pub fn run_operation(&self, operation: &OperationTemplate, client: &ApiClient) -> OperationReport {
        let span = info_span!("operation", method = %operation.method(), path = operation.path());
        let _guard = span.enter();

        let mut report = OperationReport {
            method: operation.method(),
            path: operation.path().to_string(),
            status: None,
            outcome: Outcome::Passed,
        };

        if !operation.unsupported_required().is_empty() {
            report.outcome = Outcome::Skipped(format!(
                "unsupported required parameter(s): {}",
                operation.unsupported_required().join(", ")
            ));
            info!("skipped: unsupported required parameters");
            return report;
        }
        if operation.responses().is_empty() {
            report.outcome = Outcome::Skipped("no declared responses".to_string());
            info!("skipped: no declared responses");
            return report;
        }

        let values = values_for(operation, &self.options.fixtures, self.options.include_optional);
        info!("executing");
        let result = match client.request(operation, &values) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "request failed");
                report.outcome = Outcome::Failed(e.to_string());
                return report;
            }
        };
        report.status = Some(result.status);

        if let Err(e) = check_response(client.document(), operation, &result, self.options.level) {
            warn!(error = %e, "response mismatch");
            report.outcome = Outcome::Failed(e.to_string());
        } else {
            info!(status = result.status, "passed");
        }
        report
    }
}
