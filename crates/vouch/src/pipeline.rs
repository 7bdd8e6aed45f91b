//! The failure pipeline: obfuscate, then log, then build the caller's error.
//!
//! # Example
//!
//! ```rust,ignore
//! use vouch::pipeline::{LogFormat, Pipeline, RedactValues, TracingLogger};
//!
//! let pipeline = Pipeline::new()
//!     .obfuscator(RedactValues)
//!     .logger(TracingLogger::new().format(LogFormat::Json));
//! ```

use crate::error::{ErrorTree, HookError, Rejected};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What the obfuscator receives and returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub errors: ErrorTree,
}

/// Rewrites a failure report before it is logged or surfaced.
pub trait Obfuscator: Send + Sync {
    fn obfuscate(&self, report: Report) -> Result<Report, HookError>;
}

impl<F> Obfuscator for F
where
    F: Fn(Report) -> Result<Report, HookError> + Send + Sync,
{
    fn obfuscate(&self, report: Report) -> Result<Report, HookError> {
        self(report)
    }
}

/// Records a failure. Receives the obfuscated tree.
pub trait FailureLogger: Send + Sync {
    fn log(&self, errors: &ErrorTree) -> Result<(), HookError>;
}

impl<F> FailureLogger for F
where
    F: Fn(&ErrorTree) -> Result<(), HookError> + Send + Sync,
{
    fn log(&self, errors: &ErrorTree) -> Result<(), HookError> {
        self(errors)
    }
}

/// Returns the report unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Obfuscator for Identity {
    fn obfuscate(&self, report: Report) -> Result<Report, HookError> {
        Ok(report)
    }
}

/// Strips the offending value from every violation, nested ones included.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactValues;

impl Obfuscator for RedactValues {
    fn obfuscate(&self, report: Report) -> Result<Report, HookError> {
        let errors = report.errors.map_violations(|mut violation| {
            violation.value = None;
            violation
        });
        Ok(Report { errors })
    }
}

/// Discards failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl FailureLogger for Silent {
    fn log(&self, _errors: &ErrorTree) -> Result<(), HookError> {
        Ok(())
    }
}

/// Output format of [`TracingLogger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One event with the failing paths
    #[default]
    Compact,
    /// One summary event plus a debug event per violation
    Detailed,
    /// One event carrying the serialized tree
    Json,
}

/// Emits failures as `tracing` warnings.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    format: LogFormat,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

impl FailureLogger for TracingLogger {
    fn log(&self, errors: &ErrorTree) -> Result<(), HookError> {
        match self.format {
            LogFormat::Compact => {
                tracing::warn!(
                    violations = errors.len(),
                    paths = ?errors.paths(),
                    "validation failed"
                );
            }
            LogFormat::Detailed => {
                tracing::warn!(violations = errors.len(), "=== Validation Failed ===");
                for (path, violations) in errors.flatten() {
                    for violation in violations {
                        tracing::debug!(
                            path = %path,
                            assert = %violation.assert,
                            message = %violation.interpolate_message(),
                            "violation"
                        );
                    }
                }
            }
            LogFormat::Json => {
                let json = serde_json::to_string(errors)?;
                tracing::warn!("{}", json);
            }
        }
        Ok(())
    }
}

/// Shared failure hooks of a validator.
#[derive(Clone)]
pub struct Pipeline {
    obfuscator: Arc<dyn Obfuscator>,
    logger: Arc<dyn FailureLogger>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Identity obfuscator, silent logger.
    pub fn new() -> Self {
        Self {
            obfuscator: Arc::new(Identity),
            logger: Arc::new(Silent),
        }
    }

    pub fn obfuscator(mut self, obfuscator: impl Obfuscator + 'static) -> Self {
        self.obfuscator = Arc::new(obfuscator);
        self
    }

    pub fn logger(mut self, logger: impl FailureLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Turn a raw error tree into the rejection returned to the caller.
    ///
    /// The obfuscator and the logger each run exactly once, in that order. A
    /// hook error replaces the validation failure.
    pub fn reject<E, F>(&self, errors: ErrorTree, create: F) -> Rejected<E>
    where
        F: FnOnce(ErrorTree) -> E,
    {
        let report = match self.obfuscator.obfuscate(Report { errors }) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Obfuscator failed");
                return Rejected::Obfuscator(e);
            }
        };

        if let Err(e) = self.logger.log(&report.errors) {
            tracing::error!(error = %e, "Failure logger failed");
            return Rejected::Logger(e);
        }

        Rejected::Invalid(create(report.errors))
    }
}
