//! Validator construction and the `assert` / `validate` entry points.
//!
//! Which entry points a [`Validator`] has is decided by its options: `assert`
//! exists once an assertion error factory is attached, `validate` once a
//! validation error factory is attached. `is()` always exists.
//!
//! # Example
//!
//! ```rust,ignore
//! use vouch::prelude::*;
//!
//! let validator = create_validator(
//!     ValidatorOptions::new()
//!         .validation_error(ValidationFailed::from)
//!         .mask(true),
//! );
//!
//! let is = validator.is();
//! let spec = ConstraintSpec::new().field("name", [is.required(), is.string()]);
//!
//! let data = validator.validate(json!({"name": "Ada", "extra": 1}), &spec)?;
//! assert_eq!(data, json!({"name": "Ada"}));
//! ```

use crate::config::Settings;
use crate::constraint::Node;
use crate::error::{ErrorTree, Rejected};
use crate::evaluate::{evaluate, EvaluateOptions};
use crate::group::ValidationGroup;
use crate::mask::FieldMask;
use crate::pipeline::{FailureLogger, Obfuscator, Pipeline, RedactValues, TracingLogger};
use crate::registry::{Asserts, ConstraintFactory, RegistryError};
use crate::spec::ConstraintSpec;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Placeholder for an entry point that was not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unset;

/// Builds the typed error of an entry point from the (obfuscated) error tree.
pub trait ErrorFactory: Send + Sync {
    type Error;

    fn create(&self, errors: ErrorTree) -> Self::Error;
}

impl<F, E> ErrorFactory for F
where
    F: Fn(ErrorTree) -> E + Send + Sync,
{
    type Error = E;

    fn create(&self, errors: ErrorTree) -> E {
        self(errors)
    }
}

/// Options for [`create_validator`].
pub struct ValidatorOptions<A = Unset, V = Unset> {
    assertion_error: A,
    validation_error: V,
    extras: Vec<(String, ConstraintFactory)>,
    pipeline: Pipeline,
    mask: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorOptions {
    /// No entry points, no extra kinds, no masking, identity obfuscator and
    /// silent logger.
    pub fn new() -> Self {
        Self {
            assertion_error: Unset,
            validation_error: Unset,
            extras: Vec::new(),
            pipeline: Pipeline::new(),
            mask: false,
        }
    }
}

impl<A, V> ValidatorOptions<A, V> {
    /// Enable `assert`, raising errors built by `factory`.
    pub fn assertion_error<F: ErrorFactory>(self, factory: F) -> ValidatorOptions<F, V> {
        ValidatorOptions {
            assertion_error: factory,
            validation_error: self.validation_error,
            extras: self.extras,
            pipeline: self.pipeline,
            mask: self.mask,
        }
    }

    /// Enable `validate`, raising errors built by `factory`.
    pub fn validation_error<F: ErrorFactory>(self, factory: F) -> ValidatorOptions<A, F> {
        ValidatorOptions {
            assertion_error: self.assertion_error,
            validation_error: factory,
            extras: self.extras,
            pipeline: self.pipeline,
            mask: self.mask,
        }
    }

    /// Register an extra constraint kind on the validator's `is()` catalogue.
    ///
    /// The kind is stored under its uncapitalized name and overrides a
    /// built-in kind of the same name.
    pub fn extra_assert<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[Value], &Asserts) -> Result<Node, RegistryError> + Send + Sync + 'static,
    {
        self.extras.push((name.into(), Arc::new(factory)));
        self
    }

    pub fn logger(mut self, logger: impl FailureLogger + 'static) -> Self {
        self.pipeline = self.pipeline.logger(logger);
        self
    }

    pub fn obfuscator(mut self, obfuscator: impl Obfuscator + 'static) -> Self {
        self.pipeline = self.pipeline.obfuscator(obfuscator);
        self
    }

    /// Prune data to the constrained fields before evaluating and returning it.
    pub fn mask(mut self, enabled: bool) -> Self {
        self.mask = enabled;
        self
    }

    /// Apply [`Settings`]. Enabled switches install the stock hooks, replacing
    /// any hook set earlier.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.mask = settings.mask;
        if settings.log_failures {
            self = self.logger(TracingLogger::new());
        }
        if settings.redact_values {
            self = self.obfuscator(RedactValues);
        }
        self
    }

    pub fn build(self) -> Validator<A, V> {
        let mut asserts = Asserts::builtin();
        asserts.extend(
            self.extras
                .iter()
                .map(|(name, factory)| (name.as_str(), Arc::clone(factory))),
        );

        tracing::debug!(
            kinds = asserts.names().len(),
            extras = self.extras.len(),
            mask = self.mask,
            "Validator created"
        );

        Validator {
            asserts,
            assertion_error: self.assertion_error,
            validation_error: self.validation_error,
            pipeline: self.pipeline,
            mask: self.mask,
        }
    }
}

/// Build a validator from options.
pub fn create_validator<A, V>(options: ValidatorOptions<A, V>) -> Validator<A, V> {
    options.build()
}

/// Per-call options for `assert_with` / `validate_with`.
pub struct CallOptions<E> {
    group: Option<ValidationGroup>,
    create_error: Option<Box<dyn FnOnce(ErrorTree) -> E + Send>>,
}

impl<E> Default for CallOptions<E> {
    fn default() -> Self {
        Self {
            group: None,
            create_error: None,
        }
    }
}

impl<E> fmt::Debug for CallOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("group", &self.group)
            .field("create_error", &self.create_error.is_some())
            .finish()
    }
}

impl<E> CallOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only run constraints that respond to `group`.
    pub fn group(mut self, group: impl Into<ValidationGroup>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Build this call's error with `create` instead of the configured factory.
    pub fn create_error<F>(mut self, create: F) -> Self
    where
        F: FnOnce(ErrorTree) -> E + Send + 'static,
    {
        self.create_error = Some(Box::new(create));
        self
    }
}

/// A configured validator.
///
/// `A` and `V` are the assertion and validation error factories. An entry
/// point whose factory is [`Unset`] does not exist. A validate-only validator
/// has `is` and `validate`:
///
/// ```
/// use vouch::prelude::*;
///
/// let validator = create_validator(ValidatorOptions::new().validation_error(ValidationFailed::from));
/// let spec = ConstraintSpec::new().field("name", validator.is().required());
///
/// assert!(validator.validate(json!({"name": "Ada"}), &spec).is_ok());
/// ```
///
/// but no `assert`:
///
/// ```compile_fail
/// use vouch::prelude::*;
///
/// let validator = create_validator(ValidatorOptions::new().validation_error(ValidationFailed::from));
/// let spec = ConstraintSpec::new().field("name", validator.is().required());
///
/// // no method named `assert` for `Validator<Unset, _>`
/// let _ = validator.assert(json!({"name": "Ada"}), &spec);
/// ```
///
/// With neither factory attached only `is` is available:
///
/// ```compile_fail
/// use vouch::prelude::*;
///
/// let validator = create_validator(ValidatorOptions::new());
/// let spec = ConstraintSpec::new().field("name", validator.is().required());
///
/// // no method named `validate` for `Validator<Unset, Unset>`
/// let _ = validator.validate(json!({"name": "Ada"}), &spec);
/// ```
///
/// ```compile_fail
/// use vouch::prelude::*;
///
/// let validator = create_validator(ValidatorOptions::new());
/// let spec = ConstraintSpec::new();
///
/// // no method named `assert` for `Validator<Unset, Unset>`
/// let _ = validator.assert(json!({}), &spec);
/// ```
#[derive(Clone)]
pub struct Validator<A = Unset, V = Unset> {
    asserts: Asserts,
    assertion_error: A,
    validation_error: V,
    pipeline: Pipeline,
    mask: bool,
}

impl<A, V> fmt::Debug for Validator<A, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("asserts", &self.asserts)
            .field("mask", &self.mask)
            .finish_non_exhaustive()
    }
}

impl<A, V> Validator<A, V> {
    /// The constraint catalogue: built-in kinds plus the configured extras.
    pub fn is(&self) -> &Asserts {
        &self.asserts
    }

    /// Whether data is pruned before evaluation.
    pub fn masks(&self) -> bool {
        self.mask
    }

    fn run<E, F>(
        &self,
        entry: &'static str,
        data: Value,
        spec: &ConstraintSpec,
        group: Option<ValidationGroup>,
        create: F,
    ) -> Result<Value, Rejected<E>>
    where
        F: FnOnce(ErrorTree) -> E,
    {
        let data = if self.mask {
            let mask = FieldMask::from_spec(spec);
            tracing::trace!(mask = %mask, "Applying field mask");
            mask.prune(&data)
        } else {
            data
        };

        let options = EvaluateOptions {
            deep_required: true,
            group,
        };

        match evaluate(&data, spec, &options) {
            Ok(()) => Ok(data),
            Err(errors) => {
                tracing::debug!(entry, violations = errors.len(), "Rejecting data");
                Err(self.pipeline.reject(errors, create))
            }
        }
    }
}

impl<A: ErrorFactory, V> Validator<A, V> {
    /// Check `data` against `spec`, raising the assertion error on failure.
    ///
    /// Returns the data (pruned when masking is on).
    pub fn assert(&self, data: Value, spec: &ConstraintSpec) -> Result<Value, Rejected<A::Error>> {
        self.assert_with(data, spec, CallOptions::new())
    }

    pub fn assert_with(
        &self,
        data: Value,
        spec: &ConstraintSpec,
        options: CallOptions<A::Error>,
    ) -> Result<Value, Rejected<A::Error>> {
        let CallOptions {
            group,
            create_error,
        } = options;
        self.run("assert", data, spec, group, |errors| match create_error {
            Some(create) => create(errors),
            None => self.assertion_error.create(errors),
        })
    }
}

impl<A, V: ErrorFactory> Validator<A, V> {
    /// Check `data` against `spec`, raising the validation error on failure.
    ///
    /// Returns the data (pruned when masking is on).
    pub fn validate(&self, data: Value, spec: &ConstraintSpec) -> Result<Value, Rejected<V::Error>> {
        self.validate_with(data, spec, CallOptions::new())
    }

    pub fn validate_with(
        &self,
        data: Value,
        spec: &ConstraintSpec,
        options: CallOptions<V::Error>,
    ) -> Result<Value, Rejected<V::Error>> {
        let CallOptions {
            group,
            create_error,
        } = options;
        self.run("validate", data, spec, group, |errors| match create_error {
            Some(create) => create(errors),
            None => self.validation_error.create(errors),
        })
    }
}
