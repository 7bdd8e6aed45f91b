//! # Vouch
//!
//! A configurable data-validation façade over a declarative constraint
//! catalogue. Data is a `serde_json::Value`; a [`ConstraintSpec`] maps field
//! names to constraints or to nested specs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vouch::prelude::*;
//!
//! let validator = create_validator(
//!     ValidatorOptions::new()
//!         .assertion_error(AssertionFailed::from)
//!         .validation_error(ValidationFailed::from)
//!         .obfuscator(RedactValues)
//!         .logger(TracingLogger::new()),
//! );
//!
//! let is = validator.is();
//! let spec = ConstraintSpec::new()
//!     .field("email", [is.required(), is.email()])
//!     .at("address.city", is.required());
//!
//! match validator.validate(json!({"email": "nope"}), &spec) {
//!     Ok(data) => println!("valid: {data}"),
//!     Err(Rejected::Invalid(e)) => println!("{}", serde_json::to_string(&e.errors)?),
//!     Err(fault) => return Err(fault.into()),
//! }
//! ```
//!
//! ## Failure pipeline
//!
//! On failure the raw [`ErrorTree`] goes through the obfuscator, the
//! obfuscated tree is handed to the failure logger, and the entry point's
//! error factory builds the returned error from it. Masking (`.mask(true)`)
//! prunes the data to the constrained fields before evaluation; the pruned
//! data is what a successful call returns.
//!
//! ## Error Format
//!
//! [`ErrorTree`] serializes as nested JSON:
//!
//! ```json
//! {
//!   "email": [{"assert": "Email", "message": "Invalid email format", "value": "nope"}],
//!   "address": {"city": [{"assert": "Required", "message": "This value is required"}]}
//! }
//! ```

pub mod config;
pub mod constraint;
mod error;
pub mod evaluate;
pub mod group;
pub mod mask;
pub mod pipeline;
pub mod registry;
pub mod spec;
pub mod validator;


#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::Settings;
pub use constraint::{Constraint, ConstraintExt, Context, Node};
pub use error::{
    AssertionFailed, ErrorNode, ErrorReport, ErrorTree, FieldReport, HasErrorTree, HookError,
    Rejected, ValidationFailed, Violation,
};
pub use evaluate::{evaluate, EvaluateOptions};
pub use group::ValidationGroup;
pub use mask::{derive_mask, prune, FieldMask, MaskError};
pub use pipeline::{FailureLogger, Obfuscator, Report};
pub use registry::{Asserts, RegistryError};
pub use spec::{ConstraintSpec, Entry, SpecError};
pub use validator::{create_validator, CallOptions, ErrorFactory, Unset, Validator, ValidatorOptions};

/// Prelude module for validation
pub mod prelude {
    pub use crate::constraint::{Constraint, ConstraintExt, Context, Node};
    pub use crate::error::{
        AssertionFailed, ErrorTree, HasErrorTree, Rejected, ValidationFailed, Violation,
    };
    pub use crate::group::ValidationGroup;
    pub use crate::pipeline::{Identity, RedactValues, Report, Silent, TracingLogger};
    pub use crate::registry::Asserts;
    pub use crate::spec::ConstraintSpec;
    pub use crate::validator::{create_validator, CallOptions, ValidatorOptions};
    pub use serde_json::{json, Value};
}
