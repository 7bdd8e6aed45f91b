//! The constraint capability interface and the built-in constraint kinds.

mod rules;

pub use rules::*;

use crate::error::Violation;
use crate::evaluate::EvaluateOptions;
use crate::group::{self, ValidationGroup};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// Shared handle to a constraint.
pub type Node = Arc<dyn Constraint>;

/// A checkable rule.
///
/// The evaluator only talks to constraints through this trait, so callers can
/// plug in their own kinds next to the built-in ones.
///
/// ## Example
///
/// ```rust,ignore
/// use vouch::prelude::*;
///
/// #[derive(Debug)]
/// struct Positive;
///
/// impl Constraint for Positive {
///     fn kind(&self) -> &str {
///         "Positive"
///     }
///
///     fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
///         match value.and_then(Value::as_f64) {
///             Some(n) if n <= 0.0 => Err(vec![Violation::new("Positive", "Value must be positive")]),
///             _ => Ok(()),
///         }
///     }
/// }
/// ```
pub trait Constraint: Debug + Send + Sync {
    /// Kind name reported in violations.
    fn kind(&self) -> &str;

    /// Check a value. `None` means the field is absent from the data.
    fn check(&self, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), Vec<Violation>>;

    /// Whether this constraint makes an absent field fail.
    fn is_required(&self) -> bool {
        false
    }

    /// Groups this constraint belongs to. Empty means the default group.
    fn groups(&self) -> &[ValidationGroup] {
        &[]
    }

    /// Whether this constraint runs for a call in `group`.
    fn requires_validation(&self, group: Option<&ValidationGroup>) -> bool {
        group::requires_validation(self.groups(), group)
    }
}

/// What a constraint can see besides its own value.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    object: &'a Map<String, Value>,
    root: &'a Value,
    options: &'a EvaluateOptions,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        object: &'a Map<String, Value>,
        root: &'a Value,
        options: &'a EvaluateOptions,
    ) -> Self {
        Self {
            object,
            root,
            options,
        }
    }

    /// The object that holds the field being checked.
    pub fn object(&self) -> &'a Map<String, Value> {
        self.object
    }

    /// A sibling of the field being checked.
    pub fn sibling(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key)
    }

    /// The whole data object of the call.
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// The options the evaluation runs with.
    pub fn options(&self) -> &'a EvaluateOptions {
        self.options
    }

    /// The validation group of the call.
    pub fn group(&self) -> Option<&'a ValidationGroup> {
        self.options.group.as_ref()
    }

    pub(crate) fn with_object(&self, object: &'a Map<String, Value>) -> Self {
        Self { object, ..*self }
    }
}

/// A constraint restricted to a set of validation groups.
#[derive(Debug, Clone)]
pub struct Grouped {
    inner: Node,
    groups: Vec<ValidationGroup>,
}

impl Grouped {
    /// Wrap a constraint with groups.
    pub fn new(inner: Node, groups: Vec<ValidationGroup>) -> Self {
        Self { inner, groups }
    }
}

impl Constraint for Grouped {
    fn kind(&self) -> &str {
        self.inner.kind()
    }

    fn check(&self, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        self.inner.check(value, ctx)
    }

    fn is_required(&self) -> bool {
        self.inner.is_required()
    }

    fn groups(&self) -> &[ValidationGroup] {
        &self.groups
    }
}

/// Builder helpers available on every constraint handle.
pub trait ConstraintExt {
    /// Restrict the constraint to the given validation groups.
    fn in_groups<I, G>(self, groups: I) -> Node
    where
        I: IntoIterator<Item = G>,
        G: Into<ValidationGroup>;
}

impl ConstraintExt for Node {
    fn in_groups<I, G>(self, groups: I) -> Node
    where
        I: IntoIterator<Item = G>,
        G: Into<ValidationGroup>,
    {
        Arc::new(Grouped::new(self, groups.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_constraint_keeps_kind_and_required() {
        let node: Node = Arc::new(Required::new());
        let grouped = node.in_groups(["update"]);

        assert_eq!(grouped.kind(), "Required");
        assert!(grouped.is_required());
        assert!(!grouped.requires_validation(None));
        assert!(grouped.requires_validation(Some(&ValidationGroup::named("update"))));
        assert!(grouped.requires_validation(Some(&ValidationGroup::Any)));
    }

    #[test]
    fn ungrouped_constraint_runs_without_group() {
        let node: Node = Arc::new(Email::new());

        assert!(node.requires_validation(None));
        assert!(node.requires_validation(Some(&ValidationGroup::Default)));
        assert!(!node.requires_validation(Some(&ValidationGroup::named("update"))));
    }
}
