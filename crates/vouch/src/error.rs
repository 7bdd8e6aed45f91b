//! Violations, the error tree, and the error types surfaced by validators.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Error returned by user-supplied hooks (obfuscators, loggers).
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single constraint failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    /// Kind of the failing constraint (e.g. "Required", "Length")
    pub assert: String,
    /// Human-readable error message, may contain `{param}` placeholders
    pub message: String,
    /// The offending value, if one was present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Rule parameters for message interpolation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, Value>,
    /// Element-wise failures for kinds that validate nested values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorTree>,
}

impl Violation {
    /// Create a new violation.
    pub fn new(assert: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            assert: assert.into(),
            message: message.into(),
            value: None,
            params: HashMap::new(),
            errors: None,
        }
    }

    /// Attach the offending value.
    pub fn with_value(mut self, value: Option<&Value>) -> Self {
        self.value = value.cloned();
        self
    }

    /// Attach nested failures.
    pub fn with_errors(mut self, errors: ErrorTree) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Add a parameter to the violation.
    pub fn param(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.params.insert(key.into(), v);
        }
        self
    }

    /// Interpolate parameters into the message.
    ///
    /// Replaces `{param_name}` placeholders with actual values.
    pub fn interpolate_message(&self) -> String {
        let mut result = self.message.clone();
        for (key, value) in &self.params {
            let placeholder = format!("{{{}}}", key);
            let replacement = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => value.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }
        result
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.assert, self.interpolate_message())
    }
}

impl std::error::Error for Violation {}

/// Failures recorded under one key of an [`ErrorTree`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ErrorNode {
    /// Failures of the constraints attached directly to the field
    Violations(Vec<Violation>),
    /// Failures of a nested specification
    Nested(ErrorTree),
}

impl ErrorNode {
    /// The leaf violations, if this node is a leaf.
    pub fn as_violations(&self) -> Option<&[Violation]> {
        match self {
            ErrorNode::Violations(v) => Some(v),
            ErrorNode::Nested(_) => None,
        }
    }

    /// The nested tree, if this node is nested.
    pub fn as_tree(&self) -> Option<&ErrorTree> {
        match self {
            ErrorNode::Nested(tree) => Some(tree),
            ErrorNode::Violations(_) => None,
        }
    }

    fn count(&self) -> usize {
        match self {
            ErrorNode::Violations(v) => v.len(),
            ErrorNode::Nested(tree) => tree.len(),
        }
    }
}

/// Path-indexed collection of every failure from one validation call.
///
/// Serializes as nested JSON, e.g. `{"address": {"city": [{"assert": "Required", ...}]}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ErrorTree {
    fields: IndexMap<String, ErrorNode>,
}

impl ErrorTree {
    /// Create an empty error tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation for a field.
    pub fn add(&mut self, field: impl Into<String>, violation: Violation) {
        let node = self
            .fields
            .entry(field.into())
            .or_insert_with(|| ErrorNode::Violations(Vec::new()));
        match node {
            ErrorNode::Violations(list) => list.push(violation),
            ErrorNode::Nested(_) => *node = ErrorNode::Violations(vec![violation]),
        }
    }

    /// Add multiple violations for a field.
    pub fn add_all(&mut self, field: impl Into<String>, violations: Vec<Violation>) {
        let field = field.into();
        for violation in violations {
            self.add(field.clone(), violation);
        }
    }

    /// Record the failures of a nested specification under `field`.
    pub fn nest(&mut self, field: impl Into<String>, tree: ErrorTree) {
        self.fields.insert(field.into(), ErrorNode::Nested(tree));
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the total number of violations, counting nested ones.
    pub fn len(&self) -> usize {
        self.fields.values().map(ErrorNode::count).sum()
    }

    /// Get the node recorded for a top-level field.
    pub fn get(&self, field: &str) -> Option<&ErrorNode> {
        self.fields.get(field)
    }

    /// Get the leaf violations at a dotted path such as `"address.city"`.
    pub fn violations(&self, path: &str) -> Option<&[Violation]> {
        let mut tree = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let node = tree.fields.get(segment)?;
            if segments.peek().is_none() {
                return node.as_violations();
            }
            tree = node.as_tree()?;
        }
        None
    }

    /// Iterate over top-level fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorNode)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get all top-level field names with errors.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(|s| s.as_str()).collect()
    }

    /// Dotted paths of every leaf that has violations.
    pub fn paths(&self) -> Vec<String> {
        self.flatten().into_iter().map(|(path, _)| path).collect()
    }

    /// Flatten into `(dotted path, violations)` pairs, depth first.
    pub fn flatten(&self) -> Vec<(String, &[Violation])> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a [Violation])>) {
        for (field, node) in &self.fields {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{prefix}.{field}")
            };
            match node {
                ErrorNode::Violations(list) => out.push((path, list)),
                ErrorNode::Nested(tree) => tree.flatten_into(&path, out),
            }
        }
    }

    /// Apply `f` to every violation in the tree, including element-wise ones.
    pub fn map_violations<F>(self, mut f: F) -> Self
    where
        F: FnMut(Violation) -> Violation,
    {
        self.map_with(&mut f)
    }

    fn map_with<F>(self, f: &mut F) -> Self
    where
        F: FnMut(Violation) -> Violation,
    {
        let fields = self
            .fields
            .into_iter()
            .map(|(field, node)| {
                let node = match node {
                    ErrorNode::Violations(list) => ErrorNode::Violations(
                        list.into_iter()
                            .map(|mut v| {
                                v.errors = v.errors.take().map(|tree| tree.map_with(f));
                                f(v)
                            })
                            .collect(),
                    ),
                    ErrorNode::Nested(tree) => ErrorNode::Nested(tree.map_with(f)),
                };
                (field, node)
            })
            .collect();
        Self { fields }
    }

    /// Convert to Result - Ok if no errors, Err otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Flatten into the field-list report format.
    pub fn to_report(&self) -> ErrorReport {
        let fields = self
            .flatten()
            .into_iter()
            .flat_map(|(field, violations)| {
                violations.iter().map(move |v| FieldReport {
                    field: field.clone(),
                    code: v.assert.clone(),
                    message: v.interpolate_message(),
                    params: if v.params.is_empty() {
                        None
                    } else {
                        Some(v.params.clone())
                    },
                })
            })
            .collect();

        ErrorReport {
            message: "Validation failed".to_string(),
            fields,
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.len())
    }
}

/// Flat rendering of an [`ErrorTree`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    pub fields: Vec<FieldReport>,
}

/// Single field row of an [`ErrorReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    /// Dotted field path
    pub field: String,
    /// Constraint kind
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<HashMap<String, Value>>,
}

/// Implemented by errors that carry an [`ErrorTree`].
pub trait HasErrorTree {
    /// The (obfuscated) error tree carried by this error.
    fn errors(&self) -> &ErrorTree;
}

/// Default error raised by `assert` entry points.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Assertion failed: {errors}")]
pub struct AssertionFailed {
    pub errors: ErrorTree,
}

/// Default error raised by `validate` entry points.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Validation failed: {errors}")]
pub struct ValidationFailed {
    pub errors: ErrorTree,
}

impl From<ErrorTree> for AssertionFailed {
    fn from(errors: ErrorTree) -> Self {
        Self { errors }
    }
}

impl From<ErrorTree> for ValidationFailed {
    fn from(errors: ErrorTree) -> Self {
        Self { errors }
    }
}

impl HasErrorTree for AssertionFailed {
    fn errors(&self) -> &ErrorTree {
        &self.errors
    }
}

impl HasErrorTree for ValidationFailed {
    fn errors(&self) -> &ErrorTree {
        &self.errors
    }
}

/// Why a validation call did not return data.
///
/// `Invalid` is the normal failure. The other variants report a hook that
/// failed while processing the failure; they replace the validation error.
#[derive(Debug)]
pub enum Rejected<E> {
    /// The data violated the constraints
    Invalid(E),
    /// The obfuscator returned an error
    Obfuscator(HookError),
    /// The failure logger returned an error
    Logger(HookError),
}

impl<E> Rejected<E> {
    /// Check if this is a constraint failure rather than a hook fault.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Rejected::Invalid(_))
    }

    /// The typed validation error, if this is a constraint failure.
    pub fn invalid(&self) -> Option<&E> {
        match self {
            Rejected::Invalid(e) => Some(e),
            _ => None,
        }
    }

    /// Consume into the typed validation error, if this is a constraint failure.
    pub fn into_invalid(self) -> Option<E> {
        match self {
            Rejected::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Rejected<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejected::Invalid(e) => e.fmt(f),
            Rejected::Obfuscator(e) => write!(f, "Obfuscator failed: {}", e),
            Rejected::Logger(e) => write!(f, "Failure logger failed: {}", e),
        }
    }
}

impl<E> std::error::Error for Rejected<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Rejected::Invalid(e) => e.source(),
            Rejected::Obfuscator(e) | Rejected::Logger(e) => Some(e.as_ref()),
        }
    }
}
