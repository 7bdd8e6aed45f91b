//! Constraint specifications: the declarative shape that data is checked against.

use crate::constraint::Node;
use crate::registry::{Asserts, RegistryError};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// What a single key of a [`ConstraintSpec`] maps to.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A single constraint
    Node(Node),
    /// Constraints that must all hold
    All(Vec<Node>),
    /// Specification of a nested object
    Nested(ConstraintSpec),
}

impl Entry {
    /// Build an entry from its JSON form.
    ///
    /// - `"email"` names a kind without arguments
    /// - `{"$assert": "length", "args": [{"min": 3}]}` is a kind with arguments
    /// - `["required", "email"]` is a conjunction
    /// - any other object is a nested specification
    pub fn from_value(value: &Value, asserts: &Asserts) -> Result<Self, SpecError> {
        parse_entry("", value, asserts)
    }

    /// Check if this entry describes a nested object.
    pub fn is_nested(&self) -> bool {
        matches!(self, Entry::Nested(_))
    }

    /// The nested specification, if any.
    pub fn as_nested(&self) -> Option<&ConstraintSpec> {
        match self {
            Entry::Nested(spec) => Some(spec),
            _ => None,
        }
    }
}

impl From<Node> for Entry {
    fn from(node: Node) -> Self {
        Entry::Node(node)
    }
}

impl From<Vec<Node>> for Entry {
    fn from(nodes: Vec<Node>) -> Self {
        Entry::All(nodes)
    }
}

impl<const N: usize> From<[Node; N]> for Entry {
    fn from(nodes: [Node; N]) -> Self {
        Entry::All(nodes.into())
    }
}

impl From<ConstraintSpec> for Entry {
    fn from(spec: ConstraintSpec) -> Self {
        Entry::Nested(spec)
    }
}

/// Errors raised while loading a specification.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("a constraint specification must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid entry at `{path}`: {reason}")]
    InvalidEntry { path: String, reason: String },

    #[error("invalid constraint at `{path}`: {source}")]
    Assert {
        path: String,
        #[source]
        source: RegistryError,
    },
}

/// Ordered mapping from field name to [`Entry`].
///
/// ## Example
///
/// ```rust,ignore
/// use vouch::prelude::*;
///
/// let is = Asserts::builtin();
/// let spec = ConstraintSpec::new()
///     .field("email", [is.required(), is.email()])
///     .at("address.city", is.required());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstraintSpec {
    fields: IndexMap<String, Entry>,
}

impl ConstraintSpec {
    /// Create an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for a literal field name.
    pub fn field(mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Self {
        self.insert(key, entry);
        self
    }

    /// Add an entry at a dotted path, creating nested specifications on the way.
    ///
    /// An existing nested specification along the path is extended; any other
    /// existing entry is replaced.
    pub fn at(mut self, path: &str, entry: impl Into<Entry>) -> Self {
        self.insert_path(path, entry.into());
        self
    }

    /// Insert an entry for a literal field name, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        self.fields.insert(key.into(), entry.into())
    }

    fn insert_path(&mut self, path: &str, entry: Entry) {
        match path.split_once('.') {
            None => {
                self.fields.insert(path.to_string(), entry);
            }
            Some((head, rest)) => {
                let slot = self
                    .fields
                    .entry(head.to_string())
                    .or_insert_with(|| Entry::Nested(ConstraintSpec::new()));
                if !slot.is_nested() {
                    *slot = Entry::Nested(ConstraintSpec::new());
                }
                if let Entry::Nested(spec) = slot {
                    spec.insert_path(rest, entry);
                }
            }
        }
    }

    /// Get the entry for a field.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.fields.get(key)
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Load a specification from JSON, resolving kind names through `asserts`.
    pub fn from_value(value: &Value, asserts: &Asserts) -> Result<Self, SpecError> {
        parse_spec("", value, asserts)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn parse_spec(path: &str, value: &Value, asserts: &Asserts) -> Result<ConstraintSpec, SpecError> {
    let Value::Object(map) = value else {
        return Err(SpecError::NotAnObject {
            found: type_name(value),
        });
    };

    let mut spec = ConstraintSpec::new();
    for (key, entry) in map {
        let entry = parse_entry(&join(path, key), entry, asserts)?;
        spec.insert(key.clone(), entry);
    }
    Ok(spec)
}

fn parse_entry(path: &str, value: &Value, asserts: &Asserts) -> Result<Entry, SpecError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_node(path, item, asserts))
            .collect::<Result<Vec<_>, _>>()
            .map(Entry::All),
        Value::Object(map) if !map.contains_key("$assert") => {
            parse_spec(path, value, asserts).map(Entry::Nested)
        }
        _ => parse_node(path, value, asserts).map(Entry::Node),
    }
}

fn parse_node(path: &str, value: &Value, asserts: &Asserts) -> Result<Node, SpecError> {
    let (name, args) = match value {
        Value::String(name) => (name.as_str(), &[][..]),
        Value::Object(map) => {
            let name = map.get("$assert").and_then(Value::as_str).ok_or_else(|| {
                SpecError::InvalidEntry {
                    path: path.to_string(),
                    reason: "`$assert` must name a constraint kind".to_string(),
                }
            })?;
            let args = match map.get("args") {
                None => &[][..],
                Some(Value::Array(args)) => args.as_slice(),
                Some(other) => {
                    return Err(SpecError::InvalidEntry {
                        path: path.to_string(),
                        reason: format!("`args` must be an array, found {}", type_name(other)),
                    })
                }
            };
            (name, args)
        }
        other => {
            return Err(SpecError::InvalidEntry {
                path: path.to_string(),
                reason: format!("expected a constraint, found {}", type_name(other)),
            })
        }
    };

    asserts.make(name, args).map_err(|source| SpecError::Assert {
        path: path.to_string(),
        source,
    })
}
