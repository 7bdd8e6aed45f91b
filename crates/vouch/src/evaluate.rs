//! Recursive evaluation of a [`ConstraintSpec`] against data.

use crate::constraint::{Context, Node};
use crate::error::{ErrorNode, ErrorTree, Violation};
use crate::group::ValidationGroup;
use crate::spec::{ConstraintSpec, Entry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options for a single evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Recurse into missing nested objects so their required fields fail
    pub deep_required: bool,
    /// Validation group of the call; `None` runs only ungrouped constraints
    pub group: Option<ValidationGroup>,
}

impl EvaluateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deep_required(mut self, deep_required: bool) -> Self {
        self.deep_required = deep_required;
        self
    }

    pub fn with_group(mut self, group: impl Into<ValidationGroup>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Evaluate `data` against `spec`.
///
/// Every field is checked; the returned tree holds all failures. A top-level
/// value that is not an object is evaluated as an empty object.
pub fn evaluate(data: &Value, spec: &ConstraintSpec, options: &EvaluateOptions) -> Result<(), ErrorTree> {
    let empty = Map::new();
    let object = data.as_object().unwrap_or(&empty);
    let ctx = Context::new(object, data, options);

    let errors = check_spec(spec, object, &ctx);
    if !errors.is_empty() {
        tracing::debug!(
            violations = errors.len(),
            paths = errors.paths().len(),
            group = ?options.group,
            "Constraint evaluation failed"
        );
    }
    errors.into_result()
}

fn check_spec(spec: &ConstraintSpec, object: &Map<String, Value>, ctx: &Context<'_>) -> ErrorTree {
    let ctx = ctx.with_object(object);
    let mut errors = ErrorTree::new();

    for (key, entry) in spec.iter() {
        match check_entry(entry, object.get(key), &ctx) {
            Ok(()) => {}
            Err(ErrorNode::Violations(list)) => errors.add_all(key, list),
            Err(ErrorNode::Nested(tree)) => errors.nest(key, tree),
        }
    }

    errors
}

/// Check one value against one entry. `ctx` describes the object holding the value.
pub(crate) fn check_entry(entry: &Entry, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), ErrorNode> {
    match entry {
        Entry::Node(node) => check_nodes(std::slice::from_ref(node), value, ctx),
        Entry::All(nodes) => check_nodes(nodes, value, ctx),
        Entry::Nested(spec) => {
            let tree = match value {
                Some(Value::Object(object)) => check_spec(spec, object, ctx),
                None | Some(Value::Null) if ctx.options().deep_required => {
                    check_spec(spec, &Map::new(), ctx)
                }
                None | Some(Value::Null) => return Ok(()),
                Some(other) => {
                    return Err(ErrorNode::Violations(vec![Violation::new(
                        "Object",
                        "This value should be an object",
                    )
                    .with_value(Some(other))]))
                }
            };
            tree.into_result().map_err(ErrorNode::Nested)
        }
    }
}

fn check_nodes(nodes: &[Node], value: Option<&Value>, ctx: &Context<'_>) -> Result<(), ErrorNode> {
    let group = ctx.group();
    let applicable = || nodes.iter().filter(move |node| node.requires_validation(group));

    if value.is_none() && !applicable().any(|node| node.is_required()) {
        return Ok(());
    }

    let violations: Vec<Violation> = applicable()
        .filter_map(|node| node.check(value, ctx).err())
        .flatten()
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ErrorNode::Violations(violations))
    }
}
