//! Validation groups for conditional validation.

use serde::{Deserialize, Serialize};

/// Validation groups select which constraints run on a given call.
///
/// Constraints without groups belong to [`ValidationGroup::Default`]. Every
/// constraint responds to [`ValidationGroup::Any`].
///
/// ## Example
///
/// ```rust,ignore
/// use vouch::prelude::*;
///
/// let spec = ConstraintSpec::new()
///     .field("id", is.required().in_groups(["update"]))
///     .field("email", is.email());
///
/// // `id` is only checked when validating in the "update" group
/// validator.validate_with(data, &spec, CallOptions::new().group("update"))?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationGroup {
    /// Group of every constraint that declares no groups
    #[default]
    Default,
    /// Matches every constraint
    Any,
    /// Named validation group
    Named(String),
}

impl ValidationGroup {
    /// Create a named validation group.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Get the group name as a string.
    pub fn name(&self) -> &str {
        match self {
            ValidationGroup::Default => "Default",
            ValidationGroup::Any => "Any",
            ValidationGroup::Named(name) => name,
        }
    }
}

impl From<&str> for ValidationGroup {
    fn from(s: &str) -> Self {
        match s {
            "Default" | "default" => ValidationGroup::Default,
            "Any" | "any" => ValidationGroup::Any,
            other => ValidationGroup::Named(other.to_string()),
        }
    }
}

impl From<String> for ValidationGroup {
    fn from(s: String) -> Self {
        ValidationGroup::from(s.as_str())
    }
}

impl std::fmt::Display for ValidationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check whether a constraint declaring `groups` responds to `group`.
pub fn has_group(groups: &[ValidationGroup], group: &ValidationGroup) -> bool {
    if *group == ValidationGroup::Any {
        return true;
    }

    if groups.is_empty() {
        return *group == ValidationGroup::Default;
    }

    groups.contains(group)
}

/// Check whether a constraint declaring `groups` runs for a call in `group`.
///
/// A call without a group only runs ungrouped constraints.
pub fn requires_validation(groups: &[ValidationGroup], group: Option<&ValidationGroup>) -> bool {
    match group {
        Some(group) => has_group(groups, group),
        None => groups.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_from_str() {
        assert_eq!(ValidationGroup::from("default"), ValidationGroup::Default);
        assert_eq!(ValidationGroup::from("Any"), ValidationGroup::Any);
        assert_eq!(
            ValidationGroup::from("update"),
            ValidationGroup::Named("update".to_string())
        );
    }

    #[test]
    fn group_name() {
        assert_eq!(ValidationGroup::Default.name(), "Default");
        assert_eq!(ValidationGroup::Any.name(), "Any");
        assert_eq!(ValidationGroup::named("update").to_string(), "update");
    }

    #[test]
    fn ungrouped_constraints_respond_to_default() {
        assert!(has_group(&[], &ValidationGroup::Default));
        assert!(has_group(&[], &ValidationGroup::Any));
        assert!(!has_group(&[], &ValidationGroup::named("update")));
    }

    #[test]
    fn grouped_constraints_respond_to_their_groups() {
        let groups = [ValidationGroup::named("create"), ValidationGroup::named("update")];

        assert!(has_group(&groups, &ValidationGroup::named("update")));
        assert!(has_group(&groups, &ValidationGroup::Any));
        assert!(!has_group(&groups, &ValidationGroup::Default));
        assert!(!has_group(&groups, &ValidationGroup::named("delete")));
    }

    #[test]
    fn requires_validation_without_group() {
        assert!(requires_validation(&[], None));
        assert!(!requires_validation(&[ValidationGroup::named("update")], None));
    }

    #[test]
    fn group_serialization() {
        let json = serde_json::to_string(&ValidationGroup::Any).unwrap();
        assert_eq!(json, "\"any\"");

        let parsed: ValidationGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ValidationGroup::Any);
    }
}
