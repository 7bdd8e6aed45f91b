//! Built-in constraint kinds.
//!
//! Every kind except [`Required`] passes on an absent field; presence is
//! Required's job.

use super::{Constraint, Context};
use crate::error::{ErrorNode, ErrorTree, Violation};
use crate::evaluate::check_entry;
use crate::spec::Entry;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        // RFC 5322 simplified email regex
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
        ).expect("email regex is valid")
    })
}

fn fail(
    kind: &str,
    message: &Option<String>,
    default: impl FnOnce() -> String,
    value: &Value,
) -> Vec<Violation> {
    let message = message.clone().unwrap_or_else(default);
    vec![Violation::new(kind, message).with_value(Some(value))]
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

macro_rules! with_message {
    ($ty:ty) => {
        impl $ty {
            /// Set a custom error message.
            pub fn with_message(mut self, message: impl Into<String>) -> Self {
                self.message = Some(message.into());
                self
            }
        }
    };
}

/// The field must be present. Strings must also be non-blank and arrays
/// non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Required {
    message: Option<String>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(Required);

impl Constraint for Required {
    fn kind(&self) -> &str {
        "Required"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "This value is required".to_string());
                Err(vec![Violation::new("Required", message)])
            }
            Some(v)
                if v.as_str().is_some_and(is_blank)
                    || v.as_array().is_some_and(|items| items.is_empty()) =>
            {
                Err(fail("Required", &self.message, || "This value is required".into(), v))
            }
            Some(_) => Ok(()),
        }
    }

    fn is_required(&self) -> bool {
        true
    }
}

/// The value must not be `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotNull {
    message: Option<String>,
}

impl NotNull {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(NotNull);

impl Constraint for NotNull {
    fn kind(&self) -> &str {
        "NotNull"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            Some(v) if v.is_null() => {
                Err(fail("NotNull", &self.message, || "This value should not be null".into(), v))
            }
            _ => Ok(()),
        }
    }
}

/// The value must be `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Null {
    message: Option<String>,
}

impl Null {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(Null);

impl Constraint for Null {
    fn kind(&self) -> &str {
        "Null"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            Some(Value::Null) | None => Ok(()),
            Some(v) => Err(fail("Null", &self.message, || "This value should be null".into(), v)),
        }
    }
}

/// The value must be a string containing non-whitespace characters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotBlank {
    message: Option<String>,
}

impl NotBlank {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(NotBlank);

impl Constraint for NotBlank {
    fn kind(&self) -> &str {
        "NotBlank"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => Ok(()),
            Some(Value::String(s)) if !is_blank(s) => Ok(()),
            Some(v) => Err(fail("NotBlank", &self.message, || "This value should not be blank".into(), v)),
        }
    }
}

/// The value must be an empty or whitespace-only string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blank {
    message: Option<String>,
}

impl Blank {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(Blank);

impl Constraint for Blank {
    fn kind(&self) -> &str {
        "Blank"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => Ok(()),
            Some(Value::String(s)) if is_blank(s) => Ok(()),
            Some(v) => Err(fail("Blank", &self.message, || "This value should be blank".into(), v)),
        }
    }
}

/// JSON type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Integer,
    Boolean,
}

/// The value must be of a JSON type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeOf {
    expected: JsonType,
    message: Option<String>,
}

impl TypeOf {
    pub fn new(expected: JsonType) -> Self {
        Self {
            expected,
            message: None,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self.expected {
            JsonType::String => value.is_string(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
        }
    }
}

with_message!(TypeOf);

impl Constraint for TypeOf {
    fn kind(&self) -> &str {
        match self.expected {
            JsonType::String => "String",
            JsonType::Integer => "Integer",
            JsonType::Boolean => "Boolean",
        }
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            Some(v) if !self.matches(v) => {
                let kind = self.kind();
                Err(fail(kind, &self.message, || format!("This value should be of type {kind}"), v))
            }
            _ => Ok(()),
        }
    }
}

/// The value must be an email address (RFC 5322, simplified).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
    message: Option<String>,
}

impl Email {
    pub fn new() -> Self {
        Self::default()
    }
}

with_message!(Email);

impl Constraint for Email {
    fn kind(&self) -> &str {
        "Email"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => Ok(()),
            Some(Value::String(s)) if email_regex().is_match(s) => Ok(()),
            Some(v) => Err(fail("Email", &self.message, || "Invalid email format".into(), v)),
        }
    }
}

/// String length (in characters) or array length bounds, inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
    message: Option<String>,
}

impl Length {
    /// Create a length rule with min and max bounds.
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self {
            min,
            max,
            message: None,
        }
    }
}

with_message!(Length);

impl Constraint for Length {
    fn kind(&self) -> &str {
        "Length"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };

        let len = match v {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            _ => {
                return Err(fail("Length", &self.message, || "This value should be a string or an array".into(), v));
            }
        };

        if let Some(min) = self.min {
            if len < min {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "Length must be at least {min}".to_string());
                return Err(vec![Violation::new("Length", message)
                    .with_value(Some(v))
                    .param("min", min)
                    .param("max", self.max)
                    .param("actual", len)]);
            }
        }

        if let Some(max) = self.max {
            if len > max {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "Length must be at most {max}".to_string());
                return Err(vec![Violation::new("Length", message)
                    .with_value(Some(v))
                    .param("min", self.min)
                    .param("max", max)
                    .param("actual", len)]);
            }
        }

        Ok(())
    }
}

/// Inclusive range. Numbers are compared by value, strings by character
/// count and arrays by item count.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    message: Option<String>,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            message: None,
        }
    }
}

with_message!(Range);

impl Constraint for Range {
    fn kind(&self) -> &str {
        "Range"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };

        let measured = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Some(s.chars().count() as f64),
            Value::Array(items) => Some(items.len() as f64),
            _ => None,
        };

        match measured {
            Some(n) if n >= self.min && n <= self.max => Ok(()),
            Some(_) => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "Value must be between {min} and {max}".to_string());
                Err(vec![Violation::new("Range", message)
                    .with_value(Some(v))
                    .param("min", self.min)
                    .param("max", self.max)])
            }
            None => Err(fail(
                "Range",
                &self.message,
                || "This value should be a number, string or array".into(),
                v,
            )),
        }
    }
}

/// Comparison applied by [`Threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    fn name(self) -> &'static str {
        match self {
            Comparison::GreaterThan => "GreaterThan",
            Comparison::GreaterThanOrEqual => "GreaterThanOrEqual",
            Comparison::LessThan => "LessThan",
            Comparison::LessThanOrEqual => "LessThanOrEqual",
        }
    }

    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::GreaterThanOrEqual => value >= threshold,
            Comparison::LessThan => value < threshold,
            Comparison::LessThanOrEqual => value <= threshold,
        }
    }
}

/// A number compared against a fixed threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    comparison: Comparison,
    threshold: f64,
    message: Option<String>,
}

impl Threshold {
    pub fn new(comparison: Comparison, threshold: f64) -> Self {
        Self {
            comparison,
            threshold,
            message: None,
        }
    }
}

with_message!(Threshold);

impl Constraint for Threshold {
    fn kind(&self) -> &str {
        self.comparison.name()
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };

        match v.as_f64() {
            Some(n) if self.comparison.holds(n, self.threshold) => Ok(()),
            _ => {
                let kind = self.kind();
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Value must satisfy {kind} {{threshold}}"));
                Err(vec![Violation::new(kind, message)
                    .with_value(Some(v))
                    .param("threshold", self.threshold)])
            }
        }
    }
}

/// The value must (or must not) equal a reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualTo {
    reference: Value,
    negate: bool,
    message: Option<String>,
}

impl EqualTo {
    pub fn new(reference: Value) -> Self {
        Self {
            reference,
            negate: false,
            message: None,
        }
    }

    /// The inverse rule, reported as `NotEqualTo`.
    pub fn not(reference: Value) -> Self {
        Self {
            reference,
            negate: true,
            message: None,
        }
    }
}

with_message!(EqualTo);

impl Constraint for EqualTo {
    fn kind(&self) -> &str {
        if self.negate {
            "NotEqualTo"
        } else {
            "EqualTo"
        }
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };

        if (*v == self.reference) != self.negate {
            return Ok(());
        }

        let message = self.message.clone().unwrap_or_else(|| {
            if self.negate {
                "This value should not be equal to {reference}".to_string()
            } else {
                "This value should be equal to {reference}".to_string()
            }
        });
        Err(vec![Violation::new(self.kind(), message)
            .with_value(Some(v))
            .param("reference", &self.reference)])
    }
}

/// The value must be one of a list of choices.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    choices: Vec<Value>,
    message: Option<String>,
}

impl Choice {
    pub fn new(choices: Vec<Value>) -> Self {
        Self {
            choices,
            message: None,
        }
    }
}

with_message!(Choice);

impl Constraint for Choice {
    fn kind(&self) -> &str {
        "Choice"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            Some(v) if !self.choices.contains(v) => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "The value you selected is not a valid choice".to_string());
                Err(vec![Violation::new("Choice", message)
                    .with_value(Some(v))
                    .param("choices", &self.choices)])
            }
            _ => Ok(()),
        }
    }
}

/// The array must have exactly `count` items.
#[derive(Debug, Clone, PartialEq)]
pub struct Count {
    count: usize,
    message: Option<String>,
}

impl Count {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            message: None,
        }
    }
}

with_message!(Count);

impl Constraint for Count {
    fn kind(&self) -> &str {
        "Count"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => Ok(()),
            Some(Value::Array(items)) if items.len() == self.count => Ok(()),
            Some(v) => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "This collection should contain exactly {count} elements".to_string());
                Err(vec![Violation::new("Count", message)
                    .with_value(Some(v))
                    .param("count", self.count)])
            }
        }
    }
}

/// The string must match a regular expression.
#[derive(Debug, Clone)]
pub struct Regexp {
    regex: Regex,
    message: Option<String>,
}

impl Regexp {
    /// Compile a regexp rule.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            message: None,
        })
    }

    /// Compile a regexp rule with single-letter flags: `i` (case
    /// insensitive), `m` (multi-line anchors), `s` (`.` matches newlines) and
    /// `u` (unicode, always on).
    pub fn with_flags(pattern: &str, flags: &str) -> Result<Self, RegexpError> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'u' => builder.unicode(true),
                other => return Err(RegexpError::Flag(other)),
            };
        }
        Ok(Self {
            regex: builder.build()?,
            message: None,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

with_message!(Regexp);

impl Constraint for Regexp {
    fn kind(&self) -> &str {
        "Regexp"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            None => Ok(()),
            Some(Value::String(s)) if self.regex.is_match(s) => Ok(()),
            Some(v) => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| "Value does not match pattern: {pattern}".to_string());
                Err(vec![Violation::new("Regexp", message)
                    .with_value(Some(v))
                    .param("pattern", self.pattern())])
            }
        }
    }
}

/// Why a [`Regexp`] could not be built.
#[derive(Debug, Error)]
pub enum RegexpError {
    #[error("unsupported regexp flag `{0}`")]
    Flag(char),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Array items must be unique, optionally compared by an object key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unique {
    key: Option<String>,
    message: Option<String>,
}

impl Unique {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare object items by `key` instead of by whole value.
    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            message: None,
        }
    }
}

with_message!(Unique);

impl Constraint for Unique {
    fn kind(&self) -> &str {
        "Unique"
    }

    fn check(&self, value: Option<&Value>, _ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };
        let Value::Array(items) = v else {
            return Err(fail("Unique", &self.message, || "This value should be an array".into(), v));
        };

        let mut seen: Vec<&Value> = Vec::with_capacity(items.len());
        for item in items {
            let probe = match &self.key {
                Some(key) => match item.get(key) {
                    Some(probe) => probe,
                    None => continue,
                },
                None => item,
            };
            if seen.contains(&probe) {
                let mut violation = Violation::new(
                    "Unique",
                    self.message
                        .clone()
                        .unwrap_or_else(|| "This collection should contain only unique elements".to_string()),
                )
                .with_value(Some(v));
                if let Some(key) = &self.key {
                    violation = violation.param("key", key);
                }
                return Err(vec![violation]);
            }
            seen.push(probe);
        }

        Ok(())
    }
}

fn node_violations(kind: &str, message: &str, node: ErrorNode, value: Option<&Value>) -> Vec<Violation> {
    match node {
        ErrorNode::Violations(list) => list,
        ErrorNode::Nested(tree) => vec![Violation::new(kind, message)
            .with_value(value)
            .with_errors(tree)],
    }
}

/// Every array element must satisfy an entry (node, node list or nested spec).
///
/// Element failures are reported in the violation's nested tree, keyed by index.
#[derive(Debug, Clone)]
pub struct Collection {
    entry: Entry,
    message: Option<String>,
}

impl Collection {
    pub fn new(entry: impl Into<Entry>) -> Self {
        Self {
            entry: entry.into(),
            message: None,
        }
    }
}

with_message!(Collection);

impl Constraint for Collection {
    fn kind(&self) -> &str {
        "Collection"
    }

    fn check(&self, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let Some(v) = value else {
            return Ok(());
        };
        let Value::Array(items) = v else {
            return Err(fail("Collection", &self.message, || "This value should be an array".into(), v));
        };

        let mut errors = ErrorTree::new();
        for (index, item) in items.iter().enumerate() {
            match check_entry(&self.entry, Some(item), ctx) {
                Ok(()) => {}
                Err(ErrorNode::Violations(list)) => errors.add_all(index.to_string(), list),
                Err(ErrorNode::Nested(tree)) => errors.nest(index.to_string(), tree),
            }
        }

        if errors.is_empty() {
            return Ok(());
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| "Some elements of this collection are invalid".to_string());
        Err(vec![Violation::new("Collection", message)
            .with_value(Some(v))
            .with_errors(errors)])
    }
}

/// Conditional constraint: if sibling `reference` satisfies `is`, the value
/// must satisfy `then`, otherwise it must satisfy `otherwise`.
#[derive(Debug, Clone)]
pub struct When {
    reference: String,
    is: Entry,
    then: Option<Entry>,
    otherwise: Option<Entry>,
}

impl When {
    pub fn new(reference: impl Into<String>, is: impl Into<Entry>) -> Self {
        Self {
            reference: reference.into(),
            is: is.into(),
            then: None,
            otherwise: None,
        }
    }

    /// Entry applied when the condition holds.
    pub fn then(mut self, entry: impl Into<Entry>) -> Self {
        self.then = Some(entry.into());
        self
    }

    /// Entry applied when the condition does not hold.
    pub fn otherwise(mut self, entry: impl Into<Entry>) -> Self {
        self.otherwise = Some(entry.into());
        self
    }
}

impl Constraint for When {
    fn kind(&self) -> &str {
        "When"
    }

    fn check(&self, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        let condition = check_entry(&self.is, ctx.sibling(&self.reference), ctx).is_ok();
        let branch = if condition { &self.then } else { &self.otherwise };

        match branch {
            Some(entry) => check_entry(entry, value, ctx)
                .map_err(|node| node_violations("When", "This value is invalid", node, value)),
            None => Ok(()),
        }
    }
}

type CallbackFn = dyn Fn(&Value, &Context<'_>) -> bool + Send + Sync;

/// The value must satisfy a caller-provided predicate.
#[derive(Clone)]
pub struct Callback {
    callback: Arc<CallbackFn>,
    message: Option<String>,
}

impl Callback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            message: None,
        }
    }
}

with_message!(Callback);

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl Constraint for Callback {
    fn kind(&self) -> &str {
        "Callback"
    }

    fn check(&self, value: Option<&Value>, ctx: &Context<'_>) -> Result<(), Vec<Violation>> {
        match value {
            Some(v) if !(self.callback)(v, ctx) => {
                Err(fail("Callback", &self.message, || "This value is invalid".into(), v))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::EvaluateOptions;
    use crate::spec::ConstraintSpec;
    use serde_json::{json, Map};

    fn check(rule: &dyn Constraint, value: Option<Value>) -> Result<(), Vec<Violation>> {
        check_in(rule, value, &Map::new())
    }

    fn check_in(
        rule: &dyn Constraint,
        value: Option<Value>,
        object: &Map<String, Value>,
    ) -> Result<(), Vec<Violation>> {
        let options = EvaluateOptions::default();
        let root = Value::Object(object.clone());
        let ctx = Context::new(object, &root, &options);
        rule.check(value.as_ref(), &ctx)
    }

    #[test]
    fn required_rule() {
        let rule = Required::new();
        assert!(check(&rule, Some(json!("value"))).is_ok());
        assert!(check(&rule, Some(json!(0))).is_ok());
        assert!(check(&rule, Some(json!(null))).is_ok());
        assert!(check(&rule, Some(json!("   "))).is_err());
        assert!(check(&rule, Some(json!([]))).is_err());
        assert!(check(&rule, Some(json!(["a"]))).is_ok());
        assert!(check(&rule, Some(json!({}))).is_ok());

        let err = check(&rule, None).unwrap_err();
        assert_eq!(err[0].assert, "Required");
        assert!(err[0].value.is_none());
    }

    #[test]
    fn required_custom_message() {
        let rule = Required::new().with_message("Please fill this in");
        let err = check(&rule, None).unwrap_err();
        assert_eq!(err[0].message, "Please fill this in");
    }

    #[test]
    fn non_required_rules_skip_missing_values() {
        let rules: Vec<Box<dyn Constraint>> = vec![
            Box::new(NotNull::new()),
            Box::new(NotBlank::new()),
            Box::new(Email::new()),
            Box::new(Length::new(Some(1), None)),
            Box::new(Range::new(0.0, 1.0)),
            Box::new(TypeOf::new(JsonType::Integer)),
            Box::new(Count::new(1)),
        ];
        for rule in rules {
            assert!(check(rule.as_ref(), None).is_ok(), "{}", rule.kind());
        }
    }

    #[test]
    fn null_rules() {
        assert!(check(&NotNull::new(), Some(json!(null))).is_err());
        assert!(check(&NotNull::new(), Some(json!(1))).is_ok());
        assert!(check(&Null::new(), Some(json!(null))).is_ok());
        assert!(check(&Null::new(), Some(json!("x"))).is_err());
    }

    #[test]
    fn blank_rules() {
        assert!(check(&NotBlank::new(), Some(json!("x"))).is_ok());
        assert!(check(&NotBlank::new(), Some(json!(" "))).is_err());
        assert!(check(&NotBlank::new(), Some(json!(1))).is_err());
        assert!(check(&Blank::new(), Some(json!("  "))).is_ok());
        assert!(check(&Blank::new(), Some(json!("x"))).is_err());
    }

    #[test]
    fn type_rules() {
        let integer = TypeOf::new(JsonType::Integer);
        assert!(check(&integer, Some(json!(3))).is_ok());
        assert!(check(&integer, Some(json!(3.0))).is_ok());
        assert!(check(&integer, Some(json!(3.5))).is_err());

        let err = check(&integer, Some(json!("Foo"))).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].assert, "Integer");
        assert_eq!(err[0].value, Some(json!("Foo")));

        assert!(check(&TypeOf::new(JsonType::String), Some(json!("a"))).is_ok());
        assert!(check(&TypeOf::new(JsonType::Boolean), Some(json!("true"))).is_err());
    }

    #[test]
    fn email_rule() {
        let rule = Email::new();
        assert!(check(&rule, Some(json!("test@example.com"))).is_ok());
        assert!(check(&rule, Some(json!("user.name+tag@domain.co.uk"))).is_ok());
        assert!(check(&rule, Some(json!("invalid"))).is_err());
        assert!(check(&rule, Some(json!("@domain.com"))).is_err());
        assert!(check(&rule, Some(json!(42))).is_err());
    }

    #[test]
    fn length_rule() {
        let rule = Length::new(Some(3), Some(5));
        assert!(check(&rule, Some(json!("abc"))).is_ok());
        assert!(check(&rule, Some(json!([1, 2, 3, 4]))).is_ok());

        let err = check(&rule, Some(json!("ab"))).unwrap_err();
        assert_eq!(err[0].assert, "Length");
        assert_eq!(err[0].interpolate_message(), "Length must be at least 3");

        let err = check(&rule, Some(json!("abcdef"))).unwrap_err();
        assert_eq!(err[0].params["actual"], json!(6));

        assert!(check(&rule, Some(json!(12345))).is_err());
    }

    #[test]
    fn range_and_threshold_rules() {
        let rule = Range::new(18.0, 120.0);
        assert!(check(&rule, Some(json!(18))).is_ok());
        assert!(check(&rule, Some(json!(121))).is_err());
        assert!(check(&rule, Some(json!("20"))).is_err());

        let short = Range::new(1.0, 5.0);
        assert!(check(&short, Some(json!("abc"))).is_ok());
        assert!(check(&short, Some(json!("héllo"))).is_ok());
        assert!(check(&short, Some(json!("abcdef"))).is_err());
        assert!(check(&short, Some(json!([1, 2]))).is_ok());
        assert!(check(&short, Some(json!([]))).is_err());
        let err = check(&short, Some(json!(true))).unwrap_err();
        assert_eq!(err[0].message, "This value should be a number, string or array");

        let gt = Threshold::new(Comparison::GreaterThan, 0.0);
        assert_eq!(gt.kind(), "GreaterThan");
        assert!(check(&gt, Some(json!(1))).is_ok());
        assert!(check(&gt, Some(json!(0))).is_err());

        let lte = Threshold::new(Comparison::LessThanOrEqual, 10.0);
        assert!(check(&lte, Some(json!(10))).is_ok());
        assert!(check(&lte, Some(json!(10.5))).is_err());
    }

    #[test]
    fn equality_and_choice_rules() {
        assert!(check(&EqualTo::new(json!("a")), Some(json!("a"))).is_ok());
        assert!(check(&EqualTo::new(json!("a")), Some(json!("b"))).is_err());

        let not = EqualTo::not(json!("a"));
        assert_eq!(not.kind(), "NotEqualTo");
        assert!(check(&not, Some(json!("a"))).is_err());

        let choice = Choice::new(vec![json!("red"), json!("green")]);
        assert!(check(&choice, Some(json!("red"))).is_ok());
        assert!(check(&choice, Some(json!("blue"))).is_err());
    }

    #[test]
    fn count_and_unique_rules() {
        assert!(check(&Count::new(2), Some(json!([1, 2]))).is_ok());
        assert!(check(&Count::new(2), Some(json!([1]))).is_err());

        assert!(check(&Unique::new(), Some(json!([1, 2, 3]))).is_ok());
        assert!(check(&Unique::new(), Some(json!([1, 2, 1]))).is_err());

        let by_id = Unique::by_key("id");
        assert!(check(&by_id, Some(json!([{"id": 1}, {"id": 2}]))).is_ok());
        let err = check(&by_id, Some(json!([{"id": 1}, {"id": 1}]))).unwrap_err();
        assert_eq!(err[0].params["key"], json!("id"));
    }

    #[test]
    fn regexp_flags() {
        let rule = Regexp::with_flags("^abc$", "i").unwrap();
        assert!(check(&rule, Some(json!("ABC"))).is_ok());

        let rule = Regexp::with_flags("^b$", "m").unwrap();
        assert!(check(&rule, Some(json!("a\nb"))).is_ok());

        let rule = Regexp::with_flags("^a.b$", "s").unwrap();
        assert!(check(&rule, Some(json!("a\nb"))).is_ok());

        let rule = Regexp::with_flags("^abc$", "").unwrap();
        assert!(check(&rule, Some(json!("ABC"))).is_err());

        assert!(matches!(Regexp::with_flags("a", "x"), Err(RegexpError::Flag('x'))));
        assert!(matches!(Regexp::with_flags("(", "i"), Err(RegexpError::Pattern(_))));
    }

    #[test]
    fn regexp_rule() {
        let rule = Regexp::new(r"^\d{3}-\d{4}$").unwrap();
        assert!(check(&rule, Some(json!("123-4567"))).is_ok());
        let err = check(&rule, Some(json!("1234567"))).unwrap_err();
        assert_eq!(err[0].params["pattern"], json!(r"^\d{3}-\d{4}$"));

        assert!(Regexp::new("(unclosed").is_err());
    }

    #[test]
    fn collection_rule_reports_by_index() {
        let rule = Collection::new(Arc::new(Email::new()) as Arc<dyn Constraint>);
        assert!(check(&rule, Some(json!(["a@b.co", "c@d.co"]))).is_ok());

        let err = check(&rule, Some(json!(["a@b.co", "nope", "also nope"]))).unwrap_err();
        let nested = err[0].errors.as_ref().unwrap();
        assert_eq!(nested.paths(), vec!["1", "2"]);
    }

    #[test]
    fn collection_rule_with_nested_spec() {
        let spec = ConstraintSpec::new().field("name", Arc::new(Required::new()) as Arc<dyn Constraint>);
        let rule = Collection::new(spec);

        let err = check(&rule, Some(json!([{"name": "a"}, {}]))).unwrap_err();
        let nested = err[0].errors.as_ref().unwrap();
        assert_eq!(nested.violations("1.name").unwrap()[0].assert, "Required");
    }

    #[test]
    fn when_rule_uses_sibling() {
        let rule = When::new("kind", Arc::new(EqualTo::new(json!("email"))) as Arc<dyn Constraint>)
            .then(Arc::new(Email::new()) as Arc<dyn Constraint>)
            .otherwise(Arc::new(TypeOf::new(JsonType::String)) as Arc<dyn Constraint>);

        let mut object = Map::new();
        object.insert("kind".into(), json!("email"));
        assert!(check_in(&rule, Some(json!("x@y.io")), &object).is_ok());
        assert!(check_in(&rule, Some(json!("not an email")), &object).is_err());

        object.insert("kind".into(), json!("phone"));
        assert!(check_in(&rule, Some(json!("not an email")), &object).is_ok());
        assert!(check_in(&rule, Some(json!(5)), &object).is_err());
    }

    #[test]
    fn callback_rule() {
        let rule = Callback::new(|value, _ctx| value.as_i64().is_some_and(|n| n % 2 == 0))
            .with_message("Must be even");
        assert!(check(&rule, Some(json!(4))).is_ok());

        let err = check(&rule, Some(json!(3))).unwrap_err();
        assert_eq!(err[0].message, "Must be even");
    }
}
