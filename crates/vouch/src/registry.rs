//! The `is` catalogue: named constraint factories.
//!
//! Names are stored uncapitalized (`notBlank`, `alwaysValid`). Lookups accept
//! either spelling, so `"Integer"` and `"integer"` resolve to the same kind.

use crate::constraint::{
    Blank, Callback, Choice, Collection, Comparison, Constraint, Context, Count, Email, EqualTo,
    JsonType, Length, Node, NotBlank, NotNull, Null, Range, Regexp, Required, Threshold, TypeOf,
    Unique, When,
};
use crate::spec::{Entry, SpecError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Builds a constraint from JSON arguments. The registry is passed along so
/// factories can resolve nested entries.
pub type ConstraintFactory =
    Arc<dyn Fn(&[Value], &Asserts) -> Result<Node, RegistryError> + Send + Sync>;

/// Errors raised while building a constraint by name.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown constraint kind `{0}`")]
    Unknown(String),

    #[error("invalid arguments for `{assert}`: {reason}")]
    InvalidArgs { assert: String, reason: String },

    #[error("invalid nested entry for `{assert}`: {source}")]
    Entry {
        assert: String,
        #[source]
        source: Box<SpecError>,
    },
}

impl RegistryError {
    fn args(assert: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidArgs {
            assert: assert.to_string(),
            reason: reason.into(),
        }
    }
}

/// Lowercase the first character of a kind name.
pub fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Registry of constraint kinds.
#[derive(Clone, Default)]
pub struct Asserts {
    factories: IndexMap<String, ConstraintFactory>,
}

impl fmt::Debug for Asserts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asserts")
            .field("names", &self.names())
            .finish()
    }
}

fn node(constraint: impl Constraint + 'static) -> Result<Node, RegistryError> {
    Ok(Arc::new(constraint))
}

fn no_args(name: &str, args: &[Value]) -> Result<(), RegistryError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::args(name, format!("expected no arguments, got {}", args.len())))
    }
}

fn arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a Value, RegistryError> {
    args.get(index)
        .ok_or_else(|| RegistryError::args(name, format!("missing argument {}", index + 1)))
}

fn number(name: &str, value: &Value) -> Result<f64, RegistryError> {
    value
        .as_f64()
        .ok_or_else(|| RegistryError::args(name, format!("expected a number, found {value}")))
}

fn bound(name: &str, value: Option<&Value>) -> Result<Option<usize>, RegistryError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| RegistryError::args(name, format!("expected a length, found {v}"))),
    }
}

fn entry(name: &str, value: &Value, asserts: &Asserts) -> Result<Entry, RegistryError> {
    Entry::from_value(value, asserts).map_err(|source| RegistryError::Entry {
        assert: name.to_string(),
        source: Box::new(source),
    })
}

fn length(args: &[Value], _: &Asserts) -> Result<Node, RegistryError> {
    let (min, max) = match args.first() {
        Some(Value::Object(options)) => (options.get("min"), options.get("max")),
        _ => (args.first(), args.get(1)),
    };
    node(Length::new(bound("length", min)?, bound("length", max)?))
}

fn threshold(comparison: Comparison, name: &'static str) -> ConstraintFactory {
    Arc::new(move |args: &[Value], _: &Asserts| node(Threshold::new(comparison, number(name, arg(name, args, 0)?)?)))
}

fn simple<C, F>(name: &'static str, make: F) -> ConstraintFactory
where
    C: Constraint + 'static,
    F: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(move |args: &[Value], _: &Asserts| {
        no_args(name, args)?;
        node(make())
    })
}

impl Asserts {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalogue.
    pub fn builtin() -> Self {
        let mut asserts = Self::new();

        asserts.insert("required", simple("required", Required::new));
        asserts.insert("notNull", simple("notNull", NotNull::new));
        asserts.insert("null", simple("null", Null::new));
        asserts.insert("notBlank", simple("notBlank", NotBlank::new));
        asserts.insert("blank", simple("blank", Blank::new));
        asserts.insert("string", simple("string", || TypeOf::new(JsonType::String)));
        asserts.insert("integer", simple("integer", || TypeOf::new(JsonType::Integer)));
        asserts.insert("boolean", simple("boolean", || TypeOf::new(JsonType::Boolean)));
        asserts.insert("email", simple("email", Email::new));
        asserts.insert("length", Arc::new(length));
        asserts.insert("ofLength", Arc::new(length));
        asserts.insert(
            "range",
            Arc::new(|args: &[Value], _: &Asserts| {
                let min = number("range", arg("range", args, 0)?)?;
                let max = number("range", arg("range", args, 1)?)?;
                node(Range::new(min, max))
            }),
        );
        asserts.insert("greaterThan", threshold(Comparison::GreaterThan, "greaterThan"));
        asserts.insert(
            "greaterThanOrEqual",
            threshold(Comparison::GreaterThanOrEqual, "greaterThanOrEqual"),
        );
        asserts.insert("lessThan", threshold(Comparison::LessThan, "lessThan"));
        asserts.insert(
            "lessThanOrEqual",
            threshold(Comparison::LessThanOrEqual, "lessThanOrEqual"),
        );
        asserts.insert(
            "equalTo",
            Arc::new(|args: &[Value], _: &Asserts| {
                node(EqualTo::new(arg("equalTo", args, 0)?.clone()))
            }),
        );
        asserts.insert(
            "notEqualTo",
            Arc::new(|args: &[Value], _: &Asserts| {
                node(EqualTo::not(arg("notEqualTo", args, 0)?.clone()))
            }),
        );
        asserts.insert(
            "choice",
            Arc::new(|args: &[Value], _: &Asserts| match args {
                [Value::Array(choices)] => node(Choice::new(choices.clone())),
                [] => Err(RegistryError::args("choice", "expected a list of choices")),
                choices => node(Choice::new(choices.to_vec())),
            }),
        );
        asserts.insert(
            "count",
            Arc::new(|args: &[Value], _: &Asserts| {
                let count = arg("count", args, 0)?
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| RegistryError::args("count", "expected a count"))?;
                node(Count::new(count))
            }),
        );
        asserts.insert(
            "regexp",
            Arc::new(|args: &[Value], _: &Asserts| {
                if args.len() > 2 {
                    return Err(RegistryError::args(
                        "regexp",
                        format!("expected a pattern and optional flags, got {} arguments", args.len()),
                    ));
                }
                let pattern = arg("regexp", args, 0)?
                    .as_str()
                    .ok_or_else(|| RegistryError::args("regexp", "expected a pattern string"))?;
                let flags = match args.get(1) {
                    None | Some(Value::Null) => "",
                    Some(Value::String(flags)) => flags.as_str(),
                    Some(other) => {
                        return Err(RegistryError::args("regexp", format!("expected flags, found {other}")))
                    }
                };
                let rule = Regexp::with_flags(pattern, flags)
                    .map_err(|e| RegistryError::args("regexp", e.to_string()))?;
                node(rule)
            }),
        );
        asserts.insert(
            "unique",
            Arc::new(|args: &[Value], _: &Asserts| {
                let key = match args.first() {
                    None => None,
                    Some(Value::String(key)) => Some(key.as_str()),
                    Some(Value::Object(options)) => options.get("key").and_then(Value::as_str),
                    Some(other) => {
                        return Err(RegistryError::args("unique", format!("unexpected {other}")))
                    }
                };
                node(key.map(Unique::by_key).unwrap_or_default())
            }),
        );
        asserts.insert(
            "collection",
            Arc::new(|args: &[Value], asserts: &Asserts| {
                let item = entry("collection", arg("collection", args, 0)?, asserts)?;
                node(Collection::new(item))
            }),
        );
        asserts.insert(
            "when",
            Arc::new(|args: &[Value], asserts: &Asserts| {
                let reference = arg("when", args, 0)?
                    .as_str()
                    .ok_or_else(|| RegistryError::args("when", "expected a sibling field name"))?;
                let options = arg("when", args, 1)?
                    .as_object()
                    .ok_or_else(|| RegistryError::args("when", "expected `{is, then, otherwise}`"))?;
                let is = options
                    .get("is")
                    .ok_or_else(|| RegistryError::args("when", "missing `is`"))?;

                let mut rule = When::new(reference, entry("when", is, asserts)?);
                if let Some(then) = options.get("then") {
                    rule = rule.then(entry("when", then, asserts)?);
                }
                if let Some(otherwise) = options.get("otherwise") {
                    rule = rule.otherwise(entry("when", otherwise, asserts)?);
                }
                node(rule)
            }),
        );

        asserts
    }

    fn insert(&mut self, name: &str, factory: ConstraintFactory) {
        self.factories.insert(uncapitalize(name), factory);
    }

    /// Register a kind under its uncapitalized name, replacing any existing one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&[Value], &Asserts) -> Result<Node, RegistryError> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(factory));
    }

    /// Merge another set of factories over this one.
    pub fn extend<'a, I>(&mut self, extras: I)
    where
        I: IntoIterator<Item = (&'a str, ConstraintFactory)>,
    {
        for (name, factory) in extras {
            self.insert(name, factory);
        }
    }

    /// Check if a kind is registered.
    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(&uncapitalize(name))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build a constraint by name.
    pub fn make(&self, name: &str, args: &[Value]) -> Result<Node, RegistryError> {
        let factory = self
            .factories
            .get(&uncapitalize(name))
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        factory(args, self)
    }

    pub fn required(&self) -> Node {
        Arc::new(Required::new())
    }

    pub fn not_null(&self) -> Node {
        Arc::new(NotNull::new())
    }

    pub fn null(&self) -> Node {
        Arc::new(Null::new())
    }

    pub fn not_blank(&self) -> Node {
        Arc::new(NotBlank::new())
    }

    pub fn blank(&self) -> Node {
        Arc::new(Blank::new())
    }

    pub fn string(&self) -> Node {
        Arc::new(TypeOf::new(JsonType::String))
    }

    pub fn integer(&self) -> Node {
        Arc::new(TypeOf::new(JsonType::Integer))
    }

    pub fn boolean(&self) -> Node {
        Arc::new(TypeOf::new(JsonType::Boolean))
    }

    pub fn email(&self) -> Node {
        Arc::new(Email::new())
    }

    /// Length bounds for strings (in characters) and arrays.
    pub fn length(&self, min: Option<usize>, max: Option<usize>) -> Node {
        Arc::new(Length::new(min, max))
    }

    pub fn range(&self, min: f64, max: f64) -> Node {
        Arc::new(Range::new(min, max))
    }

    pub fn greater_than(&self, threshold: f64) -> Node {
        Arc::new(Threshold::new(Comparison::GreaterThan, threshold))
    }

    pub fn greater_than_or_equal(&self, threshold: f64) -> Node {
        Arc::new(Threshold::new(Comparison::GreaterThanOrEqual, threshold))
    }

    pub fn less_than(&self, threshold: f64) -> Node {
        Arc::new(Threshold::new(Comparison::LessThan, threshold))
    }

    pub fn less_than_or_equal(&self, threshold: f64) -> Node {
        Arc::new(Threshold::new(Comparison::LessThanOrEqual, threshold))
    }

    pub fn equal_to(&self, reference: Value) -> Node {
        Arc::new(EqualTo::new(reference))
    }

    pub fn not_equal_to(&self, reference: Value) -> Node {
        Arc::new(EqualTo::not(reference))
    }

    pub fn choice(&self, choices: Vec<Value>) -> Node {
        Arc::new(Choice::new(choices))
    }

    pub fn count(&self, count: usize) -> Node {
        Arc::new(Count::new(count))
    }

    /// Pattern rule; fails if `pattern` does not compile.
    pub fn regexp(&self, pattern: &str) -> Result<Node, RegistryError> {
        let rule = Regexp::new(pattern).map_err(|e| RegistryError::args("regexp", e.to_string()))?;
        Ok(Arc::new(rule))
    }

    /// Like [`Asserts::regexp`], with flags (`i`, `m`, `s`, `u`).
    pub fn regexp_with_flags(&self, pattern: &str, flags: &str) -> Result<Node, RegistryError> {
        let rule = Regexp::with_flags(pattern, flags)
            .map_err(|e| RegistryError::args("regexp", e.to_string()))?;
        Ok(Arc::new(rule))
    }

    pub fn unique(&self) -> Node {
        Arc::new(Unique::new())
    }

    pub fn unique_by(&self, key: impl Into<String>) -> Node {
        Arc::new(Unique::by_key(key))
    }

    pub fn collection(&self, item: impl Into<Entry>) -> Node {
        Arc::new(Collection::new(item))
    }

    /// Apply `then` when sibling `reference` satisfies `is`.
    pub fn when(&self, reference: &str, is: impl Into<Entry>, then: impl Into<Entry>) -> Node {
        Arc::new(When::new(reference, is).then(then))
    }

    /// Apply `then` when sibling `reference` satisfies `is`, `otherwise` when it does not.
    pub fn when_else(
        &self,
        reference: &str,
        is: impl Into<Entry>,
        then: impl Into<Entry>,
        otherwise: impl Into<Entry>,
    ) -> Node {
        Arc::new(When::new(reference, is).then(then).otherwise(otherwise))
    }

    pub fn callback<F>(&self, callback: F) -> Node
    where
        F: Fn(&Value, &Context<'_>) -> bool + Send + Sync + 'static,
    {
        Arc::new(Callback::new(callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uncapitalize_names() {
        assert_eq!(uncapitalize("AlwaysValid"), "alwaysValid");
        assert_eq!(uncapitalize("email"), "email");
        assert_eq!(uncapitalize(""), "");
    }

    #[test]
    fn builtin_lookup_accepts_either_case() {
        let is = Asserts::builtin();

        assert!(is.has("integer"));
        assert!(is.has("Integer"));
        assert!(is.has("ofLength"));
        assert!(!is.has("callback"));
        assert_eq!(is.make("Integer", &[]).unwrap().kind(), "Integer");
    }

    #[test]
    fn make_with_arguments() {
        let is = Asserts::builtin();

        assert_eq!(is.make("length", &[json!({"min": 1, "max": 3})]).unwrap().kind(), "Length");
        assert_eq!(is.make("length", &[json!(1), json!(null)]).unwrap().kind(), "Length");
        assert_eq!(is.make("range", &[json!(1), json!(5)]).unwrap().kind(), "Range");
        assert_eq!(is.make("greaterThan", &[json!(0)]).unwrap().kind(), "GreaterThan");
        assert_eq!(is.make("notEqualTo", &[json!("x")]).unwrap().kind(), "NotEqualTo");
        assert_eq!(is.make("choice", &[json!(["a", "b"])]).unwrap().kind(), "Choice");
        assert_eq!(is.make("unique", &[json!({"key": "id"})]).unwrap().kind(), "Unique");
        assert_eq!(is.make("collection", &[json!("email")]).unwrap().kind(), "Collection");
        assert_eq!(
            is.make("when", &[json!("kind"), json!({"is": {"$assert": "equalTo", "args": ["a"]}, "then": "required"})])
                .unwrap()
                .kind(),
            "When"
        );
    }

    #[test]
    fn make_rejects_bad_arguments() {
        let is = Asserts::builtin();

        assert!(matches!(is.make("nope", &[]), Err(RegistryError::Unknown(name)) if name == "nope"));
        assert!(matches!(is.make("email", &[json!(1)]), Err(RegistryError::InvalidArgs { .. })));
        assert!(matches!(is.make("range", &[json!(1)]), Err(RegistryError::InvalidArgs { .. })));
        assert!(matches!(is.make("regexp", &[json!("(")]), Err(RegistryError::InvalidArgs { .. })));
        assert!(matches!(
            is.make("collection", &[json!("nope")]),
            Err(RegistryError::Entry { .. })
        ));
    }

    #[test]
    fn regexp_accepts_flags() {
        use crate::{evaluate, ConstraintSpec, EvaluateOptions};

        let is = Asserts::builtin();
        let passes = |rule: Node, value: Value| {
            let spec = ConstraintSpec::new().field("code", rule);
            evaluate(&json!({ "code": value }), &spec, &EvaluateOptions::default()).is_ok()
        };

        let insensitive = is.make("regexp", &[json!("^abc$"), json!("i")]).unwrap();
        assert!(passes(insensitive, json!("ABC")));

        let sensitive = is.make("regexp", &[json!("^abc$")]).unwrap();
        assert!(!passes(sensitive, json!("ABC")));

        let typed = is.regexp_with_flags("^a.c$", "is").unwrap();
        assert!(passes(typed, json!("A\nC")));

        for args in [
            vec![json!("^abc$"), json!("x")],
            vec![json!("^abc$"), json!(1)],
            vec![json!("^abc$"), json!("i"), json!("extra")],
        ] {
            assert!(
                matches!(is.make("regexp", &args), Err(RegistryError::InvalidArgs { .. })),
                "{args:?}"
            );
        }
    }

    #[test]
    fn counts_and_lengths_must_be_non_negative_integers() {
        let is = Asserts::builtin();

        assert!(matches!(is.make("count", &[json!(-1)]), Err(RegistryError::InvalidArgs { .. })));
        assert!(matches!(is.make("count", &[json!(1.5)]), Err(RegistryError::InvalidArgs { .. })));
        assert!(matches!(is.make("length", &[json!(-2)]), Err(RegistryError::InvalidArgs { .. })));
        assert_eq!(is.make("count", &[json!(3)]).unwrap().kind(), "Count");
    }

    #[test]
    fn registered_kinds_override_builtins() {
        #[derive(Debug)]
        struct AlwaysValid;

        impl Constraint for AlwaysValid {
            fn kind(&self) -> &str {
                "AlwaysValid"
            }

            fn check(&self, _: Option<&Value>, _: &Context<'_>) -> Result<(), Vec<crate::Violation>> {
                Ok(())
            }
        }

        let mut is = Asserts::builtin();
        let before = is.names().len();
        is.register("AlwaysValid", |_, _| Ok(Arc::new(AlwaysValid) as Node));
        is.register("Email", |_, _| Ok(Arc::new(AlwaysValid) as Node));

        assert_eq!(is.names().len(), before + 1);
        assert!(is.names().contains(&"alwaysValid"));
        assert_eq!(is.make("email", &[]).unwrap().kind(), "AlwaysValid");
    }
}
