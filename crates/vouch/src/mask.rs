//! Field masks: which parts of the data a validator looks at and hands back.
//!
//! The string form is a comma-separated list of keys. `a(b,c)` selects the
//! keys `b` and `c` inside `a`, `a/b` is shorthand for `a(b)` and `*` selects
//! every key at its level.

use crate::spec::{ConstraintSpec, Entry};
use indexmap::map::Entry as Slot;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};
use thiserror::Error;

/// Errors raised while parsing a mask expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("empty key at position {position}")]
    EmptyKey { position: usize },

    #[error("unclosed `(` at position {position}")]
    Unclosed { position: usize },

    #[error("unexpected `{found}` at position {position}")]
    Unexpected { found: char, position: usize },
}

/// A parsed field selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    fields: IndexMap<Key, Option<FieldMask>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Name(String),
    Any,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Any => f.write_str("*"),
        }
    }
}

/// Derive the mask string selecting exactly the fields a spec constrains.
///
/// Nested specifications become `key(sub,mask)`; every other entry is a plain
/// key. An empty spec yields an empty string. Keys are not escaped, so a key
/// containing `,`, `(`, `)`, `/` or equal to `*` does not parse back to the
/// same selection. Validators prune with [`FieldMask::from_spec`], which keeps
/// such keys literal.
pub fn derive_mask(spec: &ConstraintSpec) -> String {
    FieldMask::from_spec(spec).to_string()
}

/// Prune `data` with a mask expression.
pub fn prune(data: &Value, expression: &str) -> Result<Value, MaskError> {
    Ok(FieldMask::parse(expression)?.prune(data))
}

impl FieldMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a key, optionally restricted to a sub-mask. The key is taken
    /// literally, `"*"` included.
    pub fn select(mut self, key: impl Into<String>, sub: Option<FieldMask>) -> Self {
        self.merge(Key::Name(key.into()), sub);
        self
    }

    /// Select every key at this level, like `*` in the string form.
    pub fn select_all(mut self, sub: Option<FieldMask>) -> Self {
        self.merge(Key::Any, sub);
        self
    }

    /// The mask selecting exactly the fields a spec constrains.
    pub fn from_spec(spec: &ConstraintSpec) -> Self {
        let fields = spec
            .iter()
            .map(|(key, entry)| {
                let sub = match entry {
                    Entry::Nested(nested) => Some(FieldMask::from_spec(nested)),
                    Entry::Node(_) | Entry::All(_) => None,
                };
                (Key::Name(key.to_string()), sub)
            })
            .collect();
        Self { fields }
    }

    /// Parse a mask expression.
    pub fn parse(expression: &str) -> Result<Self, MaskError> {
        let mut parser = Parser {
            chars: expression.char_indices().peekable(),
            len: expression.len(),
        };
        parser.skip_whitespace();
        if parser.peek().is_none() {
            return Ok(Self::new());
        }
        parser.list(None)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Selected keys at this level, in order. A wildcard shows as `*`.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|key| match key {
            Key::Name(name) => name.as_str(),
            Key::Any => "*",
        })
    }

    /// The sub-mask of a literal key. `Some(None)` means the key is selected
    /// whole.
    pub fn get(&self, key: &str) -> Option<Option<&FieldMask>> {
        self.fields.get(&Key::Name(key.to_string())).map(Option::as_ref)
    }

    fn merge(&mut self, key: Key, sub: Option<FieldMask>) {
        match self.fields.entry(key) {
            Slot::Vacant(slot) => {
                slot.insert(sub);
            }
            Slot::Occupied(mut slot) => match sub {
                Some(sub) if slot.get().is_some() => {
                    if let Some(current) = slot.get_mut() {
                        for (k, v) in sub.fields {
                            current.merge(k, v);
                        }
                    }
                }
                // selecting a key whole wins over any sub-mask
                _ => {
                    slot.insert(None);
                }
            },
        }
    }

    /// Copy the selected parts of `data` into a new object.
    ///
    /// Absent keys are skipped. A sub-mask applied to an array applies to each
    /// element and drops elements that prune to nothing; applied to a scalar it
    /// drops the key. Empty nested results are dropped. The result is always
    /// an object.
    pub fn prune(&self, data: &Value) -> Value {
        match data {
            Value::Object(object) => Value::Object(self.prune_object(object)),
            _ => Value::Object(Map::new()),
        }
    }

    fn prune_object(&self, object: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, sub) in &self.fields {
            match key {
                Key::Any => {
                    for (k, v) in object {
                        if !out.contains_key(k) {
                            if let Some(v) = apply(sub.as_ref(), v) {
                                out.insert(k.clone(), v);
                            }
                        }
                    }
                }
                Key::Name(name) => {
                    if let Some(v) = object.get(name) {
                        if let Some(v) = apply(sub.as_ref(), v) {
                            out.insert(name.clone(), v);
                        }
                    }
                }
            }
        }
        out
    }
}

fn apply(sub: Option<&FieldMask>, value: &Value) -> Option<Value> {
    let Some(mask) = sub else {
        return Some(value.clone());
    };

    match value {
        Value::Object(object) => {
            let pruned = mask.prune_object(object);
            (!pruned.is_empty()).then_some(Value::Object(pruned))
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.iter().filter_map(|item| apply(Some(mask), item)).collect();
            (!pruned.is_empty()).then_some(Value::Array(pruned))
        }
        _ => None,
    }
}

impl fmt::Display for FieldMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, sub)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}")?;
            if let Some(sub) = sub {
                write!(f, "({sub})")?;
            }
        }
        Ok(())
    }
}

impl FromStr for FieldMask {
    type Err = MaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldMask::parse(s)
    }
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn position(&mut self) -> usize {
        self.peek().map_or(self.len, |(i, _)| i)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    /// `open` is the position of the enclosing `(`, if any.
    fn list(&mut self, open: Option<usize>) -> Result<FieldMask, MaskError> {
        let mut mask = FieldMask::new();
        loop {
            let (key, sub) = self.item()?;
            mask.merge(key, sub);

            self.skip_whitespace();
            match (self.peek(), open) {
                (Some((_, ',')), _) => {
                    self.chars.next();
                }
                (Some((_, ')')), Some(_)) | (None, None) => return Ok(mask),
                (None, Some(position)) => return Err(MaskError::Unclosed { position }),
                (Some((position, found)), _) => return Err(MaskError::Unexpected { found, position }),
            }
        }
    }

    fn item(&mut self) -> Result<(Key, Option<FieldMask>), MaskError> {
        let key = self.key()?;
        self.skip_whitespace();

        match self.peek() {
            Some((open, '(')) => {
                self.chars.next();
                self.skip_whitespace();
                let sub = if matches!(self.peek(), Some((_, ')'))) {
                    FieldMask::new()
                } else {
                    self.list(Some(open))?
                };
                // list() only returns Ok on a closing parenthesis
                self.chars.next();
                Ok((key, Some(sub)))
            }
            Some((_, '/')) => {
                self.chars.next();
                let (child, sub) = self.item()?;
                let mut mask = FieldMask::new();
                mask.merge(child, sub);
                Ok((key, Some(mask)))
            }
            _ => Ok((key, None)),
        }
    }

    fn key(&mut self) -> Result<Key, MaskError> {
        self.skip_whitespace();
        let position = self.position();
        let mut key = String::new();
        while let Some((_, c)) = self.peek() {
            if matches!(c, ',' | '(' | ')' | '/') {
                break;
            }
            key.push(c);
            self.chars.next();
        }

        let key = key.trim_end();
        match key {
            "" => Err(MaskError::EmptyKey { position }),
            "*" => Ok(Key::Any),
            name => Ok(Key::Name(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Asserts;
    use serde_json::json;

    #[test]
    fn derive_mask_from_spec() {
        let is = Asserts::builtin();
        let spec = ConstraintSpec::new()
            .field("foo", is.required())
            .field("tags", [is.required(), is.unique()])
            .at("address.city", is.required())
            .at("address.geo.lat", is.required());

        assert_eq!(derive_mask(&spec), "foo,tags,address(city,geo(lat))");
        assert_eq!(derive_mask(&ConstraintSpec::new()), "");
    }

    #[test]
    fn parsed_mask_matches_structural_mask() {
        let is = Asserts::builtin();
        let spec = ConstraintSpec::new()
            .field("a", is.required())
            .at("b.c", is.required())
            .field("empty", ConstraintSpec::new());

        let derived = derive_mask(&spec);
        assert_eq!(derived, "a,b(c),empty()");
        assert_eq!(FieldMask::parse(&derived).unwrap(), FieldMask::from_spec(&spec));
    }

    #[test]
    fn parse_grammar() {
        let mask: FieldMask = " a , b/c , d( e , f/g ) ".parse().unwrap();
        assert_eq!(mask.to_string(), "a,b(c),d(e,f(g))");

        let mask = FieldMask::parse("a(b),a(c)").unwrap();
        assert_eq!(mask.to_string(), "a(b,c)");

        let mask = FieldMask::parse("a(b),a").unwrap();
        assert_eq!(mask.get("a"), Some(None));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(FieldMask::parse("a,,b"), Err(MaskError::EmptyKey { position: 2 }));
        assert_eq!(FieldMask::parse("a(b"), Err(MaskError::Unclosed { position: 1 }));
        assert_eq!(
            FieldMask::parse("a)"),
            Err(MaskError::Unexpected { found: ')', position: 1 })
        );
        assert!(FieldMask::parse("a/").is_err());
    }

    #[test]
    fn prune_selects_keys() {
        let data = json!({"foo": "bar", "qux": "biz"});
        assert_eq!(prune(&data, "foo").unwrap(), json!({"foo": "bar"}));
        assert_eq!(prune(&data, "missing").unwrap(), json!({}));
        assert_eq!(prune(&data, "*").unwrap(), data);
    }

    #[test]
    fn structural_mask_keeps_star_key_literal() {
        let is = Asserts::builtin();
        let spec = ConstraintSpec::new().field("*", is.required());
        let data = json!({"*": 1, "other": 2});

        let mask = FieldMask::from_spec(&spec);
        assert_eq!(mask.prune(&data), json!({"*": 1}));
        assert_eq!(mask.get("*"), Some(None));

        let wildcard = FieldMask::new().select_all(None);
        assert_eq!(wildcard.prune(&data), data);
        assert_eq!(wildcard.get("*"), None);
        assert_eq!(wildcard.to_string(), "*");
        assert_eq!(FieldMask::parse("*").unwrap(), wildcard);
    }

    #[test]
    fn prune_nested_and_arrays() {
        let data = json!({
            "user": {"name": "Ada", "password": "secret"},
            "items": [{"id": 1, "secret": true}, {"secret": true}, 3],
            "scalar": 5
        });

        assert_eq!(
            prune(&data, "user(name),items(id),scalar(x)").unwrap(),
            json!({"user": {"name": "Ada"}, "items": [{"id": 1}]})
        );
        assert_eq!(prune(&data, "user/password").unwrap(), json!({"user": {"password": "secret"}}));
        assert_eq!(prune(&data, "user(nothing)").unwrap(), json!({}));
    }

    #[test]
    fn prune_non_object_yields_empty_object() {
        assert_eq!(prune(&json!([1, 2]), "a").unwrap(), json!({}));
        assert_eq!(prune(&json!(null), "").unwrap(), json!({}));
    }

    #[test]
    fn prune_is_idempotent() {
        let data = json!({"a": {"b": [{"c": 1, "d": 2}]}, "e": 3});
        let mask = FieldMask::parse("a(b(c)),*").unwrap();

        let once = mask.prune(&data);
        assert_eq!(mask.prune(&once), once);
    }
}
