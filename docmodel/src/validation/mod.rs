use crate::error::Result;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

/// A boolean check over a field value. `Value::Null` stands for "unset".
pub type Predicate = Box<dyn Fn(&Value) -> bool>;

/// A named predicate attached to a field.
pub struct Constraint {
    name: String,
    check: Predicate,
}

impl Constraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passes(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint").field("name", &self.name).finish()
    }
}

/// The constraints one field failed during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub constraints: Vec<String>,
}

/// A named attribute of a schema with an ordered list of constraints.
#[derive(Debug)]
pub struct Field {
    name: String,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the attached constraints, in declaration order.
    pub fn constraint_names(&self) -> Vec<&str> {
        self.constraints.iter().map(|c| c.name()).collect()
    }

    /// Append a named constraint. Constraints run in the order they were added.
    pub fn add_constraint<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.constraints.push(Constraint {
            name: name.into(),
            check: Box::new(check),
        });
        self
    }

    pub fn cant_be_blank(&mut self) -> &mut Self {
        self.add_constraint("cant_be_blank", |v| !is_blank(v))
    }

    /// Blank values pass; pair with `cant_be_blank` to require a value.
    pub fn min_length(&mut self, min: usize) -> &mut Self {
        self.add_constraint("min_length", move |v| is_blank(v) || value_length(v) >= min)
    }

    pub fn max_length(&mut self, max: usize) -> &mut Self {
        self.add_constraint("max_length", move |v| is_blank(v) || value_length(v) <= max)
    }

    /// String values must match `pattern`. Blank values pass, non-strings fail.
    pub fn matches(&mut self, pattern: &str) -> Result<&mut Self> {
        let re = Regex::new(pattern)?;
        Ok(self.add_constraint("matches", move |v| match v {
            Value::String(s) => s.is_empty() || re.is_match(s),
            other => is_blank(other),
        }))
    }

    /// The value's text must be one of `allowed`. Blank values pass.
    pub fn one_of<I, S>(&mut self, allowed: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        self.add_constraint("one_of", move |v| {
            is_blank(v) || scalar_text(v).is_some_and(|s| allowed.iter().any(|a| *a == s))
        })
    }

    /// Evaluate every constraint against `value`, returning the names of the
    /// ones that failed in declaration order. Empty means valid.
    pub fn errors_for(&self, value: &Value) -> Vec<String> {
        self.constraints
            .iter()
            .filter(|c| !c.passes(value))
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Null, empty strings and empty containers are blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_blank(&tagged.value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Text form of a scalar value, `None` for containers and null.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn value_length(value: &Value) -> usize {
    match value {
        Value::Sequence(seq) => seq.len(),
        Value::Mapping(map) => map.len(),
        other => scalar_text(other).map(|s| s.chars().count()).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Value {
        Value::String(s.into())
    }

    #[test]
    fn test_blankness() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&string("")));
        assert!(is_blank(&Value::Sequence(vec![])));
        assert!(is_blank(&Value::Mapping(serde_yaml::Mapping::new())));

        assert!(!is_blank(&string(" ")));
        assert!(!is_blank(&string("Myles")));
        assert!(!is_blank(&Value::Bool(false)));
        assert!(!is_blank(&Value::Number(0i64.into())));
        assert!(!is_blank(&Value::Sequence(vec![string("a")])));
    }

    #[test]
    fn test_no_constraints_is_valid() {
        let field = Field::new("slug");
        assert!(field.errors_for(&Value::Null).is_empty());
        assert!(field.errors_for(&string("ambalas")).is_empty());
    }

    #[test]
    fn test_cant_be_blank() {
        let mut field = Field::new("name");
        field.cant_be_blank();

        assert_eq!(field.errors_for(&Value::Null), vec!["cant_be_blank"]);
        assert_eq!(field.errors_for(&string("")), vec!["cant_be_blank"]);
        assert!(field.errors_for(&string("Myles")).is_empty());
    }

    #[test]
    fn test_errors_in_declaration_order() {
        let mut field = Field::new("code");
        field
            .add_constraint("starts_with_x", |v| v.as_str().is_some_and(|s| s.starts_with('x')))
            .add_constraint("even_length", |v| v.as_str().is_some_and(|s| s.len() % 2 == 0))
            .add_constraint("not_empty", |v| !is_blank(v));

        assert_eq!(
            field.errors_for(&string("abc")),
            vec!["starts_with_x", "even_length"]
        );
        assert_eq!(
            field.errors_for(&Value::Null),
            vec!["starts_with_x", "even_length", "not_empty"]
        );
        assert!(field.errors_for(&string("xy")).is_empty());
        assert_eq!(field.constraint_names(), vec!["starts_with_x", "even_length", "not_empty"]);
    }

    #[test]
    fn test_length_constraints() {
        let mut field = Field::new("phone");
        field.min_length(3).max_length(5);

        assert_eq!(field.errors_for(&string("12")), vec!["min_length"]);
        assert_eq!(field.errors_for(&string("123456")), vec!["max_length"]);
        assert!(field.errors_for(&string("1234")).is_empty());
        // Blank is left to cant_be_blank
        assert!(field.errors_for(&Value::Null).is_empty());
        // Multi-byte characters count once
        assert!(field.errors_for(&string("ñññ")).is_empty());
    }

    #[test]
    fn test_matches() {
        let mut field = Field::new("slug");
        field.matches("^[a-z0-9-]+$").unwrap();

        assert!(field.errors_for(&string("ambalas-2")).is_empty());
        assert_eq!(field.errors_for(&string("Ambalas")), vec!["matches"]);
        assert_eq!(field.errors_for(&Value::Bool(true)), vec!["matches"]);
        assert!(field.errors_for(&Value::Null).is_empty());
    }

    #[test]
    fn test_matches_rejects_bad_pattern() {
        let mut field = Field::new("slug");
        assert!(field.matches("(unclosed").is_err());
    }

    #[test]
    fn test_one_of() {
        let mut field = Field::new("status");
        field.one_of(["open", "closed"]);

        assert!(field.errors_for(&string("open")).is_empty());
        assert_eq!(field.errors_for(&string("gone")), vec!["one_of"]);
        assert_eq!(
            field.errors_for(&Value::Sequence(vec![string("open")])),
            vec!["one_of"]
        );
        assert!(field.errors_for(&Value::Null).is_empty());
    }
}
