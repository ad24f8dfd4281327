//! Declarative request validation.
//!
//! Each entity declares per-field rules; failures accumulate into a
//! `{field: {rule: message}}` map that is delivered to the client as a 400
//! with the map as the envelope's `message`. Uniqueness is a database
//! concern, so handlers report it through [`Validator::add_unique_violation`]
//! after consulting the mapper.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required,
    Email,
    Str,
    Int,
    Float,
    Bool,
    Min(usize),
    Max(usize),
    /// The field must match another field of the same payload.
    Same(&'static str),
}

pub type FieldRules = (&'static str, &'static [Rule]);

#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, BTreeMap<&'static str, String>>,
}

impl Validator {
    /// Run the given rules against a request payload.
    pub fn check(rules: &[FieldRules], data: &Map<String, Value>) -> Self {
        let mut validator = Validator::default();
        for (field, field_rules) in rules {
            for rule in *field_rules {
                validator.apply(rule, field, data);
            }
        }
        validator
    }

    fn apply(&mut self, rule: &Rule, field: &'static str, data: &Map<String, Value>) {
        let value = data.get(field);
        match rule {
            Rule::Required => {
                let missing = match value {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.is_empty(),
                    Some(_) => false,
                };
                if missing {
                    self.add(field, "required", format!("The field {} is required.", field));
                }
            }
            Rule::Email => {
                if let Some(v) = value {
                    let well_formed = v.as_str().map(looks_like_email).unwrap_or(false);
                    if !v.is_null() && !well_formed {
                        self.add(
                            field,
                            "email",
                            format!("The field {} must be a valid email.", field),
                        );
                    }
                }
            }
            Rule::Str => {
                if let Some(v) = value {
                    if !v.is_null() && !v.is_string() {
                        self.add(
                            field,
                            "string",
                            format!("The field {} must be a string.", field),
                        );
                    }
                }
            }
            Rule::Int => {
                if let Some(v) = value {
                    if !v.is_null() && !v.is_i64() && !v.is_u64() {
                        self.add(
                            field,
                            "integer",
                            format!("The field {} must be an integer.", field),
                        );
                    }
                }
            }
            Rule::Float => {
                if let Some(v) = value {
                    if !v.is_null() && !v.is_number() {
                        self.add(
                            field,
                            "float",
                            format!("The field {} must be a number.", field),
                        );
                    }
                }
            }
            Rule::Bool => {
                if let Some(v) = value {
                    if !v.is_null() && !v.is_boolean() {
                        self.add(
                            field,
                            "boolean",
                            format!("The field {} must be a boolean.", field),
                        );
                    }
                }
            }
            Rule::Min(len) => {
                if let Some(Value::String(s)) = value {
                    if s.chars().count() < *len {
                        self.add(
                            field,
                            "min",
                            format!("The field {} must be at least {} characters.", field, len),
                        );
                    }
                }
            }
            Rule::Max(len) => {
                if let Some(Value::String(s)) = value {
                    if s.chars().count() > *len {
                        self.add(
                            field,
                            "max",
                            format!("The field {} must be at most {} characters.", field, len),
                        );
                    }
                }
            }
            Rule::Same(other) => {
                if let (Some(a), Some(b)) = (value, data.get(*other)) {
                    if a != b {
                        self.add(
                            field,
                            "same",
                            format!("The field {} must be the same as {}.", field, other),
                        );
                    }
                }
            }
        }
    }

    /// Record a uniqueness violation detected against the row store.
    pub fn add_unique_violation(&mut self, field: &'static str) {
        self.add(field, "unique", format!("The field {} must be unique.", field));
    }

    fn add(&mut self, field: &str, rule: &'static str, message: String) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .insert(rule, message);
    }

    pub fn fails(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume the accumulated errors into a 400 validation error.
    pub fn into_error(self) -> ApiError {
        ApiError::Validation(json!(self.errors))
    }

    /// Bail out of the handler when any rule failed.
    pub fn ok_or_fail(self) -> Result<(), ApiError> {
        if self.fails() {
            Err(self.into_error())
        } else {
            Ok(())
        }
    }
}

/// Minimal structural email check: one `@` with a dotted, non-empty domain.
fn looks_like_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn required_rejects_missing_null_and_empty_values() {
        let rules: &[FieldRules] = &[("name", &[Rule::Required])];
        assert!(Validator::check(rules, &data(json!({}))).fails());
        assert!(Validator::check(rules, &data(json!({"name": null}))).fails());
        assert!(Validator::check(rules, &data(json!({"name": ""}))).fails());
        assert!(!Validator::check(rules, &data(json!({"name": "Beverages"}))).fails());
    }

    #[test]
    fn email_rule_checks_structure() {
        let rules: &[FieldRules] = &[("email", &[Rule::Email])];
        assert!(Validator::check(rules, &data(json!({"email": "not-an-email"}))).fails());
        assert!(Validator::check(rules, &data(json!({"email": "a@b"}))).fails());
        assert!(!Validator::check(rules, &data(json!({"email": "a@b.com"}))).fails());
    }

    #[test]
    fn email_rule_rejects_non_string_values() {
        let rules: &[FieldRules] = &[("email", &[Rule::Email])];
        assert!(Validator::check(rules, &data(json!({"email": 5}))).fails());
        assert!(Validator::check(rules, &data(json!({"email": ["a@b.com"]}))).fails());
        // Absence and null stay the Required rule's business.
        assert!(!Validator::check(rules, &data(json!({}))).fails());
        assert!(!Validator::check(rules, &data(json!({"email": null}))).fails());
    }

    #[test]
    fn length_rules_only_apply_to_strings_present() {
        let rules: &[FieldRules] = &[("password", &[Rule::Min(6), Rule::Max(8)])];
        assert!(Validator::check(rules, &data(json!({"password": "abc"}))).fails());
        assert!(Validator::check(rules, &data(json!({"password": "abcdefghi"}))).fails());
        assert!(!Validator::check(rules, &data(json!({"password": "abcdef"}))).fails());
        assert!(!Validator::check(rules, &data(json!({}))).fails());
    }

    #[test]
    fn same_rule_compares_against_sibling_field() {
        let rules: &[FieldRules] = &[("password", &[Rule::Same("confirmation")])];
        assert!(Validator::check(
            rules,
            &data(json!({"password": "secret1", "confirmation": "secret2"}))
        )
        .fails());
        assert!(!Validator::check(
            rules,
            &data(json!({"password": "secret1", "confirmation": "secret1"}))
        )
        .fails());
    }

    #[test]
    fn type_rules_flag_mismatches() {
        let rules: &[FieldRules] = &[("tax", &[Rule::Int]), ("admin", &[Rule::Bool])];
        let v = Validator::check(rules, &data(json!({"tax": "eight", "admin": 1})));
        let err = v.into_error().to_json();
        assert_eq!(err["code"], 400);
        assert_eq!(err["message"]["tax"]["integer"], "The field tax must be an integer.");
        assert_eq!(err["message"]["admin"]["boolean"], "The field admin must be a boolean.");
    }

    #[test]
    fn unique_violations_surface_under_the_unique_key() {
        let mut v = Validator::default();
        v.add_unique_violation("name");
        let err = v.into_error().to_json();
        assert_eq!(err["message"]["name"]["unique"], "The field name must be unique.");
    }
}
