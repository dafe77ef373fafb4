//! Declarative record schemas.
//!
//! A `Schema` is a list of field rules. It checks single fields at the merge
//! boundary (`validate_field`) and whole records (`validate`), producing either
//! a typed value or a field-path → message map.

pub mod schemas;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::FieldErrors;

pub use schemas::{
    ActivityLevel, CompleteOnboarding, Gender, Goals, PersonalInfo, Preferences, PrimaryGoal,
    goals_schema, personal_info_schema, preferences_schema, validate_complete,
};

/// Constraint on a single field value.
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// String with a character count in `min..=max`.
    Text { min: usize, max: usize },
    /// Whole number in `min..=max`.
    Integer { min: i64, max: i64 },
    /// Any number in `min..=max`.
    Number { min: f64, max: f64 },
    /// String drawn from a fixed set.
    OneOf(&'static [&'static str]),
    /// String matching a regex; `hint` describes the expected shape.
    Pattern {
        regex: &'static Regex,
        hint: &'static str,
    },
    Boolean,
    /// Array of strings, each `min_len..=max_len` characters.
    TextList {
        max_items: usize,
        min_len: usize,
        max_len: usize,
    },
}

impl FieldRule {
    /// Check a non-null value against the rule.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::Text { min, max } => {
                let s = value.as_str().ok_or("must be a string")?;
                check_len(s.trim().chars().count(), *min, *max)
            }
            Self::Integer { min, max } => {
                let n = value.as_i64().ok_or("must be a whole number")?;
                if n < *min {
                    Err(format!("must be at least {min}"))
                } else if n > *max {
                    Err(format!("must be at most {max}"))
                } else {
                    Ok(())
                }
            }
            Self::Number { min, max } => {
                let n = value.as_f64().ok_or("must be a number")?;
                if !n.is_finite() {
                    Err("must be a finite number".to_string())
                } else if n < *min {
                    Err(format!("must be at least {min}"))
                } else if n > *max {
                    Err(format!("must be at most {max}"))
                } else {
                    Ok(())
                }
            }
            Self::OneOf(options) => {
                let s = value.as_str().ok_or("must be a string")?;
                if options.contains(&s) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", options.join(", ")))
                }
            }
            Self::Pattern { regex, hint } => {
                let s = value.as_str().ok_or("must be a string")?;
                if regex.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("must match {hint}"))
                }
            }
            Self::Boolean => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| "must be true or false".to_string()),
            Self::TextList {
                max_items,
                min_len,
                max_len,
            } => {
                let items = value.as_array().ok_or("must be a list")?;
                if items.len() > *max_items {
                    return Err(format!("must have at most {max_items} items"));
                }
                for item in items {
                    let s = item.as_str().ok_or("items must be strings")?;
                    check_len(s.trim().chars().count(), *min_len, *max_len)
                        .map_err(|e| format!("items {e}"))?;
                }
                Ok(())
            }
        }
    }
}

fn check_len(len: usize, min: usize, max: usize) -> Result<(), String> {
    if len < min {
        if min == 1 {
            Err("must not be empty".to_string())
        } else {
            Err(format!("must be at least {min} characters"))
        }
    } else if len > max {
        Err(format!("must be at most {max} characters"))
    } else {
        Ok(())
    }
}

/// One named field of a schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, rule: FieldRule) -> Self {
        Self {
            name,
            rule,
            required: false,
        }
    }
}

/// A named set of field rules.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate one field in isolation. Unknown fields are rejected; `null`
    /// is accepted only for optional fields.
    pub fn validate_field(&self, name: &str, value: &Value) -> Result<(), String> {
        let spec = self
            .field(name)
            .ok_or_else(|| format!("unknown field for {}", self.name))?;
        if value.is_null() {
            return if spec.required {
                Err("is required".to_string())
            } else {
                Ok(())
            };
        }
        spec.rule.check(value)
    }

    /// Check every field of `record`, collecting one message per failing field.
    pub fn check(&self, record: &Map<String, Value>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for spec in &self.fields {
            match record.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        errors.insert(spec.name.to_string(), "is required".to_string());
                    }
                }
                Some(value) => {
                    if let Err(message) = spec.rule.check(value) {
                        errors.insert(spec.name.to_string(), message);
                    }
                }
            }
        }
        errors
    }

    /// Validate the whole record and decode it into `T`.
    pub fn validate<T: DeserializeOwned>(&self, record: &Map<String, Value>) -> Result<T, FieldErrors> {
        let errors = self.check(record);
        if !errors.is_empty() {
            return Err(errors);
        }

        let known: Map<String, Value> = record
            .iter()
            .filter(|(k, v)| self.field(k).is_some() && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        serde_json::from_value(Value::Object(known)).map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.insert(self.name.to_string(), e.to_string());
            errors
        })
    }
}
