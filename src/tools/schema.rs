//! Parameter schemas for tool arguments.
//!
//! A [`ParameterSchema`] is declared once per tool. The registry checks every
//! incoming argument object against it before the handler sees anything, and
//! the same schema is rendered to JSON Schema for the planning runtime.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// The JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    /// JSON Schema type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a single named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
    /// Upper bound on string length, in characters
    pub max_length: Option<usize>,
}

impl ParameterSpec {
    /// A required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
            max_length: None,
        }
    }

    /// An optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    /// Caps the length of a string parameter.
    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// What is wrong with one field of an argument object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    WrongType { expected: String, found: String },
    TooLong { max_length: usize },
    Unexpected,
}

/// A single offending field reported by argument validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name, or `$` for the argument object itself
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "'{}' is required", self.field),
            FieldProblem::WrongType { expected, found } => {
                write!(f, "'{}' must be {}, got {}", self.field, expected, found)
            }
            FieldProblem::TooLong { max_length } => {
                write!(f, "'{}' exceeds {} characters", self.field, max_length)
            }
            FieldProblem::Unexpected => write!(f, "'{}' is not a known parameter", self.field),
        }
    }
}

/// The full parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    params: Vec<ParameterSpec>,
}

impl ParameterSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    #[must_use]
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Checks `args` against the schema.
    ///
    /// `null` is treated as an empty object. All problems are collected rather
    /// than stopping at the first, so the caller can fix them in one go.
    ///
    /// # Errors
    ///
    /// Returns every offending field if the arguments do not conform.
    pub fn validate(&self, args: &Value) -> Result<(), Vec<FieldError>> {
        let empty = Map::new();
        let object = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(vec![FieldError::new(
                    "$",
                    FieldProblem::WrongType {
                        expected: "object".to_string(),
                        found: json_type_name(other).to_string(),
                    },
                )]);
            }
        };

        let mut errors = Vec::new();

        for spec in &self.params {
            match object.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    errors.push(FieldError::new(&spec.name, FieldProblem::Missing));
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.param_type.matches(value) => {
                    errors.push(FieldError::new(
                        &spec.name,
                        FieldProblem::WrongType {
                            expected: spec.param_type.as_str().to_string(),
                            found: json_type_name(value).to_string(),
                        },
                    ));
                }
                Some(Value::String(s)) => {
                    if let Some(max_length) = spec.max_length {
                        if s.chars().count() > max_length {
                            errors.push(FieldError::new(
                                &spec.name,
                                FieldProblem::TooLong { max_length },
                            ));
                        }
                    }
                }
                Some(_) => {}
            }
        }

        let mut unexpected: Vec<&String> = object
            .keys()
            .filter(|key| !self.params.iter().any(|p| &p.name == *key))
            .collect();
        unexpected.sort();
        errors.extend(
            unexpected
                .into_iter()
                .map(|key| FieldError::new(key.as_str(), FieldProblem::Unexpected)),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Renders the schema as a JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.params {
            let mut property = json!({
                "type": spec.param_type.as_str(),
                "description": spec.description,
            });
            if let Some(max) = spec.max_length {
                property["maxLength"] = json!(max);
            }
            properties.insert(spec.name.clone(), property);
            if spec.required {
                required.push(Value::String(spec.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(ParameterSpec::required("path", ParamType::String, "Relative path"))
            .with(
                ParameterSpec::optional("content", ParamType::String, "Text").with_max_length(5),
            )
    }

    #[test]
    fn accepts_conforming_arguments() {
        let schema = file_schema();
        assert!(schema.validate(&json!({"path": "a.txt"})).is_ok());
        assert!(schema.validate(&json!({"path": "a.txt", "content": "hi"})).is_ok());
        assert!(schema.validate(&json!({"path": "a.txt", "content": null})).is_ok());
    }

    #[test]
    fn reports_missing_required() {
        let errors = file_schema().validate(&json!({})).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("path", FieldProblem::Missing)]);
    }

    #[test]
    fn null_arguments_behave_like_empty_object() {
        let errors = file_schema().validate(&Value::Null).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "path");
    }

    #[test]
    fn collects_all_problems() {
        let errors = file_schema()
            .validate(&json!({"path": 7, "content": "too long", "mode": "x", "extra": 1}))
            .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["path", "content", "extra", "mode"]);
        assert!(matches!(errors[0].problem, FieldProblem::WrongType { .. }));
        assert_eq!(errors[1].problem, FieldProblem::TooLong { max_length: 5 });
        assert_eq!(errors[2].problem, FieldProblem::Unexpected);
    }

    #[test]
    fn rejects_non_object() {
        let errors = file_schema().validate(&json!(["a.txt"])).unwrap_err();
        assert_eq!(errors[0].field, "$");
        assert_eq!(
            errors[0].problem,
            FieldProblem::WrongType {
                expected: "object".to_string(),
                found: "array".to_string()
            }
        );
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let schema = ParameterSchema::new().with(ParameterSpec::required(
            "n",
            ParamType::Integer,
            "count",
        ));
        assert!(schema.validate(&json!({"n": 3})).is_ok());
        assert!(schema.validate(&json!({"n": 3.5})).is_err());
    }

    #[test]
    fn json_schema_shape() {
        let schema = file_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["properties"]["content"]["maxLength"], 5);
        assert_eq!(schema["required"], json!(["path"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn field_error_display() {
        let error = FieldError::new(
            "to",
            FieldProblem::WrongType {
                expected: "string".to_string(),
                found: "number".to_string(),
            },
        );
        assert_eq!(error.to_string(), "'to' must be string, got number");
    }
}
