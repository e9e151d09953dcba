//! Declarative input/output schemas for tools.
//!
//! Schemas are explicit field lists rather than arbitrary JSON Schema
//! documents. They are rendered to JSON Schema for callers, and used by the
//! gateway to validate parameters and by the recommender to judge whether a
//! query already holds the data a tool needs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::foundation::ValidationError;
use crate::domain::invocation::Parameters;

/// JSON type a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldKind {
    /// Returns the JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Any => "any",
        }
    }

    /// Checks whether a JSON value is acceptable for this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }

    /// Names the JSON type of an arbitrary value, for error messages.
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One declared field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered list of declared fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    fields: Vec<SchemaField>,
}

impl ToolSchema {
    /// Creates an empty schema (accepts anything).
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a required field.
    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name, kind, true, None)
    }

    /// Adds an optional field.
    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(name, kind, false, None)
    }

    /// Adds a field with full configuration. A later declaration of the same
    /// name replaces the earlier one.
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        required: bool,
        description: Option<String>,
    ) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(SchemaField {
            name,
            kind,
            required,
            description,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Validates caller parameters against this schema.
    ///
    /// Required fields must be present and non-null, required strings must
    /// be non-blank, and every declared field that is present must have the
    /// declared type. Undeclared parameters are passed through untouched.
    pub fn validate(&self, params: &Parameters) -> Result<(), ValidationError> {
        for field in &self.fields {
            match params.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ValidationError::missing_field(&field.name));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if !field.kind.accepts(value) {
                        return Err(ValidationError::invalid_type(
                            &field.name,
                            field.kind.as_str(),
                            FieldKind::describe(value),
                        ));
                    }
                    if field.required {
                        if let Value::String(s) = value {
                            if s.trim().is_empty() {
                                return Err(ValidationError::empty_field(&field.name));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Fraction of required fields present in `available`, in [0, 1].
    ///
    /// A schema with no required fields is fully compatible.
    pub fn compatibility<S: AsRef<str>>(&self, available: &[S]) -> f64 {
        let required: Vec<&SchemaField> = self.required_fields().collect();
        if required.is_empty() {
            return 1.0;
        }
        let present = required
            .iter()
            .filter(|f| available.iter().any(|a| a.as_ref() == f.name))
            .count();
        present as f64 / required.len() as f64
    }

    /// Renders the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut prop = Map::new();
            if field.kind != FieldKind::Any {
                prop.insert("type".into(), json!(field.kind.as_str()));
            }
            if let Some(description) = &field.description {
                prop.insert("description".into(), json!(description));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
        }
        let required: Vec<&str> = self.required_fields().map(|f| f.name.as_str()).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blast_schema() -> ToolSchema {
        ToolSchema::new()
            .required("sequence", FieldKind::String)
            .optional("database", FieldKind::String)
            .optional("e_value", FieldKind::Number)
    }

    fn params(value: Value) -> Parameters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn validate_accepts_well_formed_params() {
        let p = params(json!({"sequence": "ATCG", "e_value": 0.001, "extra": true}));
        assert!(blast_schema().validate(&p).is_ok());
    }

    #[test]
    fn validate_rejects_missing_required() {
        let p = params(json!({"database": "nr"}));
        let err = blast_schema().validate(&p).unwrap_err();
        assert_eq!(err, ValidationError::missing_field("sequence"));
    }

    #[test]
    fn validate_rejects_null_required() {
        let p = params(json!({"sequence": null}));
        assert!(matches!(
            blast_schema().validate(&p),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn validate_rejects_blank_required_string() {
        let p = params(json!({"sequence": "  "}));
        assert_eq!(
            blast_schema().validate(&p).unwrap_err(),
            ValidationError::empty_field("sequence")
        );
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let p = params(json!({"sequence": "ATCG", "e_value": "small"}));
        assert_eq!(
            blast_schema().validate(&p).unwrap_err(),
            ValidationError::invalid_type("e_value", "number", "string")
        );
    }

    #[test]
    fn integer_kind_rejects_floats() {
        assert!(FieldKind::Integer.accepts(&json!(3)));
        assert!(!FieldKind::Integer.accepts(&json!(3.5)));
        assert!(FieldKind::Number.accepts(&json!(3)));
    }

    #[test]
    fn compatibility_is_ratio_of_required_fields() {
        let schema = ToolSchema::new()
            .required("sequence", FieldKind::String)
            .required("organism", FieldKind::String);

        assert_eq!(schema.compatibility(&["sequence"]), 0.5);
        assert_eq!(schema.compatibility(&["sequence", "organism"]), 1.0);
        assert_eq!(schema.compatibility::<&str>(&[]), 0.0);
        assert_eq!(ToolSchema::new().compatibility::<&str>(&[]), 1.0);
    }

    #[test]
    fn redeclaring_a_field_replaces_it() {
        let schema = ToolSchema::new()
            .optional("sequence", FieldKind::Any)
            .required("sequence", FieldKind::String);
        assert_eq!(schema.fields().len(), 1);
        assert!(schema.fields()[0].required);
    }

    #[test]
    fn renders_json_schema() {
        let rendered = blast_schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["sequence"]["type"], "string");
        assert_eq!(rendered["required"], json!(["sequence"]));
    }
}
