//! Payload schemas: per-field type, presence, range and enum rules.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Runtime type a payload field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Type name of a JSON value, using the same vocabulary as [`FieldType`].
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.as_str() == Self::name_of(value)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules for a single payload field.
///
/// Built fluently:
///
/// ```
/// use event_orchestrator::domain::FieldSpec;
///
/// let confidence = FieldSpec::number().required().range(0.0, 1.0);
/// let direction = FieldSpec::string().required().one_of(["up", "down"]);
/// assert!(confidence.is_required());
/// assert_eq!(direction.allowed().map(<[_]>::len), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    field_type: FieldType,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<Value>>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            min: None,
            max: None,
            allowed: None,
        }
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Inclusive lower bound; only meaningful for numbers.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Inclusive upper bound; only meaningful for numbers.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    #[must_use]
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max
    }

    pub fn allowed(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }
}

/// Ordered set of field rules. Fields are checked in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayloadSchema {
    fields: Vec<(String, FieldSpec)>,
}

impl PayloadSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field rule.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = spec,
            None => self.fields.push((name, spec)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
