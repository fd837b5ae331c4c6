use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::field::ValidationRules;

/// Closed set of field types a form can contain.
///
/// Tags outside the set deserialize to [`FieldType::Unsupported`] so foreign
/// documents still load; such fields never pass validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Select,
    Checkbox,
    Textarea,
    Date,
    #[serde(other)]
    Unsupported,
}

/// How a field's answer is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// Free-form string (`text`, `textarea`, `email`, `number`, `date`).
    Scalar,
    /// Yes/no answer (`checkbox`).
    Boolean,
    /// One of the field's options (`select`).
    Enumeration,
    Unsupported,
}

/// Static capability profile of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub options: bool,
    pub numeric_bounds: bool,
    pub length_bounds: bool,
    pub shape: ValueShape,
}

const fn profile(
    options: bool,
    numeric_bounds: bool,
    length_bounds: bool,
    shape: ValueShape,
) -> Capabilities {
    Capabilities {
        options,
        numeric_bounds,
        length_bounds,
        shape,
    }
}

static TEXT: Capabilities = profile(false, false, true, ValueShape::Scalar);
static EMAIL: Capabilities = profile(false, false, false, ValueShape::Scalar);
static NUMBER: Capabilities = profile(false, true, false, ValueShape::Scalar);
static SELECT: Capabilities = profile(true, false, false, ValueShape::Enumeration);
static CHECKBOX: Capabilities = profile(false, false, false, ValueShape::Boolean);
static TEXTAREA: Capabilities = profile(false, false, true, ValueShape::Scalar);
static DATE: Capabilities = profile(false, false, false, ValueShape::Scalar);
static UNSUPPORTED: Capabilities = profile(false, false, false, ValueShape::Unsupported);

/// Display string for a `true` checkbox answer.
pub const YES: &str = "Yes";
/// Display string for a `false` checkbox answer.
pub const NO: &str = "No";

impl FieldType {
    /// Supported types in palette order.
    pub const ALL: [FieldType; 7] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Email,
        FieldType::Number,
        FieldType::Date,
        FieldType::Select,
        FieldType::Checkbox,
    ];

    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            FieldType::Text => &TEXT,
            FieldType::Email => &EMAIL,
            FieldType::Number => &NUMBER,
            FieldType::Select => &SELECT,
            FieldType::Checkbox => &CHECKBOX,
            FieldType::Textarea => &TEXTAREA,
            FieldType::Date => &DATE,
            FieldType::Unsupported => &UNSUPPORTED,
        }
    }

    pub fn supports_options(self) -> bool {
        self.capabilities().options
    }

    pub fn supports_numeric_bounds(self) -> bool {
        self.capabilities().numeric_bounds
    }

    pub fn supports_length_bounds(self) -> bool {
        self.capabilities().length_bounds
    }

    pub fn shape(self) -> ValueShape {
        self.capabilities().shape
    }

    pub fn is_supported(self) -> bool {
        self.shape() != ValueShape::Unsupported
    }

    /// Whether answers can be summarized as frequency buckets.
    pub fn is_chartable(self) -> bool {
        matches!(self.shape(), ValueShape::Boolean | ValueShape::Enumeration)
    }

    /// Rules a freshly added field starts with. Empty for every type.
    pub fn default_rules(self) -> ValidationRules {
        ValidationRules::default()
    }

    pub fn default_label(self) -> String {
        format!("New {} field", self.as_str())
    }

    /// Options seeded into a freshly added field.
    pub fn default_options(self) -> Vec<String> {
        if self.supports_options() {
            vec!["Option 1".into(), "Option 2".into()]
        } else {
            Vec::new()
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::Date => "date",
            FieldType::Unsupported => "unsupported",
        }
    }

    /// Converts a boundary value into the canonical representation for this
    /// type. Checkbox answers arrive as `"Yes"`/`"No"` from HTML forms and are
    /// stored as booleans; everything else passes through.
    pub fn normalize(self, value: &Value) -> Value {
        match (self.shape(), value) {
            (ValueShape::Boolean, Value::String(text)) => match text.as_str() {
                YES | "true" => Value::Bool(true),
                NO | "false" => Value::Bool(false),
                _ => value.clone(),
            },
            _ => value.clone(),
        }
    }

    /// Display string used by exports and aggregation buckets.
    pub fn display(self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Bool(flag) if self.shape() == ValueShape::Boolean => {
                let label = if *flag { YES } else { NO };
                label.to_string()
            }
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        FieldType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown field type '{}'", value))
    }
}
