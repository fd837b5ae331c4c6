use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::registry::{FieldType, ValueShape};
use crate::spec::field::FormField;
use crate::spec::form::Form;
use crate::spec::submission::SubmissionData;

// WHATWG HTML `input[type=email]` grammar.
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reason a value was rejected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Error)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("this field is required")]
    MissingRequired,
    #[error("value has an invalid format")]
    InvalidFormat,
    #[error("value is below the minimum")]
    BelowMin,
    #[error("value is above the maximum")]
    AboveMax,
    #[error("value is too short")]
    TooShort,
    #[error("value is too long")]
    TooLong,
    #[error("field type is not supported")]
    UnsupportedType,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingRequired => "missing_required",
            Rejection::InvalidFormat => "invalid_format",
            Rejection::BelowMin => "below_min",
            Rejection::AboveMax => "above_max",
            Rejection::TooShort => "too_short",
            Rejection::TooLong => "too_long",
            Rejection::UnsupportedType => "unsupported_type",
        }
    }
}

/// Outcome of checking one value against one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(*reason),
        }
    }
}

/// Field-level error reported for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub field_id: String,
    pub label: String,
    pub code: Rejection,
    pub message: String,
}

/// Outcome of checking a whole submission against a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
    /// Keys not matching any field. Reported but never invalidating.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_fields: Vec<String>,
}

impl ValidationResult {
    pub fn error_for(&self, field_id: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|error| error.field_id == field_id)
    }
}

/// Checks every field of `form` against `answers`, in schema order.
///
/// Used both for public submissions and for the builder preview.
pub fn validate(form: &Form, answers: &SubmissionData) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in &form.fields {
        let raw = answers.get(&field.id);
        if let Verdict::Rejected(code) = validate_field(field, raw) {
            if code == Rejection::MissingRequired {
                missing_required.push(field.id.clone());
            }
            errors.push(ValidationError {
                field_id: field.id.clone(),
                label: field.label.clone(),
                code,
                message: describe(field, code),
            });
        }
    }

    let unknown_fields = answers
        .keys()
        .filter(|key| form.field(key).is_none())
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

/// Canonical copy of `answers`: checkbox strings become booleans and keys
/// that match no field are dropped.
pub fn normalize(form: &Form, answers: &SubmissionData) -> SubmissionData {
    form.fields
        .iter()
        .filter_map(|field| {
            answers
                .get(&field.id)
                .map(|value| (field.id.clone(), field.kind.normalize(value)))
        })
        .collect()
}

/// Decides whether `raw` is an acceptable answer for `field`.
///
/// Total over every field/value pair. Bounds that the registry does not
/// associate with the field's type are ignored.
pub fn validate_field(field: &FormField, raw: Option<&Value>) -> Verdict {
    let value = raw.map(|value| field.kind.normalize(value));
    let value = value.as_ref();

    if field.required && is_blank(value, true) {
        return Verdict::Rejected(Rejection::MissingRequired);
    }
    if !field.kind.is_supported() {
        return Verdict::Rejected(Rejection::UnsupportedType);
    }
    let Some(value) = value.filter(|value| !is_blank(Some(*value), false)) else {
        return Verdict::Accepted;
    };

    match check_shape(field, value) {
        Some(Shape::Number(number)) => check_range(field, number),
        Some(Shape::Text(text)) => check_length(field, text),
        Some(Shape::Other) => Verdict::Accepted,
        None => Verdict::Rejected(Rejection::InvalidFormat),
    }
}

fn is_blank(value: Option<&Value>, false_is_blank: bool) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Bool(flag)) => false_is_blank && !flag,
        Some(_) => false,
    }
}

enum Shape<'a> {
    Number(f64),
    Text(&'a str),
    Other,
}

fn check_shape<'a>(field: &FormField, value: &'a Value) -> Option<Shape<'a>> {
    match field.kind {
        FieldType::Text | FieldType::Textarea => value.as_str().map(Shape::Text),
        FieldType::Email => value
            .as_str()
            .filter(|text| is_email(text))
            .map(|_| Shape::Other),
        FieldType::Number => parse_number(value).map(Shape::Number),
        FieldType::Date => value
            .as_str()
            .filter(|text| NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).is_ok())
            .map(|_| Shape::Other),
        FieldType::Select => value
            .as_str()
            .filter(|text| field.options.iter().any(|option| option == text))
            .map(|_| Shape::Other),
        FieldType::Checkbox => value.is_boolean().then_some(Shape::Other),
        FieldType::Unsupported => None,
    }
}

fn is_email(text: &str) -> bool {
    EMAIL.as_ref().is_some_and(|regex| regex.is_match(text))
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn check_range(field: &FormField, number: f64) -> Verdict {
    if !field.kind.supports_numeric_bounds() {
        return Verdict::Accepted;
    }
    let rules = &field.validation;
    if let Some(min) = rules.min
        && number < min
    {
        return Verdict::Rejected(Rejection::BelowMin);
    }
    if let Some(max) = rules.max
        && number > max
    {
        return Verdict::Rejected(Rejection::AboveMax);
    }
    Verdict::Accepted
}

fn check_length(field: &FormField, text: &str) -> Verdict {
    if !field.kind.supports_length_bounds() {
        return Verdict::Accepted;
    }
    let rules = &field.validation;
    let length = text.chars().count();
    if let Some(min_length) = rules.min_length
        && length < min_length
    {
        return Verdict::Rejected(Rejection::TooShort);
    }
    if let Some(max_length) = rules.max_length
        && length > max_length
    {
        return Verdict::Rejected(Rejection::TooLong);
    }
    Verdict::Accepted
}

fn describe(field: &FormField, code: Rejection) -> String {
    let rules = &field.validation;
    match code {
        Rejection::MissingRequired => "This field is required".into(),
        Rejection::InvalidFormat => match field.kind.shape() {
            ValueShape::Enumeration => "Choose one of the listed options".into(),
            ValueShape::Boolean => "Expected Yes or No".into(),
            _ => format!("Enter a valid {}", field.kind),
        },
        Rejection::BelowMin => match rules.min {
            Some(min) => format!("Must be at least {}", min),
            None => code.to_string(),
        },
        Rejection::AboveMax => match rules.max {
            Some(max) => format!("Must be at most {}", max),
            None => code.to_string(),
        },
        Rejection::TooShort => match rules.min_length {
            Some(min_length) => format!("Must be at least {} characters", min_length),
            None => code.to_string(),
        },
        Rejection::TooLong => match rules.max_length {
            Some(max_length) => format!("Must be at most {} characters", max_length),
            None => code.to_string(),
        },
        Rejection::UnsupportedType => code.to_string(),
    }
}
