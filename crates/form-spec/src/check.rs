use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::spec::field::FormField;
use crate::spec::form::Form;

/// Problem that keeps a form from being published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum SchemaIssue {
    #[error("field at position {index} has an empty id")]
    EmptyFieldId { index: usize },
    #[error("field id '{field_id}' is used more than once")]
    DuplicateFieldId { field_id: String },
    #[error("field '{field_id}' has an empty label")]
    EmptyLabel { field_id: String },
    #[error("select field '{field_id}' has no usable options")]
    NoUsableOptions { field_id: String },
    #[error("field '{field_id}' has min {min} greater than max {max}")]
    InvertedRange { field_id: String, min: f64, max: f64 },
    #[error("field '{field_id}' has minLength {min_length} greater than maxLength {max_length}")]
    InvertedLength {
        field_id: String,
        min_length: usize,
        max_length: usize,
    },
    #[error("field '{field_id}' has an unsupported type")]
    UnsupportedType { field_id: String },
}

/// Issues local to a single field. Bounds the type does not support are inert
/// and never reported.
pub fn check_field(field: &FormField) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let field_id = field.id.clone();

    if !field.kind.is_supported() {
        issues.push(SchemaIssue::UnsupportedType { field_id });
        return issues;
    }
    if field.label.trim().is_empty() {
        issues.push(SchemaIssue::EmptyLabel {
            field_id: field_id.clone(),
        });
    }
    if field.kind.supports_options() && field.usable_options().next().is_none() {
        issues.push(SchemaIssue::NoUsableOptions {
            field_id: field_id.clone(),
        });
    }

    let rules = &field.validation;
    if field.kind.supports_numeric_bounds()
        && let (Some(min), Some(max)) = (rules.min, rules.max)
        && min > max
    {
        issues.push(SchemaIssue::InvertedRange {
            field_id: field_id.clone(),
            min,
            max,
        });
    }
    if field.kind.supports_length_bounds()
        && let (Some(min_length), Some(max_length)) = (rules.min_length, rules.max_length)
        && min_length > max_length
    {
        issues.push(SchemaIssue::InvertedLength {
            field_id,
            min_length,
            max_length,
        });
    }

    issues
}

/// Every issue in the form, in field order.
pub fn check_form(form: &Form) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, field) in form.fields.iter().enumerate() {
        if field.id.trim().is_empty() {
            issues.push(SchemaIssue::EmptyFieldId { index });
        } else if !seen.insert(field.id.as_str()) {
            issues.push(SchemaIssue::DuplicateFieldId {
                field_id: field.id.clone(),
            });
        }
        issues.extend(check_field(field));
    }

    issues
}

impl Form {
    /// Marks the form as published when it has no issues. A published form
    /// stays editable.
    pub fn publish(&mut self) -> Result<(), Vec<SchemaIssue>> {
        let issues = check_form(self);
        if !issues.is_empty() {
            debug!(form_id = %self.id, issues = issues.len(), "publish refused");
            return Err(issues);
        }
        self.published = true;
        Ok(())
    }

    pub fn unpublish(&mut self) {
        self.published = false;
    }
}
