//! Admission of fields produced outside the editor.
//!
//! A [`SchemaGenerator`] is an untrusted producer: every field it returns goes
//! through the same checks as a hand-edited field before it can join a form.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::check::{SchemaIssue, check_field};
use crate::spec::field::FormField;
use crate::spec::form::Form;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator output is not a field list: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// Suggests fields from a free-text description of the form.
///
/// Best effort: an empty list is a valid answer.
pub trait SchemaGenerator {
    fn suggest_fields(&self, description: &str) -> Result<Vec<FormField>, GeneratorError>;
}

/// A generated field that failed admission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedField {
    pub label: String,
    pub issues: Vec<SchemaIssue>,
}

/// Result of merging generated fields into a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Admission {
    pub admitted: Vec<String>,
    pub rejected: Vec<RejectedField>,
}

/// Re-validates `fields` and appends the ones that pass to `form`.
///
/// Each admitted field gets a fresh id unique within `form` (generator ids
/// are never trusted) and loses `options` unless its type takes them.
pub fn admit_generated(form: &mut Form, fields: Vec<FormField>) -> Admission {
    let mut admission = Admission::default();

    for mut field in fields {
        field.id = form.fresh_field_id();
        if !field.kind.supports_options() {
            field.options.clear();
        }

        let issues = check_field(&field);
        if issues.is_empty() {
            admission.admitted.push(field.id.clone());
            form.fields.push(field);
        } else {
            warn!(
                form_id = %form.id,
                label = %field.label,
                issues = issues.len(),
                "dropping generated field"
            );
            admission.rejected.push(RejectedField {
                label: field.label,
                issues,
            });
        }
    }

    admission
}

/// Parses a JSON array of fields, as returned by a model-backed generator.
pub fn parse_fields(json: &str) -> Result<Vec<FormField>, GeneratorError> {
    Ok(serde_json::from_str(json)?)
}
