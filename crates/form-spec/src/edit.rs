use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::FieldType;
use crate::spec::field::{FormField, ValidationRules};
use crate::spec::form::Form;

/// Direction for [`Form::move_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("unknown direction '{}'", value)),
        }
    }
}

/// Partial update merged into a field by [`Form::update_field`].
///
/// Absent attributes are left untouched. Changing `type` keeps existing
/// options and rules; the registry makes them inert where they do not apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
}

impl FormField {
    pub fn apply(&mut self, patch: FieldPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(required) = patch.required {
            self.required = required;
        }
        if let Some(options) = patch.options {
            self.options = options;
        }
        if let Some(placeholder) = patch.placeholder {
            self.placeholder = Some(placeholder);
        }
        if let Some(help_text) = patch.help_text {
            self.help_text = Some(help_text);
        }
        if let Some(validation) = patch.validation {
            self.validation = validation;
        }
    }
}

impl Form {
    /// Appends a field carrying the registry defaults for `kind`.
    pub fn add_field(&mut self, kind: FieldType) -> &FormField {
        let field = FormField::new(self.fresh_field_id(), kind);
        self.fields.push(field);
        &self.fields[self.fields.len() - 1]
    }

    /// Copies the field with `field_id` and inserts the copy right after it.
    /// Returns `None` when no such field exists.
    pub fn duplicate_field(&mut self, field_id: &str) -> Option<&FormField> {
        let index = self.field_index(field_id)?;
        let mut copy = self.fields[index].clone();
        copy.id = self.fresh_field_id();
        copy.label = format!("{} (Copy)", copy.label);
        self.fields.insert(index + 1, copy);
        Some(&self.fields[index + 1])
    }

    /// Swaps the field at `index` with its neighbour. Moving past either end
    /// is a no-op. Returns whether anything moved.
    pub fn move_field(&mut self, index: usize, direction: Direction) -> bool {
        if index >= self.fields.len() {
            return false;
        }
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.fields.len() => index + 1,
            _ => return false,
        };
        self.fields.swap(index, target);
        true
    }

    pub fn remove_field(&mut self, field_id: &str) -> Option<FormField> {
        let index = self.field_index(field_id)?;
        Some(self.fields.remove(index))
    }

    /// Merges `patch` into the field. Returns `false` if the id is unknown.
    pub fn update_field(&mut self, field_id: &str, patch: FieldPatch) -> bool {
        match self.fields.iter_mut().find(|field| field.id == field_id) {
            Some(field) => {
                field.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description.filter(|text| !text.is_empty());
    }

    /// Field id not used by any field of this form.
    pub fn fresh_field_id(&self) -> String {
        loop {
            let candidate = format!("field_{}", Uuid::new_v4().simple());
            if self.field(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
