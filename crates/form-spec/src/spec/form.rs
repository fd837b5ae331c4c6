use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::field::FormField;

/// Top-level form definition: metadata plus the ordered field list.
///
/// Field order is the display order and the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,
    #[serde(alias = "userId")]
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "isPublished")]
    pub published: bool,
}

impl Form {
    /// Empty draft owned by `owner_id`.
    pub fn new(owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
            fields: Vec::new(),
            created_at: Utc::now(),
            published: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    pub fn field(&self, field_id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    pub fn field_index(&self, field_id: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.id == field_id)
    }

    /// Fields whose answers can be summarized as frequency buckets.
    pub fn chartable_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|field| field.kind.is_chartable())
    }
}
