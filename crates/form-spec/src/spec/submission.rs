use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Raw answers keyed by field id. Values are strings, booleans, numbers or null.
pub type SubmissionData = Map<String, Value>;

/// One respondent's answers. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    #[serde(default)]
    pub data: SubmissionData,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(form_id: impl Into<String>, data: SubmissionData) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            data,
            submitted_at: Utc::now(),
        }
    }

    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.data.get(field_id)
    }
}
