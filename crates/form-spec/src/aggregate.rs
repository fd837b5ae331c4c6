use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::registry::FieldType;
use crate::spec::field::FormField;
use crate::spec::form::Form;
use crate::spec::submission::Submission;

/// Bucket label for submissions that left the field empty.
pub const NO_ANSWER: &str = "No Answer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Bucket {
    pub value: String,
    pub count: usize,
    /// Share of all submissions, rounded to the nearest whole percent.
    pub percent: u32,
}

/// Buckets for one chartable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSummary {
    pub field_id: String,
    pub label: String,
    pub total: usize,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("field '{field_id}' of type {kind} cannot be summarized")]
    NotEnumerable { field_id: String, kind: FieldType },
}

/// Counts answers for `field` across `submissions`.
///
/// Buckets are ordered by descending count; ties keep first-seen order. No
/// submissions yields no buckets.
pub fn summarize(
    field: &FormField,
    submissions: &[Submission],
) -> Result<Vec<Bucket>, AggregateError> {
    if !field.kind.is_chartable() {
        return Err(AggregateError::NotEnumerable {
            field_id: field.id.clone(),
            kind: field.kind,
        });
    }

    let total = submissions.len();
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for submission in submissions {
        let key = bucket_key(field, submission.value(&field.id));
        match positions.get(&key) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    // `sort_by` is stable, so equal counts stay in first-seen order.
    counts.sort_by(|left, right| right.1.cmp(&left.1));

    Ok(counts
        .into_iter()
        .map(|(value, count)| Bucket {
            percent: percent(count, total),
            value,
            count,
        })
        .collect())
}

/// Summaries for every chartable field of `form`, in schema order.
pub fn summarize_form(form: &Form, submissions: &[Submission]) -> Vec<FieldSummary> {
    form.chartable_fields()
        .filter_map(|field| {
            summarize(field, submissions)
                .ok()
                .map(|buckets| FieldSummary {
                    field_id: field.id.clone(),
                    label: field.label.clone(),
                    total: submissions.len(),
                    buckets,
                })
        })
        .collect()
}

fn bucket_key(field: &FormField, value: Option<&Value>) -> String {
    let display = value
        .map(|value| field.kind.display(&field.kind.normalize(value)))
        .unwrap_or_default();
    if display.is_empty() {
        NO_ANSWER.to_string()
    } else {
        display
    }
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * count as f64 / total as f64).round() as u32
}
