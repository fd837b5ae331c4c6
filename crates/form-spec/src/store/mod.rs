//! Persistence seam for forms and submissions.
//!
//! The engine never talks to a storage medium directly; everything goes
//! through [`FormStore`]. Reads are snapshots with no freshness guarantee
//! past the call.

mod dir;
mod memory;

use std::fmt;

use thiserror::Error;

use crate::spec::form::Form;
use crate::spec::submission::{Submission, SubmissionData};

pub use dir::DirStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Form,
    Submission,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Form => f.write_str("form"),
            RecordKind::Submission => f.write_str("submission"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored record is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn form_not_found(form_id: &str) -> Self {
        StoreError::NotFound {
            kind: RecordKind::Form,
            id: form_id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Storage contract consumed by the service layer.
///
/// Submissions are append-only: there is no update or delete except the
/// cascade performed by [`FormStore::delete_form`].
pub trait FormStore {
    /// Forms owned by `owner_id`, newest first.
    fn list_forms(&self, owner_id: &str) -> Result<Vec<Form>, StoreError>;

    fn get_form(&self, form_id: &str) -> Result<Form, StoreError>;

    /// Inserts or fully overwrites the form with the same id.
    fn save_form(&self, form: Form) -> Result<Form, StoreError>;

    /// Removes the form and every submission recorded for it.
    fn delete_form(&self, form_id: &str) -> Result<(), StoreError>;

    fn append_submission(
        &self,
        form_id: &str,
        data: SubmissionData,
    ) -> Result<Submission, StoreError>;

    /// Submissions for `form_id`, newest first. Ties keep the most recently
    /// appended first.
    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError>;
}

fn newest_forms_first(forms: &mut [Form]) {
    forms.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}

/// Expects `submissions` in append order.
fn newest_submissions_first(submissions: &mut [Submission]) {
    submissions.reverse();
    submissions.sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every [`FormStore`] implementation must share.

    use serde_json::json;

    use super::*;

    fn data(value: &str) -> SubmissionData {
        let mut map = SubmissionData::new();
        map.insert("color".into(), json!(value));
        map
    }

    pub fn lists_only_owned_forms_newest_first(store: &impl FormStore) {
        let mut older = Form::new("alice", "Older");
        older.created_at -= chrono::Duration::hours(1);
        let older = store.save_form(older).unwrap();
        let newer = store.save_form(Form::new("alice", "Newer")).unwrap();
        store.save_form(Form::new("bob", "Other")).unwrap();

        let ids: Vec<_> = store
            .list_forms("alice")
            .unwrap()
            .into_iter()
            .map(|form| form.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    pub fn save_overwrites_by_id(store: &impl FormStore) {
        let mut form = store.save_form(Form::new("alice", "Draft")).unwrap();
        form.set_title("Final");
        store.save_form(form.clone()).unwrap();
        assert_eq!(store.get_form(&form.id).unwrap().title, "Final");
        assert_eq!(store.list_forms("alice").unwrap().len(), 1);
    }

    pub fn submissions_come_back_newest_first(store: &impl FormStore) {
        let form = store.save_form(Form::new("alice", "Colors")).unwrap();
        for color in ["Red", "Blue", "Green"] {
            store.append_submission(&form.id, data(color)).unwrap();
        }
        let colors: Vec<_> = store
            .list_submissions(&form.id)
            .unwrap()
            .into_iter()
            .map(|submission| submission.data["color"].clone())
            .collect();
        assert_eq!(colors, vec![json!("Green"), json!("Blue"), json!("Red")]);
    }

    pub fn append_to_missing_form_is_not_found(store: &impl FormStore) {
        let error = store.append_submission("missing", data("Red")).unwrap_err();
        assert!(error.is_not_found());
        assert!(store.get_form("missing").unwrap_err().is_not_found());
        assert!(store.delete_form("missing").unwrap_err().is_not_found());
    }

    pub fn delete_cascades_to_submissions(store: &impl FormStore) {
        let form = store.save_form(Form::new("alice", "Doomed")).unwrap();
        store.append_submission(&form.id, data("Red")).unwrap();
        store.delete_form(&form.id).unwrap();

        assert!(store.get_form(&form.id).unwrap_err().is_not_found());
        assert!(store.list_submissions(&form.id).unwrap_err().is_not_found());

        store.save_form(form.clone()).unwrap();
        assert!(store.list_submissions(&form.id).unwrap().is_empty());
    }
}
