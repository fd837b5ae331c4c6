use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use super::{FormStore, StoreError, newest_forms_first, newest_submissions_first};
use crate::spec::form::Form;
use crate::spec::submission::{Submission, SubmissionData};

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    forms: BTreeMap<String, Form>,
    submissions: HashMap<String, Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl FormStore for MemoryStore {
    fn list_forms(&self, owner_id: &str) -> Result<Vec<Form>, StoreError> {
        let tables = self.read()?;
        let mut forms: Vec<Form> = tables
            .forms
            .values()
            .filter(|form| form.is_owned_by(owner_id))
            .cloned()
            .collect();
        newest_forms_first(&mut forms);
        Ok(forms)
    }

    fn get_form(&self, form_id: &str) -> Result<Form, StoreError> {
        self.read()?
            .forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| StoreError::form_not_found(form_id))
    }

    fn save_form(&self, form: Form) -> Result<Form, StoreError> {
        let mut tables = self.write()?;
        debug!(form_id = %form.id, fields = form.fields.len(), "saving form");
        tables.forms.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    fn delete_form(&self, form_id: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.forms.remove(form_id).is_none() {
            return Err(StoreError::form_not_found(form_id));
        }
        let dropped = tables
            .submissions
            .remove(form_id)
            .map(|submissions| submissions.len())
            .unwrap_or(0);
        info!(form_id, dropped, "deleted form and its submissions");
        Ok(())
    }

    fn append_submission(
        &self,
        form_id: &str,
        data: SubmissionData,
    ) -> Result<Submission, StoreError> {
        let mut tables = self.write()?;
        if !tables.forms.contains_key(form_id) {
            return Err(StoreError::form_not_found(form_id));
        }
        let submission = Submission::new(form_id, data);
        tables
            .submissions
            .entry(form_id.to_string())
            .or_default()
            .push(submission.clone());
        debug!(form_id, submission_id = %submission.id, "appended submission");
        Ok(submission)
    }

    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError> {
        let tables = self.read()?;
        if !tables.forms.contains_key(form_id) {
            return Err(StoreError::form_not_found(form_id));
        }
        let mut submissions = tables
            .submissions
            .get(form_id)
            .cloned()
            .unwrap_or_default();
        newest_submissions_first(&mut submissions);
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[test]
    fn lists_only_owned_forms_newest_first() {
        contract::lists_only_owned_forms_newest_first(&MemoryStore::new());
    }

    #[test]
    fn save_overwrites_by_id() {
        contract::save_overwrites_by_id(&MemoryStore::new());
    }

    #[test]
    fn submissions_come_back_newest_first() {
        contract::submissions_come_back_newest_first(&MemoryStore::new());
    }

    #[test]
    fn append_to_missing_form_is_not_found() {
        contract::append_to_missing_form_is_not_found(&MemoryStore::new());
    }

    #[test]
    fn delete_cascades_to_submissions() {
        contract::delete_cascades_to_submissions(&MemoryStore::new());
    }
}
