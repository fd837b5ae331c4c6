use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use form_spec::{
    Admission, FieldSummary, Form, FormStore, GeneratorError, SchemaGenerator, SchemaIssue,
    StoreError, Submission, SubmissionData, ValidationResult, admit_generated, check_form,
    csv_file_name, normalize, summarize_form, to_csv, validate,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("form '{0}' not found")]
    NotFound(String),
    #[error("form '{form_id}' belongs to another owner")]
    OwnershipViolation { form_id: String },
    #[error("field '{0}' not found")]
    FieldNotFound(String),
    #[error("submission rejected with {} field error(s)", .0.errors.len())]
    Rejected(ValidationResult),
    #[error("form cannot be published: {} issue(s)", .0.len())]
    NotPublishable(Vec<SchemaIssue>),
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id, .. } => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Owner-facing results view of one form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub form_id: String,
    pub title: String,
    pub published: bool,
    pub submission_count: usize,
    pub summaries: Vec<FieldSummary>,
}

/// CSV download ready to be written or streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub rows: usize,
    pub contents: String,
}

/// Boundary layer over a [`FormStore`].
///
/// Owner-scoped operations take the acting user's id and refuse forms owned by
/// someone else. Public operations (`public_form`, `submit`) only see
/// published forms.
pub struct FormService<S> {
    store: S,
}

impl<S: FormStore> FormService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_form(
        &self,
        owner_id: &str,
        title: &str,
        description: Option<String>,
    ) -> ServiceResult<Form> {
        let mut form = Form::new(owner_id, title);
        form.set_description(description);
        let form = self.store.save_form(form)?;
        info!(form_id = %form.id, owner_id, "created form");
        Ok(form)
    }

    pub fn list_forms(&self, owner_id: &str) -> ServiceResult<Vec<Form>> {
        Ok(self.store.list_forms(owner_id)?)
    }

    /// Loads a form on behalf of `owner_id`.
    pub fn form_for_owner(&self, owner_id: &str, form_id: &str) -> ServiceResult<Form> {
        let form = self.store.get_form(form_id)?;
        ensure_owner(&form, owner_id)?;
        Ok(form)
    }

    /// Loads, edits and saves a form in one step.
    pub fn edit_form<F>(&self, owner_id: &str, form_id: &str, edit: F) -> ServiceResult<Form>
    where
        F: FnOnce(&mut Form) -> ServiceResult<()>,
    {
        let mut form = self.form_for_owner(owner_id, form_id)?;
        edit(&mut form)?;
        self.store_checked(form)
    }

    /// Full overwrite of a form the caller owns.
    pub fn save_form(&self, owner_id: &str, form: Form) -> ServiceResult<Form> {
        ensure_owner(&form, owner_id)?;
        match self.store.get_form(&form.id) {
            Ok(existing) => ensure_owner(&existing, owner_id)?,
            Err(StoreError::NotFound { .. }) => {}
            Err(other) => return Err(other.into()),
        }
        self.store_checked(form)
    }

    /// Saves `form`, refusing a published form that no longer passes
    /// [`check_form`].
    fn store_checked(&self, form: Form) -> ServiceResult<Form> {
        if form.published {
            let issues = check_form(&form);
            if !issues.is_empty() {
                warn!(
                    form_id = %form.id,
                    issues = issues.len(),
                    "refusing to save published form"
                );
                return Err(ServiceError::NotPublishable(issues));
            }
        }
        Ok(self.store.save_form(form)?)
    }

    pub fn delete_form(&self, owner_id: &str, form_id: &str) -> ServiceResult<()> {
        self.form_for_owner(owner_id, form_id)?;
        Ok(self.store.delete_form(form_id)?)
    }

    pub fn publish(&self, owner_id: &str, form_id: &str) -> ServiceResult<Form> {
        self.edit_form(owner_id, form_id, |form| {
            form.publish().map_err(ServiceError::NotPublishable)
        })
    }

    pub fn unpublish(&self, owner_id: &str, form_id: &str) -> ServiceResult<Form> {
        self.edit_form(owner_id, form_id, |form| {
            form.unpublish();
            Ok(())
        })
    }

    /// Latest saved version of a published form. Drafts look absent.
    pub fn public_form(&self, form_id: &str) -> ServiceResult<Form> {
        let form = self.store.get_form(form_id)?;
        if form.published {
            Ok(form)
        } else {
            Err(ServiceError::NotFound(form_id.to_string()))
        }
    }

    /// Validates `answers` against the current schema and stores the
    /// canonical copy when every field passes.
    pub fn submit(&self, form_id: &str, answers: &SubmissionData) -> ServiceResult<Submission> {
        let form = self.public_form(form_id)?;
        let result = validate(&form, answers);
        if !result.valid {
            warn!(form_id, errors = result.errors.len(), "submission rejected");
            return Err(ServiceError::Rejected(result));
        }
        let submission = self
            .store
            .append_submission(form_id, normalize(&form, answers))?;
        info!(form_id, submission_id = %submission.id, "submission accepted");
        Ok(submission)
    }

    /// Submissions for an owned form, newest first.
    pub fn submissions(&self, owner_id: &str, form_id: &str) -> ServiceResult<Vec<Submission>> {
        self.form_for_owner(owner_id, form_id)?;
        Ok(self.store.list_submissions(form_id)?)
    }

    pub fn dashboard(&self, owner_id: &str, form_id: &str) -> ServiceResult<Dashboard> {
        let form = self.form_for_owner(owner_id, form_id)?;
        let submissions = self.store.list_submissions(form_id)?;
        Ok(Dashboard {
            form_id: form.id.clone(),
            title: form.title.clone(),
            published: form.published,
            submission_count: submissions.len(),
            summaries: summarize_form(&form, &submissions),
        })
    }

    /// CSV of every submission, newest first, as the dashboard lists them.
    pub fn export_csv(&self, owner_id: &str, form_id: &str) -> ServiceResult<CsvExport> {
        let form = self.form_for_owner(owner_id, form_id)?;
        let submissions = self.store.list_submissions(form_id)?;
        Ok(CsvExport {
            file_name: csv_file_name(&form.title),
            rows: submissions.len(),
            contents: to_csv(&form, &submissions),
        })
    }

    /// Asks `generator` for fields and merges the ones that pass admission.
    pub fn suggest_fields(
        &self,
        owner_id: &str,
        form_id: &str,
        generator: &impl SchemaGenerator,
        description: &str,
    ) -> ServiceResult<(Form, Admission)> {
        let mut form = self.form_for_owner(owner_id, form_id)?;
        let suggested = generator.suggest_fields(description)?;
        let admission = admit_generated(&mut form, suggested);
        let form = self.store_checked(form)?;
        info!(
            form_id,
            admitted = admission.admitted.len(),
            rejected = admission.rejected.len(),
            "merged generated fields"
        );
        Ok((form, admission))
    }
}

fn ensure_owner(form: &Form, owner_id: &str) -> ServiceResult<()> {
    if form.is_owned_by(owner_id) {
        Ok(())
    } else {
        warn!(form_id = %form.id, owner_id, "ownership check failed");
        Err(ServiceError::OwnershipViolation {
            form_id: form.id.clone(),
        })
    }
}
