use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{FormStore, StoreError, newest_forms_first, newest_submissions_first};
use crate::spec::form::Form;
use crate::spec::submission::{Submission, SubmissionData};

/// Directory-backed store.
///
/// Layout: `forms/<id>.json` holds one pretty-printed form and
/// `submissions/<form id>.jsonl` holds one submission per line, appended.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { root: root.into() };
        fs::create_dir_all(store.forms_dir())?;
        fs::create_dir_all(store.submissions_dir())?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn forms_dir(&self) -> PathBuf {
        self.root.join("forms")
    }

    fn submissions_dir(&self) -> PathBuf {
        self.root.join("submissions")
    }

    fn form_path(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        checked_id(form_id).map(|id| self.forms_dir().join(format!("{}.json", id)))
    }

    fn submissions_path(&self, form_id: &str) -> Result<PathBuf, StoreError> {
        checked_id(form_id).map(|id| self.submissions_dir().join(format!("{}.jsonl", id)))
    }

    fn ensure_form(&self, form_id: &str) -> Result<(), StoreError> {
        if self.form_path(form_id)?.is_file() {
            Ok(())
        } else {
            Err(StoreError::form_not_found(form_id))
        }
    }
}

// Ids become file names, so anything outside a conservative alphabet is
// treated as absent rather than joined onto a path.
fn checked_id(id: &str) -> Result<&str, StoreError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(id)
    } else {
        Err(StoreError::form_not_found(id))
    }
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, contents)?;
    fs::rename(staging, path)
}

impl FormStore for DirStore {
    fn list_forms(&self, owner_id: &str) -> Result<Vec<Form>, StoreError> {
        let mut forms = Vec::new();
        for entry in fs::read_dir(self.forms_dir())? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let form: Form = match serde_json::from_str(&fs::read_to_string(&path)?) {
                Ok(form) => form,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable form");
                    continue;
                }
            };
            if form.is_owned_by(owner_id) {
                forms.push(form);
            }
        }
        forms.sort_by(|left, right| left.id.cmp(&right.id));
        newest_forms_first(&mut forms);
        Ok(forms)
    }

    fn get_form(&self, form_id: &str) -> Result<Form, StoreError> {
        let path = self.form_path(form_id)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::form_not_found(form_id));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_form(&self, form: Form) -> Result<Form, StoreError> {
        let path = self.form_path(&form.id)?;
        let contents = serde_json::to_string_pretty(&form)?;
        write_atomic(&path, &contents)?;
        debug!(form_id = %form.id, path = %path.display(), "saved form");
        Ok(form)
    }

    fn delete_form(&self, form_id: &str) -> Result<(), StoreError> {
        self.ensure_form(form_id)?;
        match fs::remove_file(self.submissions_path(form_id)?) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::remove_file(self.form_path(form_id)?)?;
        info!(form_id, "deleted form and its submissions");
        Ok(())
    }

    fn append_submission(
        &self,
        form_id: &str,
        data: SubmissionData,
    ) -> Result<Submission, StoreError> {
        self.ensure_form(form_id)?;
        let submission = Submission::new(form_id, data);
        let mut line = serde_json::to_string(&submission)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.submissions_path(form_id)?)?;
        file.write_all(line.as_bytes())?;
        debug!(form_id, submission_id = %submission.id, "appended submission");
        Ok(submission)
    }

    fn list_submissions(&self, form_id: &str) -> Result<Vec<Submission>, StoreError> {
        self.ensure_form(form_id)?;
        let contents = match fs::read_to_string(self.submissions_path(form_id)?) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        let mut submissions = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<Submission>)
            .collect::<Result<Vec<_>, _>>()?;
        newest_submissions_first(&mut submissions);
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    fn store() -> (TempDir, DirStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = DirStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    #[test]
    fn lists_only_owned_forms_newest_first() {
        let (_dir, store) = store();
        contract::lists_only_owned_forms_newest_first(&store);
    }

    #[test]
    fn save_overwrites_by_id() {
        let (_dir, store) = store();
        contract::save_overwrites_by_id(&store);
    }

    #[test]
    fn submissions_come_back_newest_first() {
        let (_dir, store) = store();
        contract::submissions_come_back_newest_first(&store);
    }

    #[test]
    fn append_to_missing_form_is_not_found() {
        let (_dir, store) = store();
        contract::append_to_missing_form_is_not_found(&store);
    }

    #[test]
    fn delete_cascades_to_submissions() {
        let (_dir, store) = store();
        contract::delete_cascades_to_submissions(&store);
    }

    #[test]
    fn reopened_store_sees_previous_writes() {
        let (dir, store) = store();
        let form = store.save_form(Form::new("alice", "Persisted")).unwrap();
        store
            .append_submission(&form.id, SubmissionData::new())
            .unwrap();

        let reopened = DirStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_form(&form.id).unwrap().title, "Persisted");
        assert_eq!(reopened.list_submissions(&form.id).unwrap().len(), 1);
    }

    #[test]
    fn path_like_ids_are_not_found() {
        let (_dir, store) = store();
        assert!(store.get_form("../etc/passwd").unwrap_err().is_not_found());
    }
}
