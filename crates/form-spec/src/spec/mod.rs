pub mod field;
pub mod form;
pub mod submission;

pub use field::{FormField, ValidationRules};
pub use form::Form;
pub use submission::{Submission, SubmissionData};
