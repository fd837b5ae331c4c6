#![allow(missing_docs)]

pub mod aggregate;
pub mod check;
pub mod edit;
pub mod export;
pub mod generate;
pub mod registry;
pub mod spec;
pub mod store;
pub mod validate;

pub use aggregate::{AggregateError, Bucket, FieldSummary, NO_ANSWER, summarize, summarize_form};
pub use check::{SchemaIssue, check_field, check_form};
pub use edit::{Direction, FieldPatch};
pub use export::{csv_file_name, to_csv};
pub use generate::{
    Admission, GeneratorError, RejectedField, SchemaGenerator, admit_generated, parse_fields,
};
pub use registry::{Capabilities, FieldType, ValueShape};
pub use spec::{Form, FormField, Submission, SubmissionData, ValidationRules};
pub use store::{DirStore, FormStore, MemoryStore, RecordKind, StoreError};
pub use validate::{
    Rejection, ValidationError, ValidationResult, Verdict, normalize, validate, validate_field,
};
