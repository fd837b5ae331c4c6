mod field;

use clap::{Parser, Subcommand, ValueEnum};
use field::{FieldCommand, run_field};
use form_service::{FormService, ServiceError};
use form_spec::{
    DirStore, FieldSummary, Form, FormField, GeneratorError, SchemaGenerator, Submission,
    SubmissionData, ValidationResult, check_form, parse_fields, validate,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_DATA_DIR: &str = ".formkit";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Build forms, collect submissions and export results",
    long_about = "Stores forms and submissions under FORMKIT_DATA_DIR (default ./.formkit) and exposes the editor, publish gate, public submission, dashboard and CSV export from the command line"
)]
struct Cli {
    /// Directory holding forms and submissions (defaults to FORMKIT_DATA_DIR or ./.formkit).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Log debug events to stderr.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Form,
    Field,
    Submission,
}

#[derive(Subcommand)]
enum Command {
    /// Validate answers against a form file without touching the store.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON object.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print the JSON Schema of a stored document.
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::Form)]
        kind: SchemaKind,
    },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that read or write the form store.
#[derive(Subcommand)]
enum StoreCommand {
    /// Create an empty draft form.
    New {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List forms owned by a user, newest first.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Print a form as JSON.
    Show {
        #[arg(long)]
        owner: String,
        form: String,
    },
    /// Edit the fields of a form.
    #[command(subcommand)]
    Field(FieldCommand),
    /// Report schema issues that would block publishing.
    Check {
        #[arg(long)]
        owner: String,
        form: String,
    },
    /// Open a form for public submissions.
    Publish {
        #[arg(long)]
        owner: String,
        form: String,
    },
    /// Close a form to public submissions.
    Unpublish {
        #[arg(long)]
        owner: String,
        form: String,
    },
    /// Merge generated fields from a JSON file after re-validating them.
    Suggest {
        #[arg(long)]
        owner: String,
        form: String,
        /// JSON array of fields produced by a generator.
        #[arg(long, value_name = "FIELDS")]
        from: PathBuf,
        /// Description passed to the generator (defaults to the form description or title).
        #[arg(long)]
        description: Option<String>,
    },
    /// Submit answers to a published form.
    Submit {
        form: String,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print submissions for a form, newest first.
    Submissions {
        #[arg(long)]
        owner: String,
        form: String,
    },
    /// Print answer counts for select and checkbox fields.
    Summary {
        #[arg(long)]
        owner: String,
        form: String,
        /// Emit the dashboard as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write submissions as CSV.
    Export {
        #[arg(long)]
        owner: String,
        form: String,
        /// Output directory (defaults to FORMKIT_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing export.
        #[arg(long)]
        force: bool,
    },
    /// Delete a form and all of its submissions.
    Delete {
        #[arg(long)]
        owner: String,
        form: String,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Schema { kind } => run_schema(kind),
        Command::Store(command) => {
            let data_dir = resolve_data_dir(cli.data_dir)?;
            debug!(data_dir = %data_dir.display(), "opening store");
            let service = FormService::new(DirStore::open(data_dir)?);
            run(&service, command)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(service: &FormService<DirStore>, command: StoreCommand) -> CliResult<()> {
    match command {
        StoreCommand::New {
            owner,
            title,
            description,
        } => print_json(&service.create_form(&owner, &title, description)?),
        StoreCommand::List { owner } => {
            for form in service.list_forms(&owner)? {
                println!(
                    "{}\t{}\t{} field(s)\t{}",
                    form.id,
                    status(&form),
                    form.fields.len(),
                    form.title
                );
            }
            Ok(())
        }
        StoreCommand::Show { owner, form } => print_json(&service.form_for_owner(&owner, &form)?),
        StoreCommand::Field(command) => run_field(service, command),
        StoreCommand::Check { owner, form } => run_check(&service.form_for_owner(&owner, &form)?),
        StoreCommand::Publish { owner, form } => run_publish(service, &owner, &form),
        StoreCommand::Unpublish { owner, form } => {
            let form = service.unpublish(&owner, &form)?;
            println!("Form '{}' is now {}.", form.id, status(&form));
            Ok(())
        }
        StoreCommand::Suggest {
            owner,
            form,
            from,
            description,
        } => run_suggest(service, &owner, &form, from, description),
        StoreCommand::Submit { form, answers } => run_submit(service, &form, answers),
        StoreCommand::Submissions { owner, form } => print_json(&service.submissions(&owner, &form)?),
        StoreCommand::Summary { owner, form, json } => {
            let dashboard = service.dashboard(&owner, &form)?;
            if json {
                return print_json(&dashboard);
            }
            println!(
                "{} ({} submission(s), {})",
                dashboard.title,
                dashboard.submission_count,
                if dashboard.published {
                    "published"
                } else {
                    "draft"
                }
            );
            for summary in &dashboard.summaries {
                describe_summary(summary);
            }
            Ok(())
        }
        StoreCommand::Export {
            owner,
            form,
            out,
            force,
        } => run_export(service, &owner, &form, out, force),
        StoreCommand::Delete { owner, form } => {
            service.delete_form(&owner, &form)?;
            println!("Deleted form '{}' and its submissions.", form);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(form: &Form) -> &'static str {
    if form.published { "published" } else { "draft" }
}

fn run_check(form: &Form) -> CliResult<()> {
    let issues = check_form(form);
    if issues.is_empty() {
        println!("Form '{}' is ready to publish.", form.id);
        return Ok(());
    }
    for issue in &issues {
        println!("  - {}", issue);
    }
    Err(format!("{} schema issue(s) found", issues.len()).into())
}

fn run_publish(service: &FormService<DirStore>, owner: &str, form_id: &str) -> CliResult<()> {
    match service.publish(owner, form_id) {
        Ok(form) => {
            println!("Form '{}' is now published.", form.id);
            Ok(())
        }
        Err(ServiceError::NotPublishable(issues)) => {
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
            Err(format!("form '{}' cannot be published", form_id).into())
        }
        Err(other) => Err(other.into()),
    }
}

/// Serves canned generator output stored in a file.
struct FileGenerator {
    path: PathBuf,
}

impl SchemaGenerator for FileGenerator {
    fn suggest_fields(&self, description: &str) -> Result<Vec<FormField>, GeneratorError> {
        debug!(path = %self.path.display(), description, "reading generated fields");
        let contents = fs::read_to_string(&self.path)
            .map_err(|err| GeneratorError::Unavailable(format!("{}: {}", self.path.display(), err)))?;
        parse_fields(&contents)
    }
}

fn run_suggest(
    service: &FormService<DirStore>,
    owner: &str,
    form_id: &str,
    from: PathBuf,
    description: Option<String>,
) -> CliResult<()> {
    let description = match description {
        Some(description) => description,
        None => {
            let form = service.form_for_owner(owner, form_id)?;
            form.description.unwrap_or(form.title)
        }
    };
    let generator = FileGenerator { path: from };
    let (form, admission) = service.suggest_fields(owner, form_id, &generator, &description)?;
    println!(
        "Added {} field(s) to '{}', dropped {}.",
        admission.admitted.len(),
        form.id,
        admission.rejected.len()
    );
    for rejected in &admission.rejected {
        let issues = rejected
            .issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        println!("  dropped '{}': {}", rejected.label, issues);
    }
    Ok(())
}

fn read_answers(path: &Path) -> CliResult<SubmissionData> {
    let contents = fs::read_to_string(path)?;
    let answers: SubmissionData = serde_json::from_str(&contents)
        .map_err(|err| format!("answers must be a JSON object: {}", err))?;
    Ok(answers)
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let form_json = fs::read_to_string(form_path)?;
    let form: Form = serde_json::from_str(&form_json)?;
    let answers = read_answers(&answers_path)?;

    let result = validate(&form, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_submit(
    service: &FormService<DirStore>,
    form_id: &str,
    answers_path: PathBuf,
) -> CliResult<()> {
    let answers = read_answers(&answers_path)?;
    match service.submit(form_id, &answers) {
        Ok(submission) => {
            describe_submission(&submission);
            Ok(())
        }
        Err(ServiceError::Rejected(result)) => {
            describe_validation(&result);
            Err("submission rejected".into())
        }
        Err(other) => Err(other.into()),
    }
}

fn describe_submission(submission: &Submission) {
    println!(
        "Recorded submission {} at {}",
        submission.id,
        submission.submitted_at.to_rfc3339()
    );
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} ({}) - {}", error.label, error.field_id, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn describe_summary(summary: &FieldSummary) {
    println!("{} ({} answer(s))", summary.label, summary.total);
    for bucket in &summary.buckets {
        println!("  {:<24} {:>5} {:>4}%", bucket.value, bucket.count, bucket.percent);
    }
}

fn run_export(
    service: &FormService<DirStore>,
    owner: &str,
    form_id: &str,
    out: Option<PathBuf>,
    force: bool,
) -> CliResult<()> {
    let export = service.export_csv(owner, form_id)?;
    let out_root = resolve_output_root(out)?;
    let target = out_root.join(&export.file_name);
    ensure_allowed_root(&target)?;
    if target.exists() && !force {
        return Err(format!(
            "{} already exists; rerun with --force to overwrite",
            target.display()
        )
        .into());
    }
    fs::create_dir_all(&out_root)?;
    fs::write(&target, &export.contents)?;
    println!(
        "Exported {} submission(s) to {}",
        export.rows,
        target.display()
    );
    Ok(())
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let schema = match kind {
        SchemaKind::Form => schemars::schema_for!(Form),
        SchemaKind::Field => schemars::schema_for!(FormField),
        SchemaKind::Submission => schemars::schema_for!(Submission),
    };
    print_json(&schema)
}

fn resolve_data_dir(data_dir: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match data_dir {
        Some(path) => path,
        None => env::var_os("FORMKIT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    };
    if candidate.as_os_str().is_empty() {
        return Err("data directory cannot be empty".into());
    }
    Ok(candidate)
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os("FORMKIT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    ensure_allowed_root(&candidate)?;
    Ok(candidate)
}

/// Export targets must resolve under one of `FORMKIT_ALLOWED_ROOTS`, or under
/// the working directory when the variable is unset.
fn ensure_allowed_root(target: &Path) -> CliResult<()> {
    let resolved = resolve_path(target)?;
    let roots = allowed_roots()?;
    if roots.iter().any(|root| resolved.starts_with(root)) {
        return Ok(());
    }
    Err(format!(
        "path '{}' is outside allowed roots {:?}",
        resolved.display(),
        roots
    )
    .into())
}

fn allowed_roots() -> CliResult<Vec<PathBuf>> {
    let configured = env::var_os("FORMKIT_ALLOWED_ROOTS").unwrap_or_default();
    let mut roots = Vec::new();
    for root in env::split_paths(&configured) {
        if !root.as_os_str().is_empty() {
            roots.push(resolve_path(&root)?);
        }
    }
    if roots.is_empty() {
        roots.push(resolve_path(&env::current_dir()?)?);
    }
    Ok(roots)
}

/// Absolute form of `path` with symlinks resolved on its existing prefix.
///
/// The part that does not exist yet is appended as plain names, so a
/// trailing `..` cannot walk out of the resolved prefix.
fn resolve_path(path: &Path) -> CliResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut pending = Vec::new();
    let mut existing = absolute.as_path();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                pending.push(name.to_os_string());
                existing = parent;
            }
            _ => return Err(format!("cannot resolve path '{}'", path.display()).into()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    resolved.extend(pending.iter().rev());
    Ok(resolved)
}
