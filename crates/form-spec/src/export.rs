use std::sync::LazyLock;

use chrono::SecondsFormat;
use regex::Regex;

use crate::spec::form::Form;
use crate::spec::submission::Submission;

/// First header cell of every export.
pub const SUBMITTED_AT: &str = "Submitted At";

static NON_ALNUM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").ok());

/// Serializes `submissions` as CSV, one row per submission in the given order.
///
/// Field cells are always quoted with inner quotes doubled; nothing else is
/// escaped, so commas and newlines survive inside the quotes.
pub fn to_csv(form: &Form, submissions: &[Submission]) -> String {
    let header = std::iter::once(SUBMITTED_AT.to_string())
        .chain(form.fields.iter().map(|field| quote(&field.label)))
        .collect::<Vec<_>>()
        .join(",");

    let rows = submissions.iter().map(|submission| {
        let submitted_at = submission
            .submitted_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        std::iter::once(submitted_at)
            .chain(form.fields.iter().map(|field| {
                let display = submission
                    .value(&field.id)
                    .map(|value| field.kind.display(value))
                    .unwrap_or_default();
                quote(&display)
            }))
            .collect::<Vec<_>>()
            .join(",")
    });

    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<title>_submissions.csv` with every run of non-alphanumeric characters in
/// the title collapsed to a single underscore.
pub fn csv_file_name(title: &str) -> String {
    let sanitized = match NON_ALNUM.as_ref() {
        Some(regex) => regex.replace_all(title, "_").into_owned(),
        None => title.to_string(),
    };
    if sanitized.is_empty() {
        "form_submissions.csv".into()
    } else {
        format!("{}_submissions.csv", sanitized)
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
