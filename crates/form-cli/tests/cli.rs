use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

fn formkit(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("formkit").expect("formkit binary");
    cmd.env("FORMKIT_DATA_DIR", data_dir)
        .env_remove("FORMKIT_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run formkit");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

fn new_form(data_dir: &Path, owner: &str, title: &str) -> String {
    let form = stdout_json(
        formkit(data_dir).args(["new", "--owner", owner, "--title", title]),
    );
    form["id"].as_str().expect("form id").to_string()
}

#[test]
fn email_form_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let data_dir = workspace.path().join("data");
    let form_id = new_form(&data_dir, "alice", "Team Offsite 2026!");

    let field = stdout_json(formkit(&data_dir).args([
        "field", "add", "--owner", "alice", form_id.as_str(), "--type", "email",
    ]));
    let field_id = field["id"].as_str().expect("field id").to_string();
    assert_eq!(field["label"], json!("New email field"));

    formkit(&data_dir)
        .args(["field", "set", "--owner", "alice", form_id.as_str(), field_id.as_str()])
        .args(["--label", "Work email", "--required", "true"])
        .assert()
        .success();
    formkit(&data_dir)
        .args(["publish", "--owner", "alice", form_id.as_str()])
        .assert()
        .success();

    let bad = workspace.child("bad.json");
    bad.write_str(&json!({ field_id.clone(): "not-an-email" }).to_string())?;
    let output = formkit(&data_dir)
        .args(["submit", form_id.as_str(), "--answers"])
        .arg(bad.path())
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Work email"));

    let good = workspace.child("good.json");
    good.write_str(&json!({ field_id.clone(): "a@b.com" }).to_string())?;
    formkit(&data_dir)
        .args(["submit", form_id.as_str(), "--answers"])
        .arg(good.path())
        .assert()
        .success();

    let submissions = stdout_json(formkit(&data_dir).args([
        "submissions",
        "--owner",
        "alice",
        form_id.as_str(),
    ]));
    assert_eq!(submissions.as_array().map(Vec::len), Some(1));
    assert_eq!(submissions[0]["data"][field_id.as_str()], json!("a@b.com"));

    let out_dir = workspace.child("exports");
    formkit(&data_dir)
        .args(["export", "--owner", "alice", form_id.as_str(), "--out"])
        .arg(out_dir.path())
        .env("FORMKIT_ALLOWED_ROOTS", workspace.path())
        .assert()
        .success();
    let csv = fs::read_to_string(out_dir.path().join("Team_Offsite_2026__submissions.csv"))?;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(r#"Submitted At,"Work email""#));
    assert!(lines.next().is_some_and(|row| row.ends_with(r#","a@b.com""#)));

    formkit(&data_dir)
        .args(["export", "--owner", "alice", form_id.as_str(), "--out"])
        .arg(out_dir.path())
        .env("FORMKIT_ALLOWED_ROOTS", workspace.path())
        .assert()
        .failure();

    Ok(())
}

#[test]
fn other_owners_cannot_read_submissions() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form_id = new_form(workspace.path(), "alice", "Private");

    let output = formkit(workspace.path())
        .args(["submissions", "--owner", "mallory", form_id.as_str()])
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("OwnershipViolation"));
    Ok(())
}

#[test]
fn drafts_refuse_public_submissions() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form_id = new_form(workspace.path(), "alice", "Draft");
    let answers = workspace.child("answers.json");
    answers.write_str("{}")?;

    formkit(workspace.path())
        .args(["submit", form_id.as_str(), "--answers"])
        .arg(answers.path())
        .assert()
        .failure();
    Ok(())
}

#[test]
fn publish_is_refused_for_select_without_options() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let data_dir = workspace.path();
    let form_id = new_form(data_dir, "alice", "Poll");
    let field = stdout_json(formkit(data_dir).args([
        "field", "add", "--owner", "alice", form_id.as_str(), "--type", "select",
    ]));
    let field_id = field["id"].as_str().expect("field id").to_string();
    assert_eq!(field["options"], json!(["Option 1", "Option 2"]));

    formkit(data_dir)
        .args(["field", "set", "--owner", "alice", form_id.as_str(), field_id.as_str()])
        .args(["--option", " "])
        .assert()
        .success();
    formkit(data_dir)
        .args(["check", "--owner", "alice", form_id.as_str()])
        .assert()
        .failure();
    formkit(data_dir)
        .args(["publish", "--owner", "alice", form_id.as_str()])
        .assert()
        .failure();

    let form = stdout_json(formkit(data_dir).args(["show", "--owner", "alice", form_id.as_str()]));
    assert_eq!(form["published"], json!(false));
    Ok(())
}

#[test]
fn suggest_admits_only_valid_fields() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let data_dir = workspace.path().join("data");
    let form_id = new_form(&data_dir, "alice", "Signup");
    let generated = workspace.child("generated.json");
    generated.write_str(
        &json!([
            { "id": "x", "type": "text", "label": "Full name", "required": true },
            { "id": "x", "type": "select", "label": "Size", "options": [] },
            { "id": "y", "type": "signature", "label": "Sign here" }
        ])
        .to_string(),
    )?;

    formkit(&data_dir)
        .args(["suggest", "--owner", "alice", form_id.as_str(), "--from"])
        .arg(generated.path())
        .assert()
        .success();

    let form = stdout_json(formkit(&data_dir).args(["show", "--owner", "alice", form_id.as_str()]));
    let fields = form["fields"].as_array().expect("fields");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["label"], json!("Full name"));
    assert_ne!(fields[0]["id"], json!("x"));
    Ok(())
}

#[test]
fn summary_counts_checkbox_answers() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let data_dir = workspace.path().join("data");
    let form_id = new_form(&data_dir, "alice", "Consent");
    let field = stdout_json(formkit(&data_dir).args([
        "field", "add", "--owner", "alice", form_id.as_str(), "--type", "checkbox",
    ]));
    let field_id = field["id"].as_str().expect("field id").to_string();
    formkit(&data_dir)
        .args(["publish", "--owner", "alice", form_id.as_str()])
        .assert()
        .success();

    for (name, value) in [("yes.json", "Yes"), ("also-yes.json", "Yes"), ("no.json", "No")] {
        let answers = workspace.child(name);
        answers.write_str(&json!({ field_id.clone(): value }).to_string())?;
        formkit(&data_dir)
            .args(["submit", form_id.as_str(), "--answers"])
            .arg(answers.path())
            .assert()
            .success();
    }

    let dashboard = stdout_json(formkit(&data_dir).args([
        "summary", "--owner", "alice", form_id.as_str(), "--json",
    ]));
    assert_eq!(dashboard["submission_count"], json!(3));
    let buckets = &dashboard["summaries"][0]["buckets"];
    assert_eq!(buckets[0], json!({ "value": "Yes", "count": 2, "percent": 67 }));
    assert_eq!(buckets[1], json!({ "value": "No", "count": 1, "percent": 33 }));
    Ok(())
}

#[test]
fn validate_is_pure() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form = workspace.child("form.json");
    form.write_str(
        &json!({
            "id": "f1",
            "userId": "someone",
            "title": "Age check",
            "createdAt": "2026-01-01T00:00:00Z",
            "fields": [
                { "id": "age", "type": "number", "label": "Age",
                  "validation": { "min": 18 } }
            ]
        })
        .to_string(),
    )?;
    let answers = workspace.child("answers.json");
    answers.write_str(r#"{ "age": "12" }"#)?;

    let output = Command::cargo_bin("formkit")?
        .args(["validate", "--form"])
        .arg(form.path())
        .arg("--answers")
        .arg(answers.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("invalid"));
    assert!(stdout.contains("Must be at least 18"));
    Ok(())
}

#[test]
fn schema_command_describes_forms() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("formkit")?.arg("schema").output()?;
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema["properties"]["fields"].is_object());
    Ok(())
}

#[test]
fn export_refuses_directories_outside_allowed_roots() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let elsewhere = assert_fs::TempDir::new()?;
    let data_dir = workspace.path().join("data");
    let form_id = new_form(&data_dir, "alice", "Feedback");

    formkit(&data_dir)
        .args(["export", "--owner", "alice", form_id.as_str(), "--out"])
        .arg(elsewhere.path())
        .env("FORMKIT_ALLOWED_ROOTS", workspace.path())
        .assert()
        .failure();
    assert!(!elsewhere.path().join("Feedback_submissions.csv").exists());
    Ok(())
}

#[test]
fn published_form_keeps_its_labels() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let data_dir = workspace.path();
    let form_id = new_form(data_dir, "alice", "Contact");
    let field = stdout_json(formkit(data_dir).args([
        "field", "add", "--owner", "alice", form_id.as_str(), "--type", "text",
    ]));
    let field_id = field["id"].as_str().expect("field id").to_string();
    formkit(data_dir)
        .args(["publish", "--owner", "alice", form_id.as_str()])
        .assert()
        .success();

    formkit(data_dir)
        .args(["field", "set", "--owner", "alice", form_id.as_str(), field_id.as_str()])
        .args(["--label", ""])
        .assert()
        .failure();

    let form = stdout_json(formkit(data_dir).args(["show", "--owner", "alice", form_id.as_str()]));
    assert_eq!(form["published"], json!(true));
    assert_eq!(form["fields"][0]["label"], json!("New text field"));
    Ok(())
}
