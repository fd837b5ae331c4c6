use serde_json::{Value, json};

use form_spec::{
    Bucket, FieldType, Form, FormField, NO_ANSWER, Submission, SubmissionData, summarize,
    summarize_form,
};

fn submission(field_id: &str, value: Option<Value>) -> Submission {
    let mut data = SubmissionData::new();
    if let Some(value) = value {
        data.insert(field_id.into(), value);
    }
    Submission::new("form", data)
}

fn bucket(value: &str, count: usize, percent: u32) -> Bucket {
    Bucket {
        value: value.into(),
        count,
        percent,
    }
}

#[test]
fn counts_sorted_by_frequency() {
    let field = FormField::new("color", FieldType::Select).with_options(["Red", "Blue"]);
    let submissions: Vec<_> = ["Red", "Blue", "Red", "Red"]
        .into_iter()
        .map(|color| submission("color", Some(json!(color))))
        .collect();

    let buckets = summarize(&field, &submissions).expect("select is chartable");
    assert_eq!(buckets, vec![bucket("Red", 3, 75), bucket("Blue", 1, 25)]);
}

#[test]
fn ties_keep_first_seen_order() {
    let field = FormField::new("color", FieldType::Select).with_options(["Red", "Blue", "Green"]);
    let submissions: Vec<_> = ["Green", "Red", "Red", "Green", "Blue"]
        .into_iter()
        .map(|color| submission("color", Some(json!(color))))
        .collect();

    let first = summarize(&field, &submissions).unwrap();
    let again = summarize(&field, &submissions).unwrap();
    assert_eq!(first, again);
    assert_eq!(
        first,
        vec![
            bucket("Green", 2, 40),
            bucket("Red", 2, 40),
            bucket("Blue", 1, 20),
        ]
    );
}

#[test]
fn blanks_count_as_no_answer() {
    let field = FormField::new("color", FieldType::Select).with_options(["Red"]);
    let submissions = vec![
        submission("color", None),
        submission("color", Some(json!(""))),
        submission("color", Some(Value::Null)),
        submission("color", Some(json!("Red"))),
    ];

    let buckets = summarize(&field, &submissions).unwrap();
    assert_eq!(buckets, vec![bucket(NO_ANSWER, 3, 75), bucket("Red", 1, 25)]);
}

#[test]
fn checkbox_answers_bucket_as_yes_and_no() {
    let field = FormField::new("ok", FieldType::Checkbox);
    let submissions = vec![
        submission("ok", Some(json!(true))),
        submission("ok", Some(json!("Yes"))),
        submission("ok", Some(json!(false))),
    ];

    let buckets = summarize(&field, &submissions).unwrap();
    assert_eq!(buckets, vec![bucket("Yes", 2, 67), bucket("No", 1, 33)]);
}

#[test]
fn empty_submission_set_yields_no_buckets() {
    let field = FormField::new("ok", FieldType::Checkbox);
    assert!(summarize(&field, &[]).unwrap().is_empty());
}

#[test]
fn form_summary_covers_chartable_fields_in_order() {
    let mut form = Form::new("owner", "Poll");
    form.fields = vec![
        FormField::new("name", FieldType::Text).with_label("Name"),
        FormField::new("ok", FieldType::Checkbox).with_label("Agree"),
        FormField::new("color", FieldType::Select)
            .with_label("Color")
            .with_options(["Red"]),
    ];
    let submissions = vec![submission("color", Some(json!("Red")))];

    let summaries = summarize_form(&form, &submissions);
    let labels: Vec<_> = summaries.iter().map(|summary| summary.label.as_str()).collect();
    assert_eq!(labels, vec!["Agree", "Color"]);
    assert_eq!(summaries[0].buckets, vec![bucket(NO_ANSWER, 1, 100)]);
    assert_eq!(summaries[1].total, 1);
}
