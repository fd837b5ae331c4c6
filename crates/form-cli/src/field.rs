use clap::{Args, Subcommand};
use form_service::{FormService, ServiceError};
use form_spec::{Direction, FieldPatch, FieldType, FormField, FormStore, ValidationRules};

use crate::{CliResult, print_json};

#[derive(Subcommand)]
pub enum FieldCommand {
    /// Append a field of the given type with default label and options.
    Add {
        #[arg(long)]
        owner: String,
        form: String,
        /// text, email, number, select, checkbox, textarea or date.
        #[arg(long = "type", value_name = "TYPE")]
        kind: FieldType,
    },
    /// Copy a field and insert the copy right after it.
    Duplicate {
        #[arg(long)]
        owner: String,
        form: String,
        field: String,
    },
    /// Swap a field with its neighbour.
    Move {
        #[arg(long)]
        owner: String,
        form: String,
        field: String,
        /// `up` or `down`.
        direction: Direction,
    },
    Remove {
        #[arg(long)]
        owner: String,
        form: String,
        field: String,
    },
    /// Update attributes of a field. Omitted attributes are left as they are.
    Set {
        #[arg(long)]
        owner: String,
        form: String,
        field: String,
        #[command(flatten)]
        patch: PatchArgs,
    },
}

#[derive(Args, Default)]
pub struct PatchArgs {
    #[arg(long = "type", value_name = "TYPE")]
    kind: Option<FieldType>,
    #[arg(long)]
    label: Option<String>,
    #[arg(long, value_name = "BOOL")]
    required: Option<bool>,
    /// Replaces the option list; repeat for each option.
    #[arg(long = "option", value_name = "OPTION")]
    options: Vec<String>,
    #[arg(long)]
    placeholder: Option<String>,
    #[arg(long)]
    help_text: Option<String>,
    #[arg(long)]
    min: Option<f64>,
    #[arg(long)]
    max: Option<f64>,
    #[arg(long)]
    min_length: Option<usize>,
    #[arg(long)]
    max_length: Option<usize>,
    /// Drop every validation rule before applying the bounds above.
    #[arg(long)]
    clear_rules: bool,
}

impl PatchArgs {
    /// Bounds are merged into the field's current rules.
    fn into_patch(self, current: &ValidationRules) -> FieldPatch {
        let touches_rules = self.clear_rules
            || self.min.is_some()
            || self.max.is_some()
            || self.min_length.is_some()
            || self.max_length.is_some();
        let validation = touches_rules.then(|| {
            let mut rules = if self.clear_rules {
                ValidationRules::default()
            } else {
                current.clone()
            };
            rules.min = self.min.or(rules.min);
            rules.max = self.max.or(rules.max);
            rules.min_length = self.min_length.or(rules.min_length);
            rules.max_length = self.max_length.or(rules.max_length);
            rules
        });

        FieldPatch {
            kind: self.kind,
            label: self.label,
            required: self.required,
            options: (!self.options.is_empty()).then_some(self.options),
            placeholder: self.placeholder,
            help_text: self.help_text,
            validation,
        }
    }
}

pub fn run_field<S: FormStore>(service: &FormService<S>, command: FieldCommand) -> CliResult<()> {
    match command {
        FieldCommand::Add { owner, form, kind } => {
            let mut added = None;
            service.edit_form(&owner, &form, |form| {
                added = Some(form.add_field(kind).clone());
                Ok(())
            })?;
            print_field(added)
        }
        FieldCommand::Duplicate { owner, form, field } => {
            let mut copy = None;
            service.edit_form(&owner, &form, |form| {
                copy = form.duplicate_field(&field).cloned();
                copy.as_ref()
                    .map(|_| ())
                    .ok_or_else(|| ServiceError::FieldNotFound(field.clone()))
            })?;
            print_field(copy)
        }
        FieldCommand::Move {
            owner,
            form,
            field,
            direction,
        } => {
            let updated = service.edit_form(&owner, &form, |form| {
                let index = form
                    .field_index(&field)
                    .ok_or_else(|| ServiceError::FieldNotFound(field.clone()))?;
                if !form.move_field(index, direction) {
                    println!("Field '{}' is already at the boundary.", field);
                }
                Ok(())
            })?;
            print_order(&updated.fields);
            Ok(())
        }
        FieldCommand::Remove { owner, form, field } => {
            let updated = service.edit_form(&owner, &form, |form| {
                form.remove_field(&field)
                    .map(|_| ())
                    .ok_or_else(|| ServiceError::FieldNotFound(field.clone()))
            })?;
            print_order(&updated.fields);
            Ok(())
        }
        FieldCommand::Set {
            owner,
            form,
            field,
            patch,
        } => {
            let updated = service.edit_form(&owner, &form, |form| {
                let current = form
                    .field(&field)
                    .map(|existing| existing.validation.clone())
                    .ok_or_else(|| ServiceError::FieldNotFound(field.clone()))?;
                form.update_field(&field, patch.into_patch(&current));
                Ok(())
            })?;
            print_field(updated.field(&field).cloned())
        }
    }
}

fn print_field(field: Option<FormField>) -> CliResult<()> {
    match field {
        Some(field) => print_json(&field),
        None => Err("field was not updated".into()),
    }
}

fn print_order(fields: &[FormField]) {
    for (index, field) in fields.iter().enumerate() {
        println!("{:>2}. {} [{}] {}", index + 1, field.id, field.kind, field.label);
    }
}
