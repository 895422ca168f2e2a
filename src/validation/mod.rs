//! Validation helpers for `ghi`.
//!
//! These routines check command input before anything is fetched, and
//! prompted values before they are sent, and return structured validation
//! errors. They never touch the network.

use crate::error::{GhiError, ValidationError};
use crate::model::{EditSpec, SetEdit};
use tracing::debug;

/// Validates an edit built from flags.
pub struct EditSpecValidator;

impl EditSpecValidator {
    /// Validate a flag-built edit and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(spec: &EditSpec) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        // Title: an explicit edit cannot blank it out.
        if spec.title.edited && spec.title.value.trim().is_empty() {
            errors.push(ValidationError::new("title", "cannot be empty"));
        }

        check_set("assignees", &spec.assignees, &mut errors);
        check_set("labels", &spec.labels, &mut errors);
        check_set("projects", &spec.projects.names, &mut errors);

        if spec.milestone.edited && spec.milestone.value != spec.milestone.value.trim() {
            errors.push(ValidationError::new(
                "milestone",
                "cannot have leading or trailing whitespace",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Like `validate`, but log every failure and keep the first.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for the first rule `spec` violates.
    pub fn check(spec: &EditSpec) -> crate::error::Result<()> {
        Self::validate(spec).map_err(|errors| {
            for err in &errors {
                debug!(field = %err.field, message = %err.message, "validation failed");
            }
            errors
                .into_iter()
                .next()
                .map_or_else(|| GhiError::validation("edit", "invalid"), GhiError::from)
        })
    }
}

fn check_set(field: &str, edit: &SetEdit, errors: &mut Vec<ValidationError>) {
    if edit
        .add
        .iter()
        .chain(&edit.remove)
        .any(|name| name.trim().is_empty())
    {
        errors.push(ValidationError::new(field, "names cannot be empty"));
    }

    if let Some(name) = edit.add.intersection(&edit.remove).next() {
        errors.push(ValidationError::new(
            field,
            format!("'{name}' is both added and removed"),
        ));
    }
}

/// Validates a single label, assignee, project or milestone name.
pub struct NameValidator;

impl NameValidator {
    /// # Errors
    ///
    /// Returns a `ValidationError` if the name is blank or contains a comma.
    pub fn validate(field: &str, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::new(field, "cannot be empty"));
        }
        if name.contains(',') {
            return Err(ValidationError::new(field, "cannot contain ','"));
        }
        Ok(())
    }
}
