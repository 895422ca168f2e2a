//! Terminal prompts for interactive editing, built on `dialoguer`.

use crate::edit::InteractivePrompt;
use crate::error::{GhiError, Result};
use crate::model::{EditSpec, FieldName, NamedRef, SetEdit, SharedOptions};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Editor, Input, MultiSelect, Select};
use std::collections::BTreeSet;

const NO_MILESTONE: &str = "(none)";

/// Prompts on the controlling terminal.
pub struct DialoguerPrompt {
    theme: ColorfulTheme,
}

impl DialoguerPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn pick_set(&self, prompt: &str, edit: &mut SetEdit, available: &[NamedRef]) -> Result<()> {
        let (items, checked) = set_choices(edit, available);
        if items.is_empty() {
            eprintln!("No {} available", prompt.to_lowercase());
            return Ok(());
        }
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&items)
            .defaults(&checked)
            .interact()
            .map_err(prompt_error)?;
        edit.select(selected_names(&items, &picked));
        Ok(())
    }

    fn pick_milestone(&self, spec: &mut EditSpec, options: &SharedOptions) -> Result<()> {
        let (items, current) = milestone_choices(&spec.milestone.default, &options.milestones);
        let picked = Select::with_theme(&self.theme)
            .with_prompt("Milestone")
            .items(&items)
            .default(current)
            .interact()
            .map_err(prompt_error)?;
        spec.milestone.value = if picked == 0 {
            String::new()
        } else {
            items[picked].clone()
        };
        Ok(())
    }
}

impl Default for DialoguerPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractivePrompt for DialoguerPrompt {
    fn select_fields(&self, spec: &mut EditSpec) -> Result<()> {
        let names: Vec<&str> = FieldName::ALL
            .iter()
            .map(FieldName::display_name)
            .collect();
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt("What would you like to edit?")
            .items(&names)
            .interact()
            .map_err(prompt_error)?;
        for index in picked {
            spec.mark_edited(FieldName::ALL[index]);
        }
        Ok(())
    }

    fn edit_fields(
        &self,
        spec: &mut EditSpec,
        options: &SharedOptions,
        editor_command: &str,
    ) -> Result<()> {
        if spec.title.edited {
            spec.title.value = Input::with_theme(&self.theme)
                .with_prompt("Title")
                .with_initial_text(spec.title.default.clone())
                .interact_text()
                .map_err(prompt_error)?;
        }
        if spec.body.edited {
            // The first word is the executable; dialoguer passes no arguments.
            let executable = editor_command.split_whitespace().next().unwrap_or("vi");
            spec.body.value = Editor::new()
                .executable(executable)
                .extension(".md")
                .edit(&spec.body.default)
                .map_err(|err| GhiError::Prompt {
                    reason: format!("editor '{executable}' failed: {err}"),
                })?
                .unwrap_or_else(|| spec.body.default.clone());
        }
        if spec.assignees.edited {
            self.pick_set("Assignees", &mut spec.assignees, &options.assignable_users)?;
        }
        if spec.labels.edited {
            self.pick_set("Labels", &mut spec.labels, &options.labels)?;
        }
        if spec.projects.names.edited {
            self.pick_set("Projects", &mut spec.projects.names, &options.projects)?;
        }
        if spec.milestone.edited {
            self.pick_milestone(spec, options)?;
        }
        Ok(())
    }
}

fn prompt_error(err: dialoguer::Error) -> GhiError {
    GhiError::Prompt {
        reason: err.to_string(),
    }
}

/// Choices for a multi-select: every known name plus any current value the
/// repository no longer lists, with current values pre-checked.
fn set_choices(edit: &SetEdit, available: &[NamedRef]) -> (Vec<String>, Vec<bool>) {
    let mut items: Vec<String> = available.iter().map(|r| r.name.clone()).collect();
    for current in &edit.default {
        if !items.iter().any(|item| item.eq_ignore_ascii_case(current)) {
            items.push(current.clone());
        }
    }
    let checked = items
        .iter()
        .map(|item| {
            edit.default
                .iter()
                .any(|current| current.eq_ignore_ascii_case(item))
        })
        .collect();
    (items, checked)
}

fn selected_names(items: &[String], picked: &[usize]) -> BTreeSet<String> {
    picked
        .iter()
        .filter_map(|index| items.get(*index).cloned())
        .collect()
}

/// `(none)` first, then every milestone; the default points at the current one.
fn milestone_choices(current: &str, milestones: &[NamedRef]) -> (Vec<String>, usize) {
    let mut items = vec![NO_MILESTONE.to_string()];
    items.extend(milestones.iter().map(|m| m.name.clone()));
    let default = items
        .iter()
        .skip(1)
        .position(|item| !current.is_empty() && item == current)
        .map_or(0, |index| index + 1);
    (items, default)
}
