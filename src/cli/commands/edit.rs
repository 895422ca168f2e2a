//! Edit command implementation.

use crate::api::GithubClient;
use crate::cli::EditArgs;
use crate::config::{self, CliOverrides, Settings};
use crate::edit::{BatchReport, Collaborators, EditRequest, InteractiveEditor, edit_entities};
use crate::error::{GhiError, Result};
use crate::model::{EditSpec, SetEdit};
use crate::prompt::DialoguerPrompt;
use crate::util::should_show_progress;
use crate::validation::NameValidator;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Execute the edit command.
///
/// Updated urls are printed before a batch error is returned, so partial
/// progress is visible even when the exit status is non-zero.
///
/// # Errors
///
/// Returns input errors before any network call, fetch errors before any
/// update, and the representative task error after the batch completes.
pub fn execute(args: &EditArgs, json: bool, quiet: bool, overrides: &CliOverrides) -> Result<()> {
    let settings = config::load_settings(overrides)?;
    let spec = build_spec(args, &mut io::stdin().lock())?;

    let can_prompt =
        io::stdin().is_terminal() && io::stdout().is_terminal() && !settings.prompt_disabled;
    let request = EditRequest::new(args.selectors.clone(), spec)
        .with_prompting(can_prompt)
        .with_max_workers(settings.workers)
        .with_progress(!json && should_show_progress(quiet));
    // Fail on bad input before a client or runtime exists.
    request.validate()?;

    let collaborators = build_collaborators(&settings, can_prompt)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(edit_entities(request, &collaborators))?;

    print_report(&report, json)?;
    info!(updated = report.urls.len(), failed = report.failed, "edit finished");

    match report.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn build_collaborators(settings: &Settings, can_prompt: bool) -> Result<Collaborators> {
    let client = Arc::new(GithubClient::new(
        &settings.api_url,
        settings.token.clone(),
        settings.http_timeout,
        settings.repo.clone(),
    )?);
    let editor = can_prompt.then(|| {
        InteractiveEditor::new(Arc::new(DialoguerPrompt::new()), settings.editor.clone())
    });

    Ok(Collaborators {
        fetcher: client.clone(),
        resolver: client.clone(),
        updater: client,
        editor,
    })
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_output())?);
    } else {
        for url in &report.urls {
            println!("{url}");
        }
    }
    Ok(())
}

/// Turn flags into the canonical edit. Every flag that is present marks its
/// field edited, even with an empty value.
///
/// # Errors
///
/// Returns `MutuallyExclusive` for `--body` with `--body-file`, `Io` if the
/// body file cannot be read, and `Validation` for malformed names.
pub fn build_spec(args: &EditArgs, stdin: &mut impl Read) -> Result<EditSpec> {
    let mut spec = EditSpec::default();

    if let Some(title) = &args.title {
        spec.title.edited = true;
        spec.title.value.clone_from(title);
    }

    match (&args.body, &args.body_file) {
        (Some(_), Some(_)) => {
            return Err(GhiError::mutually_exclusive(
                "specify only one of `--body` or `--body-file`",
            ));
        }
        (Some(body), None) => {
            spec.body.edited = true;
            spec.body.value.clone_from(body);
        }
        (None, Some(path)) => {
            spec.body.edited = true;
            spec.body.value = read_body_file(path, stdin)?;
        }
        (None, None) => {}
    }

    fill_set(&mut spec.labels, "labels", &args.add_label, &args.remove_label)?;
    fill_set(
        &mut spec.assignees,
        "assignees",
        &args.add_assignee,
        &args.remove_assignee,
    )?;
    fill_set(
        &mut spec.projects.names,
        "projects",
        &args.add_project,
        &args.remove_project,
    )?;

    if let Some(milestone) = &args.milestone {
        spec.milestone.edited = true;
        spec.milestone.value = milestone.trim().to_string();
    }

    debug!(fields = ?spec.dirty_fields(), "built edit from flags");
    Ok(spec)
}

fn fill_set(edit: &mut SetEdit, field: &str, add: &[String], remove: &[String]) -> Result<()> {
    if add.is_empty() && remove.is_empty() {
        return Ok(());
    }
    edit.edited = true;
    for (names, target) in [(add, &mut edit.add), (remove, &mut edit.remove)] {
        for name in names {
            let name = name.trim();
            NameValidator::validate(field, name)?;
            target.insert(name.to_string());
        }
    }
    Ok(())
}

fn read_body_file(path: &Path, stdin: &mut impl Read) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        stdin.read_to_string(&mut body)?;
        return Ok(body);
    }
    Ok(fs::read_to_string(path)?)
}
