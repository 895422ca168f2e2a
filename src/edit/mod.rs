//! Batch edit engine.
//!
//! `edit_entities` drives one invocation end to end:
//!
//! 1. Validate the request (no network yet).
//! 2. If interactive, ask which fields to edit.
//! 3. Fetch one snapshot per selector.
//! 4. Resolve repository metadata once.
//! 5. Run one isolated task per snapshot under the worker bound.

pub mod collector;
pub mod interactive;
pub mod scheduler;
pub mod task;

pub use collector::{BatchOutput, BatchReport, ResultCollector};
pub use interactive::{InteractiveEditor, InteractivePrompt, maybe_edit};
pub use scheduler::{BatchScheduler, DEFAULT_MAX_WORKERS, effective_workers};
pub use task::build_task;

use crate::api::{Fetcher, OptionsResolver, Updater};
use crate::error::{GhiError, Result};
use crate::model::EditSpec;
use crate::util::progress::{SpinnerGuard, updating_message};
use crate::validation::EditSpecValidator;
use std::sync::Arc;
use tracing::info;

/// Everything one `ghi edit` invocation asks for.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub selectors: Vec<String>,
    pub spec: EditSpec,
    /// No field flag was given; fields are chosen at the prompt.
    pub interactive: bool,
    /// stdin and stdout are terminals and prompting is not disabled.
    pub can_prompt: bool,
    pub max_workers: i64,
    pub show_progress: bool,
}

impl EditRequest {
    /// Interactive mode is implied when no field was edited on the command line.
    #[must_use]
    pub fn new(selectors: Vec<String>, spec: EditSpec) -> Self {
        let interactive = !spec.is_dirty();
        Self {
            selectors,
            spec,
            interactive,
            can_prompt: false,
            max_workers: 0,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_prompting(mut self, can_prompt: bool) -> Self {
        self.can_prompt = can_prompt;
        self
    }

    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: i64) -> Self {
        self.max_workers = max_workers;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Checks that need no network access.
    ///
    /// # Errors
    ///
    /// - `Validation` if no selector was given or a field value is invalid
    /// - `PromptUnavailable` if interactive mode is needed without a terminal
    /// - `InteractiveMultiple` if interactive mode is asked for several selectors
    pub fn validate(&self) -> Result<()> {
        if self.selectors.is_empty() {
            return Err(GhiError::validation(
                "selector",
                "at least one issue number or url is required",
            ));
        }
        if self.interactive {
            if !self.can_prompt {
                return Err(GhiError::PromptUnavailable);
            }
            if self.selectors.len() > 1 {
                return Err(GhiError::InteractiveMultiple);
            }
            return Ok(());
        }

        EditSpecValidator::check(&self.spec)
    }
}

/// Remote and terminal collaborators of one invocation.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub resolver: Arc<dyn OptionsResolver>,
    pub updater: Arc<dyn Updater>,
    pub editor: Option<InteractiveEditor>,
}

/// Apply one edit to every selected entity.
///
/// Fetch and option failures abort before any update. After that, task
/// failures are carried in the returned report next to the urls that were
/// updated.
///
/// # Errors
///
/// Returns input errors from `EditRequest::validate`, prompt errors from the
/// field survey, and fetch errors from the collaborators.
pub async fn edit_entities(request: EditRequest, collaborators: &Collaborators) -> Result<BatchReport> {
    request.validate()?;

    let EditRequest {
        selectors,
        mut spec,
        interactive,
        max_workers,
        show_progress,
        ..
    } = request;

    if interactive {
        let editor = collaborators
            .editor
            .as_ref()
            .ok_or(GhiError::PromptUnavailable)?;
        spec = editor.select_fields(spec).await?;
    }

    let (snapshots, options) = {
        let _spinner = SpinnerGuard::start("Fetching repository information", show_progress);
        let (snapshots, repo) = collaborators
            .fetcher
            .fetch_entities(&selectors, &spec.lookup_fields())
            .await?;
        info!(repo = %repo, entities = snapshots.len(), "fetched entities");
        let options = collaborators.resolver.fetch_options(&repo, &spec).await?;
        (snapshots, options)
    };

    // Prompts and spinners both draw on the terminal; only one at a time.
    let _spinner = SpinnerGuard::start(
        &updating_message(snapshots.len()),
        show_progress && !interactive,
    );
    BatchScheduler::new(max_workers)
        .with_editor(collaborators.editor.clone())
        .run(
            snapshots,
            Arc::new(spec),
            Arc::new(options),
            interactive,
            Arc::clone(&collaborators.updater),
        )
        .await
}
