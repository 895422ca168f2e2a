//! Interactive editing, allowed only for a batch of one.

use crate::error::{GhiError, Result};
use crate::model::{EditSpec, SharedOptions};
use std::sync::Arc;
use tracing::debug;

/// Synchronous prompt collaborator.
///
/// Both methods block on terminal input. They are only ever invoked for a
/// single entity, so a blocked prompt never stalls another task.
pub trait InteractivePrompt: Send + Sync {
    /// Ask which fields to edit and mark them edited on `spec`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt fails or is aborted.
    fn select_fields(&self, spec: &mut EditSpec) -> Result<()>;

    /// Ask for a new value for every edited field of `spec`, starting from
    /// its defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt fails, is aborted, or the editor exits
    /// with a failure.
    fn edit_fields(
        &self,
        spec: &mut EditSpec,
        options: &SharedOptions,
        editor_command: &str,
    ) -> Result<()>;
}

/// A prompt plus the editor command it should launch for long text.
#[derive(Clone)]
pub struct InteractiveEditor {
    prompt: Arc<dyn InteractivePrompt>,
    editor_command: String,
}

impl InteractiveEditor {
    #[must_use]
    pub fn new(prompt: Arc<dyn InteractivePrompt>, editor_command: impl Into<String>) -> Self {
        Self {
            prompt,
            editor_command: editor_command.into(),
        }
    }

    /// Run the field survey on the canonical spec, on a blocking thread.
    ///
    /// # Errors
    ///
    /// Propagates prompt failures; returns `NothingToEdit` if no field was
    /// picked.
    pub async fn select_fields(&self, spec: EditSpec) -> Result<EditSpec> {
        let prompt = Arc::clone(&self.prompt);
        let spec = run_blocking(move || {
            let mut spec = spec;
            prompt.select_fields(&mut spec)?;
            Ok(spec)
        })
        .await?;

        if spec.is_dirty() {
            Ok(spec)
        } else {
            Err(GhiError::NothingToEdit)
        }
    }

    async fn edit(&self, clone: EditSpec, options: Arc<SharedOptions>) -> Result<EditSpec> {
        let prompt = Arc::clone(&self.prompt);
        let editor_command = self.editor_command.clone();
        debug!(editor = %editor_command, "prompting for field values");
        run_blocking(move || {
            let mut clone = clone;
            prompt.edit_fields(&mut clone, &options, &editor_command)?;
            Ok(clone)
        })
        .await
    }
}

impl std::fmt::Debug for InteractiveEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveEditor")
            .field("editor_command", &self.editor_command)
            .finish_non_exhaustive()
    }
}

/// Gate interactive editing of a task's clone.
///
/// Returns `clone` unchanged unless `interactive` is set. Only the calling
/// task waits on the prompt.
///
/// # Errors
///
/// Returns `PromptUnavailable` if interactive editing is requested without
/// an editor, or the prompt's own error.
pub async fn maybe_edit(
    clone: EditSpec,
    interactive: bool,
    editor: Option<&InteractiveEditor>,
    options: &Arc<SharedOptions>,
) -> Result<EditSpec> {
    if !interactive {
        return Ok(clone);
    }
    let editor = editor.ok_or(GhiError::PromptUnavailable)?;
    editor.edit(clone, Arc::clone(options)).await
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| GhiError::Prompt {
            reason: err.to_string(),
        })?
}
