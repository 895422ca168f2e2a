//! Bounded-concurrency batch scheduler.
//!
//! One task per entity. Each task builds its own copy of the edit, optionally
//! runs the interactive editor on it, and calls the updater once. At most
//! `max_workers` tasks run at a time; every task runs to completion even
//! when a sibling has failed. There is no cancel-on-first-error: partial
//! progress on a large batch is kept and reported.

use crate::api::Updater;
use crate::edit::collector::{BatchReport, ResultCollector};
use crate::edit::interactive::{InteractiveEditor, maybe_edit};
use crate::edit::task::build_task;
use crate::error::{GhiError, Result};
use crate::model::{EditSpec, EntitySnapshot, SharedOptions};
use crate::validation::EditSpecValidator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Worker bound used when the configured value is zero or negative.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Normalize a configured worker count.
#[must_use]
pub fn effective_workers(requested: i64) -> usize {
    if requested <= 0 {
        return DEFAULT_MAX_WORKERS;
    }
    usize::try_from(requested).unwrap_or(DEFAULT_MAX_WORKERS)
}

/// Runs one edit against many entities.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    max_workers: usize,
    editor: Option<InteractiveEditor>,
}

impl BatchScheduler {
    /// `max_workers <= 0` selects `DEFAULT_MAX_WORKERS`.
    #[must_use]
    pub fn new(max_workers: i64) -> Self {
        Self {
            max_workers: effective_workers(max_workers),
            editor: None,
        }
    }

    #[must_use]
    pub fn with_editor(mut self, editor: Option<InteractiveEditor>) -> Self {
        self.editor = editor;
        self
    }

    #[must_use]
    pub const fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Apply `spec` to every snapshot.
    ///
    /// Tasks are admitted in submission order: a worker permit is taken
    /// before each task is spawned, so submission only waits while all
    /// permits are in use. Completion order is unspecified.
    ///
    /// Task failures do not make this return `Err`; they are reported in the
    /// `BatchReport` next to the urls that were updated.
    ///
    /// # Errors
    ///
    /// Returns `InteractiveMultiple` if `interactive` is set for more than
    /// one snapshot. Nothing runs in that case.
    pub async fn run(
        &self,
        snapshots: Vec<EntitySnapshot>,
        spec: Arc<EditSpec>,
        options: Arc<SharedOptions>,
        interactive: bool,
        updater: Arc<dyn Updater>,
    ) -> Result<BatchReport> {
        let total = snapshots.len();
        if interactive && total > 1 {
            return Err(GhiError::InteractiveMultiple);
        }
        if total == 0 {
            return Ok(BatchReport::default());
        }

        info!(
            tasks = total,
            workers = self.max_workers,
            interactive,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();
        // Entities whose task has not reported back yet; what is left after
        // the join set drains belongs to tasks that panicked.
        let mut unreported: BTreeMap<usize, String> = BTreeMap::new();

        for (index, snapshot) in snapshots.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("batch semaphore is never closed");

            debug!(index, url = %snapshot.url, "task admitted");
            unreported.insert(index, snapshot.url.clone());

            let spec = Arc::clone(&spec);
            let options = Arc::clone(&options);
            let updater = Arc::clone(&updater);
            let editor = self.editor.clone();

            join_set.spawn(async move {
                let outcome =
                    run_task(snapshot, &spec, &options, interactive, editor.as_ref(), &*updater)
                        .await;
                drop(permit);
                (index, outcome)
            });
        }

        let mut collector = ResultCollector::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    unreported.remove(&index);
                    match outcome {
                        Ok(url) => {
                            debug!(index, url = %url, "task succeeded");
                            collector.record_success(index, url);
                        }
                        Err(err) => collector.record_failure(index, err),
                    }
                }
                Err(join_err) => warn!(error = %join_err, "task did not complete"),
            }
        }

        for (index, url) in unreported {
            collector.record_failure(index, GhiError::TaskPanicked { url });
        }

        let report = collector.finish();
        info!(
            updated = report.urls.len(),
            failed = report.failed,
            "batch completed"
        );
        Ok(report)
    }
}

/// One entity's isolated edit-and-update.
async fn run_task(
    snapshot: EntitySnapshot,
    spec: &EditSpec,
    options: &Arc<SharedOptions>,
    interactive: bool,
    editor: Option<&InteractiveEditor>,
    updater: &dyn Updater,
) -> Result<String> {
    let clone = build_task(spec, &snapshot);
    let clone = maybe_edit(clone, interactive, editor, options)
        .await
        .map_err(|err| GhiError::task(&snapshot.url, err))?;
    // Prompted values skipped the flag checks.
    if interactive {
        EditSpecValidator::check(&clone).map_err(|err| GhiError::task(&snapshot.url, err))?;
    }

    updater
        .update(&snapshot.id, snapshot.is_pull_request(), &clone, options)
        .await
        .map_err(|err| GhiError::task(&snapshot.url, err))?;

    Ok(snapshot.url)
}
