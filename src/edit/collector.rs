//! Fan-in of task outcomes into one batch report.

use crate::error::GhiError;
use serde::Serialize;
use tracing::warn;

/// Accumulates task outcomes as they complete.
///
/// Outcomes arrive in completion order, which is unrelated to submission
/// order. Each outcome carries its submission index so the report can be
/// ordered and so the reported error is chosen deterministically.
#[derive(Debug, Default)]
pub struct ResultCollector {
    succeeded: Vec<(usize, String)>,
    failed: Vec<(usize, GhiError)>,
}

impl ResultCollector {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            succeeded: Vec::with_capacity(capacity),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, index: usize, url: String) {
        self.succeeded.push((index, url));
    }

    pub fn record_failure(&mut self, index: usize, error: GhiError) {
        warn!(index, error = %error, "task failed");
        self.failed.push((index, error));
    }

    /// Close the batch.
    ///
    /// The reported error is the one from the failed task with the lowest
    /// submission index; the others are only logged.
    #[must_use]
    pub fn finish(mut self) -> BatchReport {
        self.succeeded.sort_by_key(|(index, _)| *index);
        self.failed.sort_by_key(|(index, _)| *index);

        let failed = self.failed.len();
        let error = self.failed.into_iter().next().map(|(_, error)| error);

        BatchReport {
            urls: self.succeeded.into_iter().map(|(_, url)| url).collect(),
            failed,
            error,
        }
    }
}

/// Outcome of a completed batch.
///
/// `urls` holds every entity that was updated, sorted by submission index
/// (not by completion time). `error` is set when at least one task failed;
/// partial successes are still listed in `urls`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub urls: Vec<String>,
    pub failed: usize,
    pub error: Option<GhiError>,
}

impl BatchReport {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the updated urls and the batch error.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Option<GhiError>) {
        (self.urls, self.error)
    }

    /// JSON view for `--json` output.
    #[must_use]
    pub fn to_output(&self) -> BatchOutput<'_> {
        BatchOutput {
            updated: &self.urls,
            failed: self.failed,
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchOutput<'a> {
    pub updated: &'a [String],
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
