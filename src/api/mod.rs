//! Remote API collaborators.
//!
//! The batch engine talks to the issue tracker only through these traits.
//! `github::GithubClient` implements all three against GitHub's GraphQL API;
//! tests substitute in-memory fakes.

pub mod github;

use crate::error::Result;
use crate::model::{EditSpec, EntitySnapshot, LookupField, Repo, SharedOptions};
use async_trait::async_trait;
use std::collections::BTreeSet;

pub use github::GithubClient;

/// Loads the current state of the selected entities.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one snapshot per selector, in selector order.
    ///
    /// # Errors
    ///
    /// Fails if a selector is invalid, matches nothing, or the selectors span
    /// more than one repository.
    async fn fetch_entities(
        &self,
        selectors: &[String],
        fields: &BTreeSet<LookupField>,
    ) -> Result<(Vec<EntitySnapshot>, Repo)>;
}

/// Resolves repository metadata shared by every task of a batch.
#[async_trait]
pub trait OptionsResolver: Send + Sync {
    /// Fetch the metadata needed for the dirty fields of `spec`. Called once
    /// per batch, before any task starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository metadata cannot be read.
    async fn fetch_options(&self, repo: &Repo, spec: &EditSpec) -> Result<SharedOptions>;
}

/// Applies an edit to one remote entity.
///
/// Implementations must tolerate concurrent calls for distinct entity ids.
#[async_trait]
pub trait Updater: Send + Sync {
    /// Write `edit` to the entity identified by `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if any mutation for this entity fails.
    async fn update(
        &self,
        entity_id: &str,
        is_pull_request: bool,
        edit: &EditSpec,
        options: &SharedOptions,
    ) -> Result<()>;
}
