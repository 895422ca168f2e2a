//! `ghi` - bulk editing for issues and pull requests.
//!
//! One edit (new title, labels to add, milestone to set, ...) is applied to
//! many entities at once. Each entity gets its own copy of the edit, updates
//! run under a bounded worker pool, and one failing entity never stops the
//! others.

pub mod api;
pub mod cli;
pub mod config;
pub mod edit;
pub mod error;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, GhiError, Result, StructuredError};
