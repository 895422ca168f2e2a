//! Shared utilities for `ghi`.
//!
//! - Selector parsing (issue numbers and urls)
//! - Progress spinners

pub mod progress;
pub mod selector;

pub use progress::{SpinnerGuard, should_show_progress};
pub use selector::{ResolvedSelector, Selector, parse_selector, resolve_selectors};
