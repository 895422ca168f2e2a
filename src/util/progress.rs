//! Spinners for the network phases of an edit.
//!
//! Spinners draw on stderr only, so stdout stays a clean list of urls.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};
use std::time::Duration;

/// Progress is shown only if stderr is an interactive terminal and the user
/// did not ask for quiet output.
#[must_use]
pub fn should_show_progress(quiet: bool) -> bool {
    !quiet && stderr().is_terminal()
}

/// Create a spinner for an operation of unknown length.
///
/// # Panics
/// Panics if the spinner template string is invalid.
#[must_use]
pub fn create_spinner(message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if show {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("valid template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Spinner that clears itself when dropped, including on early `?` returns.
pub struct SpinnerGuard {
    bar: ProgressBar,
}

impl SpinnerGuard {
    #[must_use]
    pub fn start(message: &str, show: bool) -> Self {
        Self {
            bar: create_spinner(message, show),
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// "Updating 1 issue" / "Updating 3 issues".
#[must_use]
pub fn updating_message(count: usize) -> String {
    if count == 1 {
        "Updating 1 issue".to_string()
    } else {
        format!("Updating {count} issues")
    }
}
