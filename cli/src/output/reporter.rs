//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::sync::{Mutex, PoisonError};

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY the latest step is shown on a spinner; otherwise steps print as
/// `"  → {message}"`. Everything is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    spinner: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            spinner: Mutex::new(None),
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        let mut guard = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Print a line without tearing an active spinner.
    fn print_line(&self, line: &str) {
        self.with_spinner(|spinner| match spinner {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        });
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if !self.ctx.show_progress() {
            println!("  {} {message}", "→".style(self.ctx.styles.step));
            return;
        }
        self.with_spinner(|spinner| match spinner {
            Some(pb) => pb.set_message(message.to_string()),
            None => *spinner = Some(progress::spinner(message)),
        });
    }

    fn success(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let mut finished = false;
        self.with_spinner(|spinner| {
            if let Some(pb) = spinner.take() {
                progress::finish_ok(&pb, message);
                finished = true;
            }
        });
        if !finished {
            println!("  {} {message}", "✓".style(self.ctx.styles.success));
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            self.print_line(&format!("  {} {message}", "!".style(self.ctx.styles.warning)));
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        self.with_spinner(|spinner| {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        });
    }
}
