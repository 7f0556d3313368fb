//! Progress indicators for the command line.
//!
//! Thin wrappers over `indicatif` with WAM styling, plus [`ProgressSink`], the
//! [`EventSink`] the CLI hands to commands so every add-on gets its own spinner.
//!
//! Progress output is hidden when the `WAM_NO_PROGRESS` environment variable is
//! set, which keeps scripted runs and test output clean.
//!
//! ```rust
//! use wam_cli::utils::progress::ProgressBar;
//!
//! let spinner = ProgressBar::new_spinner();
//! spinner.set_message("Cloning repository...");
//! spinner.finish_with_message("Repository cloned");
//! ```

use crate::constants::NO_PROGRESS_ENV;
use crate::events::{AddonEvent, EventSink, Stage};
use indicatif::{
    MultiProgress, ProgressBar as IndicatifBar, ProgressDrawTarget, ProgressStyle as IndicatifStyle,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// A spinner that honours `WAM_NO_PROGRESS`.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// A spinner for work of unknown length.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// Renders command events as one spinner per add-on.
///
/// A spinner is created on the first event for a subject and finished on
/// `*:complete` or `error`.
pub struct ProgressSink {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, IndicatifBar>>,
}

impl ProgressSink {
    pub fn new() -> Self {
        let multi = if is_progress_disabled() {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_for(&self, bars: &mut HashMap<String, IndicatifBar>, subject: &str) -> IndicatifBar {
        bars.entry(subject.to_string())
            .or_insert_with(|| {
                let bar = self.multi.add(IndicatifBar::new_spinner());
                bar.set_style(spinner_style());
                bar.set_prefix(subject.to_string());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            })
            .clone()
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressSink {
    fn emit(&self, event: &AddonEvent) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = self.bar_for(&mut bars, event.subject());

        match event {
            AddonEvent::Progress {
                stage: Stage::Complete,
                operation,
                ..
            } => {
                bar.finish_with_message(format!("{} complete", operation.as_str()));
                bars.remove(event.subject());
            }
            AddonEvent::Progress {
                stage,
                ..
            } => bar.set_message(stage.as_str()),
            AddonEvent::Error {
                message,
                ..
            } => {
                bar.abandon_with_message(format!("failed: {message}"));
                bars.remove(event.subject());
            }
        }
    }
}
