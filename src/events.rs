//! Lifecycle events emitted by commands.
//!
//! Commands report progress through an [`EventSink`] handed to them in the
//! [`CommandContext`](crate::commands::CommandContext). There is no global
//! emitter: a caller that does not care about progress passes [`NoopSink`] and
//! the core runs headless.
//!
//! The vocabulary is fixed and versioned by [`EVENT_VOCABULARY_VERSION`]. Event
//! names have the form `<operation>:<stage>` (`install:start`,
//! `update:copying`, ...) plus a single `error` event.
//!
//! ```rust
//! use wam_cli::events::{AddonEvent, Operation, Stage};
//!
//! let event = AddonEvent::progress(Operation::Install, Stage::Downloading, "ElvUI");
//! assert_eq!(event.name(), "install:downloading");
//! ```

use std::fmt;

/// Version of the event vocabulary. Bumped whenever a name is added or changed.
pub const EVENT_VOCABULARY_VERSION: u32 = 1;

/// The command an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Install,
    Update,
    Remove,
    Scan,
}

impl Operation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Scan => "scan",
        }
    }
}

/// A step inside an operation, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Downloading,
    Extracting,
    Copying,
    Complete,
}

impl Stage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Copying => "copying",
            Self::Complete => "complete",
        }
    }
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddonEvent {
    /// An operation reached `stage` for `subject` (a folder, URL or catalog id)
    Progress {
        operation: Operation,
        stage: Stage,
        subject: String,
    },
    /// An operation failed; always the last event for that subject
    Error {
        operation: Operation,
        subject: String,
        message: String,
    },
}

impl AddonEvent {
    pub fn progress(operation: Operation, stage: Stage, subject: impl Into<String>) -> Self {
        Self::Progress {
            operation,
            stage,
            subject: subject.into(),
        }
    }

    pub fn error(
        operation: Operation,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error {
            operation,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// The wire name of the event, e.g. `update:complete` or `error`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Progress {
                operation,
                stage,
                ..
            } => format!("{}:{}", operation.as_str(), stage.as_str()),
            Self::Error {
                ..
            } => "error".to_string(),
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::Progress {
                subject,
                ..
            }
            | Self::Error {
                subject,
                ..
            } => subject,
        }
    }
}

impl fmt::Display for AddonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress {
                subject,
                ..
            } => write!(f, "{} {}", self.name(), subject),
            Self::Error {
                subject,
                message,
                ..
            } => write!(f, "error {subject}: {message}"),
        }
    }
}

/// Receives lifecycle events. Implementations must not block for long; they
/// are called inline from command execution.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AddonEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &AddonEvent) {}
}

/// Forwards events to `tracing` under the `events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AddonEvent) {
        match event {
            AddonEvent::Progress {
                ..
            } => tracing::debug!(target: "events", "{}", event),
            AddonEvent::Error {
                ..
            } => tracing::warn!(target: "events", "{}", event),
        }
    }
}
