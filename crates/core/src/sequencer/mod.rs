//! Timed playback of the scripted research log.
//!
//! Each entry is due at an absolute offset from the start of playback, not
//! relative to the entry before it. Entries are still emitted strictly in the
//! given order: an entry whose offset has already passed fires immediately
//! after its predecessor.

pub mod script;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_PROGRESS_STEP;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Info,
    Process,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub category: LogCategory,
    pub emit_after_ms: u64,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, category: LogCategory, emit_after_ms: u64) -> Self {
        Self {
            message: message.into(),
            category,
            emit_after_ms,
        }
    }
}

/// Receives lines as their timers fire.
pub trait LogSink: Send + Sync {
    /// Returns `false` if the sink no longer accepts lines for this playback.
    fn emit(&self, entry: &LogEntry) -> bool;

    fn advance_progress(&self, step: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Completed { emitted: usize },
    Cancelled { emitted: usize },
    /// The sink rejected a line because a newer run owns the display.
    Superseded { emitted: usize },
}

impl PlayOutcome {
    pub fn emitted(self) -> usize {
        match self {
            PlayOutcome::Completed { emitted }
            | PlayOutcome::Cancelled { emitted }
            | PlayOutcome::Superseded { emitted } => emitted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogSequencer {
    progress_step: u8,
}

impl Default for LogSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_STEP)
    }
}

impl LogSequencer {
    pub fn new(progress_step: u8) -> Self {
        Self { progress_step }
    }

    pub async fn play<S>(
        &self,
        sink: &S,
        entries: &[LogEntry],
        cancel: &CancellationToken,
    ) -> PlayOutcome
    where
        S: LogSink + ?Sized,
    {
        let start = Instant::now();
        let mut emitted = 0usize;

        for entry in entries {
            let due = start + Duration::from_millis(entry.emit_after_ms);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(emitted, remaining = entries.len() - emitted, "log playback cancelled");
                    return PlayOutcome::Cancelled { emitted };
                }
                _ = sleep_until(due) => {}
            }

            if !sink.emit(entry) {
                return PlayOutcome::Superseded { emitted };
            }
            sink.advance_progress(self.progress_step);
            emitted += 1;
        }

        PlayOutcome::Completed { emitted }
    }
}
