//! Display state of the Trade-Mind page, independent of how it is drawn.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::decision::{BadgeStyle, DecisionClass};
use crate::render::news::NewsCard;
use crate::sequencer::{LogCategory, LogEntry};

pub const PLACEHOLDER: &str = "—";
pub const FAILURE_PLACEHOLDER: &str = "Analysis unavailable";
pub const IDLE_TRIGGER_LABEL: &str = "SELECT A TICKER";

/// Automatic increments stop here; only completion reaches 100.
pub const AUTO_PROGRESS_CAP: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub run_id: u64,
    pub category: LogCategory,
    pub text: String,
    pub offset_ms: u64,
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UiEvent {
    LogAppended(LogLine),
    Progress(u8),
    Revealed,
    Failed(String),
    /// The run is over and the trigger is usable again.
    Settled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress(u8);

impl Progress {
    pub fn value(self) -> u8 {
        self.0
    }

    /// Adds `step` unless the bar already sits at the cap. Never lowers the value.
    pub fn auto_step(&mut self, step: u8) -> u8 {
        if self.0 < AUTO_PROGRESS_CAP {
            self.0 = self.0.saturating_add(step).min(AUTO_PROGRESS_CAP);
        }
        self.0
    }

    pub fn complete(&mut self) {
        self.0 = 100;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPanel {
    pub bull_score: String,
    pub bull_summary: String,
    pub bear_score: String,
    pub bear_summary: String,
    pub final_score: String,
    pub judge_summary: String,
    pub decision_label: String,
    pub decision_class: Option<DecisionClass>,
    pub badge: Option<BadgeStyle>,
    pub confidence: String,
}

impl Default for ResultsPanel {
    fn default() -> Self {
        Self {
            bull_score: PLACEHOLDER.to_string(),
            bull_summary: String::new(),
            bear_score: PLACEHOLDER.to_string(),
            bear_summary: String::new(),
            final_score: PLACEHOLDER.to_string(),
            judge_summary: String::new(),
            decision_label: PLACEHOLDER.to_string(),
            decision_class: None,
            badge: None,
            confidence: PLACEHOLDER.to_string(),
        }
    }
}

impl ResultsPanel {
    fn fail_summaries(&mut self) {
        self.bull_summary = FAILURE_PLACEHOLDER.to_string();
        self.bear_summary = FAILURE_PLACEHOLDER.to_string();
        self.judge_summary = FAILURE_PLACEHOLDER.to_string();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub run_id: u64,
    pub trigger_label: String,
    pub trigger_enabled: bool,
    pub terminal_visible: bool,
    pub logs: Vec<LogLine>,
    pub progress: Progress,
    pub results: ResultsPanel,
    pub news: Vec<NewsCard>,
    pub news_visible: bool,
    pub panel_visible: bool,
    pub scrolled_into_view: bool,

    #[serde(skip)]
    events: Option<UnboundedSender<UiEvent>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            run_id: 0,
            trigger_label: IDLE_TRIGGER_LABEL.to_string(),
            trigger_enabled: false,
            terminal_visible: false,
            logs: Vec::new(),
            progress: Progress::default(),
            results: ResultsPanel::default(),
            news: Vec::new(),
            news_visible: false,
            panel_visible: false,
            scrolled_into_view: false,
            events: None,
        }
    }
}

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Locks the board, recovering the data if a previous holder panicked.
pub fn lock(board: &SharedDashboard) -> MutexGuard<'_, Dashboard> {
    board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Dashboard {
    pub fn shared() -> SharedDashboard {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn with_events(events: UnboundedSender<UiEvent>) -> SharedDashboard {
        Arc::new(Mutex::new(Self {
            events: Some(events),
            ..Self::default()
        }))
    }

    fn publish(&self, event: UiEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// The trigger stays disabled while a run is in flight.
    pub fn on_selected(&mut self, ticker: &str, idle: bool) {
        self.trigger_enabled = idle;
        self.trigger_label = format!("RUN ANALYSIS: {ticker}");
    }

    /// Starts a fresh run: everything from the previous run is cleared.
    pub fn begin_run(&mut self, run_id: u64) {
        self.run_id = run_id;
        self.logs.clear();
        self.progress = Progress::default();
        self.news.clear();
        self.news_visible = false;
        self.panel_visible = false;
        self.scrolled_into_view = false;
        self.results = ResultsPanel::default();
        self.terminal_visible = true;
        self.trigger_enabled = false;
        self.publish(UiEvent::Progress(0));
    }

    pub fn end_run(&mut self) {
        self.trigger_enabled = true;
        self.publish(UiEvent::Settled);
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        self.run_id == run_id
    }

    /// Appends a scripted line. Lines from a superseded run are dropped.
    pub fn append_log(&mut self, run_id: u64, entry: &LogEntry) -> bool {
        if !self.is_current(run_id) {
            tracing::warn!(run_id, current = self.run_id, "dropping log line from stale run");
            return false;
        }
        self.push_line(entry.category, entry.message.clone(), entry.emit_after_ms);
        true
    }

    fn push_line(&mut self, category: LogCategory, text: String, offset_ms: u64) {
        let line = LogLine {
            run_id: self.run_id,
            category,
            text,
            offset_ms,
            emitted_at: Utc::now(),
        };
        self.logs.push(line.clone());
        self.publish(UiEvent::LogAppended(line));
    }

    pub fn auto_progress(&mut self, run_id: u64, step: u8) -> Option<u8> {
        if !self.is_current(run_id) {
            return None;
        }
        let before = self.progress.value();
        let after = self.progress.auto_step(step);
        if after != before {
            self.publish(UiEvent::Progress(after));
        }
        Some(after)
    }

    pub fn complete_progress(&mut self) {
        self.progress.complete();
        self.publish(UiEvent::Progress(100));
    }

    /// Request-level failure: one error line, no partial render.
    pub fn fail_run(&mut self, message: &str) {
        self.push_line(
            LogCategory::Error,
            format!("[ERROR] Protocol Failed: {message}"),
            0,
        );
        self.publish(UiEvent::Failed(message.to_string()));
    }

    /// Render-level failure: every summary shows the failure placeholder.
    pub fn fail_render(&mut self, message: &str) {
        self.results.fail_summaries();
        self.publish(UiEvent::Failed(message.to_string()));
    }

    pub fn reveal(&mut self) {
        self.panel_visible = true;
        self.scrolled_into_view = true;
        self.publish(UiEvent::Revealed);
    }
}
