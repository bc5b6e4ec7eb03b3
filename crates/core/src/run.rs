//! Trigger-to-render orchestration.
//!
//! A run plays the scripted log and requests the analysis at the same time,
//! waits for both to settle, then renders. Only one run may be in flight;
//! triggers that arrive meanwhile are dropped, not queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::error::{AnalysisError, StructuralError};
use crate::client::{AnalysisClient, Source};
use crate::config::Settings;
use crate::dashboard::{lock, Dashboard, SharedDashboard};
use crate::domain::ticker::{SelectionError, TickerSelector};
use crate::render::ResultRenderer;
use crate::sequencer::script::default_script;
use crate::sequencer::{LogEntry, LogSequencer, LogSink};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    NoSelection,
    InFlight,
}

#[derive(Debug)]
pub enum RunOutcome {
    Rendered { run_id: u64, ticker: String },
    Failed { run_id: u64, ticker: String, error: RunError },
    Ignored(Ignored),
}

/// Display access for one run. Writes are dropped once another run owns the board.
struct RunScope {
    run_id: u64,
    board: SharedDashboard,
}

impl LogSink for RunScope {
    fn emit(&self, entry: &LogEntry) -> bool {
        lock(&self.board).append_log(self.run_id, entry)
    }

    fn advance_progress(&self, step: u8) {
        lock(&self.board).auto_progress(self.run_id, step);
    }
}

/// Stops the run's timers, re-enables the trigger and clears the in-flight
/// flag however the run ends, including when the trigger future is dropped.
struct RunGuard<'a> {
    run_id: u64,
    in_flight: &'a AtomicBool,
    board: &'a SharedDashboard,
    cancel: CancellationToken,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancel.cancel();
        {
            let mut board = lock(self.board);
            if board.is_current(self.run_id) {
                board.end_run();
            }
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

pub struct RunController {
    selector: Mutex<TickerSelector>,
    board: SharedDashboard,
    client: Arc<dyn AnalysisClient>,
    sequencer: LogSequencer,
    renderer: ResultRenderer,
    render_delay: Duration,
    in_flight: AtomicBool,
    last_run_id: AtomicU64,
}

impl RunController {
    pub fn new(settings: &Settings, client: Arc<dyn AnalysisClient>, board: SharedDashboard) -> Self {
        Self {
            selector: Mutex::new(TickerSelector::new(settings.tickers.iter().cloned())),
            board,
            client,
            sequencer: LogSequencer::new(settings.progress_step),
            renderer: ResultRenderer::from_settings(settings),
            render_delay: Duration::from_millis(settings.render_delay_ms),
            in_flight: AtomicBool::new(false),
            last_run_id: AtomicU64::new(0),
        }
    }

    pub fn board(&self) -> SharedDashboard {
        self.board.clone()
    }

    pub fn snapshot(&self) -> Dashboard {
        lock(&self.board).clone()
    }

    pub fn offered_tickers(&self) -> Vec<String> {
        self.selector_guard().offered().to_vec()
    }

    pub fn selected(&self) -> Option<String> {
        self.selector_guard().current().map(str::to_string)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn selector_guard(&self) -> std::sync::MutexGuard<'_, TickerSelector> {
        self.selector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn select(&self, ticker: &str) -> Result<String, SelectionError> {
        let chosen = self.selector_guard().select(ticker)?.to_string();
        lock(&self.board).on_selected(&chosen, !self.is_in_flight());
        tracing::debug!(ticker = %chosen, "ticker selected");
        Ok(chosen)
    }

    pub async fn trigger(&self) -> RunOutcome {
        let Some(ticker) = self.selected() else {
            tracing::debug!(error = %SelectionError::NoSelection, "trigger ignored");
            return RunOutcome::Ignored(Ignored::NoSelection);
        };

        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::warn!(%ticker, "trigger ignored; a run is already in flight");
            return RunOutcome::Ignored(Ignored::InFlight);
        }

        let run_id = self.last_run_id.fetch_add(1, Ordering::AcqRel) + 1;
        let cancel = CancellationToken::new();
        let _guard = RunGuard {
            run_id,
            in_flight: &self.in_flight,
            board: &self.board,
            cancel: cancel.clone(),
        };
        lock(&self.board).begin_run(run_id);

        let source = self.client.source();
        tracing::info!(run_id, %ticker, ?source, "analysis run started");

        let outcome = self.execute(run_id, &ticker, source, &cancel).await;
        match &outcome {
            RunOutcome::Rendered { .. } => tracing::info!(run_id, %ticker, "analysis run rendered"),
            RunOutcome::Failed { error, .. } => {
                tracing::error!(run_id, %ticker, error = %error, "analysis run failed")
            }
            RunOutcome::Ignored(_) => {}
        }
        outcome
    }

    async fn execute(
        &self,
        run_id: u64,
        ticker: &str,
        source: Source,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let scope = RunScope {
            run_id,
            board: self.board.clone(),
        };
        let script = default_script(ticker, source == Source::Mock);

        let fetch = async {
            let res = self.client.fetch_analysis(ticker).await;
            if res.is_err() {
                // Remaining scripted lines would contradict the failure.
                cancel.cancel();
            }
            res
        };

        let (played, fetched) = tokio::join!(self.sequencer.play(&scope, &script, cancel), fetch);
        tracing::debug!(run_id, ?played, "log playback settled");

        let failed = |error: RunError| RunOutcome::Failed {
            run_id,
            ticker: ticker.to_string(),
            error,
        };

        let response = match fetched {
            Ok(response) => response,
            Err(err) => {
                if let AnalysisError::Schema {
                    raw_output: Some(raw),
                    ..
                } = &err
                {
                    tracing::debug!(run_id, raw_len = raw.len(), "rejected response body");
                }
                lock(&self.board).fail_run(&err.to_string());
                return failed(err.into());
            }
        };

        lock(&self.board).complete_progress();
        tokio::time::sleep(self.render_delay).await;

        let rendered = {
            let mut board = lock(&self.board);
            let res = self.renderer.render(&mut board, &response);
            if let Err(err) = &res {
                board.fail_render(&err.to_string());
                board.reveal();
            }
            res
        };

        match rendered {
            Ok(()) => RunOutcome::Rendered {
                run_id,
                ticker: ticker.to_string(),
            },
            Err(err) => failed(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{demo_payload, MockAnalysisClient};
    use crate::dashboard::{UiEvent, FAILURE_PLACEHOLDER, PLACEHOLDER};
    use crate::domain::analysis::AnalysisResponse;
    use crate::sequencer::LogCategory;
    use std::sync::atomic::AtomicUsize;

    struct FakeClient {
        calls: AtomicUsize,
        latency: Duration,
        result: Result<AnalysisResponse, AnalysisError>,
    }

    impl FakeClient {
        fn ok(latency_ms: u64, response: AnalysisResponse) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                latency: Duration::from_millis(latency_ms),
                result: Ok(response),
            })
        }

        fn err(latency_ms: u64, error: AnalysisError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                latency: Duration::from_millis(latency_ms),
                result: Err(error),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl AnalysisClient for FakeClient {
        fn source(&self) -> Source {
            Source::Remote
        }

        async fn fetch_analysis(&self, _ticker: &str) -> Result<AnalysisResponse, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.result.clone()
        }
    }

    fn controller(client: Arc<dyn AnalysisClient>) -> RunController {
        RunController::new(&Settings::default(), client, Dashboard::shared())
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_without_selection_is_a_no_op() {
        let client = FakeClient::ok(10, demo_payload());
        let app = controller(client.clone());

        let outcome = app.trigger().await;
        assert!(matches!(outcome, RunOutcome::Ignored(Ignored::NoSelection)));
        assert_eq!(client.calls(), 0);
        assert!(!app.snapshot().terminal_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_run_renders_after_full_script() {
        let client = FakeClient::ok(2000, demo_payload());
        let app = controller(client.clone());
        app.select("tcs").unwrap();
        assert_eq!(app.snapshot().trigger_label, "RUN ANALYSIS: TCS");

        let outcome = app.trigger().await;
        assert!(matches!(outcome, RunOutcome::Rendered { run_id: 1, .. }));

        let board = app.snapshot();
        assert_eq!(board.logs.len(), 7);
        assert!(board.logs.windows(2).all(|w| w[0].offset_ms < w[1].offset_ms));
        assert_eq!(board.progress.value(), 100);
        assert!(board.panel_visible);
        assert_eq!(board.results.decision_label, "BUY");
        assert!(board.trigger_enabled);
        assert!(!app.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_while_in_flight_is_ignored() {
        let client = FakeClient::ok(3000, demo_payload());
        let app = controller(client.clone());
        app.select("TCS").unwrap();

        let (first, second) = tokio::join!(app.trigger(), app.trigger());

        assert!(matches!(first, RunOutcome::Rendered { .. }));
        assert!(matches!(second, RunOutcome::Ignored(Ignored::InFlight)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn http_error_aborts_without_render() {
        let client = FakeClient::err(
            2000,
            AnalysisError::Http {
                status: 502,
                body: None,
            },
        );
        let app = controller(client.clone());
        app.select("INFY").unwrap();

        let outcome = app.trigger().await;
        match outcome {
            RunOutcome::Failed { error, .. } => assert_eq!(error.to_string(), "API Error: 502"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let board = app.snapshot();
        let last = board.logs.last().unwrap();
        assert_eq!(last.category, LogCategory::Error);
        assert_eq!(last.text, "[ERROR] Protocol Failed: API Error: 502");
        // Lines due after the failure never fire.
        assert_eq!(board.logs.len(), 4);
        assert!(!board.panel_visible);
        assert_eq!(board.results.bull_score, PLACEHOLDER);
        assert!(board.progress.value() < 100);
        assert!(board.trigger_enabled);
        assert!(!app.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn structural_error_marks_every_summary() {
        let response = AnalysisResponse {
            metrics: None,
            ..demo_payload()
        };
        let app = controller(FakeClient::ok(100, response));
        app.select("TCS").unwrap();

        let outcome = app.trigger().await;
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                error: RunError::Structural(_),
                ..
            }
        ));

        let board = app.snapshot();
        assert_eq!(board.results.bull_summary, FAILURE_PLACEHOLDER);
        assert_eq!(board.results.bear_summary, FAILURE_PLACEHOLDER);
        assert_eq!(board.results.judge_summary, FAILURE_PLACEHOLDER);
        assert_eq!(board.results.bull_score, PLACEHOLDER);
        assert_eq!(board.results.final_score, PLACEHOLDER);
        assert!(board.trigger_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn structural_error_does_not_show_previous_verdict() {
        let board = Dashboard::shared();
        let settings = Settings::default();

        let first = RunController::new(&settings, FakeClient::ok(100, demo_payload()), board.clone());
        first.select("TCS").unwrap();
        assert!(matches!(first.trigger().await, RunOutcome::Rendered { .. }));
        assert_eq!(lock(&board).results.bull_score, "Score: 85");

        let broken = AnalysisResponse {
            metrics: None,
            ..demo_payload()
        };
        let second = RunController::new(&settings, FakeClient::ok(100, broken), board.clone());
        second.select("INFY").unwrap();
        assert!(matches!(second.trigger().await, RunOutcome::Failed { .. }));

        let results = lock(&board).results.clone();
        assert_eq!(results.bull_score, PLACEHOLDER);
        assert_eq!(results.bear_score, PLACEHOLDER);
        assert_eq!(results.final_score, PLACEHOLDER);
        assert_eq!(results.decision_label, PLACEHOLDER);
        assert_eq!(results.confidence, PLACEHOLDER);
        assert_eq!(results.decision_class, None);
        assert_eq!(results.badge, None);
        assert_eq!(results.bull_summary, FAILURE_PLACEHOLDER);
    }

    #[tokio::test(start_paused = true)]
    async fn can_retry_after_failure() {
        let app = controller(FakeClient::err(10, AnalysisError::Transport("refused".into())));
        app.select("TCS").unwrap();
        assert!(matches!(app.trigger().await, RunOutcome::Failed { run_id: 1, .. }));
        assert!(matches!(app.trigger().await, RunOutcome::Failed { run_id: 2, .. }));
        assert!(app.snapshot().logs.iter().all(|l| l.run_id == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_run_releases_the_flag() {
        let app = controller(FakeClient::ok(60_000, demo_payload()));
        app.select("TCS").unwrap();

        let aborted = tokio::time::timeout(Duration::from_millis(1000), app.trigger()).await;
        assert!(aborted.is_err());
        assert!(!app.is_in_flight());
        assert!(app.snapshot().trigger_enabled);

        let lines_at_abort = app.snapshot().logs.len();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(app.snapshot().logs.len(), lines_at_abort);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_source_plays_warning_line() {
        let app = controller(Arc::new(MockAnalysisClient::default()));
        app.select("TCS").unwrap();
        assert!(matches!(app.trigger().await, RunOutcome::Rendered { .. }));

        let board = app.snapshot();
        assert_eq!(board.logs.len(), 8);
        assert!(board
            .logs
            .iter()
            .any(|l| l.category == LogCategory::Warning));
    }

    #[tokio::test(start_paused = true)]
    async fn every_run_ends_with_settled_event() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let app = RunController::new(
            &Settings::default(),
            FakeClient::err(100, AnalysisError::Transport("reset".into())),
            Dashboard::with_events(tx),
        );
        app.select("SBIN").unwrap();
        app.trigger().await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&UiEvent::Progress(0)));
        assert_eq!(events.last(), Some(&UiEvent::Settled));
        assert!(events.contains(&UiEvent::Failed("Network Error: reset".to_string())));
        assert!(!events.contains(&UiEvent::Revealed));
    }

    #[test]
    fn selecting_during_a_run_keeps_trigger_disabled() {
        let app = controller(FakeClient::ok(10, demo_payload()));
        app.in_flight.store(true, Ordering::SeqCst);
        app.select("INFY").unwrap();
        let board = app.snapshot();
        assert!(!board.trigger_enabled);
        assert_eq!(board.trigger_label, "RUN ANALYSIS: INFY");
    }

    #[test]
    fn unknown_ticker_is_rejected() {
        let app = controller(FakeClient::ok(10, demo_payload()));
        assert!(app.select("AAPL").is_err());
        assert_eq!(app.selected(), None);
        assert_eq!(app.offered_tickers().len(), 5);
    }
}
