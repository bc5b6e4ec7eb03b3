use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trademind_core::config::{parse_ticker_list, Settings};
use trademind_core::dashboard::{Dashboard, UiEvent};
use trademind_core::run::{Ignored, RunController, RunOutcome};

mod display;

#[derive(Debug, Parser)]
#[command(name = "trademind", about = "Trade-Mind investment committee terminal")]
struct Args {
    /// Ticker to analyse. Must be one of the offered symbols.
    #[arg(long)]
    ticker: Option<String>,

    /// Use the built-in demonstration payload instead of calling the API.
    #[arg(long)]
    mock: bool,

    /// Analysis service base URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Path suffix on the service, e.g. /analyze or /api/analyze.
    #[arg(long)]
    api_path: Option<String>,

    /// CORS relay that receives the real URL as a query parameter.
    #[arg(long)]
    relay: Option<String>,

    /// Comma-separated ticker choices, replacing the configured set.
    #[arg(long)]
    tickers: Option<String>,

    #[arg(long)]
    news_limit: Option<usize>,

    /// Print the final display state as JSON instead of the live terminal.
    #[arg(long)]
    json: bool,

    #[arg(long)]
    list_tickers: bool,

    /// Read one ticker per line from stdin and run each.
    #[arg(long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    apply_overrides(&mut settings, &args);
    settings.validate()?;

    if args.list_tickers {
        for ticker in &settings.tickers {
            println!("{ticker}");
        }
        return Ok(());
    }

    let client = trademind_core::client::from_settings(&settings)
        .context("failed to build analysis client")?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = RunController::new(&settings, client, Dashboard::with_events(tx));

    tracing::info!(
        mock = settings.use_mock_data,
        api_url = %settings.api_url,
        tickers = settings.tickers.len(),
        "trademind terminal ready"
    );

    if args.interactive {
        return interactive(&app, &mut rx, args.json).await;
    }

    if let Some(ticker) = args.ticker.as_deref() {
        if let Err(err) = app.select(ticker) {
            eprintln!("{err}; choose one of: {}", app.offered_tickers().join(", "));
            return Ok(());
        }
    }

    if app.selected().is_none() {
        // Nothing selected: the trigger is a no-op.
        let outcome = app.trigger().await;
        tracing::debug!(?outcome, "no ticker selected");
        eprintln!(
            "select a ticker with --ticker (one of: {})",
            app.offered_tickers().join(", ")
        );
        return Ok(());
    }

    run_once(&app, &mut rx, args.json).await
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if args.mock {
        settings.use_mock_data = true;
    }
    if let Some(url) = &args.api_url {
        settings.api_url = url.clone();
    }
    if let Some(path) = &args.api_path {
        settings.api_path = Some(path.clone()).filter(|p| !p.trim().is_empty());
    }
    if let Some(relay) = &args.relay {
        settings.cors_relay = Some(relay.clone());
    }
    if let Some(raw) = &args.tickers {
        let tickers = parse_ticker_list(raw);
        if !tickers.is_empty() {
            settings.tickers = tickers;
        }
    }
    if let Some(limit) = args.news_limit {
        settings.news_limit = limit;
    }
}

async fn run_once(
    app: &RunController,
    rx: &mut UnboundedReceiver<UiEvent>,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = if json {
        let outcome = app.trigger().await;
        while rx.try_recv().is_ok() {}
        outcome
    } else {
        let (outcome, _) = tokio::join!(app.trigger(), display::follow_run(rx));
        outcome
    };

    let board = app.snapshot();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&board).context("failed to serialise display state")?
        );
    } else if board.panel_visible {
        print!("{}", display::results_panel(&board));
    }

    report(outcome);
    Ok(())
}

async fn interactive(
    app: &RunController,
    rx: &mut UnboundedReceiver<UiEvent>,
    json: bool,
) -> anyhow::Result<()> {
    eprintln!(
        "enter a ticker ({}), or `quit`",
        app.offered_tickers().join(", ")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        match app.select(input) {
            Ok(_) => run_once(app, rx, json).await?,
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn report(outcome: RunOutcome) {
    match outcome {
        RunOutcome::Rendered { run_id, ticker } => {
            tracing::debug!(run_id, %ticker, "run complete");
        }
        RunOutcome::Failed { run_id, ticker, error } => {
            let err = anyhow::Error::new(error).context(format!("analysis run {run_id} for {ticker}"));
            sentry_anyhow::capture_anyhow(&err);
        }
        RunOutcome::Ignored(Ignored::InFlight) => {
            tracing::warn!("a run is already in flight");
        }
        RunOutcome::Ignored(Ignored::NoSelection) => {}
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
