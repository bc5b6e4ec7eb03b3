use chrono::Local;
use tokio::sync::mpsc::UnboundedReceiver;
use trademind_core::dashboard::{Dashboard, LogLine, UiEvent};
use trademind_core::domain::decision::DecisionClass;
use trademind_core::render::news::NewsCard;
use trademind_core::sequencer::LogCategory;

const BAR_WIDTH: usize = 20;

/// Prints events as they arrive until the current run settles.
///
/// Returns `false` once the channel is closed.
pub async fn follow_run(rx: &mut UnboundedReceiver<UiEvent>) -> bool {
    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::LogAppended(line) => println!("{}", log_line(&line)),
            UiEvent::Progress(value) if value > 0 => println!("{}", progress_bar(value)),
            UiEvent::Progress(_) | UiEvent::Revealed => {}
            UiEvent::Failed(message) => tracing::debug!(%message, "run failure shown"),
            UiEvent::Settled => return true,
        }
    }
    false
}

fn category_tag(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Info => "INFO",
        LogCategory::Process => "PROC",
        LogCategory::Warning => "WARN",
        LogCategory::Success => " OK ",
        LogCategory::Error => "ERR ",
    }
}

pub fn log_line(line: &LogLine) -> String {
    format!(
        "{} {} > {}",
        line.emitted_at.with_timezone(&Local).format("%H:%M:%S"),
        category_tag(line.category),
        line.text
    )
}

pub fn progress_bar(value: u8) -> String {
    let filled = usize::from(value.min(100)) * BAR_WIDTH / 100;
    format!(
        "         [{}{}] {value:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled)
    )
}

fn class_name(class: Option<DecisionClass>) -> &'static str {
    match class {
        Some(DecisionClass::Bullish) => "bullish",
        Some(DecisionClass::Bearish) => "bearish",
        Some(DecisionClass::Neutral) | None => "neutral",
    }
}

fn news_card(index: usize, card: &NewsCard) -> String {
    if card.placeholder {
        return format!("  {} {}", card.title, card.snippet);
    }

    let mut out = format!("  {index}. {}\n     {}", card.title, card.snippet);
    let meta: Vec<&str> = [card.source.as_deref(), card.published.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !meta.is_empty() {
        out.push_str(&format!("\n     {}", meta.join(" | ")));
    }
    if let Some(click) = card.click_through() {
        out.push_str(&format!("\n     Read Source: {}", click.url));
    }
    if let Some(fragment) = &card.fragment {
        out.push_str(&format!("\n     html: {fragment}"));
    }
    out
}

pub fn results_panel(board: &Dashboard) -> String {
    let r = &board.results;
    let mut out = String::new();

    if board.news_visible {
        out.push_str("\nRECENT NEWS\n");
        for (i, card) in board.news.iter().enumerate() {
            out.push_str(&news_card(i + 1, card));
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "\nBULL   {}\n  {}\n\nBEAR   {}\n  {}\n\nJUDGE  [{}] ({})  {}  Confidence: {}\n  {}\n",
        r.bull_score,
        r.bull_summary,
        r.bear_score,
        r.bear_summary,
        r.decision_label,
        class_name(r.decision_class),
        r.final_score,
        r.confidence,
        r.judge_summary,
    ));
    out
}
