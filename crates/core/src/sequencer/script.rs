use super::{LogCategory, LogEntry};

/// The research pipeline shown while the committee "deliberates".
///
/// Offsets are absolute from the start of the run. The mock variant adds a
/// warning line so it is obvious the payload is not live.
pub fn default_script(ticker: &str, mock: bool) -> Vec<LogEntry> {
    let mut script = vec![
        LogEntry::new(
            format!("[SYSTEM] Initializing Investment Committee for {ticker}..."),
            LogCategory::Info,
            0,
        ),
        LogEntry::new(
            "[MACRO] Fetching: Indian Union Budget 2026-27 Data...",
            LogCategory::Process,
            800,
        ),
        LogEntry::new(
            "[MACRO] Analyzing: RBI Monetary Policy Committee Minutes 2025...",
            LogCategory::Process,
            1500,
        ),
        LogEntry::new(
            "[SECTOR] Loading: CareEdge Indian IT Sector Report 2025...",
            LogCategory::Info,
            2500,
        ),
        LogEntry::new(
            format!("[COMPANY] Vector Search: {ticker} Annual Report (FY25)..."),
            LogCategory::Process,
            3500,
        ),
    ];

    if mock {
        script.push(LogEntry::new(
            "[DEBUG] CORS Bypass Active: Loading Simulation Data...",
            LogCategory::Warning,
            4000,
        ));
    }

    script.push(LogEntry::new(
        "[NEWS] Google News API: Sentiment Analysis Complete...",
        LogCategory::Process,
        5000,
    ));
    script.push(LogEntry::new(
        "[SYSTEM] Consensus Reached. Generating Investment Thesis...",
        LogCategory::Success,
        6000,
    ));
    script
}
