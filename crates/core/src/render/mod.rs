pub mod html;
pub mod news;

use crate::client::error::StructuralError;
use crate::config::{Settings, DEFAULT_NEWS_LIMIT};
use crate::dashboard::{Dashboard, PLACEHOLDER};
use crate::domain::analysis::AnalysisResponse;
use crate::domain::decision::classify;
use news::NewsFormatter;

#[derive(Debug, Clone)]
pub struct ResultRenderer {
    news: NewsFormatter,
    news_limit: usize,
}

impl Default for ResultRenderer {
    fn default() -> Self {
        Self::new(NewsFormatter::default(), DEFAULT_NEWS_LIMIT)
    }
}

fn score_label(score: Option<f64>) -> String {
    match score {
        Some(v) => format!("Score: {v}"),
        None => format!("Score: {PLACEHOLDER}"),
    }
}

fn text_or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

impl ResultRenderer {
    pub fn new(news: NewsFormatter, news_limit: usize) -> Self {
        Self { news, news_limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(NewsFormatter::from_settings(settings), settings.news_limit)
    }

    /// Maps the payload onto the board and reveals the results panel.
    ///
    /// Fails before touching the board if `metrics` is absent.
    pub fn render(
        &self,
        board: &mut Dashboard,
        response: &AnalysisResponse,
    ) -> Result<(), StructuralError> {
        let metrics = response.metrics.as_ref().ok_or(StructuralError)?;

        board.news = self.news.format(response.news(), self.news_limit);
        board.news_visible = true;

        let results = &mut board.results;
        results.bull_score = score_label(metrics.bull_score);
        results.bull_summary = text_or_placeholder(response.bull_summary.as_deref());
        results.bear_score = score_label(metrics.bear_score);
        results.bear_summary = text_or_placeholder(response.bear_summary.as_deref());
        results.final_score = score_label(metrics.final_score);
        results.judge_summary = text_or_placeholder(response.final_summary.as_deref());
        results.confidence = text_or_placeholder(response.confidence.as_deref());

        let decision = response.final_decision.as_deref().unwrap_or_default();
        results.decision_label = text_or_placeholder(Some(decision));
        let class = classify(decision);
        results.decision_class = Some(class);
        results.badge = Some(class.badge_style());

        board.reveal();
        Ok(())
    }
}
