use crate::client::error::AnalysisError;
use crate::client::{AnalysisClient, Source};
use crate::domain::analysis::{AnalysisResponse, Metrics, NewsItem};
use std::time::Duration;

const DEFAULT_LATENCY_MS: u64 = 1000;

/// Serves a canned committee verdict so the interface can be exercised
/// without the remote service.
#[derive(Debug, Clone)]
pub struct MockAnalysisClient {
    latency: Duration,
    payload: AnalysisResponse,
}

impl Default for MockAnalysisClient {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
            payload: demo_payload(),
        }
    }
}

impl MockAnalysisClient {
    pub fn new(latency: Duration, payload: AnalysisResponse) -> Self {
        Self { latency, payload }
    }
}

#[async_trait::async_trait]
impl AnalysisClient for MockAnalysisClient {
    fn source(&self) -> Source {
        Source::Mock
    }

    async fn fetch_analysis(&self, ticker: &str) -> Result<AnalysisResponse, AnalysisError> {
        tracing::debug!(%ticker, latency_ms = self.latency.as_millis() as u64, "serving mock analysis");
        tokio::time::sleep(self.latency).await;
        Ok(self.payload.clone())
    }
}

pub fn demo_payload() -> AnalysisResponse {
    AnalysisResponse {
        ticker: Some("TCS".to_string()),
        metrics: Some(Metrics {
            bull_score: Some(85.0),
            bear_score: Some(72.0),
            final_score: Some(13.0),
        }),
        bull_summary: Some(
            "TCS demonstrates strong resilience with high ROE (~50%) and margin stability despite \
             wage pressures. The MPC's unchanged repo rate (6.50%) provides a stable macroeconomic backdrop."
                .to_string(),
        ),
        bear_summary: Some(
            "The IT/ITeS sector faces headwinds due to high inflation and elevated policy repo rates. \
             Rising deposit rates squeeze margins, while AI-driven innovation demands escalating R&D investments."
                .to_string(),
        ),
        final_decision: Some("BUY".to_string()),
        confidence: Some("Medium".to_string()),
        final_summary: Some(
            "TCS's strong profitability metrics and leadership in AI-driven IT services support \
             long-term growth. However, sector-specific headwinds introduce near-term risks."
                .to_string(),
        ),
        recent_news: Some(vec![
            NewsItem {
                title: Some("IT stocks selloff continues! Infosys, TCS crash up to 6%".to_string()),
                summary: Some("IT stocks selloff continues! Infosys, TCS crash up to 6%.".to_string()),
                published: None,
            },
            NewsItem {
                title: Some("State Bank Of India Overtakes TCS".to_string()),
                summary: Some(
                    "State Bank Of India Overtakes TCS To Become Fourth Most Valued Company In India."
                        .to_string(),
                ),
                published: None,
            },
        ]),
    }
}
