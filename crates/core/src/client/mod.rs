pub mod error;
pub mod http;
pub mod mock;

use std::sync::Arc;

use crate::config::Settings;
use crate::domain::analysis::AnalysisResponse;
use error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Mock,
}

#[async_trait::async_trait]
pub trait AnalysisClient: Send + Sync {
    fn source(&self) -> Source;

    /// One attempt, no retry. Rendering is not attempted on `Err`.
    async fn fetch_analysis(&self, ticker: &str) -> Result<AnalysisResponse, AnalysisError>;
}

pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn AnalysisClient>> {
    if settings.use_mock_data {
        return Ok(Arc::new(mock::MockAnalysisClient::default()));
    }
    Ok(Arc::new(http::HttpAnalysisClient::from_settings(settings)?))
}
