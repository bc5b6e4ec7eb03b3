use thiserror::Error;

/// Failure of a single analysis request. The run aborts on any variant.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("API Error: {status}")]
    Http { status: u16, body: Option<String> },

    #[error("{detail}")]
    Schema {
        detail: String,
        raw_output: Option<String>,
    },

    #[error("Network Error: {0}")]
    Transport(String),
}

impl AnalysisError {
    pub fn schema(detail: impl Into<String>, raw_output: Option<&str>) -> Self {
        AnalysisError::Schema {
            detail: detail.into(),
            raw_output: raw_output.map(str::to_string),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AnalysisError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::Http { .. } => "http",
            AnalysisError::Schema { .. } => "schema",
            AnalysisError::Transport(_) => "transport",
        }
    }
}

/// Raised by the renderer when the payload lacks `metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("response is missing required field `metrics`")]
pub struct StructuralError;
