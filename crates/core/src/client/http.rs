use crate::client::error::AnalysisError;
use crate::client::{AnalysisClient, Source};
use crate::config::Settings;
use crate::domain::analysis::AnalysisResponse;
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Body keys that signal a server-side failure despite a 2xx status.
const ERROR_KEYS: &[&str] = &["error", "detail"];

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    ticker: &'a str,
}

impl HttpAnalysisClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let endpoint = build_endpoint(
            &settings.api_url,
            settings.api_path.as_deref(),
            settings.cors_relay.as_deref(),
            &settings.cors_relay_param,
        )?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build analysis http client")?;

        Ok(Self { http, endpoint })
    }
}

/// Joins the base URL and optional path, then wraps the result in the relay if one is set.
pub fn build_endpoint(
    api_url: &str,
    api_path: Option<&str>,
    relay: Option<&str>,
    relay_param: &str,
) -> anyhow::Result<Url> {
    let target = match api_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => {
            let path = path.trim_start_matches('/');
            format!("{}/{}", api_url.trim_end_matches('/'), path)
        }
        None => api_url.to_string(),
    };
    let target = Url::parse(&target).with_context(|| format!("invalid analysis URL: {target}"))?;

    let Some(relay) = relay else {
        return Ok(target);
    };

    let mut relayed =
        Url::parse(relay).with_context(|| format!("invalid CORS relay URL: {relay}"))?;
    relayed
        .query_pairs_mut()
        .append_pair(relay_param, target.as_str());
    Ok(relayed)
}

/// Validates a 2xx body and decodes it.
pub fn parse_analysis(text: &str) -> Result<AnalysisResponse, AnalysisError> {
    let raw = serde_json::from_str::<Value>(text).map_err(|e| {
        AnalysisError::schema(format!("response is not valid JSON: {e}"), Some(text))
    })?;

    let Some(obj) = raw.as_object() else {
        return Err(AnalysisError::schema(
            "response is not a JSON object",
            Some(text),
        ));
    };

    for key in ERROR_KEYS {
        match obj.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::String(msg)) => {
                return Err(AnalysisError::schema(
                    format!("server reported: {msg}"),
                    Some(text),
                ))
            }
            Some(other) => {
                return Err(AnalysisError::schema(
                    format!("server reported: {other}"),
                    Some(text),
                ))
            }
        }
    }

    if obj.get("metrics").map_or(true, Value::is_null) {
        return Err(AnalysisError::schema(
            "response is missing required field `metrics`",
            Some(text),
        ));
    }

    serde_json::from_value::<AnalysisResponse>(raw).map_err(|e| {
        AnalysisError::schema(format!("response does not match schema: {e}"), Some(text))
    })
}

#[async_trait::async_trait]
impl AnalysisClient for HttpAnalysisClient {
    fn source(&self) -> Source {
        Source::Remote
    }

    async fn fetch_analysis(&self, ticker: &str) -> Result<AnalysisResponse, AnalysisError> {
        tracing::debug!(%ticker, endpoint = %self.endpoint, "requesting analysis");

        let res = self
            .http
            .post(self.endpoint.clone())
            .json(&AnalyzeRequest { ticker })
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            // The status is the failure; the body is only diagnostics.
            let body = res.text().await.ok().filter(|t| !t.is_empty());
            return Err(AnalysisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = res
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(format!("failed to read response body: {e}")))?;

        parse_analysis(&text)
    }
}
