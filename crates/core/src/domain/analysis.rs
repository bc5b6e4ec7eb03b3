use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Payload returned by the analysis service.
///
/// Only `metrics` is structurally required; every other field may be absent
/// and is rendered as a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default, deserialize_with = "loose_string")]
    pub ticker: Option<String>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default, deserialize_with = "loose_string")]
    pub bull_summary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub bear_summary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub final_decision: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub confidence: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub final_summary: Option<String>,
    #[serde(default)]
    pub recent_news: Option<Vec<NewsItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "loose_number")]
    pub bull_score: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub bear_score: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub final_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    /// May carry raw HTML, typically an anchor followed by a `<font>` source label.
    #[serde(default, deserialize_with = "loose_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub published: Option<String>,
}

impl AnalysisResponse {
    pub fn news(&self) -> &[NewsItem] {
        self.recent_news.as_deref().unwrap_or_default()
    }
}

// The service is not strict about scalar types: confidence arrives as "Medium"
// from some builds and 0.72 from others.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
