use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The run was triggered before any ticker was chosen.
    #[error("no ticker selected")]
    NoSelection,

    #[error("ticker {0} is not one of the offered choices")]
    UnknownTicker(String),
}

/// Tracks the single selected symbol out of a fixed set of choices.
#[derive(Debug, Clone)]
pub struct TickerSelector {
    offered: Vec<String>,
    selected: Option<String>,
}

impl TickerSelector {
    pub fn new<I, S>(offered: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            offered: offered.into_iter().map(Into::into).collect(),
            selected: None,
        }
    }

    pub fn offered(&self) -> &[String] {
        &self.offered
    }

    /// Last write wins. Matching is case-insensitive; the offered spelling is kept.
    pub fn select(&mut self, ticker: &str) -> Result<&str, SelectionError> {
        let wanted = ticker.trim();
        let found = self
            .offered
            .iter()
            .find(|t| t.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SelectionError::UnknownTicker(wanted.to_string()))?;
        Ok(self.selected.insert(found.clone()).as_str())
    }

    pub fn current(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}
