use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionClass {
    Bullish,
    Bearish,
    Neutral,
}

/// Classifies a free-text verdict by case-insensitive substring match.
///
/// "BUY" is checked before "SELL", so a string mentioning both is bullish.
pub fn classify(decision: &str) -> DecisionClass {
    let upper = decision.to_uppercase();
    if upper.contains("BUY") {
        DecisionClass::Bullish
    } else if upper.contains("SELL") {
        DecisionClass::Bearish
    } else {
        DecisionClass::Neutral
    }
}

/// Colors of the decision badge, named after the page palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeStyle {
    pub background: &'static str,
    pub foreground: &'static str,
}

impl DecisionClass {
    pub fn badge_style(self) -> BadgeStyle {
        match self {
            DecisionClass::Bullish => BadgeStyle {
                background: "bull",
                foreground: "#000",
            },
            DecisionClass::Bearish => BadgeStyle {
                background: "bear",
                foreground: "#fff",
            },
            DecisionClass::Neutral => BadgeStyle {
                background: "gold",
                foreground: "#000",
            },
        }
    }
}
