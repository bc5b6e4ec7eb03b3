use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::{Settings, DEFAULT_NEWS_SNIPPET_MAX, DEFAULT_NEWS_TITLE_MAX};
use crate::dashboard::PLACEHOLDER;
use crate::domain::analysis::NewsItem;
use crate::render::html;

pub const NO_NEWS_TITLE: &str = "No recent news";
pub const NO_NEWS_SNIPPET: &str = "No news items were returned for this ticker.";

/// Feeds mark the publisher with a `<font>` element after the headline link.
const SOURCE_MARKER_TAG: &str = "font";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsMode {
    /// Cards carry plain text only.
    #[default]
    Text,
    /// Cards also carry a sanitized copy of the summary markup for embedding.
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown news mode `{0}`")]
pub struct UnknownNewsMode(String);

impl FromStr for NewsMode {
    type Err = UnknownNewsMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(NewsMode::Text),
            "html" => Ok(NewsMode::Html),
            other => Err(UnknownNewsMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsCard {
    pub title: String,
    pub snippet: String,
    pub source: Option<String>,
    pub published: Option<String>,
    pub link: Option<String>,
    pub fragment: Option<String>,
    pub placeholder: bool,
}

/// Opening a card's link in a new browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickThrough<'a> {
    pub url: &'a str,
    pub target: &'static str,
}

impl NewsCard {
    pub fn no_news() -> Self {
        Self {
            title: NO_NEWS_TITLE.to_string(),
            snippet: NO_NEWS_SNIPPET.to_string(),
            source: None,
            published: None,
            link: None,
            fragment: None,
            placeholder: true,
        }
    }

    pub fn click_through(&self) -> Option<ClickThrough<'_>> {
        self.link.as_deref().map(|url| ClickThrough {
            url,
            target: "_blank",
        })
    }

    pub fn is_clickable(&self) -> bool {
        self.link.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewsFormatter {
    title_max: usize,
    snippet_max: usize,
    mode: NewsMode,
}

impl Default for NewsFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_NEWS_TITLE_MAX, DEFAULT_NEWS_SNIPPET_MAX, NewsMode::Text)
    }
}

impl NewsFormatter {
    pub fn new(title_max: usize, snippet_max: usize, mode: NewsMode) -> Self {
        Self {
            title_max,
            snippet_max,
            mode,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.news_title_max,
            settings.news_snippet_max,
            settings.news_mode,
        )
    }

    /// Formats at most `limit` items in their given order.
    ///
    /// An empty list yields a single placeholder card.
    pub fn format(&self, items: &[NewsItem], limit: usize) -> Vec<NewsCard> {
        if items.is_empty() || limit == 0 {
            return vec![NewsCard::no_news()];
        }
        items.iter().take(limit).map(|item| self.card(item)).collect()
    }

    fn card(&self, item: &NewsItem) -> NewsCard {
        let title = item
            .title
            .as_deref()
            .map(|raw| html::text_content(raw, &[]))
            .filter(|t| !t.is_empty())
            .map(|t| html::truncate_with_ellipsis(&t, self.title_max))
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let summary = item.summary.as_deref().unwrap_or_default();
        let published = item
            .published
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        if !html::contains_markup(summary) {
            return NewsCard {
                title,
                snippet: if summary.is_empty() {
                    PLACEHOLDER.to_string()
                } else {
                    summary.to_string()
                },
                source: None,
                published,
                link: None,
                fragment: None,
                placeholder: false,
            };
        }

        let source = html::first_element_text(summary, SOURCE_MARKER_TAG);
        let skip: &[&str] = if source.is_some() {
            &[SOURCE_MARKER_TAG]
        } else {
            &[]
        };
        let text = html::text_content(summary, skip);
        let snippet = if text.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            html::truncate_with_ellipsis(&text, self.snippet_max)
        };

        let link = html::first_attr(summary, "a", "href")
            .map(|href| href.trim().to_string())
            .filter(|href| html::is_web_link(href));

        let fragment = match self.mode {
            NewsMode::Html => Some(html::sanitize_fragment(summary)),
            NewsMode::Text => None,
        };

        NewsCard {
            title,
            snippet,
            source,
            published,
            link,
            fragment,
            placeholder: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, summary: &str) -> NewsItem {
        NewsItem {
            title: Some(title.to_string()),
            summary: Some(summary.to_string()),
            published: None,
        }
    }

    #[test]
    fn extracts_link_and_strips_markup() {
        let cards = NewsFormatter::default().format(
            &[item("t", "<a href=\"https://x.test/a\">text</a> more text")],
            4,
        );
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].link.as_deref(), Some("https://x.test/a"));
        assert_eq!(cards[0].snippet, "text more text");
        assert!(!cards[0].snippet.contains('<'));
        let click = cards[0].click_through().unwrap();
        assert_eq!(click.url, "https://x.test/a");
        assert_eq!(click.target, "_blank");
    }

    #[test]
    fn empty_list_yields_one_placeholder() {
        let cards = NewsFormatter::default().format(&[], 4);
        assert_eq!(cards, vec![NewsCard::no_news()]);
        assert!(cards[0].placeholder);
        assert!(!cards[0].is_clickable());
    }

    #[test]
    fn respects_limit_and_order() {
        let items: Vec<_> = (0..7).map(|i| item(&format!("n{i}"), "plain")).collect();
        let cards = NewsFormatter::default().format(&items, 5);
        let titles: Vec<_> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["n0", "n1", "n2", "n3", "n4"]);
    }

    #[test]
    fn plain_summary_is_verbatim_and_not_clickable() {
        let summary = "State Bank Of India Overtakes TCS To Become Fourth Most Valued Company In India, a long story told in full without any markup at all.";
        let cards = NewsFormatter::default().format(&[item("SBI", summary)], 4);
        assert_eq!(cards[0].snippet, summary);
        assert_eq!(cards[0].link, None);
        assert!(cards[0].click_through().is_none());
    }

    #[test]
    fn title_is_cleaned_and_truncated() {
        let formatter = NewsFormatter::new(20, 120, NewsMode::Text);
        let cards = formatter.format(
            &[item("  <b>TCS</b>   &amp; Infosys\n rally   as IT stocks recover ", "x")],
            4,
        );
        assert_eq!(cards[0].title, "TCS & Infosys rally...");
    }

    #[test]
    fn source_marker_becomes_label() {
        let summary = "<a href=\"https://news.test/1\">Budget boosts IT spend</a>&nbsp;&nbsp;<font color=\"#6f6f6f\">Mint</font>";
        let cards = NewsFormatter::default().format(&[item("Budget", summary)], 4);
        assert_eq!(cards[0].source.as_deref(), Some("Mint"));
        assert_eq!(cards[0].snippet, "Budget boosts IT spend");
        assert_eq!(cards[0].fragment, None);
    }

    #[test]
    fn markup_snippet_is_truncated() {
        let long = "word ".repeat(60);
        let summary = format!("<p>{long}</p>");
        let cards = NewsFormatter::new(100, 120, NewsMode::Text).format(&[item("t", &summary)], 4);
        assert!(cards[0].snippet.ends_with("..."));
        assert!(cards[0].snippet.chars().count() <= 123);
    }

    #[test]
    fn non_web_href_is_not_a_link() {
        let cards = NewsFormatter::default().format(&[item("t", "<a href=\"#\">x</a>")], 4);
        assert_eq!(cards[0].link, None);
    }

    #[test]
    fn html_mode_keeps_sanitized_fragment() {
        let formatter = NewsFormatter::new(100, 120, NewsMode::Html);
        let cards = formatter.format(
            &[item("t", "<a href=\"https://x.test/a\">x</a><script>bad()</script>")],
            4,
        );
        let fragment = cards[0].fragment.as_deref().unwrap();
        assert!(fragment.contains("href=\"https://x.test/a\""));
        assert!(!fragment.contains("script"));
    }

    #[test]
    fn missing_fields_degrade_to_placeholders() {
        let cards = NewsFormatter::default().format(&[NewsItem::default()], 4);
        assert_eq!(cards[0].title, PLACEHOLDER);
        assert_eq!(cards[0].snippet, PLACEHOLDER);
        assert!(!cards[0].placeholder);
    }

    #[test]
    fn published_is_carried() {
        let mut news = item("t", "plain");
        news.published = Some(" Tue, 03 Feb 2026 08:00:00 GMT ".to_string());
        let cards = NewsFormatter::default().format(&[news], 4);
        assert_eq!(cards[0].published.as_deref(), Some("Tue, 03 Feb 2026 08:00:00 GMT"));
    }

    #[test]
    fn parses_mode() {
        assert_eq!("HTML".parse::<NewsMode>().unwrap(), NewsMode::Html);
        assert_eq!(" text ".parse::<NewsMode>().unwrap(), NewsMode::Text);
        assert!("markdown".parse::<NewsMode>().is_err());
    }
}
