pub mod client;
pub mod dashboard;
pub mod domain;
pub mod render;
pub mod run;
pub mod sequencer;

pub mod config {
    use anyhow::Context;

    use crate::render::news::NewsMode;

    pub const DEFAULT_API_URL: &str = "https://trade-mind-production.up.railway.app";
    pub const DEFAULT_RELAY_PARAM: &str = "url";
    pub const DEFAULT_TICKERS: &[&str] = &["TCS", "INFY", "RELIANCE", "HDFCBANK", "SBIN"];
    pub const DEFAULT_NEWS_LIMIT: usize = 4;
    pub const DEFAULT_NEWS_TITLE_MAX: usize = 100;
    pub const DEFAULT_NEWS_SNIPPET_MAX: usize = 120;
    pub const DEFAULT_PROGRESS_STEP: u8 = 15;
    pub const DEFAULT_RENDER_DELAY_MS: u64 = 800;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_url: String,
        pub api_path: Option<String>,
        pub cors_relay: Option<String>,
        pub cors_relay_param: String,
        pub http_timeout_secs: Option<u64>,
        pub use_mock_data: bool,
        pub tickers: Vec<String>,
        pub news_limit: usize,
        pub news_title_max: usize,
        pub news_snippet_max: usize,
        pub news_mode: NewsMode,
        pub progress_step: u8,
        pub render_delay_ms: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_url: DEFAULT_API_URL.to_string(),
                api_path: None,
                cors_relay: None,
                cors_relay_param: DEFAULT_RELAY_PARAM.to_string(),
                http_timeout_secs: None,
                use_mock_data: false,
                tickers: DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
                news_limit: DEFAULT_NEWS_LIMIT,
                news_title_max: DEFAULT_NEWS_TITLE_MAX,
                news_snippet_max: DEFAULT_NEWS_SNIPPET_MAX,
                news_mode: NewsMode::Text,
                progress_step: DEFAULT_PROGRESS_STEP,
                render_delay_ms: DEFAULT_RENDER_DELAY_MS,
                sentry_dsn: None,
            }
        }
    }

    fn env_nonempty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        env_nonempty(key).and_then(|s| s.parse().ok())
    }

    fn env_bool(key: &str, default: bool) -> bool {
        match env_nonempty(key).map(|s| s.to_lowercase()) {
            None => default,
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "n" | "off") => false,
            Some(_) => default,
        }
    }

    pub fn parse_ticker_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let tickers = env_nonempty("TRADEMIND_TICKERS")
                .map(|raw| parse_ticker_list(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.tickers);

            let news_mode = match env_nonempty("TRADEMIND_NEWS_MODE") {
                Some(raw) => raw
                    .parse::<NewsMode>()
                    .context("TRADEMIND_NEWS_MODE must be `text` or `html`")?,
                None => defaults.news_mode,
            };

            let settings = Self {
                api_url: env_nonempty("TRADEMIND_API_URL").unwrap_or(defaults.api_url),
                api_path: env_nonempty("TRADEMIND_API_PATH"),
                cors_relay: env_nonempty("TRADEMIND_CORS_RELAY"),
                cors_relay_param: env_nonempty("TRADEMIND_CORS_RELAY_PARAM")
                    .unwrap_or(defaults.cors_relay_param),
                http_timeout_secs: env_parse("TRADEMIND_HTTP_TIMEOUT_SECS"),
                use_mock_data: env_bool("TRADEMIND_USE_MOCK_DATA", false),
                tickers,
                news_limit: env_parse("TRADEMIND_NEWS_LIMIT").unwrap_or(defaults.news_limit),
                news_title_max: env_parse("TRADEMIND_NEWS_TITLE_MAX")
                    .unwrap_or(defaults.news_title_max),
                news_snippet_max: env_parse("TRADEMIND_NEWS_SNIPPET_MAX")
                    .unwrap_or(defaults.news_snippet_max),
                news_mode,
                progress_step: env_parse("TRADEMIND_PROGRESS_STEP")
                    .unwrap_or(defaults.progress_step),
                render_delay_ms: env_parse("TRADEMIND_RENDER_DELAY_MS")
                    .unwrap_or(defaults.render_delay_ms),
                sentry_dsn: env_nonempty("SENTRY_DSN"),
            };
            settings.validate()?;
            Ok(settings)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                (1..=90).contains(&self.progress_step),
                "progress step must be 1..=90 (got {})",
                self.progress_step
            );
            anyhow::ensure!(self.news_limit > 0, "news limit must be at least 1");
            anyhow::ensure!(!self.tickers.is_empty(), "ticker set must not be empty");
            Ok(())
        }
    }

}
