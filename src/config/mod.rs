use crate::config::cli::Args;
use crate::error::Result;
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// How many leaderboard pages to check per category before giving up.
    #[serde(default = "default_search_pages")]
    pub search_pages: u32,
    /// Leaderboard variants to scan. Only "daily" by default.
    #[serde(default = "default_rank_types")]
    pub rank_types: Vec<String>,
}

fn default_search_pages() -> u32 {
    3
}

fn default_rank_types() -> Vec<String> {
    vec!["daily".to_string()]
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            search_pages: default_search_pages(),
            rank_types: default_rank_types(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
}

impl AiConfig {
    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub keyword: String,
    #[serde(default = "default_pages")]
    pub pages_to_scrape: u32,
    /// Cap on items taken from each list page. None scrapes the whole page.
    #[serde(default)]
    pub list_limit: Option<usize>,
    /// Cap on how many listed products get the deep scrape.
    #[serde(default)]
    pub deep_limit: Option<usize>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enable_translation: bool,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

fn default_pages() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

pub struct Config {
    pub args: Args,
    pub scraper: ScraperConfig,
    pub http_client: Client,
}

impl Config {
    pub fn new() -> Result<Self> {
        let args = Args::parse();

        let mut scraper: ScraperConfig =
            serde_json::from_str(&std::fs::read_to_string(&args.config_file)?)?;
        if let Some(keyword) = &args.keyword {
            scraper.keyword = keyword.clone();
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(scraper.request_timeout_secs))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            );
        if let Some(proxy) = &scraper.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(crate::error::ScrapeError::Network)?,
            );
        }
        let http_client = builder.build()?;

        Ok(Self {
            args,
            scraper,
            http_client,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }

        info!("Data dir exists");
        Ok(())
    }
}
