use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::FetchStrategy;
use crate::output::OutputFormat;

pub const DEFAULT_INDEX_URL: &str = "https://www.funda.nl/en/koop/amsterdam/";

/// Top-level settings. Every field has a default, so a TOML file only needs
/// the keys it wants to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing-search page the run starts from.
    pub index_url: String,
    /// Class carried by the anchors that link to listing pages.
    pub listing_link_class: String,
    /// How the index page is fetched. Listing pages always use the lightweight strategy.
    pub index_strategy: FetchStrategy,
    /// Listings parsed at once; 1 keeps the run strictly sequential.
    pub concurrency: usize,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub fetch: FetchConfig,
    pub browser: BrowserOptions,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            listing_link_class: "group".to_string(),
            index_strategy: FetchStrategy::BrowserAutomation,
            concurrency: 1,
            output: PathBuf::from("funda_listings_details.csv"),
            format: OutputFormat::Csv,
            fetch: FetchConfig::default(),
            browser: BrowserOptions::default(),
        }
    }
}

impl ScraperConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Lightweight (plain HTTP) fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Sent as the `User-Agent` header on every request.
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Browser-automation fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Wait after navigation so client-side rendering can finish.
    pub settle_delay_ms: u64,
    /// Wait after the consent control was clicked.
    pub consent_delay_ms: u64,
    /// Visible text of the cookie/consent acceptance button.
    pub consent_button_text: String,
    /// Budget for navigate + consent + capture. The session is closed either way.
    pub timeout_secs: u64,
    /// Extra command-line flags for the browser process.
    pub args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            settle_delay_ms: 5_000,
            consent_delay_ms: 5_000,
            consent_button_text: "Agree and close".to_string(),
            timeout_secs: 90,
            args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--start-maximized".to_string(),
                "--incognito".to_string(),
            ],
        }
    }
}

impl BrowserOptions {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn consent_delay(&self) -> Duration {
        Duration::from_millis(self.consent_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
