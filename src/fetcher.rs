use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::sleep;

use crate::browser::{BrowserLauncher, BrowserSession, ChromiumLauncher};
use crate::config::{BrowserOptions, FetchConfig, ScraperConfig};
use crate::error::FetchError;
use crate::page::PageHandle;

/// How a page is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// One plain HTTP GET.
    Lightweight,
    /// Full browser render with consent-banner dismissal.
    #[serde(alias = "browser")]
    #[value(alias = "browser")]
    BrowserAutomation,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.context("Failed to fetch page")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("Failed to read response body")?;

        Ok(HttpResponse { status, body })
    }
}

/// Result of the best-effort consent click. Never turned into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Accepted,
    NotFound,
    Failed(String),
}

/// Resolves URLs to parsed pages using either fetch strategy.
pub struct PageFetcher {
    http: Arc<dyn HttpTransport>,
    browser: Arc<dyn BrowserLauncher>,
    fetch_config: FetchConfig,
    browser_options: BrowserOptions,
}

impl PageFetcher {
    pub fn new(
        http: Arc<dyn HttpTransport>,
        browser: Arc<dyn BrowserLauncher>,
        fetch_config: FetchConfig,
        browser_options: BrowserOptions,
    ) -> Self {
        Self {
            http,
            browser,
            fetch_config,
            browser_options,
        }
    }

    /// reqwest for plain fetches, a local Chromium for browser fetches.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let http = ReqwestTransport::new(&config.fetch)?;
        Ok(Self::new(
            Arc::new(http),
            Arc::new(ChromiumLauncher),
            config.fetch.clone(),
            config.browser.clone(),
        ))
    }

    pub async fn fetch(&self, url: &str, strategy: FetchStrategy) -> Result<PageHandle, FetchError> {
        log::debug!("Fetching {} ({:?})", url, strategy);

        let html = match strategy {
            FetchStrategy::Lightweight => self.fetch_lightweight(url).await?,
            FetchStrategy::BrowserAutomation => self.fetch_with_browser(url).await?,
        };

        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(PageHandle::parse(&html))
    }

    async fn fetch_lightweight(&self, url: &str) -> Result<String, FetchError> {
        let headers = [("User-Agent", self.fetch_config.user_agent.as_str())];
        let response = self
            .http
            .get(url, &headers)
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: format!("{:#}", e),
            })?;

        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        Ok(response.body)
    }

    async fn fetch_with_browser(&self, url: &str) -> Result<String, FetchError> {
        let mut session = self
            .browser
            .open(&self.browser_options)
            .await
            .map_err(|e| FetchError::Browser {
                url: url.to_string(),
                reason: format!("{:#}", e),
            })?;

        let budget = self.browser_options.timeout();
        let outcome = tokio::time::timeout(budget, self.render(session.as_mut(), url)).await;

        // Closed exactly once, whatever happened above.
        if let Err(e) = session.close().await {
            log::warn!("Failed to close browser session for {}: {:#}", url, e);
        }

        match outcome {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(FetchError::Browser {
                url: url.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                secs: budget.as_secs(),
            }),
        }
    }

    async fn render(&self, session: &mut dyn BrowserSession, url: &str) -> Result<String> {
        session.navigate(url).await?;
        sleep(self.browser_options.settle_delay()).await;

        if self.accept_consent(session, url).await == ConsentOutcome::Accepted {
            sleep(self.browser_options.consent_delay()).await;
        }

        session.page_source().await
    }

    async fn accept_consent(&self, session: &mut dyn BrowserSession, url: &str) -> ConsentOutcome {
        let text = &self.browser_options.consent_button_text;

        let outcome = match session.find_by_visible_text(text).await {
            Ok(Some(mut button)) => match button.click().await {
                Ok(()) => ConsentOutcome::Accepted,
                Err(e) => ConsentOutcome::Failed(format!("{:#}", e)),
            },
            Ok(None) => ConsentOutcome::NotFound,
            Err(e) => ConsentOutcome::Failed(format!("{:#}", e)),
        };

        match &outcome {
            ConsentOutcome::Accepted => log::info!("Accepted cookies on {}", url),
            ConsentOutcome::NotFound => {
                log::info!("Cookie banner not found or already accepted on {}", url)
            }
            ConsentOutcome::Failed(reason) => {
                log::warn!("Could not dismiss cookie banner on {}: {}", url, reason)
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBrowser, FakeTransport, fetcher, fetcher_with_timeout};
    use httpmock::prelude::*;

    const LISTING: &str = "<html><body><h1>Listing</h1></body></html>";

    #[tokio::test]
    async fn test_lightweight_fetch_sends_user_agent() {
        let transport = Arc::new(FakeTransport::new().page("https://example.com/a", 200, LISTING));
        let fetcher = fetcher(transport.clone(), Arc::new(FakeBrowser::new(LISTING)));

        let page = fetcher
            .fetch("https://example.com/a", FetchStrategy::Lightweight)
            .await
            .unwrap();
        assert!(page.find_first_by_text("h1", "Listing").unwrap().is_some());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, vec![("User-Agent".to_string(), "Mozilla/5.0".to_string())]);
    }

    #[tokio::test]
    async fn test_lightweight_fetch_failures() {
        let transport = FakeTransport::new()
            .page("https://example.com/missing", 404, "not found")
            .page("https://example.com/empty", 200, "   \n");
        let fetcher = fetcher(Arc::new(transport), Arc::new(FakeBrowser::new(LISTING)));

        let status = fetcher.fetch("https://example.com/missing", FetchStrategy::Lightweight).await;
        assert!(matches!(status, Err(FetchError::Status { status: 404, .. })));

        let empty = fetcher.fetch("https://example.com/empty", FetchStrategy::Lightweight).await;
        assert!(matches!(empty, Err(FetchError::EmptyBody { .. })));

        let transport = fetcher.fetch("https://example.com/down", FetchStrategy::Lightweight).await;
        assert!(matches!(transport, Err(FetchError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_browser_fetch_accepts_consent_and_closes() {
        let browser = Arc::new(FakeBrowser::new(LISTING).with_consent_button());
        let fetcher = fetcher(Arc::new(FakeTransport::new()), browser.clone());

        let page = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await
            .unwrap();
        assert!(page.find_first_by_text("h1", "Listing").unwrap().is_some());
        assert_eq!(browser.clicks(), 1);
        assert_eq!(browser.closes(), 1);
        assert_eq!(browser.navigations(), vec!["https://example.com/index".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_consent_button_is_not_an_error() {
        let browser = Arc::new(FakeBrowser::new(LISTING));
        let fetcher = fetcher(Arc::new(FakeTransport::new()), browser.clone());

        let page = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await;
        assert!(page.is_ok());
        assert_eq!(browser.clicks(), 0);
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn test_session_closed_when_navigation_fails() {
        let browser = Arc::new(FakeBrowser::new(LISTING).failing_navigation());
        let fetcher = fetcher(Arc::new(FakeTransport::new()), browser.clone());

        let result = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await;
        assert!(matches!(result, Err(FetchError::Browser { .. })));
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn test_browser_timeout_still_closes_session() {
        let browser = Arc::new(FakeBrowser::new(LISTING).hanging_navigation());
        let fetcher = fetcher_with_timeout(Arc::new(FakeTransport::new()), browser.clone(), 1);

        let result = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await;
        assert!(matches!(result, Err(FetchError::Timeout { secs: 1, .. })));
        assert_eq!(browser.opens(), 1);
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn test_failed_consent_click_is_not_fatal() {
        let browser = Arc::new(FakeBrowser::new(LISTING).failing_click());
        let fetcher = fetcher(Arc::new(FakeTransport::new()), browser.clone());

        let page = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await
            .unwrap();
        assert!(page.find_first_by_text("h1", "Listing").unwrap().is_some());
        assert_eq!(browser.clicks(), 1);
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn test_browser_empty_render_is_a_failure() {
        let browser = Arc::new(FakeBrowser::new(""));
        let fetcher = fetcher(Arc::new(FakeTransport::new()), browser.clone());

        let result = fetcher
            .fetch("https://example.com/index", FetchStrategy::BrowserAutomation)
            .await;
        assert!(matches!(result, Err(FetchError::EmptyBody { .. })));
        assert_eq!(browser.closes(), 1);
    }

    #[tokio::test]
    async fn test_reqwest_transport_against_mock_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/en/koop/amsterdam/house-a/")
                    .header("user-agent", "Mozilla/5.0");
                then.status(200).body(LISTING);
            })
            .await;

        let config = ScraperConfig::default();
        let fetcher = PageFetcher::from_config(&config).unwrap();
        let page = fetcher
            .fetch(&server.url("/en/koop/amsterdam/house-a/"), FetchStrategy::Lightweight)
            .await
            .unwrap();

        assert!(page.find_first_by_text("h1", "Listing").unwrap().is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(503);
            })
            .await;

        let fetcher = PageFetcher::from_config(&ScraperConfig::default()).unwrap();
        let result = fetcher.fetch(&server.url("/gone"), FetchStrategy::Lightweight).await;
        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    }

    #[test]
    fn test_strategy_names() {
        let strategy: FetchStrategy = serde_json::from_str("\"browser\"").unwrap();
        assert_eq!(strategy, FetchStrategy::BrowserAutomation);
        let strategy: FetchStrategy = serde_json::from_str("\"lightweight\"").unwrap();
        assert_eq!(strategy, FetchStrategy::Lightweight);
        assert_eq!(
            FetchStrategy::from_str("browser", true).unwrap(),
            FetchStrategy::BrowserAutomation
        );
    }
}
