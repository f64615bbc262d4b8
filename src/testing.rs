//! In-memory HTTP and browser fakes shared by the unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::browser::{BrowserElement, BrowserLauncher, BrowserSession};
use crate::config::{BrowserOptions, FetchConfig};
use crate::fetcher::{HttpResponse, HttpTransport, PageFetcher};

pub type RecordedRequest = (String, Vec<(String, String)>);

/// Serves canned responses; unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct FakeTransport {
    pages: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages.insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        ));

        let (status, body) = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", url))?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Default)]
struct BrowserStats {
    opens: AtomicUsize,
    closes: AtomicUsize,
    clicks: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

/// How a fake session behaves when asked to navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    Succeed,
    Fail,
    Hang,
}

/// Renders a fixed page; optionally offers a consent button, breaks
/// navigation or makes the button unclickable.
pub struct FakeBrowser {
    html: String,
    consent_button: bool,
    fail_click: bool,
    navigation: Navigation,
    stats: Arc<BrowserStats>,
}

impl FakeBrowser {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            consent_button: false,
            fail_click: false,
            navigation: Navigation::Succeed,
            stats: Arc::default(),
        }
    }

    pub fn with_consent_button(mut self) -> Self {
        self.consent_button = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.navigation = Navigation::Fail;
        self
    }

    /// Navigation never completes.
    pub fn hanging_navigation(mut self) -> Self {
        self.navigation = Navigation::Hang;
        self
    }

    /// Offers a consent button whose click errors.
    pub fn failing_click(mut self) -> Self {
        self.consent_button = true;
        self.fail_click = true;
        self
    }

    pub fn opens(&self) -> usize {
        self.stats.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.stats.closes.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> usize {
        self.stats.clicks.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.stats.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn open(&self, _options: &BrowserOptions) -> Result<Box<dyn BrowserSession>> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            html: self.html.clone(),
            consent_button: self.consent_button,
            fail_click: self.fail_click,
            navigation: self.navigation,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeSession {
    html: String,
    consent_button: bool,
    fail_click: bool,
    navigation: Navigation,
    stats: Arc<BrowserStats>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.stats.navigations.lock().unwrap().push(url.to_string());
        match self.navigation {
            Navigation::Succeed => Ok(()),
            Navigation::Fail => Err(anyhow!("net::ERR_NAME_NOT_RESOLVED")),
            Navigation::Hang => std::future::pending().await,
        }
    }

    async fn find_by_visible_text(
        &mut self,
        _text: &str,
    ) -> Result<Option<Box<dyn BrowserElement>>> {
        if !self.consent_button {
            return Ok(None);
        }
        Ok(Some(Box::new(FakeButton {
            fail: self.fail_click,
            stats: Arc::clone(&self.stats),
        })))
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeButton {
    fail: bool,
    stats: Arc<BrowserStats>,
}

#[async_trait]
impl BrowserElement for FakeButton {
    async fn click(&mut self) -> Result<()> {
        self.stats.clicks.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("element is not clickable at point (640, 480)"));
        }
        Ok(())
    }
}

/// Fetcher over the given fakes with all browser delays set to zero.
pub fn fetcher(http: Arc<dyn HttpTransport>, browser: Arc<dyn BrowserLauncher>) -> PageFetcher {
    fetcher_with_timeout(http, browser, BrowserOptions::default().timeout_secs)
}

pub fn fetcher_with_timeout(
    http: Arc<dyn HttpTransport>,
    browser: Arc<dyn BrowserLauncher>,
    timeout_secs: u64,
) -> PageFetcher {
    let browser_options = BrowserOptions {
        settle_delay_ms: 0,
        consent_delay_ms: 0,
        timeout_secs,
        ..Default::default()
    };
    PageFetcher::new(http, browser, FetchConfig::default(), browser_options)
}
