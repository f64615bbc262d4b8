use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::config::BrowserOptions;

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserSession>>;
}

/// One running browser with a single tab.
///
/// Whoever opens a session must call [`close`](BrowserSession::close) on every
/// exit path; the process is not reaped otherwise.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// First button whose visible text contains `text`, if any.
    async fn find_by_visible_text(&mut self, text: &str)
    -> Result<Option<Box<dyn BrowserElement>>>;

    /// Markup of the page as currently rendered.
    async fn page_source(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait BrowserElement: Send {
    async fn click(&mut self) -> Result<()>;
}

/// Launches a local Chromium through the DevTools protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in &options.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("Invalid browser configuration: {}", e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("browser handler event error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if browser.close().await.is_err() {
                    let _ = browser.kill().await;
                }
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(e).context("Failed to open browser tab");
            }
        };

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page
            .goto(url.to_string())
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn find_by_visible_text(
        &mut self,
        text: &str,
    ) -> Result<Option<Box<dyn BrowserElement>>> {
        let buttons = self
            .page
            .find_elements("button")
            .await
            .context("Failed to search for buttons")?;

        for button in buttons {
            match button.inner_text().await {
                Ok(label) if label_contains(label.as_deref(), text) => {
                    return Ok(Some(Box::new(ChromiumElement(button))));
                }
                Ok(_) => {}
                // Buttons can detach while the page is still settling.
                Err(e) => log::debug!("Skipping unreadable button: {}", e),
            }
        }

        Ok(None)
    }

    async fn page_source(&mut self) -> Result<String> {
        self.page.content().await.context("Failed to read page content")
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if closed.is_err() {
            // A dropped DevTools channel leaves the process running; wait() would block.
            if let Some(Err(e)) = self.browser.kill().await {
                log::debug!("Failed to kill browser process: {}", e);
            }
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        closed.map(|_| ()).context("Failed to close browser")
    }
}

struct ChromiumElement(Element);

#[async_trait]
impl BrowserElement for ChromiumElement {
    async fn click(&mut self) -> Result<()> {
        self.0.click().await.context("Failed to click element")?;
        Ok(())
    }
}

/// Whether a button label contains `text`, ignoring line breaks and
/// repeated spaces in the rendered label.
fn label_contains(label: Option<&str>, text: &str) -> bool {
    let Some(label) = label else {
        return false;
    };
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    label.contains(&text)
}
