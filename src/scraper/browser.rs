//! Browser automation using chromiumoxide.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{login_url, PageKind, PageSource};
use crate::config::BrowserSettings;
use crate::race::RaceConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const LOGIN_WAIT: Duration = Duration::from_secs(5);

const LOGIN_ID_SELECTOR: &str = "input[name='login_id']";
const PASSWORD_SELECTOR: &str = "input[type='password']";
const SUBMIT_SELECTOR: &str = "input[type='submit'], .btn-login";

/// Browser wrapper for web scraping
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
    page_wait: Duration,
}

impl Browser {
    /// Launch a new browser instance
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        // Find Chrome executable
        let chrome_path = settings.chrome_path.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
            } else if cfg!(target_os = "windows") {
                "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"
            } else {
                "google-chrome"
            }
            .to_string()
        });

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .no_sandbox()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--lang=ja-JP")
            .arg(
                "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .window_size(1280, 2200);
        if settings.headless {
            builder = builder.arg("--headless=new");
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        // Spawn handler task - must keep running for browser to work
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handle,
            page_wait: Duration::from_secs(settings.page_wait_secs),
        })
    }

    /// Log in to keibabook. Skipped without credentials; a failed form step is
    /// logged and scraping continues with the public pages.
    pub async fn login(&self, settings: &BrowserSettings) -> Result<()> {
        let Some((id, password)) = settings.credentials() else {
            info!("No keibabook credentials, skipping login");
            return Ok(());
        };

        let page = self
            .browser
            .new_page(login_url())
            .await
            .map_err(|e| anyhow!("Failed to open login page: {}", e))?;

        let result = Self::submit_login(&page, id, password).await;
        let _ = page.close().await;

        match result {
            Ok(()) => info!("Logged in to keibabook"),
            Err(e) => warn!("Login failed, continuing without it: {}", e),
        }
        Ok(())
    }

    async fn submit_login(page: &Page, id: &str, password: &str) -> Result<()> {
        Self::wait_for(page, LOGIN_ID_SELECTOR, LOGIN_WAIT).await?;

        page.find_element(LOGIN_ID_SELECTOR)
            .await?
            .click()
            .await?
            .type_str(id)
            .await?;
        page.find_element(PASSWORD_SELECTOR)
            .await?
            .click()
            .await?
            .type_str(password)
            .await?;
        page.find_element(SUBMIT_SELECTOR).await?.click().await?;

        page.wait_for_navigation().await?;
        sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    /// Fetch page content once `ready_selector` appears (or the wait runs out)
    pub async fn fetch_page(&self, url: &str, ready_selector: &str) -> Result<String> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("Failed to create new page: {}", e))?;

        if let Err(e) = Self::wait_for(&page, ready_selector, self.page_wait).await {
            debug!("{}: {}", url, e);
        }

        let html = page
            .content()
            .await
            .map_err(|e| anyhow!("Failed to get page content: {}", e));

        // Close the page
        let _ = page.close().await;

        html
    }

    /// Poll until an element matching `selector` exists
    async fn wait_for(page: &Page, selector: &str, limit: Duration) -> Result<()> {
        let deadline = Instant::now() + limit;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!("timed out waiting for {}", selector);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Close the browser
    pub async fn close(mut self) -> Result<()> {
        let _ = self.browser.close().await;
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl PageSource for Browser {
    async fn fetch(&self, kind: PageKind, config: &RaceConfig, race_num: u8) -> Result<String> {
        let Some(url) = kind.url(config, race_num) else {
            bail!("no {} page for venue {}", kind, config.place);
        };
        debug!("Fetching {}", url);
        self.fetch_page(&url, kind.ready_selector()).await
    }
}
