//! Headless Chromium session management.
//!
//! [`BrowserSession::launch`] starts a dedicated Chromium process for one
//! run and opens a single page with the configured user agent and
//! viewport. The session owns the browser, the page and the CDP handler
//! task; [`BrowserSession::close`] consumes it and releases all three.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::loader::ScrollSurface;

/// Flags passed to every launch, before any configured extras.
const LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Find a Chromium binary: `HARVEST_CHROME` first, then well-known paths.
pub fn find_chrome() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("HARVEST_CHROME") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }
    CHROME_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// One live browser process with a single page.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
    settle: Duration,
}

impl BrowserSession {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let chrome_path = match config.executable.clone() {
            Some(path) => path,
            None => find_chrome().context(
                "Chrome/Chromium not found. Install it or set browser.executable in the config.",
            )?,
        };

        info!(
            "Launching browser {} (headless={})",
            chrome_path.display(),
            config.headless
        );

        let mut builder = CdpConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if !config.headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        for arg in &config.args {
            builder = builder.arg(arg.as_str());
        }

        let cdp_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (mut browser, mut handler) = Browser::launch(cdp_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match open_page(&browser, &config.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close browser after page setup failed: {}", close_err);
                }
                if let Err(wait_err) = browser.wait().await {
                    warn!("Browser process did not exit cleanly: {}", wait_err);
                }
                handler.abort();
                return Err(e);
            }
        };

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate and wait for the page to settle. Not retried.
    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => anyhow::bail!("navigation failed: {}", e),
            Err(_) => anyhow::bail!(
                "navigation timed out after {}s",
                self.navigation_timeout.as_secs()
            ),
        }
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    /// Serialized document HTML.
    pub async fn html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {:?}", e))
    }

    pub async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    /// Close the browser, reap the child process and stop the handler.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        closed.context("failed to close browser")?;
        debug!("Browser closed");
        Ok(())
    }
}

async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create new page")?;
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .context("failed to set user agent")?;
    Ok(page)
}

async fn eval<T: serde::de::DeserializeOwned>(page: &Page, script: String) -> Result<T> {
    page.evaluate(script)
        .await
        .context("JS execution failed")?
        .into_value()
        .map_err(|e| anyhow::anyhow!("failed to convert JS result: {:?}", e))
}

/// [`ScrollSurface`] over a live page.
pub struct PageSurface<'a> {
    page: &'a Page,
    /// JSON-quoted card selector.
    card: String,
    /// JSON-quoted load-more selector.
    load_more: Option<String>,
}

impl<'a> PageSurface<'a> {
    pub fn new(page: &'a Page, card_selector: &str, load_more: Option<&str>) -> Result<Self> {
        Ok(Self {
            page,
            card: serde_json::to_string(card_selector)?,
            load_more: load_more.map(serde_json::to_string).transpose()?,
        })
    }
}

#[async_trait]
impl ScrollSurface for PageSurface<'_> {
    async fn advance(&mut self) -> Result<()> {
        let script = r#"(() => {
            const bottom = () => window.scrollTo(0, document.body.scrollHeight);
            bottom();
            window.dispatchEvent(new Event('scroll'));
            window.scrollBy(0, -300);
            bottom();
            return true;
        })()"#;
        let _: bool = eval(self.page, script.to_string()).await?;
        Ok(())
    }

    async fn record_count(&mut self) -> Result<usize> {
        let script = format!("document.querySelectorAll({}).length", self.card);
        eval(self.page, script).await
    }

    async fn activate_load_more(&mut self) -> Result<bool> {
        let Some(ref selector) = self.load_more else {
            return Ok(false);
        };
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (el && el.offsetParent !== null && !el.disabled) {{
                    el.click();
                    return true;
                }}
                return false;
            }})()"#,
            selector
        );
        eval(self.page, script).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_all, LoadState, LoaderBounds};

    #[test]
    fn test_launch_args_include_container_flags() {
        assert!(LAUNCH_ARGS.contains(&"--no-sandbox"));
        assert!(LAUNCH_ARGS.contains(&"--disable-gpu"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_session_loads_static_page() {
        let session = BrowserSession::launch(&BrowserConfig {
            settle_ms: 100,
            ..Default::default()
        })
        .await
        .expect("failed to launch browser");

        session
            .goto("data:text/html,<div class='c'>a</div><div class='c'>b</div>")
            .await
            .expect("navigation failed");

        let mut surface = PageSurface::new(session.page(), ".c", Some(".load-more")).unwrap();
        let bounds = LoaderBounds {
            min_records: 0,
            max_records: 100,
            scroll_delay: Duration::from_millis(50),
            stable_timeout: Duration::from_millis(200),
            max_run_time: Duration::from_secs(10),
            max_attempts: 50,
            load_more_delay: Duration::from_millis(10),
        };
        let outcome = load_all(&mut surface, &bounds).await.expect("loader failed");
        assert_eq!(outcome.state, LoadState::Converged);
        assert_eq!(outcome.count, 2);

        let html = session.html().await.expect("html failed");
        assert!(html.contains("class=\"c\""));

        session.close().await.expect("close failed");
    }
}
