//! Browser session lifecycle via `chromiumoxide`.
//!
//! One long-lived Chromium instance serves the whole process; each request
//! gets a fresh tab from it. If the process dies, the next acquire relaunches
//! transparently. Launch installs the stealth overrides on any already-open
//! tab so even the bootstrap page carries no automation markers.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::future::Future;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::config;
use crate::scraping::overview::stealth::PRE_NAVIGATION_OVERRIDES;

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_browser_executable() -> Option<String> {
    if let Some(p) = config::chrome_executable_override() {
        return Some(p);
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = ["google-chrome", "chromium", "chromium-browser", "chrome"];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Hardening flag set for the session browser.
///
/// Sandboxing is disabled only because CI / container environments require
/// it; `AutomationControlled` suppression hides the webdriver blink flag;
/// the throttling and background-feature flags keep page timing
/// deterministic regardless of window focus.
fn build_session_config(exe: &str, headless: bool) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1920,
            height: 1080,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1920, 1080)
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-features=VizDisplayCompositor")
        .arg("--no-first-run")
        .arg("--disable-gpu")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-renderer-backgrounding")
        .arg("--disable-default-apps")
        .arg("--disable-extensions")
        .arg("--disable-sync")
        .arg("--no-default-browser-check")
        .arg("--no-pings")
        .arg("--disable-client-side-phishing-detection")
        .arg("--disable-component-extensions-with-background-pages");

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

/// Exclusive process-wide handle to the one running browser.
///
/// At most one live session per scraper instance: `acquire_tab` reuses the
/// live browser or replaces a dead one, and is idempotent while alive.
pub struct SessionManager {
    headless: bool,
    inner: Mutex<Option<Browser>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            headless: config::headless_mode(),
            inner: Mutex::new(None),
        }
    }

    /// Open a fresh tab, lazily launching (or relaunching) the browser.
    ///
    /// The liveness probe and the tab open are the same operation: if the
    /// existing browser still answers `new_page`, that page is the request's
    /// tab. Launch failures propagate; there is no retry at this layer.
    pub async fn acquire_tab(&self) -> Result<Page> {
        let mut guard = self.inner.lock().await;

        if let Some(browser) = guard.as_mut() {
            match browser.new_page("about:blank").await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!("Browser session dead ({}), relaunching", e);
                    if let Some(mut dead) = guard.take() {
                        // Close errors on a dead browser are expected.
                        let _ = dead.close().await;
                    }
                }
            }
        }

        let exe = find_browser_executable().ok_or_else(|| {
            anyhow!(
                "No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE \
                 if installed in a non-standard location."
            )
        })?;

        info!("Launching browser session ({})", exe);
        let browser_config = build_session_config(&exe, self.headless)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        // Strip automation markers from the bootstrap tab as well.
        if let Ok(pages) = browser.pages().await {
            for page in pages {
                if let Err(e) = page
                    .execute(
                        chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams::new(
                            PRE_NAVIGATION_OVERRIDES,
                        ),
                    )
                    .await
                {
                    warn!("Stealth bootstrap on open tab failed: {}", e);
                }
            }
        }

        *guard = Some(browser);
        let browser = guard.as_mut().expect("browser present after launch");
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open tab: {}", e))
    }

    /// Close the session and null the handle. Safe to call when already
    /// closed or never launched.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut browser) = guard.take() {
            let _ = browser.close().await;
            info!("Browser session shut down");
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Drop cannot await; spawn the close when a runtime is available to
        // avoid zombie Chromium processes.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if let Ok(mut guard) = self.inner.try_lock() {
            if let Some(mut browser) = guard.take() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                });
            }
        }
    }
}

/// The one thing the pipeline needs from a tab beyond driving it: closing
/// it. Kept as a seam so tab cleanup is testable with a stub.
#[async_trait]
pub trait TabHandle: Send + Sync {
    async fn close_tab(&self) -> Result<()>;
}

#[async_trait]
impl TabHandle for Page {
    async fn close_tab(&self) -> Result<()> {
        self.clone()
            .close()
            .await
            .map_err(|e| anyhow!("Tab close failed: {}", e))
    }
}

/// Run `op` against the tab and close the tab afterwards on every exit path,
/// success or error. A close failure is logged, never surfaced; it must not
/// shadow the operation's own result.
pub async fn with_tab<P, T, E, Fut, F>(tab: P, op: F) -> Result<T, E>
where
    P: TabHandle + Clone,
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let result = op(tab.clone()).await;
    if let Err(e) = tab.close_tab().await {
        warn!("Tab close error (non-fatal): {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct StubTab {
        closes: Arc<AtomicUsize>,
    }

    impl StubTab {
        fn new() -> Self {
            Self {
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TabHandle for StubTab {
        async fn close_tab(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn tab_closed_once_on_success() {
        let tab = StubTab::new();
        let result: Result<u32, anyhow::Error> =
            with_tab(tab.clone(), |_| async move { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(tab.close_count(), 1);
    }

    #[tokio::test]
    async fn tab_closed_once_when_operation_fails_early() {
        let tab = StubTab::new();
        let result: Result<u32, anyhow::Error> =
            with_tab(tab.clone(), |_| async move { Err(anyhow!("navigation exploded")) }).await;
        assert!(result.is_err());
        assert_eq!(tab.close_count(), 1);
    }

    #[tokio::test]
    async fn close_failure_does_not_shadow_the_result() {
        #[derive(Clone)]
        struct FailingCloseTab {
            closes: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl TabHandle for FailingCloseTab {
            async fn close_tab(&self) -> Result<()> {
                self.closes.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("tab already gone"))
            }
        }

        let tab = FailingCloseTab {
            closes: Arc::new(AtomicUsize::new(0)),
        };
        let result: Result<&str, anyhow::Error> =
            with_tab(tab.clone(), |_| async move { Ok("content") }).await;
        assert_eq!(result.unwrap(), "content");
        assert_eq!(tab.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn session_manager_starts_without_a_browser() {
        let manager = SessionManager::new();
        assert!(manager.inner.try_lock().unwrap().is_none());
    }
}
