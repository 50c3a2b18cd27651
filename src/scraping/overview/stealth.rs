//! Per-request fingerprint randomization and automation-marker suppression.
//!
//! A single suppressed signal is itself a detection vector, so the override
//! script patches several at once: `navigator.webdriver`, the permissions
//! API, the plugin list, and `window.chrome.runtime`. The script must be
//! installed before any page script runs.

use anyhow::{anyhow, Result};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::site::SiteProfile;

const USER_AGENTS: &[&str] = &[
    // Chrome – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    // Chrome – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Safari – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1440, 900),
    (1536, 864),
    (1280, 720),
];

/// Document overrides installed on every new tab before page scripts execute.
///
/// Detection scripts that run at document start see a "normal" browser:
/// no webdriver flag, a granted-permissions shim, a non-empty plugin list,
/// and an extension runtime object.
pub const PRE_NAVIGATION_OVERRIDES: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined,
});
delete Navigator.prototype.webdriver;

window.chrome = window.chrome || {};
window.chrome.runtime = window.chrome.runtime || {};

Object.defineProperty(navigator, 'permissions', {
    get: () => ({
        query: () => Promise.resolve({ state: 'granted' })
    })
});

Object.defineProperty(navigator, 'plugins', {
    get: () => [
        {
            0: {
                type: 'application/x-google-chrome-pdf',
                suffixes: 'pdf',
                description: 'Portable Document Format',
            },
            description: 'Portable Document Format',
            filename: 'internal-pdf-viewer',
            length: 1,
            name: 'Chrome PDF Plugin'
        }
    ]
});
"#;

/// Randomized per-request browser fingerprint. Immutable once generated;
/// applied to a fresh tab before any navigation.
#[derive(Debug, Clone)]
pub struct StealthProfile {
    pub user_agent: &'static str,
    pub viewport: (u32, u32),
    pub extra_headers: &'static [(&'static str, &'static str)],
}

impl StealthProfile {
    /// Draw a user agent and viewport from the fixed pools; header set comes
    /// from the site profile.
    pub fn generate(site: &SiteProfile) -> Self {
        let mut rng = rand::rng();
        let user_agent = USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0]);
        let viewport = VIEWPORTS.choose(&mut rng).copied().unwrap_or(VIEWPORTS[0]);
        Self {
            user_agent,
            viewport,
            extra_headers: site.extra_headers,
        }
    }

    /// Apply the profile to a fresh tab: document overrides first, then user
    /// agent, viewport metrics, and the navigation header set.
    pub async fn apply(&self, page: &Page) -> Result<()> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            PRE_NAVIGATION_OVERRIDES,
        ))
        .await
        .map_err(|e| anyhow!("Failed to install stealth overrides: {}", e))?;

        page.set_user_agent(self.user_agent)
            .await
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        let (width, height) = self.viewport;
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| anyhow!("Invalid viewport metrics: {}", e))?;
        page.execute(metrics)
            .await
            .map_err(|e| anyhow!("Failed to set viewport {}x{}: {}", width, height, e))?;

        let mut headers = serde_json::Map::new();
        for (name, value) in self.extra_headers {
            headers.insert(name.to_string(), serde_json::Value::from(*value));
        }
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(headers),
        )))
        .await
        .map_err(|e| anyhow!("Failed to set extra headers: {}", e))?;

        debug!(
            "Stealth profile applied: {}x{}, UA {}...",
            width,
            height,
            &self.user_agent[..50.min(self.user_agent.len())]
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::overview::site::GOOGLE;

    #[test]
    fn generated_profile_comes_from_the_pools() {
        for _ in 0..50 {
            let profile = StealthProfile::generate(&GOOGLE);
            assert!(USER_AGENTS.contains(&profile.user_agent));
            assert!(VIEWPORTS.contains(&profile.viewport));
            assert!(!profile.extra_headers.is_empty());
        }
    }

    #[test]
    fn pools_span_multiple_families() {
        assert!(USER_AGENTS.len() >= 4);
        assert!(VIEWPORTS.len() >= 5);
        let windows = USER_AGENTS.iter().filter(|ua| ua.contains("Windows")).count();
        let mac = USER_AGENTS.iter().filter(|ua| ua.contains("Mac OS X")).count();
        assert!(windows >= 1 && mac >= 1);
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Version/")));
    }

    #[test]
    fn overrides_cover_all_automation_markers() {
        // Dropping any single patch weakens the rest; keep them together.
        assert!(PRE_NAVIGATION_OVERRIDES.contains("webdriver"));
        assert!(PRE_NAVIGATION_OVERRIDES.contains("permissions"));
        assert!(PRE_NAVIGATION_OVERRIDES.contains("plugins"));
        assert!(PRE_NAVIGATION_OVERRIDES.contains("chrome.runtime"));
    }
}
