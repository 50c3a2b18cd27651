//! Two-hop navigation: homepage first to establish a plausible session,
//! then the query URL. Milestone delays and synthetic pointer movement come
//! from the pacing policy; any timeout or network failure here is a
//! transient error, never a block classification.

use anyhow::anyhow;
use chromiumoxide::Page;
use std::time::Duration;
use tracing::info;

use super::error::ScrapeError;
use super::pacing::PacingPolicy;
use super::site::SiteProfile;
use super::stealth::StealthProfile;
use crate::core::types::SearchOptions;

/// Per-hop navigation budget. No operation is allowed to wait indefinitely.
const NAV_TIMEOUT: Duration = Duration::from_secs(20);

/// What the Navigator hands to classification and extraction.
#[derive(Debug)]
pub struct NavigationCapture {
    /// The tab's URL after the query hop; differs from the request URL when
    /// a defense page redirected us.
    pub final_url: String,
    /// Full rendered markup of the results page.
    pub markup: String,
}

/// Drive the two-hop sequence against a fresh tab and capture the result.
pub async fn navigate(
    page: &Page,
    query: &str,
    options: &SearchOptions,
    profile: &StealthProfile,
    site: &'static SiteProfile,
    policy: &PacingPolicy,
) -> Result<NavigationCapture, ScrapeError> {
    profile
        .apply(page)
        .await
        .map_err(ScrapeError::Navigation)?;

    policy.pre_nav.wait("Pre-navigation").await;

    info!("Step 1: visiting {} homepage", site.display_name);
    goto_with_timeout(page, site.homepage, "Homepage").await?;
    pointer_probe(page, 100, 100).await;
    policy.homepage.wait("Homepage").await;

    let search_url = site.build_search_url(query, options);
    info!("Step 2: performing search: {}", search_url);
    goto_with_timeout(page, &search_url, "Search").await?;
    policy.content.wait("Content loading").await;
    pointer_probe(page, 200, 200).await;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| search_url.clone());
    let markup = page
        .content()
        .await
        .map_err(|e| ScrapeError::Navigation(anyhow!("Failed to read page content: {}", e)))?;

    info!("Captured {} chars from {}", markup.len(), final_url);
    Ok(NavigationCapture { final_url, markup })
}

async fn goto_with_timeout(page: &Page, url: &str, label: &str) -> Result<(), ScrapeError> {
    match tokio::time::timeout(NAV_TIMEOUT, page.goto(url)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ScrapeError::Navigation(anyhow!(
            "{} navigation failed: {}",
            label,
            e
        ))),
        Err(_) => Err(ScrapeError::Navigation(anyhow!(
            "{} navigation timed out after {}s",
            label,
            NAV_TIMEOUT.as_secs()
        ))),
    }
}

/// Synthetic pointer movement via hit-testing at a jittered point. Failures
/// are swallowed; the probe exists only to look less mechanical.
async fn pointer_probe(page: &Page, max_x: u32, max_y: u32) {
    // Coordinates drawn before the await so the RNG never crosses it.
    let (x, y) = {
        use rand::RngExt;
        let mut rng = rand::rng();
        (rng.random_range(0..max_x), rng.random_range(0..max_y))
    };
    let _ = page
        .evaluate(format!("document.elementFromPoint({}, {})", x, y))
        .await;
}
