//! Block detection: URL-pattern hard check first, body-text soft check second.
//!
//! Hard blocks are unambiguous from the URL alone and short-circuit before
//! the heuristic text scan runs. Both trigger lists live on the site
//! profile, not here; the classifier is pattern-agnostic.

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use super::extract::visible_body_text;
use super::site::SiteProfile;

/// How much of the rendered body text the soft-block scan looks at.
const SOFT_BLOCK_SCAN_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockVerdict {
    /// No defense page detected; proceed to extraction.
    None,
    /// Final URL landed on a dedicated block / CAPTCHA page.
    HardBlock,
    /// Page rendered normally but the top of the body text carries an
    /// automated-traffic suspicion phrase.
    SoftBlock,
}

/// Inspect the navigation result for block indicators.
pub fn classify(final_url: &str, markup: &str, site: &SiteProfile) -> BlockVerdict {
    if site.is_block_url(final_url) {
        return BlockVerdict::HardBlock;
    }

    let body_text = visible_body_text(markup, SOFT_BLOCK_SCAN_CHARS);
    if site.soft_block_matcher().is_match(&body_text) {
        return BlockVerdict::SoftBlock;
    }

    BlockVerdict::None
}

/// Best-effort diagnostics on a hard block: a full-page screenshot named
/// with a sortable timestamp, and a page-title read. Neither failure is
/// allowed to shadow the block error itself.
pub async fn capture_block_diagnostics(page: &Page, dir: &Path) {
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ");
    let path = dir.join(format!("blocked-{}.png", timestamp));

    let shot = page
        .screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build(),
        )
        .await;
    match shot {
        Ok(bytes) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!("Failed to create screenshot dir {:?}: {}", dir, e);
            } else if let Err(e) = std::fs::write(&path, &bytes) {
                warn!("Failed to write block screenshot {:?}: {}", path, e);
            } else {
                info!("Block screenshot saved: {:?}", path);
            }
        }
        Err(e) => warn!("Failed to capture block screenshot: {}", e),
    }

    match page.get_title().await {
        Ok(Some(title)) => info!("Block page title: {}", title),
        Ok(None) => info!("Block page has no title"),
        Err(e) => warn!("Could not read block page title: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::overview::site::GOOGLE;

    #[test]
    fn block_url_classifies_hard_regardless_of_markup() {
        let clean_markup = "<html><body><p>perfectly ordinary results</p></body></html>";
        let verdict = classify(
            "https://www.google.com/sorry/index?continue=https://www.google.com/search",
            clean_markup,
            &GOOGLE,
        );
        assert_eq!(verdict, BlockVerdict::HardBlock);
    }

    #[test]
    fn suspicion_phrase_with_clean_url_classifies_soft() {
        let markup = "<html><body><p>Our systems have detected unusual traffic \
                      from your computer network.</p></body></html>";
        let verdict = classify("https://www.google.com/search?q=rust", markup, &GOOGLE);
        assert_eq!(verdict, BlockVerdict::SoftBlock);
    }

    #[test]
    fn hard_check_wins_when_both_indicators_present() {
        let markup = "<html><body><p>unusual traffic detected</p></body></html>";
        let verdict = classify("https://www.google.com/sorry/index", markup, &GOOGLE);
        assert_eq!(verdict, BlockVerdict::HardBlock);
    }

    #[test]
    fn clean_page_classifies_none() {
        let markup = "<html><body><p>ten blue links</p></body></html>";
        let verdict = classify("https://www.google.com/search?q=rust", markup, &GOOGLE);
        assert_eq!(verdict, BlockVerdict::None);
    }

    #[test]
    fn suspicion_phrase_outside_scan_window_is_ignored() {
        // The scan only covers the first 500 visible characters; a phrase
        // buried deep in the page is not a soft-block signal.
        let markup = format!(
            "<html><body><p>{}</p><p>unusual traffic</p></body></html>",
            "filler text ".repeat(60),
        );
        let verdict = classify("https://www.google.com/search?q=rust", &markup, &GOOGLE);
        assert_eq!(verdict, BlockVerdict::None);
    }

    #[test]
    fn suspicion_phrase_inside_script_is_ignored() {
        let markup = r#"<html><body>
            <script>trackers.report("unusual traffic");</script>
            <p>ordinary results</p>
        </body></html>"#;
        let verdict = classify("https://www.google.com/search?q=rust", markup, &GOOGLE);
        assert_eq!(verdict, BlockVerdict::None);
    }
}
