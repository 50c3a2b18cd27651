use crate::core::types::ErrorKind;
use thiserror::Error;

/// Everything that can go wrong inside one query's pipeline.
///
/// These never escape `scrape_one` / `scrape_batch`; the pipeline folds them
/// into a `Failure` outcome at the query boundary.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser process failed to start. Fatal to the current call, no retry.
    #[error("Browser launch failed: {0}")]
    Launch(#[source] anyhow::Error),

    /// Timeout or network failure during either navigation hop.
    #[error("Navigation failed: {0}")]
    Navigation(#[source] anyhow::Error),

    /// Redirected to a dedicated block / CAPTCHA page.
    #[error("🚫 BLOCKED: {site} detected automation. Solutions: 1) Wait 10+ minutes 2) Change IP/VPN 3) Use different browser profile 4) Try simpler queries first")]
    HardBlock { site: &'static str, url: String },

    /// Page rendered normally but carries automated-traffic suspicion text.
    #[error("🚫 SOFT BLOCK: {site} detected unusual traffic. Wait and try again with different patterns.")]
    SoftBlock { site: &'static str },
}

impl ScrapeError {
    /// Wire-level classification for the `Failure` outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch(_) => ErrorKind::Launch,
            Self::Navigation(_) => ErrorKind::Navigation,
            Self::HardBlock { .. } => ErrorKind::HardBlock,
            Self::SoftBlock { .. } => ErrorKind::SoftBlock,
        }
    }
}
