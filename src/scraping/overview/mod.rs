//! The extraction pipeline: gate → tab → navigate → classify → extract.
//!
//! Every failure inside one query's pipeline is converted into a `Failure`
//! outcome at the query boundary; nothing escapes `scrape_one` /
//! `scrape_batch` as a raw error. The tab is closed on every exit path.

pub mod classify;
pub mod error;
pub mod extract;
pub mod navigate;
pub mod pacing;
pub mod site;
pub mod stealth;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config;
use crate::core::types::{Extraction, Outcome, SearchOptions};
use crate::scraping::browser_manager::{with_tab, SessionManager};

use classify::{capture_block_diagnostics, classify, BlockVerdict};
use extract::extract_overview;
use navigate::navigate;
use pacing::{PacingPolicy, RateGate};
use site::SiteProfile;
use stealth::StealthProfile;

pub use error::ScrapeError;

/// Owns the browser session, the rate gate, and the pacing policy. One
/// instance per process; handlers share it behind an `Arc`.
pub struct OverviewScraper {
    session: SessionManager,
    gate: RateGate,
    policy: PacingPolicy,
    screenshot_dir: PathBuf,
}

impl OverviewScraper {
    pub fn new(policy: PacingPolicy) -> Self {
        Self {
            session: SessionManager::new(),
            gate: RateGate::new(policy.min_request_spacing),
            policy,
            screenshot_dir: config::screenshot_dir(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(PacingPolicy::from_env())
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// Run the full pipeline for one query. Always returns an `Outcome`;
    /// launch failures, navigation errors and classified blocks come back
    /// as the `Failure` variant.
    pub async fn scrape_one(
        &self,
        query: &str,
        options: &SearchOptions,
        site: &'static SiteProfile,
    ) -> Outcome {
        let search_url = site.build_search_url(query, options);
        match self.run_pipeline(query, options, site).await {
            Ok(extraction) => Outcome::success(query.to_string(), search_url, extraction),
            Err(e) => {
                warn!("Scrape failed for {:?}: {}", query, e);
                Outcome::failure(query.to_string(), e.kind(), e.to_string())
            }
        }
    }

    async fn run_pipeline(
        &self,
        query: &str,
        options: &SearchOptions,
        site: &'static SiteProfile,
    ) -> Result<Option<Extraction>, ScrapeError> {
        self.gate.gate().await;

        let tab = self
            .session
            .acquire_tab()
            .await
            .map_err(ScrapeError::Launch)?;

        with_tab(tab, |page| async move {
            let profile = StealthProfile::generate(site);
            let capture = navigate(&page, query, options, &profile, site, &self.policy).await?;

            match classify(&capture.final_url, &capture.markup, site) {
                BlockVerdict::HardBlock => {
                    capture_block_diagnostics(&page, &self.screenshot_dir).await;
                    return Err(ScrapeError::HardBlock {
                        site: site.display_name,
                        url: capture.final_url,
                    });
                }
                BlockVerdict::SoftBlock => {
                    return Err(ScrapeError::SoftBlock {
                        site: site.display_name,
                    });
                }
                BlockVerdict::None => {}
            }

            Ok(extract_overview(&capture.markup, site))
        })
        .await
    }

    /// Scrape a list of queries strictly in order, waiting `delay` between
    /// consecutive queries. A block on one query does not abort the rest.
    pub async fn scrape_batch(
        &self,
        queries: &[String],
        options: &SearchOptions,
        site: &'static SiteProfile,
        delay: Duration,
    ) -> Vec<Outcome> {
        run_batch(queries, delay, |query| self.scrape_one(query, options, site)).await
    }

    /// Tear down the browser session. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}

/// Sequential batch loop, factored out of `scrape_batch` so the ordering
/// and spacing guarantees are testable without a browser.
pub async fn run_batch<'a, F, Fut>(queries: &'a [String], delay: Duration, mut run_one: F) -> Vec<Outcome>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let mut results = Vec::with_capacity(queries.len());
    for (i, query) in queries.iter().enumerate() {
        info!("Processing query {}/{}: {}", i + 1, queries.len(), query);
        results.push(run_one(query).await);
        if i + 1 < queries.len() {
            tokio::time::sleep(delay).await;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorKind;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn queries(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn batch_returns_outcomes_in_input_order() {
        let qs = queries(&["q1", "q2", "q3"]);
        let results = run_batch(&qs, Duration::from_millis(3000), |q| async move {
            Outcome::success(q.to_string(), format!("https://example.test/?q={}", q), None)
        })
        .await;

        assert_eq!(results.len(), 3);
        for (outcome, expected) in results.iter().zip(["q1", "q2", "q3"]) {
            assert_eq!(outcome.query(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_spaces_invocations_by_at_least_the_delay() {
        let delay = Duration::from_millis(3000);
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        let qs = queries(&["q1", "q2", "q3"]);
        let starts_ref = starts.clone();
        run_batch(&qs, delay, move |q| {
            let starts = starts_ref.clone();
            async move {
                starts.lock().unwrap().push(Instant::now());
                Outcome::success(q.to_string(), String::new(), None)
            }
        })
        .await;

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn batch_continues_past_individual_failures() {
        let qs = queries(&["ok", "blocked", "ok again"]);
        let results = run_batch(&qs, Duration::from_millis(100), |q| async move {
            if q == "blocked" {
                Outcome::failure(
                    q.to_string(),
                    ErrorKind::HardBlock,
                    "blocked mid-batch".to_string(),
                )
            } else {
                Outcome::success(q.to_string(), String::new(), None)
            }
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[2].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn no_trailing_delay_after_the_last_query() {
        let qs = queries(&["only"]);
        let before = Instant::now();
        run_batch(&qs, Duration::from_millis(60_000), |q| async move {
            Outcome::success(q.to_string(), String::new(), None)
        })
        .await;
        assert!(before.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_yields_no_outcomes() {
        let qs: Vec<String> = Vec::new();
        let results = run_batch(&qs, Duration::from_millis(100), |q| async move {
            Outcome::success(q.to_string(), String::new(), None)
        })
        .await;
        assert!(results.is_empty());
    }
}
