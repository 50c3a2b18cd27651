use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::scraping::OverviewScraper;

/// Shared state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<OverviewScraper>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scraper: Arc<OverviewScraper>) -> Self {
        Self {
            scraper,
            started_at: Utc::now(),
        }
    }

    /// Seconds since startup, for the health endpoint.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("started_at", &self.started_at)
            .finish()
    }
}
