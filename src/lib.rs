pub mod api;
pub mod core;
pub mod features;
pub mod scraping;

// --- Primary exports ---
pub use crate::core::types;
pub use crate::core::types::{ErrorKind, Extraction, Outcome, SearchOptions};
pub use crate::core::AppState;
pub use crate::scraping::overview::pacing::PacingPolicy;
pub use crate::scraping::overview::site::{find_profile, SiteProfile, BING, GOOGLE};
pub use crate::scraping::OverviewScraper;
