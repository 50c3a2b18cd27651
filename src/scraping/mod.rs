pub mod browser_manager;
pub mod overview;

pub use browser_manager::SessionManager;
pub use overview::OverviewScraper;
