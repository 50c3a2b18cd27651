use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search parameters accepted by every scrape entry point.
///
/// All fields are optional on the wire; missing ones fall back to the
/// documented defaults (gl=US, hl=en, num=10, start=0, pws=0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Geo / country code.
    #[serde(default = "default_gl")]
    pub gl: String,
    /// Interface language code.
    #[serde(default = "default_hl")]
    pub hl: String,
    /// Result count per page.
    #[serde(default = "default_num")]
    pub num: u32,
    /// Result offset.
    #[serde(default)]
    pub start: u32,
    /// Personalization flag; 0 keeps results unpersonalized.
    #[serde(default)]
    pub pws: u8,
}

fn default_gl() -> String {
    "US".to_string()
}

fn default_hl() -> String {
    "en".to_string()
}

fn default_num() -> u32 {
    10
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            gl: default_gl(),
            hl: default_hl(),
            num: default_num(),
            start: 0,
            pws: 0,
        }
    }
}

/// The extracted answer-panel fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Trimmed visible text of the matched element.
    pub text: String,
    /// Inner markup of the matched element.
    pub html: String,
    /// Which catalog rule matched, or `"keyword-based"` for the fallback pass.
    pub selector: String,
    /// Marker phrase that triggered the fallback pass, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Wire-level classification of a failed scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Browser process failed to start.
    Launch,
    /// Timeout or network failure during navigation.
    Navigation,
    /// Redirected to a dedicated block / CAPTCHA page.
    HardBlock,
    /// Page rendered but carries automated-traffic suspicion text.
    SoftBlock,
}

/// Result of one scraped query. Every caller gets exactly one of these per
/// query; pipeline failures are folded into the `Failure` variant rather
/// than propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        query: String,
        search_url: String,
        /// Absent when the page loaded fine but carried no overview panel.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overview: Option<Extraction>,
        has_overview: bool,
        timestamp: DateTime<Utc>,
    },
    Failure {
        query: String,
        error_kind: ErrorKind,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Outcome {
    pub fn success(query: String, search_url: String, overview: Option<Extraction>) -> Self {
        let has_overview = overview.is_some();
        Self::Success {
            query,
            search_url,
            overview,
            has_overview,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(query: String, error_kind: ErrorKind, message: String) -> Self {
        Self::Failure {
            query,
            error_kind,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Success { query, .. } | Self::Failure { query, .. } => query,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Query string of `GET /api/ai-overview`. Kept flat with optional fields
/// because the query-string layer has no notion of nested defaults; the
/// merge into [`SearchOptions`] happens in `options()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverviewParams {
    pub q: Option<String>,
    pub gl: Option<String>,
    pub hl: Option<String>,
    pub num: Option<u32>,
    pub start: Option<u32>,
    pub pws: Option<u8>,
    /// Which site profile to scrape; defaults to `google`.
    pub site: Option<String>,
}

impl OverviewParams {
    /// Fold the supplied parameters over the documented defaults.
    pub fn options(&self) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            gl: self.gl.clone().unwrap_or(defaults.gl),
            hl: self.hl.clone().unwrap_or(defaults.hl),
            num: self.num.unwrap_or(defaults.num),
            start: self.start.unwrap_or(defaults.start),
            pws: self.pws.unwrap_or(defaults.pws),
        }
    }
}

/// Body of `POST /api/ai-overview/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub options: SearchOptions,
    /// Which site profile to scrape; defaults to `google`.
    #[serde(default)]
    pub site: Option<String>,
    /// Delay between queries in milliseconds; server default applies when absent.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total_queries: usize,
    pub results: Vec<Outcome>,
    pub timestamp: DateTime<Utc>,
}
