//! Site profiles: everything engine-specific the pipeline needs, as plain data.
//!
//! The pipeline itself is site-agnostic. Adding another engine means adding
//! a `SiteProfile` const here (URL builder, selector catalog, header set,
//! block trigger lists), not new pipeline code.

use aho_corasick::AhoCorasick;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::sync::OnceLock;

use crate::core::types::SearchOptions;

/// One content-location strategy: a CSS selector plus the minimum trimmed
/// text length a match must carry to be accepted.
#[derive(Debug, Clone, Copy)]
pub struct SelectorRule {
    pub selector: &'static str,
    pub min_text_len: usize,
}

impl SelectorRule {
    pub const fn new(selector: &'static str, min_text_len: usize) -> Self {
        Self {
            selector,
            min_text_len,
        }
    }
}

/// A search engine the pipeline knows how to drive.
///
/// Block trigger lists are data on purpose: engines change their defense
/// pages faster than we change code, so the lists evolve here per site.
pub struct SiteProfile {
    /// Request-parameter value selecting this profile.
    pub name: &'static str,
    /// Human-readable name used in error messages.
    pub display_name: &'static str,
    /// Homepage visited first to establish a plausible session.
    pub homepage: &'static str,
    /// Ordered selector catalog; first sufficiently-long match wins.
    pub catalog: &'static [SelectorRule],
    /// Marker phrases for the fallback pass. Empty slice disables the pass.
    pub fallback_keywords: &'static [&'static str],
    /// Minimum trimmed text length a fallback match must carry.
    pub fallback_min_text_len: usize,
    /// Extra HTTP headers sent with every navigation.
    pub extra_headers: &'static [(&'static str, &'static str)],
    /// URL substrings that mark a dedicated block / CAPTCHA page.
    pub block_url_patterns: &'static [&'static str],
    /// Body-text phrases that mark a soft block.
    pub soft_block_phrases: &'static [&'static str],
    build_url: fn(&str, &SearchOptions) -> String,
    soft_matcher: OnceLock<AhoCorasick>,
}

impl SiteProfile {
    /// Build the query URL with the site's parameter scheme.
    pub fn build_search_url(&self, query: &str, options: &SearchOptions) -> String {
        (self.build_url)(query, options)
    }

    /// `true` when the final URL landed on a known block page.
    pub fn is_block_url(&self, url: &str) -> bool {
        self.block_url_patterns.iter().any(|p| url.contains(p))
    }

    /// Cached case-insensitive matcher over `soft_block_phrases`.
    pub fn soft_block_matcher(&self) -> &AhoCorasick {
        self.soft_matcher.get_or_init(|| {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(self.soft_block_phrases)
                .expect("valid soft-block phrases")
        })
    }
}

impl std::fmt::Debug for SiteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteProfile")
            .field("name", &self.name)
            .field("catalog_len", &self.catalog.len())
            .finish()
    }
}

/// Resolve a request-supplied site name. Case-insensitive.
pub fn find_profile(name: &str) -> Option<&'static SiteProfile> {
    let lower = name.trim().to_ascii_lowercase();
    [&GOOGLE, &BING]
        .into_iter()
        .find(|p| p.name == lower)
}

pub fn default_profile() -> &'static SiteProfile {
    &GOOGLE
}

// ── Shared request headers ───────────────────────────────────────────────────

/// Header set a real browser sends on a top-level document navigation.
const REALISTIC_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Cache-Control", "max-age=0"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
];

// ── Google ───────────────────────────────────────────────────────────────────

// AI Overview containers change often; ordered roughly from the most specific
// answer-panel attributes down to generic snippet classes.
const GOOGLE_CATALOG: &[SelectorRule] = &[
    SelectorRule::new(r#"[data-attrid="FeaturedSnippet"]"#, 50),
    SelectorRule::new(r#"[data-attrid="SGTOverview"]"#, 50),
    SelectorRule::new(r#"[jsname="xQjRM"]"#, 50),
    SelectorRule::new(r#"[data-async-context="query:"]"#, 50),
    SelectorRule::new(".aCOpRe", 50),
    SelectorRule::new(".kp-wholepage-osrp", 50),
    SelectorRule::new(".g-blk", 50),
    SelectorRule::new(".TzHB6b", 50),
    SelectorRule::new(".BNeawe", 50),
    SelectorRule::new(".IZ6rdc", 50),
    SelectorRule::new(".hgKElc", 50),
    SelectorRule::new(".LTKOO", 50),
    SelectorRule::new(".sATSHe", 50),
    SelectorRule::new(".UCInVb", 50),
    SelectorRule::new(".yXK7lf", 50),
    SelectorRule::new(".MjjYud", 50),
    SelectorRule::new(".VwiC3b", 50),
    SelectorRule::new(".yXK7lf em", 50),
    SelectorRule::new(".hgKElc .BNeawe", 50),
];

fn build_google_url(query: &str, options: &SearchOptions) -> String {
    let q = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!(
        "https://www.google.com/search?q={}&gl={}&hl={}&num={}&start={}&pws={}",
        q, options.gl, options.hl, options.num, options.start, options.pws
    )
}

pub static GOOGLE: SiteProfile = SiteProfile {
    name: "google",
    display_name: "Google",
    homepage: "https://www.google.com",
    catalog: GOOGLE_CATALOG,
    fallback_keywords: &["AI-generated", "Generative AI", "Overview", "Sources include"],
    fallback_min_text_len: 100,
    extra_headers: REALISTIC_HEADERS,
    block_url_patterns: &["sorry/index", "captcha", "blocked"],
    soft_block_phrases: &["unusual traffic", "automated queries"],
    build_url: build_google_url,
    soft_matcher: OnceLock::new(),
};

// ── Bing ─────────────────────────────────────────────────────────────────────

// Copilot / answer-card containers. Bing panels run shorter than Google's,
// hence the lower acceptance threshold.
const BING_CATALOG: &[SelectorRule] = &[
    SelectorRule::new(".b_cards", 30),
    SelectorRule::new(".b_ans", 30),
    SelectorRule::new(".b_entityTP", 30),
    SelectorRule::new(".b_pag", 30),
    SelectorRule::new(".b_factrow", 30),
    SelectorRule::new(".ans_nws", 30),
    SelectorRule::new(".b_xlText", 30),
    SelectorRule::new(".rms_rnk", 30),
];

fn build_bing_url(query: &str, options: &SearchOptions) -> String {
    let q = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!(
        "https://www.bing.com/search?q={}&cc={}&setLang={}&count={}",
        q, options.gl, options.hl, options.num
    )
}

pub static BING: SiteProfile = SiteProfile {
    name: "bing",
    display_name: "Bing",
    homepage: "https://www.bing.com",
    catalog: BING_CATALOG,
    // Bing answer cards carry no stable marker phrases; selector pass only.
    fallback_keywords: &[],
    fallback_min_text_len: 100,
    extra_headers: REALISTIC_HEADERS,
    block_url_patterns: &["sorry/index", "captcha", "blocked"],
    soft_block_phrases: &["unusual traffic", "automated queries"],
    build_url: build_bing_url,
    soft_matcher: OnceLock::new(),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_url_reflects_defaults() {
        let url = GOOGLE.build_search_url("rust", &SearchOptions::default());
        assert_eq!(
            url,
            "https://www.google.com/search?q=rust&gl=US&hl=en&num=10&start=0&pws=0"
        );
    }

    #[test]
    fn google_url_reflects_overrides() {
        let options = SearchOptions {
            gl: "DE".to_string(),
            hl: "de".to_string(),
            num: 25,
            start: 10,
            pws: 1,
        };
        let url = GOOGLE.build_search_url("kaffee", &options);
        assert_eq!(
            url,
            "https://www.google.com/search?q=kaffee&gl=DE&hl=de&num=25&start=10&pws=1"
        );
    }

    #[test]
    fn google_url_percent_encodes_query() {
        let url = GOOGLE.build_search_url("rust async await", &SearchOptions::default());
        assert!(url.starts_with("https://www.google.com/search?q=rust%20async%20await&"));
    }

    #[test]
    fn bing_url_uses_its_own_parameter_scheme() {
        let url = BING.build_search_url("rust", &SearchOptions::default());
        assert_eq!(
            url,
            "https://www.bing.com/search?q=rust&cc=US&setLang=en&count=10"
        );
    }

    #[test]
    fn profile_lookup_is_case_insensitive() {
        assert_eq!(find_profile("google").unwrap().name, "google");
        assert_eq!(find_profile("  Bing ").unwrap().name, "bing");
        assert!(find_profile("yandex").is_none());
    }

    #[test]
    fn block_url_patterns_match_known_pages() {
        assert!(GOOGLE.is_block_url("https://www.google.com/sorry/index?continue=https://..."));
        assert!(GOOGLE.is_block_url("https://www.google.com/search/captcha"));
        assert!(!GOOGLE.is_block_url("https://www.google.com/search?q=rust"));
    }

    #[test]
    fn soft_block_matcher_is_case_insensitive() {
        assert!(GOOGLE.soft_block_matcher().is_match("Unusual Traffic from your network"));
        assert!(GOOGLE
            .soft_block_matcher()
            .is_match("systems have detected Automated Queries"));
        assert!(!GOOGLE.soft_block_matcher().is_match("ordinary results page"));
    }
}
