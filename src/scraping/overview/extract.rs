//! Content extraction: ordered selector-catalog walk with keyword fallback.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::site::SiteProfile;
use crate::core::types::Extraction;

/// `selector` value tagged onto fallback-pass results.
pub const KEYWORD_FALLBACK_LABEL: &str = "keyword-based";

/// Walk the site's selector catalog over `markup`; first rule whose first
/// match carries enough trimmed text wins. Catalog order is the only
/// tie-break. When no rule accepts, the keyword fallback pass scans all
/// elements in document order for a marker phrase.
///
/// `None` means the page rendered fine but carried no overview panel; that
/// is a normal outcome, not an error.
pub fn extract_overview(markup: &str, site: &SiteProfile) -> Option<Extraction> {
    let doc = Html::parse_document(markup);

    for rule in site.catalog {
        let Ok(sel) = Selector::parse(rule.selector) else {
            continue;
        };
        if let Some(element) = doc.select(&sel).next() {
            let text = collapse_text(&element);
            if text.len() > rule.min_text_len {
                debug!("Overview matched via selector: {}", rule.selector);
                return Some(Extraction {
                    text,
                    html: element.inner_html(),
                    selector: rule.selector.to_string(),
                    keyword: None,
                });
            }
        }
    }

    if site.fallback_keywords.is_empty() {
        return None;
    }

    let Ok(every) = Selector::parse("*") else {
        return None;
    };
    for element in doc.select(&every) {
        let text = collapse_text(&element);
        if text.len() <= site.fallback_min_text_len {
            continue;
        }
        if let Some(keyword) = site
            .fallback_keywords
            .iter()
            .find(|kw| text.contains(*kw))
        {
            debug!("Overview matched via keyword fallback: {}", keyword);
            return Some(Extraction {
                text,
                html: element.inner_html(),
                selector: KEYWORD_FALLBACK_LABEL.to_string(),
                keyword: Some(keyword.to_string()),
            });
        }
    }

    None
}

/// First `limit` characters of the rendered body text, with script / style /
/// noscript subtrees excluded. Approximates what a user sees at the top of
/// the page; the soft-block check scans this.
pub fn visible_body_text(markup: &str, limit: usize) -> String {
    let doc = Html::parse_document(markup);
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = doc.select(&body_selector).next() else {
        return String::new();
    };

    let mut parts = Vec::new();
    push_visible_text(&body, &mut parts);
    let squished = parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    squished.chars().take(limit).collect()
}

fn push_visible_text(element: &ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if matches!(
                child_element.value().name(),
                "script" | "style" | "noscript"
            ) {
                continue;
            }
            push_visible_text(&child_element, parts);
        } else if let Some(text_node) = child.value().as_text() {
            parts.push(text_node.text.to_string());
        }
    }
}

fn collapse_text(element: &ElementRef<'_>) -> String {
    let raw = element.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::overview::site::{BING, GOOGLE};

    fn long_text(prefix: &str, len: usize) -> String {
        let mut s = String::from(prefix);
        while s.len() < len {
            s.push_str(" lorem ipsum dolor sit amet");
        }
        s
    }

    #[test]
    fn earliest_catalog_rule_wins_over_longer_match() {
        // .MjjYud sits later in the catalog than .TzHB6b; its longer text
        // must not beat catalog order.
        let markup = format!(
            r#"<html><body>
                <div class="MjjYud">{}</div>
                <div class="TzHB6b">{}</div>
            </body></html>"#,
            long_text("late rule, much longer content", 300),
            long_text("early rule content", 80),
        );
        let extraction = extract_overview(&markup, &GOOGLE).expect("should match");
        assert_eq!(extraction.selector, ".TzHB6b");
        assert!(extraction.keyword.is_none());
        assert!(extraction.text.starts_with("early rule content"));
    }

    #[test]
    fn short_match_is_rejected_and_walk_continues() {
        // .BNeawe matches first but is under the 50-char minimum; the longer
        // .VwiC3b match further down the catalog is taken instead.
        let markup = format!(
            r#"<html><body>
                <div class="BNeawe">too short</div>
                <div class="VwiC3b">{}</div>
            </body></html>"#,
            long_text("acceptable snippet", 120),
        );
        let extraction = extract_overview(&markup, &GOOGLE).expect("should match");
        assert_eq!(extraction.selector, ".VwiC3b");
    }

    #[test]
    fn bing_threshold_is_lower() {
        // 40 trimmed chars: too short for the generic catalog, long enough
        // for Bing's 30-char rules.
        let markup = r#"<html><body>
            <div class="b_ans">forty characters of answer card text....</div>
        </body></html>"#;
        let extraction = extract_overview(markup, &BING).expect("should match");
        assert_eq!(extraction.selector, ".b_ans");
        assert_eq!(extraction.text.len(), 40);
    }

    #[test]
    fn no_match_yields_none_not_error() {
        let markup = "<html><body><p>ten results, none of them an answer panel</p></body></html>";
        assert!(extract_overview(markup, &GOOGLE).is_none());
    }

    #[test]
    fn keyword_fallback_fires_only_when_catalog_misses() {
        let markup = format!(
            "<html><body><p>{}</p></body></html>",
            long_text("Sources include encyclopedias and journals", 150),
        );
        let extraction = extract_overview(&markup, &GOOGLE).expect("fallback should match");
        assert_eq!(extraction.selector, KEYWORD_FALLBACK_LABEL);
        assert_eq!(extraction.keyword.as_deref(), Some("Sources include"));
    }

    #[test]
    fn keyword_fallback_does_not_shadow_catalog_match() {
        let markup = format!(
            r#"<html><body>
                <div class="hgKElc">{}</div>
                <p>{}</p>
            </body></html>"#,
            long_text("catalog answer", 90),
            long_text("Sources include other places", 150),
        );
        let extraction = extract_overview(&markup, &GOOGLE).expect("should match");
        assert_eq!(extraction.selector, ".hgKElc");
        assert!(extraction.keyword.is_none());
    }

    #[test]
    fn keyword_fallback_requires_substantial_text() {
        let markup = "<html><body><p>Sources include one line.</p></body></html>";
        assert!(extract_overview(markup, &GOOGLE).is_none());
    }

    #[test]
    fn bing_profile_has_no_fallback_pass() {
        let markup = format!(
            "<html><body><p>{}</p></body></html>",
            long_text("Sources include encyclopedias", 150),
        );
        assert!(extract_overview(&markup, &BING).is_none());
    }

    #[test]
    fn visible_body_text_skips_script_and_style() {
        let markup = r#"<html><body>
            <script>var detected = "automated queries";</script>
            <style>.x { color: red; }</style>
            <p>normal page text</p>
        </body></html>"#;
        let text = visible_body_text(markup, 500);
        assert_eq!(text, "normal page text");
    }

    #[test]
    fn visible_body_text_truncates_to_limit() {
        let markup = format!("<html><body><p>{}</p></body></html>", "a".repeat(2000));
        assert_eq!(visible_body_text(&markup, 500).len(), 500);
    }
}
