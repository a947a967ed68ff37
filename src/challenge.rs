//! Verification-challenge detection.
//!
//! Classifies the current page as "blocked/verification" vs "normal" by pure
//! URL substring matching: no network calls, no DOM inspection. Deliberately
//! conservative: a false positive only costs an extra escalation or wait,
//! while a false negative hands garbage to the extractor.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;

/// URL fragments that mark a verification or rate-limiting interstitial.
pub const BLOCKED_URL_PATTERNS: &[&str] = &[
    "google.com/sorry/index",
    "google.com/sorry",
    "recaptcha",
    "captcha",
    "unusual traffic",
];

static BLOCKED_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn blocked_matcher() -> &'static AhoCorasick {
    BLOCKED_MATCHER.get_or_init(|| {
        // Patterns are simple substrings; Aho-Corasick gives linear-time scan.
        AhoCorasick::new(BLOCKED_URL_PATTERNS).expect("valid blocked-url patterns")
    })
}

/// Returns `true` when either URL matches a blocked-page pattern.
///
/// `last_response_url` catches the case where the page has already been
/// redirected server-side but the visible location has not settled yet.
pub fn is_blocked(current_url: &str, last_response_url: Option<&str>) -> bool {
    let matcher = blocked_matcher();
    if matcher.is_match(&current_url.to_lowercase()) {
        return true;
    }
    match last_response_url {
        Some(url) => matcher.is_match(&url.to_lowercase()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorry_page_variants_are_blocked() {
        assert!(is_blocked("https://www.google.com/sorry/index?continue=x", None));
        assert!(is_blocked("https://www.google.com/sorry?continue=x", None));
    }

    #[test]
    fn captcha_markers_are_blocked() {
        assert!(is_blocked("https://www.google.com/recaptcha/api2/anchor", None));
        assert!(is_blocked("https://example.com/captcha-check", None));
        assert!(is_blocked("HTTPS://WWW.GOOGLE.COM/ReCaptcha", None));
    }

    #[test]
    fn response_url_alone_triggers_detection() {
        assert!(is_blocked(
            "https://www.google.com/search?q=rust",
            Some("https://www.google.com/sorry/index")
        ));
    }

    #[test]
    fn normal_serp_is_not_blocked() {
        assert!(!is_blocked("https://www.google.com/search?q=rust", None));
        assert!(!is_blocked(
            "https://www.google.com/",
            Some("https://www.google.com/")
        ));
    }

    #[test]
    fn detection_is_a_pure_predicate() {
        let url = "https://www.google.com/sorry/index";
        let first = is_blocked(url, None);
        for _ in 0..10 {
            assert_eq!(is_blocked(url, None), first);
        }
    }
}
