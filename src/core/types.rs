use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Fingerprint profile: the signals one session presents to the provider
// ─────────────────────────────────────────────────────────────────────────────

/// CSS `prefers-color-scheme` value emulated for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    Dark,
    Light,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Dark => "dark",
            ColorScheme::Light => "light",
        }
    }
}

/// CSS `prefers-reduced-motion` value emulated for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReducedMotion {
    Reduce,
    NoPreference,
}

impl ReducedMotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReducedMotion::Reduce => "reduce",
            ReducedMotion::NoPreference => "no-preference",
        }
    }
}

/// CSS `forced-colors` value emulated for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForcedColors {
    Active,
    None,
}

impl ForcedColors {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForcedColors::Active => "active",
            ForcedColors::None => "none",
        }
    }
}

/// The device/locale/appearance bundle a session presents to the provider.
///
/// Chosen once (deserialized from the sidecar file, or synthesized from host
/// signals) and then immutable for the session. All fields stay consistent
/// with a desktop profile: the launch configuration disables touch and mobile
/// emulation regardless of what this struct says.
///
/// Field names are camelCase on disk; this is the persisted sidecar format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintProfile {
    pub device_profile_name: String,
    pub locale: String,
    pub timezone_id: String,
    pub color_scheme: ColorScheme,
    pub reduced_motion: ReducedMotion,
    pub forced_colors: ForcedColors,
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted session state
// ─────────────────────────────────────────────────────────────────────────────

/// Durable per-state-file record: the pinned fingerprint and provider domain.
///
/// Read at session start when present; both fields are filled lazily and then
/// reused on every later run against the same state file, so consecutive runs
/// resemble the same returning visitor. Written back after every attempt,
/// success or failure, unless persistence is disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<FingerprintProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_provider_domain: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Query / response contract
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-supplied search request. Immutable for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms. Must be non-empty.
    pub text: String,
    /// Maximum number of results to return. Must be > 0.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Per-operation timeout in milliseconds. Launch and post-challenge waits
    /// are bounded by twice this value.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Optional locale override for fingerprint synthesis (e.g. "de-DE").
    #[serde(default)]
    pub locale: Option<String>,
}

fn default_result_limit() -> usize {
    crate::core::config::DEFAULT_RESULT_LIMIT
}

fn default_timeout_ms() -> u64 {
    crate::core::config::DEFAULT_TIMEOUT_MS
}

impl SearchQuery {
    /// Creates a query with default limit and timeout.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            result_limit: default_result_limit(),
            timeout_ms: default_timeout_ms(),
            locale: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// One extracted organic result.
///
/// The extractor never emits a result with an empty title or link; the single
/// exception is the synthetic failure result (see [`SearchResponse::failure`]),
/// which carries an empty link by contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Title of the synthetic result returned on unrecoverable failure.
pub const SEARCH_FAILED_TITLE: &str = "Search failed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    /// The synthetic response returned instead of an error: exactly one result
    /// with a fixed title and the failure message as snippet. Callers decide
    /// whether this constitutes a non-zero exit.
    pub fn failure(query: &str, message: &str) -> Self {
        Self {
            query: query.to_string(),
            results: vec![SearchResult {
                title: SEARCH_FAILED_TITLE.to_string(),
                link: String::new(),
                snippet: message.to_string(),
            }],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.results.as_slice(),
            [r] if r.title == SEARCH_FAILED_TITLE && r.link.is_empty()
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation options
// ─────────────────────────────────────────────────────────────────────────────

/// Engine-level options carried alongside the query.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Main state-file path. The cookie jar lives at this literal path; the
    /// fingerprint/domain sidecar sits next to it (`-fingerprint.json`).
    pub state_file: PathBuf,
    /// Set to `false` to skip all state persistence for this run.
    pub persist_state: bool,
    /// Deprecated legacy flag. The engine always attempts headless first; only
    /// an explicit `Some(false)` changes behavior (the first attempt starts
    /// headed).
    pub headless: Option<bool>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            state_file: crate::core::config::default_state_file(),
            persist_state: true,
            headless: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_serializes_camel_case_with_css_tokens() {
        let fp = FingerprintProfile {
            device_profile_name: "Desktop Chrome".into(),
            locale: "en-US".into(),
            timezone_id: "Europe/Berlin".into(),
            color_scheme: ColorScheme::Dark,
            reduced_motion: ReducedMotion::NoPreference,
            forced_colors: ForcedColors::None,
        };
        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["deviceProfileName"], "Desktop Chrome");
        assert_eq!(json["timezoneId"], "Europe/Berlin");
        assert_eq!(json["colorScheme"], "dark");
        assert_eq!(json["reducedMotion"], "no-preference");
        assert_eq!(json["forcedColors"], "none");
    }

    #[test]
    fn session_state_roundtrips_through_json() {
        let state = SessionState {
            fingerprint: None,
            selected_provider_domain: Some("https://www.google.ca".into()),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("selectedProviderDomain"));
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn empty_object_deserializes_to_default_state() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn failure_response_shape() {
        let resp = SearchResponse::failure("rust async", "browser launch failed: boom");
        assert_eq!(resp.query, "rust async");
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].title, SEARCH_FAILED_TITLE);
        assert!(resp.results[0].link.is_empty());
        assert!(resp.results[0].snippet.contains("boom"));
        assert!(resp.is_failure());
    }

    #[test]
    fn normal_response_is_not_failure() {
        let resp = SearchResponse {
            query: "q".into(),
            results: vec![SearchResult {
                title: "Example".into(),
                link: "https://example.com".into(),
                snippet: String::new(),
            }],
        };
        assert!(!resp.is_failure());
    }
}
