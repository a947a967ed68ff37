//! End-to-end engine scenarios.
//!
//! Tests that need a live Chromium and network access are `#[ignore]`d so the
//! suite stays green on build machines without a browser; run them locally
//! with `cargo test -- --ignored`.

use serp_scout::state_store;
use serp_scout::{
    ColorScheme, FingerprintProfile, ForcedColors, ReducedMotion, SearchEngine, SearchOptions,
    SearchQuery, SessionState, SEARCH_FAILED_TITLE,
};

fn options_in(dir: &tempfile::TempDir, persist: bool) -> SearchOptions {
    SearchOptions {
        state_file: dir.path().join("browser-state.json"),
        persist_state: persist,
        headless: None,
    }
}

/// Launch failure must surface as the synthetic failed-result response, never
/// as an error or a panic, and a run with persistence disabled must leave no
/// files behind. Runs everywhere: the executable override points at a path
/// that cannot exist.
#[tokio::test]
async fn launch_failure_yields_synthetic_response_and_writes_nothing() {
    std::env::set_var("CHROME_EXECUTABLE", "/nonexistent/path/to/chromium");

    let dir = tempfile::tempdir().unwrap();
    let options = options_in(&dir, false);
    let state_file = options.state_file.clone();

    let engine = SearchEngine::new(options);
    let response = engine.search(&SearchQuery::new("openai")).await;

    std::env::remove_var("CHROME_EXECUTABLE");

    assert_eq!(response.query, "openai");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].title, SEARCH_FAILED_TITLE);
    assert_eq!(response.results[0].link, "");
    assert!(
        response.results[0].snippet.contains("browser launch failed"),
        "snippet should carry the launch error, got: {}",
        response.results[0].snippet
    );

    assert!(!state_file.exists());
    assert!(!state_store::sidecar_path(&state_file).exists());
}

/// Fresh state file, limit 3: every result is well-formed and the limit holds.
#[tokio::test]
#[ignore = "requires a local Chromium install and network access"]
async fn fresh_search_returns_capped_well_formed_results() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SearchEngine::new(options_in(&dir, true));

    let response = engine
        .search(&SearchQuery::new("openai").with_limit(3))
        .await;

    assert_eq!(response.query, "openai");
    assert!(!response.is_failure(), "{:?}", response.results);
    assert!((1..=3).contains(&response.results.len()));
    for result in &response.results {
        assert!(!result.title.is_empty());
        assert!(result.link.starts_with("http"));
    }

    // Both the fingerprint sidecar and the cookie jar exist after a persisted run.
    assert!(state_store::sidecar_path(engine.options().state_file.as_path()).exists());
}

/// A pinned provider domain is reused, never re-drawn.
#[tokio::test]
#[ignore = "requires a local Chromium install and network access"]
async fn pinned_provider_domain_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(&dir, true);

    let pinned = SessionState {
        fingerprint: Some(FingerprintProfile {
            device_profile_name: "Desktop Chrome".into(),
            locale: "en-GB".into(),
            timezone_id: "Europe/London".into(),
            color_scheme: ColorScheme::Light,
            reduced_motion: ReducedMotion::NoPreference,
            forced_colors: ForcedColors::None,
        }),
        selected_provider_domain: Some("https://www.google.co.uk".into()),
    };
    state_store::save(&options.state_file, &pinned).unwrap();

    let engine = SearchEngine::new(options);
    let response = engine
        .search(&SearchQuery::new("rust language").with_limit(2))
        .await;
    assert!(!response.is_failure(), "{:?}", response.results);

    let after = state_store::load(engine.options().state_file.as_path());
    assert_eq!(
        after.selected_provider_domain.as_deref(),
        Some("https://www.google.co.uk")
    );
    assert_eq!(after.fingerprint, pinned.fingerprint);
}
