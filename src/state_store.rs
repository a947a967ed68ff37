//! Durable session state: fingerprint/domain sidecar and cookie jar.
//!
//! Two files per state path:
//! * the sidecar (`<stem>-fingerprint.json`) holds the pinned
//!   [`SessionState`] (fingerprint + provider domain);
//! * the main path holds the low-level session blob: a raw JSON array of
//!   cookies captured from the browser at teardown and re-injected before the
//!   next navigation, so a later run resembles the same returning visitor.
//!
//! Every operation here is best-effort. A missing or corrupt file yields an
//! empty state; a failed write is reported as [`SearchError::Persistence`]
//! for the caller to log and swallow; persistence must never abort a
//! completed search.

use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};
use chromiumoxide::Page;
use tracing::{info, warn};

use crate::core::types::SessionState;
use crate::error::SearchError;

/// Suffix substituted onto the main state path for the fingerprint sidecar.
const SIDECAR_SUFFIX: &str = "-fingerprint.json";

/// `…/browser-state.json` → `…/browser-state-fingerprint.json`.
pub fn sidecar_path(state_file: &Path) -> PathBuf {
    let stem = state_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("browser-state");
    state_file.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Fingerprint / domain sidecar
// ─────────────────────────────────────────────────────────────────────────────

/// Loads the pinned state from the sidecar. Never fatal: a missing file is an
/// empty state, a corrupt file is logged and treated as empty.
pub fn load(state_file: &Path) -> SessionState {
    let path = sidecar_path(state_file);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return SessionState::default(),
    };
    match serde_json::from_str::<SessionState>(&content) {
        Ok(state) => {
            info!("state_store: loaded session state from {}", path.display());
            state
        }
        Err(e) => {
            warn!(
                "state_store: corrupt session state at {}: {}; starting fresh",
                path.display(),
                e
            );
            SessionState::default()
        }
    }
}

/// Writes the pinned state to the sidecar, creating parent directories.
pub fn save(state_file: &Path, state: &SessionState) -> crate::Result<()> {
    let path = sidecar_path(state_file);
    write_json(&path, state)?;
    info!("state_store: saved session state to {}", path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Cookie jar (low-level session blob at the main state path)
// ─────────────────────────────────────────────────────────────────────────────

/// Loads stored cookies as raw JSON values. `None` when the file is missing,
/// unreadable, or empty.
pub fn load_cookies(state_file: &Path) -> Option<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(state_file).ok()?;
    let cookies: Vec<serde_json::Value> = serde_json::from_str(&content).ok()?;
    if cookies.is_empty() {
        return None;
    }
    info!(
        "state_store: loaded {} cookies from {}",
        cookies.len(),
        state_file.display()
    );
    Some(cookies)
}

/// Persists the raw cookie array at the main state path.
pub fn save_cookies(state_file: &Path, cookies: &[serde_json::Value]) -> crate::Result<()> {
    write_json(state_file, &cookies)?;
    info!(
        "state_store: saved {} cookies to {}",
        cookies.len(),
        state_file.display()
    );
    Ok(())
}

/// Snapshots the page's cookie jar as raw JSON values. Errors degrade to an
/// empty jar; there is nothing actionable to do with a failed read here.
pub async fn capture_cookies(page: &Page) -> Vec<serde_json::Value> {
    match page.get_cookies().await {
        Ok(cookies) => cookies
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect(),
        Err(e) => {
            warn!("state_store: cookie capture failed: {}", e);
            Vec::new()
        }
    }
}

/// Injects stored cookies into a live page **before** navigation.
///
/// Raw values are deserialized into [`CookieParam`]s; any individual cookie
/// that fails to deserialize is silently skipped so a partially-malformed jar
/// never blocks a search.
pub async fn inject_cookies(page: &Page, raw_cookies: &[serde_json::Value]) {
    let cookie_params: Vec<CookieParam> = raw_cookies
        .iter()
        .filter_map(|v| serde_json::from_value::<CookieParam>(v.clone()).ok())
        .collect();

    if cookie_params.is_empty() {
        warn!("state_store: stored jar contained no valid cookies; skipping injection");
        return;
    }

    let count = cookie_params.len();
    match page.execute(SetCookiesParams::new(cookie_params)).await {
        Ok(_) => info!("state_store: injected {} session cookies", count),
        Err(e) => warn!("state_store: cookie injection failed: {}", e),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SearchError::Persistence(format!("{}: {}", parent.display(), e)))?;
        }
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| SearchError::Persistence(e.to_string()))?;
    std::fs::write(path, json)
        .map_err(|e| SearchError::Persistence(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        ColorScheme, FingerprintProfile, ForcedColors, ReducedMotion,
    };
    use serde_json::json;

    fn sample_state() -> SessionState {
        SessionState {
            fingerprint: Some(FingerprintProfile {
                device_profile_name: "Desktop Chrome".into(),
                locale: "en-GB".into(),
                timezone_id: "Europe/London".into(),
                color_scheme: ColorScheme::Light,
                reduced_motion: ReducedMotion::NoPreference,
                forced_colors: ForcedColors::None,
            }),
            selected_provider_domain: Some("https://www.google.co.uk".into()),
        }
    }

    #[test]
    fn sidecar_path_substitutes_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/x/browser-state.json")),
            Path::new("/tmp/x/browser-state-fingerprint.json")
        );
        assert_eq!(
            sidecar_path(Path::new("state.json")),
            Path::new("state-fingerprint.json")
        );
    }

    #[test]
    fn roundtrip_preserves_all_populated_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("nested").join("browser-state.json");

        let state = sample_state();
        save(&state_file, &state).unwrap();
        assert_eq!(load(&state_file), state);
    }

    #[test]
    fn missing_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("nope.json");
        assert_eq!(load(&state_file), SessionState::default());
    }

    #[test]
    fn corrupt_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("browser-state.json");
        std::fs::write(sidecar_path(&state_file), "{not json").unwrap();
        assert_eq!(load(&state_file), SessionState::default());
    }

    #[test]
    fn cookie_jar_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("browser-state.json");

        let cookies = vec![
            json!({"name": "NID", "value": "abc", "domain": ".google.com", "path": "/"}),
            json!({"name": "CONSENT", "value": "YES+", "domain": ".google.com", "path": "/"}),
        ];
        save_cookies(&state_file, &cookies).unwrap();
        assert_eq!(load_cookies(&state_file), Some(cookies));
    }

    #[test]
    fn empty_or_missing_jar_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("browser-state.json");
        assert_eq!(load_cookies(&state_file), None);

        std::fs::write(&state_file, "[]").unwrap();
        assert_eq!(load_cookies(&state_file), None);
    }
}
