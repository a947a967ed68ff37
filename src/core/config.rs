use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Defaults and env-var plumbing shared by the engine and the CLI shim
// ---------------------------------------------------------------------------

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Default number of results per search.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Default per-operation timeout for library callers.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default per-operation timeout when invoked through the CLI.
pub const CLI_DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Explicit override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `browser::launch::find_chrome_executable`).
/// When `CHROME_EXECUTABLE` is set to a non-empty value it is authoritative,
/// even if the path does not exist; a bad override surfaces as a launch
/// failure rather than silently falling back to a different browser.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    Some(p.to_string())
}

/// Default main state-file path: `~/.serp-scout/browser-state.json`.
///
/// Falls back to a file in the working directory when no home directory can
/// be resolved (containers, stripped-down CI images).
pub fn default_state_file() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".serp-scout").join("browser-state.json"),
        None => PathBuf::from("serp-scout-state.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_file_is_json() {
        let path = default_state_file();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
    }
}
