//! Browser executable discovery and the hardened launch configuration.
//!
//! Every session, headless attempt and headed fallback alike, starts from
//! the same named configuration; the only difference between the two modes is
//! `with_head()`.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use std::path::Path;

/// Fixed virtual desktop geometry, kept in sync with the screen patch in
/// [`super::stealth`].
pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// The one user agent every session presents. Matches the desktop profile
/// (`Win32` platform, no mobile tokens) so repeated runs look like the same
/// machine rather than a rotating pool.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Hardened launch arguments shared by every code path that starts a session.
///
/// Automation-control and telemetry surfaces off, sandboxing relaxed for
/// portability, GPU/extensions off for determinism.
pub const HARDENED_LAUNCH_ARGS: &[&str] = &[
    // Stealth: suppress the CDP automation fingerprint
    "--disable-blink-features=AutomationControlled",
    // Telemetry / background chatter
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--disable-crash-reporter",
    "--disable-breakpad",
    // Determinism
    "--disable-gpu",
    "--disable-extensions",
    "--disable-default-apps",
    // Portability in CI / containers
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    // Quality of life
    "--no-first-run",
    "--no-default-browser-check",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (authoritative when set)
/// 2. PATH scan, which finds package-manager installs on all platforms
/// 3. OS-specific well-known install paths
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = crate::core::config::chrome_executable_override() {
        return Some(p);
    }

    for exe in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "brave-browser",
        "brave",
    ] {
        if let Ok(full) = which::which(exe) {
            return Some(full.to_string_lossy().to_string());
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Build the shared `BrowserConfig` for either mode.
///
/// The viewport forces a desktop rendering: no touch, not mobile, landscape,
/// regardless of host, matching the fingerprint invariant.
pub fn build_browser_config(exe: &str, headless: bool) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .arg(format!("--user-agent={}", DESKTOP_USER_AGENT));

    for arg in HARDENED_LAUNCH_ARGS {
        builder = builder.arg(*arg);
    }

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_disable_automation_control() {
        assert!(HARDENED_LAUNCH_ARGS
            .contains(&"--disable-blink-features=AutomationControlled"));
    }

    #[test]
    fn launch_args_have_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for arg in HARDENED_LAUNCH_ARGS {
            assert!(seen.insert(arg), "duplicate launch arg: {arg}");
        }
    }

    #[test]
    fn user_agent_is_desktop() {
        assert!(DESKTOP_USER_AGENT.contains("Windows NT"));
        assert!(!DESKTOP_USER_AGENT.contains("Mobile"));
        assert!(!DESKTOP_USER_AGENT.contains("Headless"));
    }
}
