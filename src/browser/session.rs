//! Browser session lifecycle and fingerprint application.
//!
//! A [`BrowserSession`] owns one Chromium process plus the spawned CDP event
//! handler task. Sessions are explicit values threaded through the engine;
//! there is no process-global browser handle. Whether a given session may be
//! closed is the engine's call (caller-supplied sessions are never closed or
//! repurposed here).

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::{
    MediaFeature, SetEmulatedMediaParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::launch::{build_browser_config, find_chrome_executable, DESKTOP_USER_AGENT};
use super::stealth::stealth_script;
use crate::core::types::FingerprintProfile;
use crate::error::SearchError;

pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    headless: bool,
}

impl BrowserSession {
    /// Launches a fresh session with the hardened configuration.
    ///
    /// `launch_timeout` should already carry the caller's doubling for
    /// launch-class operations.
    pub async fn launch(headless: bool, launch_timeout: Duration) -> crate::Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            SearchError::LaunchFailure(
                "no Chromium-family browser found; install Chrome/Chromium or set CHROME_EXECUTABLE"
                    .to_string(),
            )
        })?;

        let config = build_browser_config(&exe, headless)
            .map_err(|e| SearchError::LaunchFailure(e.to_string()))?;

        info!(
            "browser: launching {} session ({})",
            if headless { "headless" } else { "headed" },
            exe
        );

        let launched = tokio::time::timeout(launch_timeout, Browser::launch(config))
            .await
            .map_err(|_| {
                SearchError::LaunchFailure(format!(
                    "browser did not start within {} ms ({})",
                    launch_timeout.as_millis(),
                    exe
                ))
            })?;

        let (browser, mut handler) =
            launched.map_err(|e| SearchError::LaunchFailure(format!("{} ({})", e, exe)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser: CDP handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            headless,
        })
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Opens a page with the fingerprint applied and the masking patches
    /// registered for every document it will load.
    pub async fn new_page(&self, fingerprint: &FingerprintProfile) -> crate::Result<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SearchError::Automation(format!("failed to open page: {}", e)))?;
        apply_fingerprint(&page, fingerprint).await?;
        Ok(page)
    }

    /// Gracefully shuts the session down. Only the engine calls this, and only
    /// for sessions it launched itself.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser: close error (non-fatal): {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        info!("browser: session closed");
    }
}

/// Applies the fingerprint as CDP overrides plus the injected patch script.
///
/// Runs before any navigation so the very first document already sees the
/// spoofed environment.
async fn apply_fingerprint(page: &Page, fp: &FingerprintProfile) -> crate::Result<()> {
    let ua_override = SetUserAgentOverrideParams::builder()
        .user_agent(DESKTOP_USER_AGENT)
        .accept_language(accept_language_for(&fp.locale))
        .platform("Win32")
        .build()
        .map_err(|e| SearchError::Automation(format!("user-agent override: {}", e)))?;
    page.execute(ua_override)
        .await
        .map_err(|e| SearchError::Automation(format!("user-agent override: {}", e)))?;

    page.execute(SetTimezoneOverrideParams::new(fp.timezone_id.clone()))
        .await
        .map_err(|e| SearchError::Automation(format!("timezone override: {}", e)))?;

    let media = SetEmulatedMediaParams::builder()
        .features(vec![
            MediaFeature::new("prefers-color-scheme", fp.color_scheme.as_str()),
            MediaFeature::new("prefers-reduced-motion", fp.reduced_motion.as_str()),
            MediaFeature::new("forced-colors", fp.forced_colors.as_str()),
        ])
        .build();
    page.execute(media)
        .await
        .map_err(|e| SearchError::Automation(format!("media emulation: {}", e)))?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script()))
        .await
        .map_err(|e| SearchError::Automation(format!("patch injection: {}", e)))?;

    debug!(
        "browser: fingerprint applied (locale={}, tz={}, scheme={})",
        fp.locale,
        fp.timezone_id,
        fp.color_scheme.as_str()
    );
    Ok(())
}

/// `de-DE` becomes `de-DE,de;q=0.9`, the header shape a real desktop Chrome sends.
fn accept_language_for(locale: &str) -> String {
    let lang = locale.split('-').next().unwrap_or("en");
    if lang == locale {
        format!("{locale};q=0.9")
    } else {
        format!("{locale},{lang};q=0.9")
    }
}

/// Navigates within the caller's timeout.
pub async fn navigate(page: &Page, url: &str, timeout: Duration) -> crate::Result<()> {
    debug!("browser: navigating to {}", url);
    match tokio::time::timeout(timeout, page.goto(url.to_string())).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(SearchError::Automation(format!(
            "navigation to {} failed: {}",
            url, e
        ))),
        Err(_) => Err(SearchError::NavigationTimeout(format!(
            "{} after {} ms",
            url,
            timeout.as_millis()
        ))),
    }
}

/// The page's current location, best-effort.
pub async fn current_url(page: &Page) -> Option<String> {
    page.url().await.ok().flatten()
}
