//! Query-input interaction: locate, type, submit, settle.
//!
//! The provider ships several SERP layouts; the input element is probed from
//! an ordered candidate list. Typing goes through raw CDP key events with
//! small randomized inter-keystroke delays for human-like timing.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use chromiumoxide::{Element, Page};
use rand::distr::{Distribution, Uniform};
use tracing::{debug, info, warn};

use crate::error::SearchError;

/// Candidate query-input descriptors, most specific first.
pub const QUERY_INPUT_SELECTORS: &[&str] = &[
    "textarea[name='q']",
    "input[name='q']",
    "textarea[title='Search']",
    "textarea[aria-label='Search']",
    "input[title='Search']",
    "input[aria-label='Search']",
    "textarea",
];

/// Inter-keystroke delay bounds, milliseconds.
const KEYSTROKE_DELAY_MS: (u64, u64) = (10, 30);

/// Pause between the last keystroke and submission, milliseconds.
const SETTLE_DELAY_MS: (u64, u64) = (100, 300);

/// Returns the first input element matching a candidate descriptor.
pub async fn locate_query_input(page: &Page) -> crate::Result<Element> {
    for selector in QUERY_INPUT_SELECTORS {
        debug!("interact: probing query input selector {:?}", selector);
        if let Ok(element) = page.find_element(*selector).await {
            info!("interact: query input located via {:?}", selector);
            return Ok(element);
        }
    }
    Err(SearchError::InputNotFound)
}

/// Focuses the element, types the query with human-like timing, submits, and
/// waits for the page to settle within the caller's timeout.
pub async fn submit_query(
    page: &Page,
    element: &Element,
    text: &str,
    timeout_ms: u64,
) -> crate::Result<()> {
    element
        .click()
        .await
        .map_err(|e| SearchError::Automation(format!("query input focus failed: {}", e)))?;

    type_like_human(page, text).await?;

    // Randomized settle pause before pressing Enter.
    let pause_ms = {
        let mut rng = rand::rng();
        Uniform::new(SETTLE_DELAY_MS.0, SETTLE_DELAY_MS.1)
            .map(|d| d.sample(&mut rng))
            .unwrap_or(SETTLE_DELAY_MS.0)
    };
    tokio::time::sleep(Duration::from_millis(pause_ms)).await;

    press_enter(page).await?;
    info!("interact: query submitted ({} chars)", text.chars().count());

    wait_until_settled(page, 800, timeout_ms).await;
    Ok(())
}

/// Emits the text as one keystroke sequence with randomized 10–30 ms gaps.
async fn type_like_human(page: &Page, text: &str) -> crate::Result<()> {
    // Delays are drawn up front; the RNG handle must not live across awaits.
    let delays: Vec<u64> = {
        let mut rng = rand::rng();
        match Uniform::new(KEYSTROKE_DELAY_MS.0, KEYSTROKE_DELAY_MS.1) {
            Ok(dist) => text.chars().map(|_| dist.sample(&mut rng)).collect(),
            Err(_) => text.chars().map(|_| KEYSTROKE_DELAY_MS.0).collect(),
        }
    };

    for (c, delay_ms) in text.chars().zip(delays) {
        let key_down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .text(c.to_string())
            .build()
            .map_err(|e| SearchError::Automation(format!("key event build: {}", e)))?;
        page.execute(key_down)
            .await
            .map_err(|e| SearchError::Automation(format!("keystroke failed: {}", e)))?;

        let key_up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .build()
            .map_err(|e| SearchError::Automation(format!("key event build: {}", e)))?;
        page.execute(key_up)
            .await
            .map_err(|e| SearchError::Automation(format!("keystroke failed: {}", e)))?;

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    Ok(())
}

/// Full Enter sequence (rawKeyDown, char `\r`, keyUp) so form submission
/// triggers the same handlers a physical keyboard would.
async fn press_enter(page: &Page) -> crate::Result<()> {
    let events = [
        DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build(),
        DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text("\r")
            .build(),
        DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build(),
    ];
    for event in events {
        let params =
            event.map_err(|e| SearchError::Automation(format!("enter event build: {}", e)))?;
        page.execute(params)
            .await
            .map_err(|e| SearchError::Automation(format!("enter dispatch failed: {}", e)))?;
    }
    Ok(())
}

/// Waits until the page network goes idle (no new resource entries for
/// `quiet_ms` consecutive ms with the DOM fully loaded) or `timeout_ms`
/// elapses. A timeout is not an error; the caller proceeds with whatever has
/// rendered.
pub async fn wait_until_settled(page: &Page, quiet_ms: u64, timeout_ms: u64) {
    let poll_ms = 250u64;
    let start = std::time::Instant::now();
    let mut last_count: u64 = 0;
    let mut stable_since = std::time::Instant::now();

    loop {
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            warn!("interact: settle wait timed out after {} ms", timeout_ms);
            break;
        }

        let count: u64 = page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0);

        let ready: bool = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false);

        if !ready {
            stable_since = std::time::Instant::now();
            last_count = count;
        } else if count != last_count {
            last_count = count;
            stable_since = std::time::Instant::now();
        } else if stable_since.elapsed().as_millis() as u64 >= quiet_ms {
            debug!(
                "interact: page settled after {} ms ({} resources)",
                start.elapsed().as_millis(),
                count
            );
            break;
        }

        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_candidates_are_ordered_specific_first() {
        assert_eq!(QUERY_INPUT_SELECTORS[0], "textarea[name='q']");
        assert_eq!(
            *QUERY_INPUT_SELECTORS.last().unwrap(),
            "textarea",
            "generic fallback must come last"
        );
    }

    #[test]
    fn delay_bounds_are_sane() {
        assert!(KEYSTROKE_DELAY_MS.0 < KEYSTROKE_DELAY_MS.1);
        assert!(SETTLE_DELAY_MS.0 < SETTLE_DELAY_MS.1);
    }
}
