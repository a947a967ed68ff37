//! The retrieval orchestrator.
//!
//! Owns the search lifecycle end to end: working profile (fingerprint +
//! pinned provider domain), session launch, the headless→headed escalation
//! state machine, query submission, extraction, and state persistence.
//!
//! Escalation is an explicit finite state machine driven by an iterative
//! loop, never recursion. A search launches a replacement browser session at
//! most once: a challenge seen while headless escalates to the headed
//! fallback; a challenge seen while already headed suspends and waits for
//! manual resolution, bounded by twice the caller's timeout.

use std::time::{Duration, Instant};

use chromiumoxide::Page;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::browser::session::{current_url, navigate, BrowserSession};
use crate::challenge;
use crate::core::types::{
    FingerprintProfile, SearchOptions, SearchQuery, SearchResponse, SearchResult,
};
use crate::error::SearchError;
use crate::extract;
use crate::fingerprint::{self, HostSignals};
use crate::interact;
use crate::state_store;

/// Candidate provider entry points. One is drawn uniformly at random on the
/// first run against a state file, then pinned for every later run.
pub const PROVIDER_DOMAINS: &[&str] = &[
    "https://www.google.com",
    "https://www.google.co.uk",
    "https://www.google.ca",
    "https://www.google.com.au",
];

// ─────────────────────────────────────────────────────────────────────────────
// Escalation state machine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    HeadlessAttempt,
    HeadedFallback,
    VerifiedContinue,
    Success,
    Failed,
}

/// The three gates where challenge detection runs. Each is an independent
/// decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    AfterNavigation,
    AfterSubmit,
    BeforeExtraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeSignal {
    Clear,
    Blocked,
}

/// The transition table, pure and independently testable.
///
/// The only edge that launches a replacement browser session is
/// `HeadlessAttempt --Blocked--> HeadedFallback`; a blocked signal in any
/// headed state waits in place rather than re-escalating.
pub fn next_state(state: EscalationState, signal: ChallengeSignal) -> EscalationState {
    use ChallengeSignal::*;
    use EscalationState::*;
    match (state, signal) {
        (HeadlessAttempt, Blocked) => HeadedFallback,
        (HeadlessAttempt, Clear) => HeadlessAttempt,
        (HeadedFallback, Blocked) => HeadedFallback,
        (HeadedFallback, Clear) => VerifiedContinue,
        (VerifiedContinue, Blocked) => HeadedFallback,
        (VerifiedContinue, Clear) => VerifiedContinue,
        (terminal @ (Success | Failed), _) => terminal,
    }
}

fn log_state(state: EscalationState) {
    info!("engine: escalation_state={:?}", state);
}

/// Internal attempt outcome: either a hard error, or a request to escalate
/// raised by a checkpoint that saw a challenge while headless.
enum AttemptError {
    Escalate(Checkpoint),
    Fatal(SearchError),
}

impl From<SearchError> for AttemptError {
    fn from(e: SearchError) -> Self {
        AttemptError::Fatal(e)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

pub struct SearchEngine {
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn with_defaults() -> Self {
        Self::new(SearchOptions::default())
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Runs one search in an engine-owned browser session.
    ///
    /// Never returns an error: any unrecoverable failure is folded into the
    /// synthetic failed-result response so callers always get a
    /// [`SearchResponse`] to act on.
    pub async fn search(&self, query: &SearchQuery) -> SearchResponse {
        self.search_inner(query, None).await
    }

    /// Like [`search`](Self::search), but reuses a caller-supplied session for
    /// the first attempt. The supplied session is never closed and never
    /// repurposed: if escalation fires, a brand-new engine-owned headed
    /// session is launched instead.
    pub async fn search_with_session(
        &self,
        query: &SearchQuery,
        session: &BrowserSession,
    ) -> SearchResponse {
        self.search_inner(query, Some(session)).await
    }

    async fn search_inner(
        &self,
        query: &SearchQuery,
        external: Option<&BrowserSession>,
    ) -> SearchResponse {
        if query.text.trim().is_empty() {
            return SearchResponse::failure(&query.text, "query text must not be empty");
        }
        if query.result_limit == 0 {
            return SearchResponse::failure(&query.text, "result limit must be greater than zero");
        }

        match self.run(query, external).await {
            Ok(results) => {
                log_state(EscalationState::Success);
                SearchResponse {
                    query: query.text.clone(),
                    results,
                }
            }
            Err(e) => {
                log_state(EscalationState::Failed);
                warn!("engine: search failed: {}", e);
                SearchResponse::failure(&query.text, &e.to_string())
            }
        }
    }

    async fn run(
        &self,
        query: &SearchQuery,
        external: Option<&BrowserSession>,
    ) -> crate::Result<Vec<SearchResult>> {
        let mut state = state_store::load(&self.options.state_file);

        let fingerprint = match state.fingerprint.clone() {
            Some(fp) => {
                info!(
                    "engine: reusing pinned fingerprint ({} / {})",
                    fp.locale, fp.timezone_id
                );
                fp
            }
            None => {
                let fp = fingerprint::synthesize(&HostSignals::capture(), query.locale.as_deref());
                info!(
                    "engine: synthesized fingerprint ({} / {} / {})",
                    fp.locale,
                    fp.timezone_id,
                    fp.color_scheme.as_str()
                );
                fp
            }
        };
        state.fingerprint = Some(fingerprint.clone());

        let provider_domain = match state.selected_provider_domain.clone() {
            Some(domain) => {
                info!("engine: reusing pinned provider domain {}", domain);
                domain
            }
            None => {
                let domain = PROVIDER_DOMAINS
                    .choose(&mut rand::rng())
                    .copied()
                    .unwrap_or(PROVIDER_DOMAINS[0])
                    .to_string();
                info!("engine: selected provider domain {}", domain);
                domain
            }
        };
        state.selected_provider_domain = Some(provider_domain.clone());

        let outcome = self
            .drive(query, &fingerprint, &provider_domain, external)
            .await;

        // Persist the working profile on success and failure alike;
        // persistence problems never change the outcome.
        if self.options.persist_state {
            if let Err(e) = state_store::save(&self.options.state_file, &state) {
                warn!("engine: {}", e);
            }
        }

        outcome
    }

    /// The iterative escalation driver.
    async fn drive(
        &self,
        query: &SearchQuery,
        fingerprint: &FingerprintProfile,
        provider_domain: &str,
        external: Option<&BrowserSession>,
    ) -> crate::Result<Vec<SearchResult>> {
        let op_timeout = Duration::from_millis(query.timeout_ms);
        let long_timeout = op_timeout * 2;

        // Headless by default; the deprecated legacy flag only matters when
        // it explicitly asks for a visible window.
        let mut fsm = if self.options.headless == Some(false) {
            EscalationState::HeadedFallback
        } else {
            EscalationState::HeadlessAttempt
        };
        log_state(fsm);

        let mut escalated = false;

        loop {
            let headless = matches!(fsm, EscalationState::HeadlessAttempt);

            let mut owned: Option<BrowserSession> = None;
            let session: &BrowserSession = if let (Some(supplied), false) = (external, escalated) {
                debug!("engine: using caller-supplied session for this attempt");
                supplied
            } else {
                owned.insert(BrowserSession::launch(headless, long_timeout).await?)
            };

            let attempt = self
                .attempt(query, fingerprint, provider_domain, session, headless, op_timeout, long_timeout)
                .await;

            if let Some(session) = owned.take() {
                session.close().await;
            }

            match attempt {
                Ok(results) => return Ok(results),
                Err(AttemptError::Escalate(checkpoint)) => {
                    info!(
                        "engine: challenge at {:?} while headless; escalating to headed fallback",
                        checkpoint
                    );
                    escalated = true;
                    fsm = next_state(EscalationState::HeadlessAttempt, ChallengeSignal::Blocked);
                    log_state(fsm);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }
    }

    /// One full pass: page, cookies, navigation, checkpoints, interaction,
    /// extraction. Cookie persistence runs on every exit path.
    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        query: &SearchQuery,
        fingerprint: &FingerprintProfile,
        provider_domain: &str,
        session: &BrowserSession,
        headless: bool,
        op_timeout: Duration,
        long_timeout: Duration,
    ) -> Result<Vec<SearchResult>, AttemptError> {
        let page = session.new_page(fingerprint).await?;

        let result = self
            .attempt_on_page(&page, query, provider_domain, headless, op_timeout, long_timeout)
            .await;

        if self.options.persist_state {
            let cookies = state_store::capture_cookies(&page).await;
            if !cookies.is_empty() {
                if let Err(e) = state_store::save_cookies(&self.options.state_file, &cookies) {
                    warn!("engine: {}", e);
                }
            }
        }

        if let Err(e) = page.close().await {
            debug!("engine: page close error (non-fatal): {}", e);
        }

        result
    }

    async fn attempt_on_page(
        &self,
        page: &Page,
        query: &SearchQuery,
        provider_domain: &str,
        headless: bool,
        op_timeout: Duration,
        long_timeout: Duration,
    ) -> Result<Vec<SearchResult>, AttemptError> {
        if let Some(cookies) = state_store::load_cookies(&self.options.state_file) {
            state_store::inject_cookies(page, &cookies).await;
        }

        navigate(page, provider_domain, op_timeout).await?;
        interact::wait_until_settled(page, 800, query.timeout_ms).await;
        self.checkpoint(page, Checkpoint::AfterNavigation, headless, long_timeout)
            .await?;

        let input = interact::locate_query_input(page).await?;
        interact::submit_query(page, &input, &query.text, query.timeout_ms).await?;
        self.checkpoint(page, Checkpoint::AfterSubmit, headless, long_timeout)
            .await?;

        self.checkpoint(page, Checkpoint::BeforeExtraction, headless, long_timeout)
            .await?;

        wait_for_result_elements(page, op_timeout).await;

        let html = page
            .content()
            .await
            .map_err(|e| SearchError::Automation(format!("page snapshot failed: {}", e)))?;

        let results = extract::extract(&html, provider_domain, query.result_limit);
        if results.is_empty() {
            return Err(SearchError::ExtractionEmpty.into());
        }
        Ok(results)
    }

    /// One challenge gate. Blocked while headless raises the escalation
    /// request; blocked while headed suspends until the page leaves every
    /// blocked-URL pattern or the doubled timeout expires.
    async fn checkpoint(
        &self,
        page: &Page,
        checkpoint: Checkpoint,
        headless: bool,
        wait_bound: Duration,
    ) -> Result<(), AttemptError> {
        let current = current_url(page).await.unwrap_or_default();
        let response_url: Option<String> = page
            .evaluate("document.location.href")
            .await
            .ok()
            .and_then(|v| v.into_value::<String>().ok());

        if !challenge::is_blocked(&current, response_url.as_deref()) {
            debug!("engine: checkpoint {:?} clear", checkpoint);
            return Ok(());
        }

        warn!(
            "engine: verification challenge detected at {:?} ({})",
            checkpoint, current
        );

        if headless {
            return Err(AttemptError::Escalate(checkpoint));
        }

        log_state(next_state(
            EscalationState::HeadedFallback,
            ChallengeSignal::Blocked,
        ));
        self.wait_for_challenge_resolution(page, wait_bound)
            .await
            .map_err(AttemptError::Fatal)?;
        log_state(next_state(
            EscalationState::HeadedFallback,
            ChallengeSignal::Clear,
        ));
        Ok(())
    }

    async fn wait_for_challenge_resolution(
        &self,
        page: &Page,
        bound: Duration,
    ) -> crate::Result<()> {
        info!(
            "engine: waiting up to {} ms for manual challenge resolution",
            bound.as_millis()
        );
        let start = Instant::now();
        loop {
            if start.elapsed() >= bound {
                return Err(SearchError::ChallengeUnresolved {
                    waited_ms: bound.as_millis() as u64,
                });
            }

            let current = current_url(page).await.unwrap_or_default();
            if !current.is_empty() && !challenge::is_blocked(&current, None) {
                info!(
                    "engine: challenge cleared after {} ms",
                    start.elapsed().as_millis()
                );
                return Ok(());
            }

            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

/// Polls for any known result container before the HTML snapshot. A timeout
/// is only logged; the extractor's fallback still gets its chance.
async fn wait_for_result_elements(page: &Page, timeout: Duration) {
    let start = Instant::now();
    loop {
        if start.elapsed() >= timeout {
            warn!(
                "engine: no result containers appeared within {} ms",
                timeout.as_millis()
            );
            return;
        }

        let present = page
            .evaluate("!!document.querySelector('#search, #rso, .g, div[data-hveid]')")
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .unwrap_or(false);
        if present {
            return;
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_challenge_escalates_exactly_once() {
        let escalated = next_state(EscalationState::HeadlessAttempt, ChallengeSignal::Blocked);
        assert_eq!(escalated, EscalationState::HeadedFallback);

        // A persistent challenge after the fallback waits in place; it must
        // never route back through a session-launching edge.
        assert_eq!(
            next_state(EscalationState::HeadedFallback, ChallengeSignal::Blocked),
            EscalationState::HeadedFallback
        );
        assert_eq!(
            next_state(EscalationState::VerifiedContinue, ChallengeSignal::Blocked),
            EscalationState::HeadedFallback
        );
    }

    #[test]
    fn headed_clear_verifies() {
        assert_eq!(
            next_state(EscalationState::HeadedFallback, ChallengeSignal::Clear),
            EscalationState::VerifiedContinue
        );
    }

    #[test]
    fn terminal_states_absorb() {
        for signal in [ChallengeSignal::Clear, ChallengeSignal::Blocked] {
            assert_eq!(
                next_state(EscalationState::Success, signal),
                EscalationState::Success
            );
            assert_eq!(
                next_state(EscalationState::Failed, signal),
                EscalationState::Failed
            );
        }
    }

    #[test]
    fn provider_domains_are_https_provider_hosts() {
        assert!(!PROVIDER_DOMAINS.is_empty());
        for domain in PROVIDER_DOMAINS {
            assert!(domain.starts_with("https://www.google."));
        }
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_a_browser() {
        let engine = SearchEngine::with_defaults();
        let response = engine.search(&SearchQuery::new("   ")).await;
        assert!(response.is_failure());
        assert!(response.results[0].snippet.contains("must not be empty"));
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_without_a_browser() {
        let engine = SearchEngine::with_defaults();
        let response = engine.search(&SearchQuery::new("rust").with_limit(0)).await;
        assert!(response.is_failure());
        assert!(response.results[0].snippet.contains("greater than zero"));
    }
}
