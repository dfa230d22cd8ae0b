//! The fixed smoke-test journey: role selection, invite-code auth,
//! dashboard load, Market tab, Market Overview component.
//!
//! Every step is independently guarded. A failed step logs a diagnostic,
//! becomes the run's failed stage, and stops the journey; the browser
//! session is closed exactly once on every path. There are no retries:
//! each wait succeeds once within its timeout or the step fails.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::driver::BrowserSession;
use crate::error::SmokeError;

/// Address of the dashboard under test.
pub const BASE_URL: &str = "http://localhost:5001";

/// Screenshot written when the Market Overview component renders.
pub const SUCCESS_SCREENSHOT: &str = "success_market_overview.png";

/// Diagnostic screenshot written when the final check fails.
pub const DEBUG_SCREENSHOT: &str = "debug_market_tab.png";

const ROLE_SELECTOR: &str = "text=Client Experience";
const INVITE_INPUT: &str = "input#invite-code";
const INVITE_CODE: &str = "VIPACCESS";
const SUBMIT_BUTTON: &str = "button[type='submit']";
const MARKET_TAB: &str = "text=Market";
const OVERVIEW_HEADING: &str = "h2:has-text('Market Overview')";

const NAV_TIMEOUT: Duration = Duration::from_secs(10);
const ROLE_TIMEOUT: Duration = Duration::from_secs(5);
const AUTH_TIMEOUT: Duration = Duration::from_secs(5);
const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(15);
const OVERVIEW_TIMEOUT: Duration = Duration::from_secs(10);

// Playwright's default actionability timeout, used for plain clicks that
// have no spec-mandated wait of their own.
const CLICK_TIMEOUT: Duration = Duration::from_secs(30);

// Fixed pauses for UI animations.
const ENTRY_ANIMATION: Duration = Duration::from_millis(500);
const TAB_ANIMATION: Duration = Duration::from_secs(2);

// How much visible page text to log when a post-auth check fails.
const BODY_SNIPPET_CHARS: usize = 500;

/// Journey parameters. Defaults are the production constants; tests point
/// the base URL and artifact directory elsewhere.
#[derive(Debug, Clone)]
pub struct SmokeConfig {
    pub base_url: String,
    pub artifact_dir: PathBuf,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            artifact_dir: PathBuf::from("."),
        }
    }
}

/// The guarded stages of the journey, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Navigate,
    RoleSelect,
    Auth,
    DashboardWait,
    TabSwitch,
    OverviewCheck,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Navigate => "navigate",
            Stage::RoleSelect => "role_select",
            Stage::Auth => "auth",
            Stage::DashboardWait => "dashboard_wait",
            Stage::TabSwitch => "tab_switch",
            Stage::OverviewCheck => "overview_check",
        };
        f.write_str(name)
    }
}

/// Outcome of a single journey stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl StepRecord {
    fn passed(stage: Stage, started: Instant) -> Self {
        Self {
            stage,
            success: true,
            duration_ms: started.elapsed().as_millis() as u64,
            error: None,
        }
    }

    fn failed(stage: Stage, started: Instant, err: &SmokeError) -> Self {
        Self {
            stage,
            success: false,
            duration_ms: started.elapsed().as_millis() as u64,
            error: Some(err.to_string()),
        }
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeReport {
    pub passed: bool,
    pub failed_stage: Option<Stage>,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
}

/// Run the journey against `session` and always close it afterwards.
///
/// Journey failures are data, not errors: the report carries the failed
/// stage and per-step records, and the caller decides what to do with it.
pub async fn run<S>(session: &mut S, config: &SmokeConfig) -> SmokeReport
where
    S: BrowserSession + Send,
{
    let start = Instant::now();
    let mut steps = Vec::new();

    let outcome = drive(session, config, &mut steps).await;

    if let Err(e) = session.close().await {
        warn!("Error closing browser session: {}", e);
    }

    let failed_stage = outcome.err();
    SmokeReport {
        passed: failed_stage.is_none(),
        failed_stage,
        steps,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// The linear step sequence. Returns the stage that failed, if any.
async fn drive<S>(
    session: &mut S,
    config: &SmokeConfig,
    steps: &mut Vec<StepRecord>,
) -> Result<(), Stage>
where
    S: BrowserSession + Send,
{
    // Navigation is fatal: nothing below can run without the page.
    info!("Navigating to {}...", config.base_url);
    let started = Instant::now();
    if let Err(e) = session.goto(&config.base_url, NAV_TIMEOUT).await {
        error!("Error loading page: {}", e);
        steps.push(StepRecord::failed(Stage::Navigate, started, &e));
        return Err(Stage::Navigate);
    }
    steps.push(StepRecord::passed(Stage::Navigate, started));
    info!("Page loaded.");

    // Landing page: pick the client role.
    info!("Waiting for 'Client Experience' button...");
    let started = Instant::now();
    let result = async {
        session.wait_for_selector(ROLE_SELECTOR, ROLE_TIMEOUT).await?;
        session.click(ROLE_SELECTOR, CLICK_TIMEOUT).await
    }
    .await;
    if let Err(e) = result {
        error!("Failed to find/click role selector: {}", e);
        steps.push(StepRecord::failed(Stage::RoleSelect, started, &e));
        return Err(Stage::RoleSelect);
    }
    steps.push(StepRecord::passed(Stage::RoleSelect, started));
    info!("Clicked 'Client Experience'.");

    // Invite-code auth.
    info!("Waiting for Invite Code input...");
    let started = Instant::now();
    let result = async {
        session.wait_for_selector(INVITE_INPUT, AUTH_TIMEOUT).await?;
        // The auth view slides in; let it settle before typing.
        tokio::time::sleep(ENTRY_ANIMATION).await;
        session.fill(INVITE_INPUT, INVITE_CODE).await?;
        info!("Entered invite code.");
        session.click(SUBMIT_BUTTON, CLICK_TIMEOUT).await
    }
    .await;
    if let Err(e) = result {
        error!("Failed during auth: {}", e);
        steps.push(StepRecord::failed(Stage::Auth, started, &e));
        return Err(Stage::Auth);
    }
    steps.push(StepRecord::passed(Stage::Auth, started));
    info!("Clicked Enter.");

    // Dashboard: the 'Market' tab text confirms the post-auth view rendered.
    info!("Waiting for dashboard...");
    let started = Instant::now();
    if let Err(e) = session.wait_for_selector(MARKET_TAB, DASHBOARD_TIMEOUT).await {
        error!("Failed to load dashboard: {}", e);
        log_body_snippet(session).await;
        steps.push(StepRecord::failed(Stage::DashboardWait, started, &e));
        return Err(Stage::DashboardWait);
    }
    steps.push(StepRecord::passed(Stage::DashboardWait, started));
    info!("Dashboard loaded (found 'Market' tab text).");

    // Switch to the Market tab.
    info!("Clicking 'Market' tab...");
    let started = Instant::now();
    if let Err(e) = session.click(MARKET_TAB, CLICK_TIMEOUT).await {
        error!("Failed to switch tabs: {}", e);
        steps.push(StepRecord::failed(Stage::TabSwitch, started, &e));
        return Err(Stage::TabSwitch);
    }
    tokio::time::sleep(TAB_ANIMATION).await;
    steps.push(StepRecord::passed(Stage::TabSwitch, started));

    // Final check: the Market Overview heading.
    info!("Waiting for 'Market Overview' component...");
    let started = Instant::now();
    match session.wait_for_selector(OVERVIEW_HEADING, OVERVIEW_TIMEOUT).await {
        Ok(()) => {
            info!("SUCCESS: Found 'Market Overview'.");
            let path = config.artifact_dir.join(SUCCESS_SCREENSHOT);
            if let Err(e) = session.screenshot(&path, true).await {
                warn!("Failed to capture success screenshot: {}", e);
            }
            steps.push(StepRecord::passed(Stage::OverviewCheck, started));
            Ok(())
        }
        Err(e) => {
            error!("FAILED: Could not find 'Market Overview'.");
            log_body_snippet(session).await;
            let path = config.artifact_dir.join(DEBUG_SCREENSHOT);
            if let Err(shot_err) = session.screenshot(&path, false).await {
                warn!("Failed to capture debug screenshot: {}", shot_err);
            }
            steps.push(StepRecord::failed(Stage::OverviewCheck, started, &e));
            Err(Stage::OverviewCheck)
        }
    }
}

/// Log a truncated view of the page's visible text for diagnosis.
async fn log_body_snippet<S>(session: &mut S)
where
    S: BrowserSession + Send,
{
    match session.inner_text("body").await {
        Ok(text) => {
            info!("Body text content (truncated):");
            info!("{}", truncate_chars(&text, BODY_SNIPPET_CHARS));
        }
        Err(e) => warn!("Could not read page body text: {}", e),
    }
}

/// Truncate to at most `limit` characters, never splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_chars("hello", 500), "hello");
        assert_eq!(truncate_chars("", 500), "");
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "x".repeat(600);
        assert_eq!(truncate_chars(&text, 500).len(), 500);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let snippet = truncate_chars(&text, 5);
        assert_eq!(snippet.chars().count(), 5);
        assert_eq!(snippet, "ééééé");
    }

    #[test]
    fn test_default_config_targets_local_dashboard() {
        let config = SmokeConfig::default();
        assert_eq!(config.base_url, "http://localhost:5001");
        assert_eq!(config.artifact_dir, PathBuf::from("."));
    }

    #[test]
    fn test_step_record_serializes_stage_names() {
        let record = StepRecord {
            stage: Stage::DashboardWait,
            success: false,
            duration_ms: 15000,
            error: Some("Timeout 15000ms exceeded".to_string()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""stage":"dashboard_wait""#));
    }
}
