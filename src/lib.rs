//! Headless-browser smoke test for the client dashboard.
//!
//! Drives a headless Chromium instance (Playwright, via a Node.js driver
//! subprocess) through the fixed client journey: select the "Client
//! Experience" role, authenticate with the invite code, wait for the
//! dashboard, open the Market tab, and confirm the Market Overview
//! component renders. The run reports pass/fail through the log and
//! leaves a screenshot behind: `success_market_overview.png` on success,
//! `debug_market_tab.png` when the final check fails.
//!
//! Layering:
//! - [`protocol`]: line-delimited JSON messages exchanged with the driver
//! - [`driver`]: the driver subprocess and the [`driver::BrowserSession`] seam
//! - [`journey`]: the guarded step sequence and its report

pub mod driver;
pub mod error;
pub mod journey;
pub mod protocol;

pub use driver::{BrowserSession, PlaywrightSession, SessionConfig};
pub use error::{SmokeError, SmokeResult};
pub use journey::{SmokeConfig, SmokeReport};
