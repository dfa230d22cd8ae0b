//! Smoke-test entry point.
//!
//! Run with the dashboard serving on localhost:5001:
//! `cargo run --release`

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dashboard_smoke::driver::{PlaywrightSession, SessionConfig};
use dashboard_smoke::journey::{self, SmokeConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut session = match PlaywrightSession::launch(SessionConfig::default()).await {
        Ok(session) => session,
        Err(e) => {
            error!("Could not launch browser: {}", e);
            return;
        }
    };

    let report = journey::run(&mut session, &SmokeConfig::default()).await;

    if report.passed {
        info!("Smoke test passed in {} ms", report.duration_ms);
    } else if let Some(stage) = report.failed_stage {
        // Failure is reported through the log and the debug screenshot;
        // the process still exits 0.
        error!("Smoke test failed at {} after {} ms", stage, report.duration_ms);
    }
}
