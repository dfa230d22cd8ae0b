//! Error types for the smoke runner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmokeError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver failed to start: {0}")]
    DriverStartup(String),

    #[error("Driver exited unexpectedly: {0}")]
    DriverExited(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("{0}")]
    Page(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SmokeResult<T> = Result<T, SmokeError>;
