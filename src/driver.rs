//! Playwright browser automation over a Node.js driver subprocess.
//!
//! Rather than spawning one script per page action, a single long-lived
//! driver process owns the browser/context/page for the whole run and
//! executes commands sent as line-delimited JSON (see [`crate::protocol`]).
//! This keeps page state (the authenticated session) alive across steps
//! while the Rust side keeps per-step control and error handling.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{SmokeError, SmokeResult};
use crate::protocol::{Command, Op, Reply};

/// Extra time allowed for a driver round trip beyond the page-side timeout.
const DRIVER_GRACE: Duration = Duration::from_secs(5);

/// Deadline for operations that rely on Playwright's default 30 s
/// actionability timeout (fill, inner_text, screenshot).
const DEFAULT_OP_DEADLINE: Duration = Duration::from_secs(35);

/// A browser session the journey can drive.
///
/// [`PlaywrightSession`] is the real implementation; tests substitute a
/// scripted fake to exercise the journey's guard and teardown logic.
#[async_trait]
pub trait BrowserSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> SmokeResult<()>;
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> SmokeResult<()>;
    async fn click(&mut self, selector: &str, timeout: Duration) -> SmokeResult<()>;
    async fn fill(&mut self, selector: &str, value: &str) -> SmokeResult<()>;
    async fn inner_text(&mut self, selector: &str) -> SmokeResult<String>;
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> SmokeResult<()>;
    async fn close(&mut self) -> SmokeResult<()>;
}

/// Configuration for launching the browser.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,

    /// Timeout for the browser to launch and the driver to report ready.
    pub launch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle to the running driver process and its browser.
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,

    // Holds the generated driver script; removed when the session drops.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Launch the browser: write the driver script, spawn `node` on it, and
    /// wait for the driver's ready message.
    pub async fn launch(config: SessionConfig) -> SmokeResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(&config))?;

        debug!("Spawning Playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(script_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SmokeError::DriverStartup(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmokeError::DriverStartup("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmokeError::DriverStartup("driver stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 0,
            closed: false,
            _script_dir: script_dir,
        };

        match tokio::time::timeout(config.launch_timeout, session.read_reply()).await {
            Ok(Ok(Reply::Ready)) => {
                info!("Browser launched (headless: {})", config.headless);
                Ok(session)
            }
            Ok(Ok(other)) => Err(SmokeError::Protocol(format!(
                "expected ready from driver, got {:?}",
                other
            ))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SmokeError::DriverStartup(
                "browser did not become ready in time".to_string(),
            )),
        }
    }

    /// Check that Playwright is available before spawning the driver.
    fn check_playwright_installed() -> SmokeResult<()> {
        let output = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(SmokeError::PlaywrightNotFound),
        }
    }

    /// Read the next non-event reply, forwarding console/page-error events
    /// to the log as they arrive.
    async fn read_reply(&mut self) -> SmokeResult<Reply> {
        loop {
            let line = self
                .lines
                .next_line()
                .await?
                .ok_or_else(|| SmokeError::DriverExited("driver closed its stdout".to_string()))?;

            if line.trim().is_empty() {
                continue;
            }

            let reply: Reply = serde_json::from_str(&line)
                .map_err(|e| SmokeError::Protocol(format!("bad driver line {:?}: {}", line, e)))?;

            match reply {
                Reply::Console { text } => info!("Browser Console: {}", text),
                Reply::PageError { text } => warn!("Browser Error: {}", text),
                other => return Ok(other),
            }
        }
    }

    /// Send one command and wait for its result within `deadline`.
    async fn call(&mut self, op: Op, deadline: Duration) -> SmokeResult<Option<serde_json::Value>> {
        let op_name = op.name();
        self.next_id += 1;
        let id = self.next_id;

        let mut line = serde_json::to_string(&Command { id, op })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let wait = async {
            loop {
                match self.read_reply().await? {
                    Reply::Result { id: reply_id, ok, error, value } if reply_id == id => {
                        return if ok {
                            Ok(value)
                        } else {
                            Err(SmokeError::Page(
                                error.unwrap_or_else(|| "unknown driver error".to_string()),
                            ))
                        };
                    }
                    Reply::Result { id: reply_id, .. } => {
                        debug!("Discarding stale driver reply for command {}", reply_id);
                    }
                    Reply::Ready => {}
                    // Events are already logged inside read_reply
                    Reply::Console { .. } | Reply::PageError { .. } => {
                        debug!("Ignoring event reply while awaiting command result");
                    }
                }
            }
        };

        tokio::time::timeout(deadline, wait)
            .await
            .map_err(|_| SmokeError::Timeout(format!("driver reply to {}", op_name)))?
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> SmokeResult<()> {
        self.call(
            Op::Goto {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            timeout + DRIVER_GRACE,
        )
        .await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> SmokeResult<()> {
        self.call(
            Op::WaitForSelector {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            timeout + DRIVER_GRACE,
        )
        .await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> SmokeResult<()> {
        self.call(
            Op::Click {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            timeout + DRIVER_GRACE,
        )
        .await?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> SmokeResult<()> {
        self.call(
            Op::Fill {
                selector: selector.to_string(),
                value: value.to_string(),
            },
            DEFAULT_OP_DEADLINE,
        )
        .await?;
        Ok(())
    }

    async fn inner_text(&mut self, selector: &str) -> SmokeResult<String> {
        let value = self
            .call(
                Op::InnerText {
                    selector: selector.to_string(),
                },
                DEFAULT_OP_DEADLINE,
            )
            .await?;

        match value {
            Some(serde_json::Value::String(text)) => Ok(text),
            other => Err(SmokeError::Protocol(format!(
                "expected text from inner_text, got {:?}",
                other
            ))),
        }
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> SmokeResult<()> {
        self.call(
            Op::Screenshot {
                path: path.to_string_lossy().into_owned(),
                full_page,
            },
            DEFAULT_OP_DEADLINE,
        )
        .await?;
        Ok(())
    }

    /// Ask the driver to close the browser and exit, then reap the child.
    /// `kill_on_drop` covers the paths where this is never reached.
    async fn close(&mut self) -> SmokeResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let shutdown = self.call(Op::Close, Duration::from_secs(10)).await;

        if tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .is_err()
        {
            warn!("Driver did not exit after close, killing it");
            let _ = self.child.kill().await;
        }

        shutdown.map(|_| ())
    }
}

/// Generate the Node.js driver script for this session's configuration.
fn build_driver_script(config: &SessionConfig) -> String {
    format!(
        r#"const {{ chromium }} = require('playwright');
const readline = require('readline');

function emit(msg) {{
  process.stdout.write(JSON.stringify(msg) + '\n');
}}

(async () => {{
  const browser = await chromium.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  page.on('console', msg => emit({{ kind: 'console', text: msg.text() }}));
  page.on('pageerror', err => emit({{ kind: 'page_error', text: String(err) }}));

  emit({{ kind: 'ready' }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let cmd;
    try {{ cmd = JSON.parse(line); }} catch (err) {{ continue; }}
    try {{
      let value = null;
      switch (cmd.op) {{
        case 'goto':
          await page.goto(cmd.url, {{ timeout: cmd.timeout_ms }});
          break;
        case 'wait_for_selector':
          await page.waitForSelector(cmd.selector, {{ timeout: cmd.timeout_ms }});
          break;
        case 'click':
          await page.click(cmd.selector, {{ timeout: cmd.timeout_ms }});
          break;
        case 'fill':
          await page.fill(cmd.selector, cmd.value);
          break;
        case 'inner_text':
          value = await page.innerText(cmd.selector);
          break;
        case 'screenshot':
          await page.screenshot({{ path: cmd.path, fullPage: cmd.full_page }});
          break;
        case 'close':
          emit({{ kind: 'result', id: cmd.id, ok: true }});
          await browser.close();
          process.exit(0);
      }}
      emit({{ kind: 'result', id: cmd.id, ok: true, value }});
    }} catch (err) {{
      emit({{ kind: 'result', id: cmd.id, ok: false, error: String((err && err.message) || err) }});
    }}
  }}

  await browser.close();
}})();
"#,
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_script_reflects_config() {
        let script = build_driver_script(&SessionConfig::default());
        assert!(script.contains("headless: true"));
        assert!(script.contains("width: 1280, height: 720"));
    }

    #[test]
    fn test_driver_script_covers_all_ops() {
        let script = build_driver_script(&SessionConfig::default());
        for op in [
            "'goto'",
            "'wait_for_selector'",
            "'click'",
            "'fill'",
            "'inner_text'",
            "'screenshot'",
            "'close'",
        ] {
            assert!(script.contains(&format!("case {}:", op)), "missing {}", op);
        }
    }

    #[test]
    fn test_headed_mode() {
        let config = SessionConfig {
            headless: false,
            ..Default::default()
        };
        assert!(build_driver_script(&config).contains("headless: false"));
    }
}
