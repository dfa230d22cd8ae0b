//! Wire protocol between the Rust runner and the Node.js Playwright driver.
//!
//! Both directions are line-delimited JSON on the driver's stdin/stdout.
//! Commands carry a monotonically increasing `id`; the driver answers each
//! with a `result` reply tagged with the same id. `console` and `page_error`
//! events may arrive at any time between results.

use serde::{Deserialize, Serialize};

/// A command sent to the driver, one per line on its stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: u64,
    #[serde(flatten)]
    pub op: Op,
}

/// Page operations the driver knows how to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Goto { url: String, timeout_ms: u64 },
    WaitForSelector { selector: String, timeout_ms: u64 },
    Click { selector: String, timeout_ms: u64 },
    Fill { selector: String, value: String },
    InnerText { selector: String },
    Screenshot { path: String, full_page: bool },
    Close,
}

impl Op {
    /// Short name used in timeout diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Goto { .. } => "goto",
            Op::WaitForSelector { .. } => "wait_for_selector",
            Op::Click { .. } => "click",
            Op::Fill { .. } => "fill",
            Op::InnerText { .. } => "inner_text",
            Op::Screenshot { .. } => "screenshot",
            Op::Close => "close",
        }
    }
}

/// A reply read from the driver's stdout, one per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Browser, context and page are up; the driver accepts commands.
    Ready,

    /// Outcome of the command with the matching id.
    Result {
        id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        value: Option<serde_json::Value>,
    },

    /// An in-page `console.*` message.
    Console { text: String },

    /// An uncaught in-page error.
    PageError { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = Command {
            id: 3,
            op: Op::WaitForSelector {
                selector: "text=Market".to_string(),
                timeout_ms: 15000,
            },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"id":3,"op":"wait_for_selector","selector":"text=Market","timeout_ms":15000}"#
        );
    }

    #[test]
    fn test_parse_result_reply() {
        let line = r#"{"kind":"result","id":7,"ok":false,"error":"Timeout 5000ms exceeded"}"#;
        match serde_json::from_str::<Reply>(line).unwrap() {
            Reply::Result { id, ok, error, value } => {
                assert_eq!(id, 7);
                assert!(!ok);
                assert_eq!(error.as_deref(), Some("Timeout 5000ms exceeded"));
                assert!(value.is_none());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_parse_event_replies() {
        let console: Reply =
            serde_json::from_str(r#"{"kind":"console","text":"hydrated"}"#).unwrap();
        assert!(matches!(console, Reply::Console { text } if text == "hydrated"));

        let page_error: Reply =
            serde_json::from_str(r#"{"kind":"page_error","text":"ReferenceError: x"}"#).unwrap();
        assert!(matches!(page_error, Reply::PageError { text } if text.starts_with("ReferenceError")));

        let ready: Reply = serde_json::from_str(r#"{"kind":"ready"}"#).unwrap();
        assert!(matches!(ready, Reply::Ready));
    }

    #[test]
    fn test_parse_garbage_line_fails() {
        assert!(serde_json::from_str::<Reply>("not json").is_err());
        assert!(serde_json::from_str::<Reply>(r#"{"kind":"launch"}"#).is_err());
    }
}
