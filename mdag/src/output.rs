//! Output formatting for CLI commands.
//!
//! Every structured command builds a DTO; text mode renders it through a closure,
//! JSON mode serializes it as-is.

use anyhow::Result;
use mdag_core::{Entry, Hash, NodeKind, RootRef};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write `data` as JSON, or the text produced by `text_fn`.
    ///
    /// `text_fn` only runs in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        let mut out = self.stdout.lock();
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(out, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(out, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error to stderr, as a JSON object in JSON mode.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// JSON shapes. Errors carry `success` and `result_code`; successful commands print
// only their payload.

#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init`.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub root: String,
    pub algorithm: String,
    pub compression: String,
}

/// One root produced by `add`.
#[derive(Debug, Clone, Serialize)]
pub struct AddedObject {
    pub hash: Hash,
    pub kind: NodeKind,
    pub size: u64,
    pub path: String,
}

/// Reference written by `add --ref-name`.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceCreated {
    pub name: String,
    pub hash: Hash,
    pub kind: NodeKind,
}

/// Output for `add`.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub objects: Vec<AddedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceCreated>,
}

/// Output for `ls`.
#[derive(Debug, Serialize)]
pub struct LsOutput {
    pub root: Hash,
    pub path: String,
    pub entries: Vec<Entry>,
}

/// Reference information for `refs list`.
#[derive(Debug, Clone, Serialize)]
pub struct RefInfo {
    pub name: String,
    #[serde(flatten)]
    pub root: RootRef,
}

/// Output for `refs add`.
#[derive(Debug, Serialize)]
pub struct RefsAddOutput {
    pub name: String,
    #[serde(flatten)]
    pub root: RootRef,
}

/// Output for `refs list`.
#[derive(Debug, Serialize)]
pub struct RefsListOutput {
    pub refs: Vec<RefInfo>,
}

/// Output for `refs rm`.
#[derive(Debug, Serialize)]
pub struct RefsRmOutput {
    pub name: String,
}
