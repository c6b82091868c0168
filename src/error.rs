//! Error taxonomy for the request/response pipeline.
//!
//! Every stage returns [`Result`], so a failed query surfaces as a single
//! typed value the driver can report before prompting again.

use crate::protocol::RunStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while relaying a question to the assistant service.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network, authentication, or protocol failure talking to the service.
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The configured assistant does not exist remotely.
    #[error("assistant '{assistant_id}' not found")]
    NotFound { assistant_id: String },

    /// The conversation holds no assistant-authored message to extract.
    #[error("no assistant reply found in thread {thread_id}")]
    NoAssistantReply { thread_id: String },

    /// The run reached a terminal status other than `completed`.
    #[error("run {run_id} ended with status {status}{}", reason_suffix(.reason))]
    IncompleteRun {
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },

    /// The run was still in flight when the poll deadline expired.
    #[error("run {run_id} did not finish within {}s", .waited.as_secs())]
    Timeout { run_id: String, waited: Duration },

    /// The caller abandoned the query; `run_id` is set once a run exists.
    #[error("query cancelled{}", run_suffix(.run_id))]
    Cancelled { run_id: Option<String> },

    /// Missing or invalid startup configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Build a transport error for the named operation.
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        RelayError::Transport {
            operation,
            message: message.into(),
        }
    }

    /// Whether the interactive loop can keep going after this error.
    ///
    /// Only configuration problems are fatal; everything else aborts the
    /// current query.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RelayError::Config(_))
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

fn run_suffix(run_id: &Option<String>) -> String {
    run_id
        .as_deref()
        .map(|id| format!(" (run {id})"))
        .unwrap_or_default()
}

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, RelayError>;
