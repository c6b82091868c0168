//! Interactive prompt loop.
//!
//! Reads one line at a time, relays it through the pipeline and prints the
//! reply. One query is in flight at a time; a failed query is reported and
//! the prompt comes back.

use crate::client::AssistantApi;
use crate::error::RelayError;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const PROMPT: &str = "Enter your question (or X to exit): ";
pub const REPLY_LABEL: &str = "Response:";

/// Cancellation handle of the query currently in flight, shared with the
/// interrupt watcher.
#[derive(Debug, Clone, Default)]
pub struct ActiveQuery(Arc<Mutex<Option<CancellationToken>>>);

impl ActiveQuery {
    /// Register a new query and return its token.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    /// Mark the prompt idle again.
    pub fn finish(&self) {
        *self.slot() = None;
    }

    /// Cancel the running query. Returns `false` when there is nothing left
    /// to cancel (idle prompt, or the query was already cancelled), which
    /// callers treat as a request to quit.
    pub fn interrupt(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        // Poisoning cannot leave the slot half-written.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Forward Ctrl-C to the active query; exit with 130 on Ctrl-C at an idle
/// prompt or on a second Ctrl-C while a cancelled query winds down.
pub async fn watch_interrupts(active: ActiveQuery) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if active.interrupt() {
            warn!("interrupted, cancelling query");
            eprintln!("\nInterrupt received - cancelling query (Ctrl-C again to quit)");
        } else {
            eprintln!();
            std::process::exit(130);
        }
    }
}

/// Whether a line ends the session.
pub fn is_exit(line: &str) -> bool {
    line.to_uppercase() == "X"
}

/// Render the outcome of one query for the console.
pub fn render(outcome: &Result<String, RelayError>) -> String {
    match outcome {
        Ok(reply) => format!("{REPLY_LABEL} {reply}"),
        Err(RelayError::IncompleteRun { status, .. }) => {
            format!("{REPLY_LABEL} Run did not complete successfully (status: {status})")
        }
        Err(e) => format!("Error: {e}"),
    }
}

/// Run the prompt loop until `X` or end of input.
///
/// Each query's token is published through `active`, so an interrupt
/// abandons only that query.
pub async fn run<C, R, W>(
    pipeline: &Pipeline<'_, C>,
    input: R,
    mut output: W,
    active: &ActiveQuery,
) -> Result<()>
where
    C: AssistantApi + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            debug!("input closed");
            output.write_all(b"\n").await?;
            break;
        };
        let line = line.trim_end_matches('\r');

        if is_exit(line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let cancel = active.begin();
        let outcome = pipeline.get_reply(line, &cancel).await;
        active.finish();

        if let Err(e) = &outcome {
            if !e.is_recoverable() {
                return Err(anyhow::anyhow!("{e}"));
            }
        }

        output.write_all(render(&outcome).as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    output.flush().await?;
    Ok(())
}
