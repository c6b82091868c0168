//! Run orchestration: start a run and wait for it to leave the in-flight
//! states.
//!
//! Polling backs off exponentially up to `max_interval` and gives up after
//! `max_wait`. A cancellation token lets the caller abandon a hung run; in
//! both cases the run is cancelled remotely on a best-effort basis.

use crate::client::AssistantApi;
use crate::error::{RelayError, Result};
use crate::pipeline::session::ConversationContext;
use crate::protocol::{Assistant, Run};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often and how long to poll a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub max_wait: Duration,
}

impl PollPolicy {
    /// Delay to use after `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor >= 1.0 {
            self.backoff_factor
        } else {
            1.0
        };
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// Start a run and block until it reaches a terminal status.
///
/// Returns the finished run whatever its terminal status; telling
/// `completed` apart from the failure statuses is up to the caller.
pub async fn submit_and_await<C: AssistantApi + ?Sized>(
    client: &C,
    context: &ConversationContext,
    assistant: &Assistant,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Run> {
    if cancel.is_cancelled() {
        return Err(RelayError::Cancelled { run_id: None });
    }

    let thread_id = context.thread_id.as_str();
    let mut run = client.create_run(thread_id, &assistant.id).await?;
    info!(thread_id, run_id = %run.id, status = %run.status, "run started");

    // A wait too long to represent never expires.
    let deadline = Instant::now().checked_add(policy.max_wait);
    let mut interval = policy.initial_interval.min(policy.max_interval);

    while !run.status.is_terminal() {
        let now = Instant::now();
        let sleep = match deadline {
            Some(deadline) if now >= deadline => {
                warn!(run_id = %run.id, waited = ?policy.max_wait, "run timed out");
                abandon(client, &run).await;
                return Err(RelayError::Timeout {
                    run_id: run.id,
                    waited: policy.max_wait,
                });
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(run_id = %run.id, "run cancelled by caller");
                abandon(client, &run).await;
                return Err(RelayError::Cancelled { run_id: Some(run.id) });
            }
            _ = tokio::time::sleep(sleep) => {}
        }

        run = client.retrieve_run(thread_id, &run.id).await?;
        debug!(run_id = %run.id, status = %run.status, "polled run");
        interval = policy.next_interval(interval);
    }

    info!(run_id = %run.id, status = %run.status, "run finished");
    Ok(run)
}

/// Best-effort remote cancellation of a run we stopped waiting for.
async fn abandon<C: AssistantApi + ?Sized>(client: &C, run: &Run) {
    if let Err(e) = client.cancel_run(&run.thread_id, &run.id).await {
        warn!(run_id = %run.id, error = %e, "failed to cancel run");
    }
}
