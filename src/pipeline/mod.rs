//! The request/response pipeline.
//!
//! Per query: resolve the assistant, open a fresh thread and append the
//! user's message, run the assistant and wait for it, then extract and
//! sanitize the latest assistant reply. Every stage reports failure through
//! [`RelayError`](crate::error::RelayError).

pub mod extract;
pub mod resolver;
pub mod run;
pub mod sanitize;
pub mod session;

pub use run::PollPolicy;
pub use session::ConversationContext;

use crate::client::AssistantApi;
use crate::error::{RelayError, Result};
use crate::protocol::RunStatus;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Relays single questions to one configured assistant.
pub struct Pipeline<'a, C: AssistantApi + ?Sized> {
    client: &'a C,
    assistant_id: String,
    policy: PollPolicy,
}

impl<'a, C: AssistantApi + ?Sized> Pipeline<'a, C> {
    pub fn new(client: &'a C, assistant_id: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            client,
            assistant_id: assistant_id.into(),
            policy,
        }
    }

    /// Ask one question in a brand-new thread and return the cleaned reply.
    pub async fn get_reply(&self, user_text: &str, cancel: &CancellationToken) -> Result<String> {
        let result = self.relay(user_text, cancel).await;
        if let Err(e) = &result {
            debug!(assistant_id = %self.assistant_id, error = %e, "query failed");
        }
        result
    }

    async fn relay(&self, user_text: &str, cancel: &CancellationToken) -> Result<String> {
        let assistant =
            until_cancelled(cancel, resolver::resolve(self.client, &self.assistant_id)).await?;

        let context = until_cancelled(cancel, ConversationContext::create(self.client)).await?;
        until_cancelled(cancel, context.append_user_message(self.client, user_text)).await?;

        let run = run::submit_and_await(self.client, &context, &assistant, &self.policy, cancel).await?;
        if run.status != RunStatus::Completed {
            return Err(RelayError::IncompleteRun {
                run_id: run.id,
                status: run.status,
                reason: run.last_error.map(|e| e.to_string()),
            });
        }

        let reply =
            until_cancelled(cancel, extract::extract_latest_reply(self.client, &context)).await?;
        info!(thread_id = %context.thread_id, "reply extracted");
        Ok(reply.sanitized().to_string())
    }
}

/// Drive `stage` unless the query is cancelled first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    stage: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled { run_id: None }),
        result = stage => result,
    }
}
