//! Conversation session: one fresh thread per query.

use crate::client::AssistantApi;
use crate::error::Result;
use tracing::debug;

/// A thread owned by a single pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    pub thread_id: String,
}

impl ConversationContext {
    /// Create a new, empty thread on the service.
    pub async fn create<C: AssistantApi + ?Sized>(client: &C) -> Result<Self> {
        let thread = client.create_thread().await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(Self { thread_id: thread.id })
    }

    /// Append the user's message. Callers filter out blank input.
    pub async fn append_user_message<C: AssistantApi + ?Sized>(
        &self,
        client: &C,
        text: &str,
    ) -> Result<()> {
        let message = client.create_message(&self.thread_id, text).await?;
        debug!(thread_id = %self.thread_id, message_id = %message.id, "appended user message");
        Ok(())
    }
}
