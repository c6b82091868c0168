//! Client layer for the hosted assistant service.
//!
//! The pipeline talks to the service only through [`AssistantApi`], so a
//! single client is built at startup and handed to every query, and tests
//! can substitute an in-memory implementation.

pub mod openai;

#[cfg(test)]
pub mod fake;

use crate::error::Result;
use crate::protocol::{Assistant, Message, Run, Thread};
use async_trait::async_trait;

pub use openai::OpenAIClient;

/// Operations the pipeline needs from the remote service.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Fetch assistant metadata; `NotFound` when the id is unknown.
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;

    /// Create a new, empty thread.
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to a thread.
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<Message>;

    /// Start a run of `assistant_id` over `thread_id`.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Ask the service to stop a run.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List the thread's messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;
}
