//! Scripted in-memory [`AssistantApi`] for tests.
//!
//! Records every call in order so tests can assert on the exact request
//! sequence a query produces.

use crate::client::AssistantApi;
use crate::error::{RelayError, Result};
use crate::protocol::{
    Assistant, Message, MessageContent, Role, Run, RunError, RunStatus, TextContent, Thread,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const THREAD_ID: &str = "thread_fake";
pub const RUN_ID: &str = "run_fake";

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RetrieveAssistant(String),
    CreateThread,
    CreateMessage(String),
    CreateRun,
    RetrieveRun,
    CancelRun,
    ListMessages,
}

pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    assistant_exists: bool,
    statuses: Mutex<VecDeque<RunStatus>>,
    last_error: Option<RunError>,
    messages: Vec<Message>,
    failing: Option<&'static str>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            assistant_exists: true,
            statuses: Mutex::new(VecDeque::from([RunStatus::Completed])),
            last_error: None,
            messages: Vec::new(),
            failing: None,
        }
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses reported by `create_run` then each `retrieve_run`; the last
    /// one repeats forever.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..self
        }
    }

    pub fn with_last_error(self, code: &str, message: &str) -> Self {
        Self {
            last_error: Some(RunError {
                code: code.to_string(),
                message: message.to_string(),
            }),
            ..self
        }
    }

    /// Thread contents returned by `list_messages`, newest first.
    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        Self { messages, ..self }
    }

    pub fn without_assistant(self) -> Self {
        Self {
            assistant_exists: false,
            ..self
        }
    }

    /// Make the named operation fail with a transport error.
    pub fn failing(self, operation: &'static str) -> Self {
        Self {
            failing: Some(operation),
            ..self
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing == Some(operation) {
            return Err(RelayError::transport(operation, "connection reset"));
        }
        Ok(())
    }

    fn next_run(&self) -> Run {
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        let status = next.unwrap_or(RunStatus::Completed);
        run(status, self.last_error.clone())
    }
}

fn run(status: RunStatus, last_error: Option<RunError>) -> Run {
    Run {
        id: RUN_ID.to_string(),
        thread_id: THREAD_ID.to_string(),
        assistant_id: "asst_fake".to_string(),
        status,
        last_error,
    }
}

/// Build a single-part text message.
pub fn text_message(role: Role, created_at: i64, text: &str) -> Message {
    Message {
        id: format!("msg_{created_at}"),
        thread_id: THREAD_ID.to_string(),
        role,
        created_at,
        content: vec![MessageContent::Text {
            text: TextContent {
                value: text.to_string(),
            },
        }],
    }
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.record(
            Call::RetrieveAssistant(assistant_id.to_string()),
            "retrieve assistant",
        )?;
        if !self.assistant_exists {
            return Err(RelayError::NotFound {
                assistant_id: assistant_id.to_string(),
            });
        }
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: Some("Fake".to_string()),
            model: Some("gpt-4o".to_string()),
            instructions: None,
        })
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.record(Call::CreateThread, "create thread")?;
        Ok(Thread {
            id: THREAD_ID.to_string(),
            created_at: 0,
        })
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        self.record(Call::CreateMessage(content.to_string()), "create message")?;
        let mut message = text_message(Role::User, 0, content);
        message.thread_id = thread_id.to_string();
        Ok(message)
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run> {
        self.record(Call::CreateRun, "create run")?;
        Ok(self.next_run())
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
        self.record(Call::RetrieveRun, "retrieve run")?;
        Ok(self.next_run())
    }

    async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
        self.record(Call::CancelRun, "cancel run")?;
        Ok(run(RunStatus::Cancelling, None))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<Message>> {
        self.record(Call::ListMessages, "list messages")?;
        Ok(self.messages.clone())
    }
}
