//! Extraction of the assistant's latest reply from a thread.

use crate::client::AssistantApi;
use crate::error::{RelayError, Result};
use crate::pipeline::sanitize::sanitize;
use crate::pipeline::session::ConversationContext;
use crate::protocol::{Message, MessageContent, Role};
use std::fmt;
use tracing::debug;

/// The first content part of the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// A non-text payload, described by kind and reference.
    NonText { kind: &'static str, reference: String },
}

impl Reply {
    /// Remove citation markers from text replies; other kinds pass through.
    pub fn sanitized(self) -> Self {
        match self {
            Reply::Text(text) => Reply::Text(sanitize(&text)),
            other => other,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.write_str(text),
            Reply::NonText { kind, reference } => write!(f, "[{kind}: {reference}]"),
        }
    }
}

/// Pick the most recent assistant-authored message.
///
/// Newest `created_at` wins; on ties the message the service listed first
/// wins, since listings are requested newest first.
pub fn latest_assistant_message(messages: &[Message]) -> Option<&Message> {
    messages
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .reduce(|best, m| if m.created_at > best.created_at { m } else { best })
}

fn first_part(message: &Message) -> Option<Reply> {
    message.content.first().map(|part| match part {
        MessageContent::Text { text } => Reply::Text(text.value.clone()),
        MessageContent::ImageFile { image_file } => Reply::NonText {
            kind: "image_file",
            reference: image_file.file_id.clone(),
        },
        MessageContent::ImageUrl { image_url } => Reply::NonText {
            kind: "image_url",
            reference: image_url.url.clone(),
        },
        MessageContent::Unsupported => Reply::NonText {
            kind: "unsupported",
            reference: message.id.clone(),
        },
    })
}

/// List the thread and return the first part of the latest assistant message.
pub async fn extract_latest_reply<C: AssistantApi + ?Sized>(
    client: &C,
    context: &ConversationContext,
) -> Result<Reply> {
    let messages = client.list_messages(&context.thread_id).await?;
    debug!(thread_id = %context.thread_id, count = messages.len(), "listed messages");

    latest_assistant_message(&messages)
        .and_then(first_part)
        .ok_or_else(|| RelayError::NoAssistantReply {
            thread_id: context.thread_id.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{text_message, FakeApi, THREAD_ID};
    use crate::protocol::ImageFile;

    fn context() -> ConversationContext {
        ConversationContext {
            thread_id: THREAD_ID.to_string(),
        }
    }

    #[test]
    fn test_latest_assistant_message_ignores_users() {
        let messages = vec![
            text_message(Role::User, 30, "newest but user"),
            text_message(Role::Assistant, 20, "latest reply"),
            text_message(Role::Assistant, 10, "older reply"),
        ];
        let latest = latest_assistant_message(&messages).unwrap();
        assert_eq!(latest.created_at, 20);
    }

    #[test]
    fn test_latest_assistant_message_in_ascending_listing() {
        let messages = vec![
            text_message(Role::Assistant, 10, "older reply"),
            text_message(Role::User, 15, "question"),
            text_message(Role::Assistant, 20, "latest reply"),
        ];
        assert_eq!(latest_assistant_message(&messages).unwrap().created_at, 20);
    }

    #[test]
    fn test_tie_prefers_service_order() {
        let mut first = text_message(Role::Assistant, 10, "first");
        first.id = "msg_a".to_string();
        let mut second = text_message(Role::Assistant, 10, "second");
        second.id = "msg_b".to_string();
        let messages = vec![first, second];
        assert_eq!(latest_assistant_message(&messages).unwrap().id, "msg_a");
    }

    #[tokio::test]
    async fn test_extract_then_sanitize() {
        let api = FakeApi::new().with_messages(vec![
            text_message(Role::Assistant, 2, "【0:1†source】hello"),
            text_message(Role::User, 1, "hi"),
        ]);
        let reply = extract_latest_reply(&api, &context()).await.unwrap();
        assert_eq!(reply.sanitized().to_string(), "hello");
    }

    #[tokio::test]
    async fn test_no_assistant_message_is_typed_error() {
        let api = FakeApi::new().with_messages(vec![text_message(Role::User, 1, "hi")]);
        let err = extract_latest_reply(&api, &context()).await.unwrap_err();
        assert!(matches!(err, RelayError::NoAssistantReply { thread_id } if thread_id == THREAD_ID));
    }

    #[tokio::test]
    async fn test_empty_assistant_message_is_typed_error() {
        let mut empty = text_message(Role::Assistant, 2, "");
        empty.content.clear();
        let api = FakeApi::new().with_messages(vec![empty]);
        let err = extract_latest_reply(&api, &context()).await.unwrap_err();
        assert!(matches!(err, RelayError::NoAssistantReply { .. }));
    }

    #[test]
    fn test_non_text_reply_passes_through() {
        let mut message = text_message(Role::Assistant, 1, "");
        message.content = vec![MessageContent::ImageFile {
            image_file: ImageFile {
                file_id: "file_【1:1†source】".to_string(),
            },
        }];
        let reply = first_part(&message).unwrap().sanitized();
        assert_eq!(reply.to_string(), "[image_file: file_【1:1†source】]");
    }
}
