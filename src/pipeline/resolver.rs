//! Assistant reference resolution.

use crate::client::AssistantApi;
use crate::error::Result;
use crate::protocol::Assistant;
use tracing::{debug, warn};

/// Fetch and validate the configured assistant before any thread is created.
pub async fn resolve<C: AssistantApi + ?Sized>(client: &C, assistant_id: &str) -> Result<Assistant> {
    match client.retrieve_assistant(assistant_id).await {
        Ok(assistant) => {
            debug!(
                assistant_id = %assistant.id,
                name = assistant.name.as_deref().unwrap_or("<unnamed>"),
                "resolved assistant"
            );
            Ok(assistant)
        }
        Err(e) => {
            warn!(assistant_id, error = %e, "failed to resolve assistant");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{Call, FakeApi};
    use crate::error::RelayError;

    #[tokio::test]
    async fn test_resolve_existing_assistant() {
        let api = FakeApi::new();
        let assistant = resolve(&api, "asst_1").await.unwrap();
        assert_eq!(assistant.id, "asst_1");
        assert_eq!(api.calls(), vec![Call::RetrieveAssistant("asst_1".into())]);
    }

    #[tokio::test]
    async fn test_resolve_missing_assistant() {
        let api = FakeApi::new().without_assistant();
        let err = resolve(&api, "asst_gone").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { assistant_id } if assistant_id == "asst_gone"));
    }
}
