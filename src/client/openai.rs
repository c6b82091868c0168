//! OpenAI Assistants API client.
//!
//! Raw reqwest calls against the threads/runs/messages endpoints. Every
//! request carries the JSON content type, the bearer credential and the
//! feature-version header.

use crate::client::AssistantApi;
use crate::config::{ApiConfig, ApiKey};
use crate::error::{RelayError, Result};
use crate::protocol::{
    ApiError, Assistant, CreateMessageRequest, CreateRunRequest, ListResponse, Message, Role, Run,
    Thread,
};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const BETA_HEADER: &str = "OpenAI-Beta";

/// HTTP client for the hosted assistant service.
pub struct OpenAIClient {
    base_url: String,
    beta: String,
    /// Pre-built `Bearer` value, marked sensitive.
    authorization: HeaderValue,
    client: Client,
}

impl OpenAIClient {
    /// Create a new client from API settings and a credential.
    pub fn new(config: &ApiConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to create HTTP client: {e}")))?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
            .map_err(|_| RelayError::Config("API_KEY contains invalid header characters".into()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            beta: config.beta_header.clone(),
            authorization,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach the headers the service requires on every call.
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.authorization.clone())
            .header(BETA_HEADER, &self.beta)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| RelayError::transport(operation, connect_message(e)))?;
        debug!(operation, status = %response.status(), "response received");
        decode(operation, response).await
    }
}

/// Describe a reqwest failure without echoing request headers.
fn connect_message(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "could not connect to the assistant service".to_string()
    } else {
        err.without_url().to_string()
    }
}

async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: std::result::Result<ApiError, _> = response.json().await;
        let message = body
            .map(|e| e.error.message)
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(RelayError::transport(
            operation,
            format!("request failed with status {status}: {message}"),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| RelayError::transport(operation, format!("failed to parse response: {e}")))
}

#[async_trait]
impl AssistantApi for OpenAIClient {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        let operation = "retrieve assistant";
        let response = self
            .authorized(self.client.get(self.url(&format!("assistants/{assistant_id}"))))
            .send()
            .await
            .map_err(|e| RelayError::transport(operation, connect_message(e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound {
                assistant_id: assistant_id.to_string(),
            });
        }
        decode(operation, response).await
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.send(
            "create thread",
            self.client.post(self.url("threads")).json(&serde_json::json!({})),
        )
        .await
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        let body = CreateMessageRequest {
            role: Role::User,
            content,
        };
        self.send(
            "create message",
            self.client
                .post(self.url(&format!("threads/{thread_id}/messages")))
                .json(&body),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let body = CreateRunRequest { assistant_id };
        self.send(
            "create run",
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs")))
                .json(&body),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            "retrieve run",
            self.client
                .get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            "cancel run",
            self.client
                .post(self.url(&format!("threads/{thread_id}/runs/{run_id}/cancel"))),
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let page: ListResponse<Message> = self
            .send(
                "list messages",
                self.client
                    .get(self.url(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "desc")]),
            )
            .await?;
        Ok(page.data)
    }
}
