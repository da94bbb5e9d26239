use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::CombinerError;
use crate::request::PromptRequest;

/// Rendered when `/generate` answers with a missing or empty `combined_response`.
pub const NO_RESPONSE: &str = "No response received.";

#[derive(Serialize)]
struct ChatBody<'a> {
    query: &'a str,
    models: &'a [String],
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    models: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateReply {
    combined_response: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    models: Vec<String>,
}

/// Talks to the backend proxy that owns the provider credentials.
pub struct ProxyDispatch {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ProxyDispatch {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    fn check_status(&self, response: &Response, route: &str) -> Result<(), CombinerError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CombinerError::Http {
                status: status.as_u16(),
                endpoint: self.url(route),
            })
        }
    }

    /// `GET /models`.
    pub async fn list_models(&self) -> Result<Vec<String>, CombinerError> {
        let response = self.client.get(self.url("/models")).send().await?;
        self.check_status(&response, "/models")?;
        let bytes = response.bytes().await?;
        let list: ModelList = serde_json::from_slice(&bytes)
            .map_err(|e| CombinerError::SchemaParse(format!("failed to parse model list: {e}")))?;
        Ok(list.models)
    }

    /// `POST /chat`: read the streamed body to the end, chunks in arrival order.
    pub async fn chat_stream(&self, req: &PromptRequest) -> Result<String, CombinerError> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatBody {
                query: req.prompt(),
                models: req.models(),
            })
            .send()
            .await?;
        self.check_status(&response, "/chat")?;

        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            chunks += 1;
            tracing::debug!(chunk = chunks, bytes = chunk.len(), "stream chunk");
            body.extend_from_slice(&chunk);
        }

        // Decode once so a character split across chunks survives.
        let text = String::from_utf8_lossy(&body).into_owned();
        tracing::info!(chunks, bytes = body.len(), "stream finished");
        Ok(text)
    }

    /// `POST /generate`: one JSON reply carrying the combined answer.
    pub async fn generate(&self, req: &PromptRequest) -> Result<String, CombinerError> {
        let response = self
            .client
            .post(self.url("/generate"))
            .json(&GenerateBody {
                prompt: req.prompt(),
                models: req.models(),
                api_key: self.api_key.as_deref(),
            })
            .send()
            .await?;
        self.check_status(&response, "/generate")?;

        let bytes = response.bytes().await?;
        let reply: GenerateReply = serde_json::from_slice(&bytes)
            .map_err(|e| CombinerError::SchemaParse(format!("failed to parse reply: {e}")))?;

        Ok(reply
            .combined_response
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}
