use reqwest::Client;
use serde::Deserialize;

use crate::dispatch::ModelResponse;
use crate::error::CombinerError;

/// One chat-completion call against an OpenAI-compatible provider.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// Direct provider dispatch, authenticated with a bearer key.
pub struct HttpDispatch {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl HttpDispatch {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn query_model(
        &self,
        req: CompletionRequest<'_>,
    ) -> Result<ModelResponse, CombinerError> {
        let body = serde_json::json!({
            "model": req.model,
            "messages": [
                {"role": "system", "content": req.system_prompt},
                {"role": "user", "content": req.prompt},
            ],
            "temperature": req.temperature,
            "max_tokens": req.max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(model = req.model, %status, "provider rejected request");
            return Err(CombinerError::Http {
                status: status.as_u16(),
                endpoint: self.endpoint.clone(),
            });
        }

        let bytes = response.bytes().await?;
        let completion: ChatCompletion = serde_json::from_slice(&bytes)
            .map_err(|e| CombinerError::SchemaParse(format!("failed to parse completion: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CombinerError::EmptyCompletion {
                model: req.model.to_string(),
            })?;

        tracing::debug!(model = req.model, bytes = content.len(), "model answered");

        Ok(ModelResponse {
            model: req.model.to_string(),
            content,
        })
    }
}
