pub mod http;
pub mod proxy;

use reqwest::Client;

use crate::aggregate::Aggregator;
use crate::catalog::ModelCatalog;
use crate::config::{Config, TransportKind};
use crate::error::CombinerError;
use crate::request::PromptRequest;

use self::http::HttpDispatch;
use self::proxy::ProxyDispatch;

/// Rendered for failures of the combined and direct transports.
pub const GENERIC_ERROR: &str = "Error fetching response.";

/// A single model's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub model: String,
    pub content: String,
}

/// Transport strategy, chosen once from configuration.
pub enum Transport {
    Streaming(ProxyDispatch),
    Combined(ProxyDispatch),
    Direct {
        aggregator: Aggregator,
        models: Vec<String>,
    },
}

/// "Send prompt, get text" over whichever transport is configured.
pub struct Dispatcher {
    transport: Transport,
}

impl Dispatcher {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &Config) -> Result<Self, CombinerError> {
        let client = Client::builder().pool_max_idle_per_host(4).build()?;

        let transport = match config.transport {
            TransportKind::Streaming => Transport::Streaming(ProxyDispatch::new(
                client,
                config.backend_url.clone(),
                None,
            )),
            TransportKind::Combined => Transport::Combined(ProxyDispatch::new(
                client,
                config.backend_url.clone(),
                config.provider.api_key.clone(),
            )),
            TransportKind::Direct => {
                let api_key = config.provider.api_key.clone().ok_or_else(|| {
                    CombinerError::Config(
                        "direct transport needs an API key (set GROQ_API_KEY)".to_string(),
                    )
                })?;
                let http = HttpDispatch::new(client, config.provider.endpoint.clone(), api_key);
                Transport::Direct {
                    aggregator: Aggregator::new(
                        http,
                        ModelCatalog::new(config.display_names.clone()),
                        config.generation.clone(),
                        config.synthesis.clone(),
                        config.join_policy,
                    ),
                    models: config.models.clone(),
                }
            }
        };

        tracing::info!(transport = config.transport.as_str(), "dispatcher ready");
        Ok(Self { transport })
    }

    pub fn kind(&self) -> TransportKind {
        match &self.transport {
            Transport::Streaming(_) => TransportKind::Streaming,
            Transport::Combined(_) => TransportKind::Combined,
            Transport::Direct { .. } => TransportKind::Direct,
        }
    }

    /// Models the user can pick from: the backend's list for proxied
    /// transports, the configured catalog for direct calls.
    pub async fn list_models(&self) -> Result<Vec<String>, CombinerError> {
        match &self.transport {
            Transport::Streaming(proxy) | Transport::Combined(proxy) => proxy.list_models().await,
            Transport::Direct { models, .. } => Ok(models.clone()),
        }
    }

    pub async fn send(&self, req: &PromptRequest) -> Result<String, CombinerError> {
        match &self.transport {
            Transport::Streaming(proxy) => proxy.chat_stream(req).await,
            Transport::Combined(proxy) => proxy.generate(req).await,
            Transport::Direct { aggregator, .. } => aggregator.run(req).await,
        }
    }

    /// Text rendered in place of an answer when `send` fails.
    pub fn failure_message(&self, err: &CombinerError) -> String {
        match &self.transport {
            Transport::Streaming(_) => format!("Error fetching response: {}", err.user_message()),
            Transport::Combined(_) | Transport::Direct { .. } => GENERIC_ERROR.to_string(),
        }
    }
}
