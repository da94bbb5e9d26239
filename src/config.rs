use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::CombinerError;

pub const DEFAULT_CONFIG_FILE: &str = "combiner.toml";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's question directly.";

/// Models offered when the provider is called directly (no backend `/models`).
pub const DEFAULT_MODELS: &[&str] = &["llama-3.3-70b-versatile", "llama3-8b-8192", "gemma2-9b-it"];

/// How a prompt reaches the models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// `POST /chat` on the backend, streamed plain-text body.
    #[default]
    Streaming,
    /// `POST /generate` on the backend, JSON `combined_response`.
    Combined,
    /// One completion call per model straight to the provider, then synthesis.
    Direct,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Combined => "combined",
            Self::Direct => "direct",
        }
    }
}

impl FromStr for TransportKind {
    type Err = CombinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "streaming" | "stream" | "chat" => Ok(Self::Streaming),
            "combined" | "generate" => Ok(Self::Combined),
            "direct" => Ok(Self::Direct),
            other => Err(CombinerError::Config(format!(
                "unknown transport '{other}' (expected streaming, combined or direct)"
            ))),
        }
    }
}

/// What happens to the fan-out when one of the per-model calls fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// First failure aborts the whole submission.
    #[default]
    AllOrNothing,
    /// Every call settles on its own; failures are shown inline.
    Settled,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PROVIDER_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Sampling parameters for the per-model calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportKind,
    pub backend_url: String,
    pub join_policy: JoinPolicy,
    pub models: Vec<String>,
    pub display_names: HashMap<String, String>,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
    pub synthesis: SynthesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            join_policy: JoinPolicy::default(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            display_names: HashMap::new(),
            provider: ProviderConfig::default(),
            generation: GenerationConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, CombinerError> {
        toml::from_str(raw).map_err(|e| CombinerError::Config(format!("invalid config: {e}")))
    }

    /// Load the config file (explicit path, or `combiner.toml` when present),
    /// then resolve it against the environment and the command-line transport.
    pub fn load(
        path: Option<&Path>,
        transport: Option<TransportKind>,
    ) -> Result<Self, CombinerError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Self::default()
                }
            }
        };
        config.resolve(|key| env::var(key).ok(), transport)
    }

    /// Environment overrides first, then the explicit transport, then
    /// validation of the final result.
    pub fn resolve<F>(
        mut self,
        lookup: F,
        transport: Option<TransportKind>,
    ) -> Result<Self, CombinerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_overrides(lookup)?;
        if let Some(transport) = transport {
            self.transport = transport;
        }
        self.validate()?;
        Ok(self)
    }

    fn from_file(path: &Path) -> Result<Self, CombinerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CombinerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CombinerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(transport) = lookup("COMBINER_TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Some(url) = lookup("COMBINER_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = lookup("COMBINER_PROVIDER_URL") {
            self.provider.endpoint = url;
        }
        if let Some(model) = lookup("COMBINER_SYNTHESIS_MODEL") {
            self.synthesis.model = model;
        }
        if let Some(key) = lookup("GROQ_API_KEY") {
            self.provider.api_key = Some(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CombinerError> {
        if self.backend_url.trim().is_empty() && self.transport != TransportKind::Direct {
            return Err(CombinerError::Config("backend_url must not be empty".to_string()));
        }
        if self.transport == TransportKind::Direct
            && self.provider.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
        {
            return Err(CombinerError::Config(
                "direct transport needs an API key (set GROQ_API_KEY)".to_string(),
            ));
        }
        validate_temperature(self.generation.temperature)?;
        validate_temperature(self.synthesis.temperature)?;
        if self.synthesis.model.trim().is_empty() {
            return Err(CombinerError::Config(
                "synthesis model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_temperature(temperature: f64) -> Result<(), CombinerError> {
    if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
        return Err(CombinerError::Config(format!(
            "temperature must be between 0 and 2, got {temperature}"
        )));
    }
    Ok(())
}
