use std::collections::HashMap;

/// Human-readable names for models commonly served by Groq.
const KNOWN_MODELS: &[(&str, &str)] = &[
    ("llama-3.3-70b-versatile", "Llama 3.3 70B Versatile"),
    ("llama-3.1-8b-instant", "Llama 3.1 8B Instant"),
    ("llama3-70b-8192", "Llama 3 70B"),
    ("llama3-8b-8192", "Llama 3 8B"),
    ("gemma2-9b-it", "Gemma 2 9B"),
    ("mixtral-8x7b-32768", "Mixtral 8x7B"),
    ("deepseek-r1-distill-llama-70b", "DeepSeek R1 Distill Llama 70B"),
    ("qwen-qwq-32b", "Qwen QwQ 32B"),
];

/// Resolves model ids to display names. Configured names win over built-ins;
/// unknown ids display as themselves.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    overrides: HashMap<String, String>,
}

impl ModelCatalog {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn display_name<'a>(&'a self, model_id: &'a str) -> &'a str {
        if let Some(name) = self.overrides.get(model_id) {
            return name;
        }
        KNOWN_MODELS
            .iter()
            .find(|(id, _)| *id == model_id)
            .map(|(_, name)| *name)
            .unwrap_or(model_id)
    }
}
