use std::collections::HashSet;

use crate::error::ValidationError;

/// A validated submission: non-blank prompt and at least one model, in
/// selection order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    prompt: String,
    models: Vec<String>,
}

impl PromptRequest {
    /// Check the raw inputs. The prompt is checked before the model selection.
    pub fn new(prompt: &str, models: &[String]) -> Result<Self, ValidationError> {
        if prompt.trim().is_empty() {
            return Err(ValidationError::PromptRequired);
        }

        let mut seen = HashSet::new();
        let models: Vec<String> = models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .filter(|m| seen.insert(*m))
            .map(str::to_string)
            .collect();

        if models.is_empty() {
            return Err(ValidationError::ModelRequired);
        }

        Ok(Self {
            prompt: prompt.to_string(),
            models,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_multi_model(&self) -> bool {
        self.models.len() > 1
    }

    /// Build a request without validation, for exercising the dispatch guards.
    #[cfg(test)]
    pub(crate) fn unchecked(prompt: &str, models: &[&str]) -> Self {
        Self {
            prompt: prompt.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }
}
