use std::time::Instant;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{CombinerError, ValidationError};
use crate::request::PromptRequest;
use crate::surface::{LoadingGuard, Surface};

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Rejected before any network call; an alert was shown.
    Rejected(ValidationError),
    /// The answer was rendered.
    Completed(String),
    /// An error message was rendered in place of the answer.
    Failed(String),
}

impl Submission {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// The submit handler: validate, dispatch, render.
pub struct Session {
    dispatcher: Dispatcher,
}

impl Session {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn from_config(config: &Config) -> Result<Self, CombinerError> {
        Ok(Self::new(Dispatcher::from_config(config)?))
    }

    pub async fn available_models(&self) -> Result<Vec<String>, CombinerError> {
        self.dispatcher.list_models().await
    }

    pub async fn submit<S: Surface + ?Sized>(
        &self,
        surface: &S,
        prompt: &str,
        models: &[String],
    ) -> Submission {
        let req = match PromptRequest::new(prompt, models) {
            Ok(req) => req,
            Err(e) => {
                surface.alert(&e.to_string());
                return Submission::Rejected(e);
            }
        };

        surface.clear();
        let _loading = LoadingGuard::show(surface);
        let start = Instant::now();
        tracing::info!(
            transport = self.dispatcher.kind().as_str(),
            models = ?req.models(),
            "dispatching prompt"
        );

        match self.dispatcher.send(&req).await {
            Ok(text) => {
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    bytes = text.len(),
                    "submission completed"
                );
                surface.render(&text);
                Submission::Completed(text)
            }
            Err(e) => {
                tracing::error!("submission failed: {e}");
                let message = self.dispatcher.failure_message(&e);
                surface.render(&message);
                Submission::Failed(message)
            }
        }
    }
}
