use std::fmt::Write as _;

use futures_util::future::{join_all, try_join_all};

use crate::catalog::ModelCatalog;
use crate::config::{GenerationConfig, JoinPolicy, SynthesisConfig};
use crate::dispatch::ModelResponse;
use crate::dispatch::http::{CompletionRequest, HttpDispatch};
use crate::error::{CombinerError, ValidationError};
use crate::request::PromptRequest;

pub const SYNTHESIS_HEADER: &str = "=== Synthesized answer ===";

/// Appended under the synthesis header when the combining call fails.
pub const SYNTHESIS_FAILED: &str =
    "[synthesis failed: the combining model did not return an answer]";

const SYNTHESIS_SYSTEM_PROMPT: &str =
    "You are an expert at synthesizing information from several AI assistants.";

/// Per-model result after the join. `Err` holds the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutcome {
    pub model: String,
    pub result: Result<String, String>,
}

/// Fans a prompt out to every selected model and merges the answers.
pub struct Aggregator {
    http: HttpDispatch,
    catalog: ModelCatalog,
    generation: GenerationConfig,
    synthesis: SynthesisConfig,
    join_policy: JoinPolicy,
}

impl Aggregator {
    pub fn new(
        http: HttpDispatch,
        catalog: ModelCatalog,
        generation: GenerationConfig,
        synthesis: SynthesisConfig,
        join_policy: JoinPolicy,
    ) -> Self {
        Self {
            http,
            catalog,
            generation,
            synthesis,
            join_policy,
        }
    }

    pub async fn run(&self, req: &PromptRequest) -> Result<String, CombinerError> {
        match req.models() {
            [] => return Err(ValidationError::ModelRequired.into()),
            [model] => {
                let response = self
                    .http
                    .query_model(self.completion(model, req.prompt()))
                    .await?;
                return Ok(response.content);
            }
            _ => {}
        }

        let outcomes = self.fan_out(req).await?;
        let mut output = format_sections(&self.catalog, &outcomes);

        let answers: Vec<ModelResponse> = outcomes
            .into_iter()
            .filter_map(|o| {
                o.result.ok().map(|content| ModelResponse {
                    model: o.model,
                    content,
                })
            })
            .collect();

        if answers.len() > 1 {
            let synthesis = self.synthesize(req.prompt(), &answers).await;
            output.push_str(SYNTHESIS_HEADER);
            output.push('\n');
            output.push_str(&synthesis);
        } else {
            tracing::info!(
                succeeded = answers.len(),
                "not enough answers to synthesize"
            );
        }

        Ok(output)
    }

    fn completion<'a>(&'a self, model: &'a str, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model,
            system_prompt: &self.generation.system_prompt,
            prompt,
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        }
    }

    /// Issue every per-model call concurrently. Results keep selection order.
    async fn fan_out(&self, req: &PromptRequest) -> Result<Vec<ModelOutcome>, CombinerError> {
        let calls = req
            .models()
            .iter()
            .map(|model| self.http.query_model(self.completion(model, req.prompt())));

        match self.join_policy {
            JoinPolicy::AllOrNothing => {
                let responses = try_join_all(calls).await?;
                Ok(responses
                    .into_iter()
                    .map(|r| ModelOutcome {
                        model: r.model,
                        result: Ok(r.content),
                    })
                    .collect())
            }
            JoinPolicy::Settled => {
                let results = join_all(calls).await;
                let mut outcomes = Vec::with_capacity(results.len());
                let mut first_error = None;

                for (model, result) in req.models().iter().zip(results) {
                    match result {
                        Ok(r) => outcomes.push(ModelOutcome {
                            model: r.model,
                            result: Ok(r.content),
                        }),
                        Err(e) => {
                            tracing::warn!(model = %model, "model call failed: {e}");
                            outcomes.push(ModelOutcome {
                                model: model.clone(),
                                result: Err(e.user_message()),
                            });
                            first_error.get_or_insert(e);
                        }
                    }
                }

                let all_failed = outcomes.iter().all(|o| o.result.is_err());
                match first_error {
                    Some(e) if all_failed => Err(e),
                    _ => Ok(outcomes),
                }
            }
        }
    }

    /// Ask the synthesis model to merge the answers. Never fails the caller.
    async fn synthesize(&self, query: &str, answers: &[ModelResponse]) -> String {
        let prompt = synthesis_prompt(&self.catalog, query, answers);
        let req = CompletionRequest {
            model: &self.synthesis.model,
            system_prompt: SYNTHESIS_SYSTEM_PROMPT,
            prompt: &prompt,
            temperature: self.synthesis.temperature,
            max_tokens: self.synthesis.max_tokens,
        };

        match self.http.query_model(req).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!(model = %self.synthesis.model, "synthesis failed: {e}");
                SYNTHESIS_FAILED.to_string()
            }
        }
    }
}

/// One labeled block per model, each followed by a blank line.
pub fn format_sections(catalog: &ModelCatalog, outcomes: &[ModelOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        let name = catalog.display_name(&outcome.model);
        match &outcome.result {
            Ok(content) => {
                let _ = write!(out, "=== {name} ===\n{content}\n\n");
            }
            Err(message) => {
                let _ = write!(out, "=== {name} ===\n[error: {message}]\n\n");
            }
        }
    }
    out
}

/// Prompt for the combining model: the query plus every answer, numbered from 1.
pub fn synthesis_prompt(catalog: &ModelCatalog, query: &str, answers: &[ModelResponse]) -> String {
    let mut prompt = String::from(
        "A user asked a question and several AI assistants answered it.\n\
         Critically evaluate every answer, keep what is correct in each, and merge them \
         into one cohesive, comprehensive answer to the user's original question.\n\
         Where the answers contradict each other, point out the contradiction and say \
         which position is better supported.\n\n",
    );
    let _ = write!(prompt, "Original question:\n{query}\n\n");
    for (i, answer) in answers.iter().enumerate() {
        let name = catalog.display_name(&answer.model);
        let _ = write!(prompt, "Response {} ({name}):\n{}\n\n", i + 1, answer.content);
    }
    prompt
}
