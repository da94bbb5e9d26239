use thiserror::Error;

#[derive(Debug, Error)]
pub enum CombinerError {
    #[error("HTTP error! Status: {status}")]
    Http { status: u16, endpoint: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("empty completion from {model}")]
    EmptyCompletion { model: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CombinerError {
    /// Status code for HTTP failures, None for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message shown on the output surface. Transport errors keep the
    /// underlying error text; parse errors do not leak the raw body.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, .. } => format!("HTTP error! Status: {status}"),
            Self::Request(e) => e.to_string(),
            Self::SchemaParse(_) => "failed to parse server response".to_string(),
            Self::EmptyCompletion { model } => format!("{model} returned no content"),
            Self::Config(msg) => msg.clone(),
            Self::Validation(e) => e.to_string(),
        }
    }
}

/// Client-side rejection raised before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a prompt.")]
    PromptRequired,

    #[error("Please select at least one model.")]
    ModelRequired,
}
