use crate::normalize::{normalize, Normalized};
use crate::selector::ModelHandle;
use crate::traits::{GenerationParams, ModelCatalog};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Longest accepted input, in characters, after trimming.
pub const MAX_INPUT_CHARS: usize = 5000;
/// How many model names are appended to an upstream error.
const DIAGNOSTIC_MODEL_COUNT: usize = 3;

/// Sampling used for verification: near-deterministic, bounded output.
pub const VERIFY_PARAMS: GenerationParams = GenerationParams {
    temperature: Some(0.1),
    max_output_tokens: Some(1024),
    top_p: Some(0.95),
    top_k: Some(40),
};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Gemini model not available. Please check server logs.")]
    ServiceUnavailable,

    #[error("Failed to generate content: {0}")]
    Upstream(String),

    #[error("No response text received from Gemini API")]
    EmptyUpstreamResponse,

    #[error("An unexpected error occurred. Please try again.")]
    Internal,
}

impl VerifyError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, VerifyError::InvalidRequest(_))
    }
}

/// Validated user input. Construction is the only way to get one, so holding
/// a `VerificationRequest` means the text is trimmed, non-empty and in bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    input: String,
}

impl VerificationRequest {
    pub fn new(raw: &str) -> Result<Self, VerifyError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(VerifyError::InvalidRequest("No input provided".into()));
        }
        if input.chars().count() > MAX_INPUT_CHARS {
            return Err(VerifyError::InvalidRequest(format!(
                "Input too long (max {MAX_INPUT_CHARS} characters)"
            )));
        }
        Ok(Self {
            input: input.to_string(),
        })
    }

    /// Validate a decoded request body of the form `{"input": "..."}`.
    pub fn from_json(body: &Value) -> Result<Self, VerifyError> {
        let obj = body
            .as_object()
            .ok_or_else(|| VerifyError::InvalidRequest("Invalid JSON data".into()))?;
        match obj.get("input") {
            None | Some(Value::Null) => Err(VerifyError::InvalidRequest("No input provided".into())),
            Some(Value::String(s)) => Self::new(s),
            Some(_) => Err(VerifyError::InvalidRequest("Input must be a string".into())),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_correct: bool,
    pub confidence: u8,
    pub reasoning: String,
    pub suggestions: String,
}

/// Outcome of one successful verification.
#[derive(Debug, Clone)]
pub struct Verification {
    pub result: VerificationResult,
    pub model_used: String,
    /// The normalizer had to synthesize `result`.
    pub degraded: bool,
}

pub fn build_prompt(input: &str) -> String {
    format!(
        r#"You are a fact-checking assistant. Analyze the following input and determine if it is factually correct,
logically sound, and free of errors.

Input: {input}

Respond ONLY with a JSON object in this exact format:
{{
    "is_correct": true/false,
    "confidence": 0-100 (percentage confidence in your assessment),
    "reasoning": "Brief explanation of your assessment",
    "suggestions": "Corrected version or suggestions if needed, otherwise 'None'"
}}

Rules:
- Be concise in your reasoning (max 200 words)
- If the input is correct, set suggestions to "None"
- Confidence should reflect how certain you are (0-100)
- Only output the JSON object, no additional text
"#
    )
}

/// Per-request verification against the model chosen at start-up.
pub struct Verifier {
    model: Option<ModelHandle>,
    catalog: Arc<dyn ModelCatalog>,
}

impl Verifier {
    pub fn new(model: Option<ModelHandle>, catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { model, catalog }
    }

    pub async fn verify(&self, request: &VerificationRequest) -> Result<Verification, VerifyError> {
        let model = self.model.as_ref().ok_or(VerifyError::ServiceUnavailable)?;

        let prompt = build_prompt(request.input());
        let response = match model.generate(&prompt, VERIFY_PARAMS).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(model = %model.identifier(), error = %e, "verification call failed");
                let mut detail = e.detail();
                if let Some(names) = self.available_models().await {
                    detail.push_str(&format!(" | Available models: {names}"));
                }
                return Err(VerifyError::Upstream(detail));
            }
        };

        let text = response.text.trim();
        if text.is_empty() {
            tracing::warn!(
                model = %model.identifier(),
                finish_reason = ?response.finish_reason,
                "model returned no text"
            );
            return Err(VerifyError::EmptyUpstreamResponse);
        }

        let normalized = normalize(text);
        if let Normalized::Degraded { cause, .. } = &normalized {
            tracing::warn!(model = %model.identifier(), %cause, "model output could not be parsed");
        }
        tracing::debug!(
            model = %model.identifier(),
            tokens_used = ?response.tokens_used,
            degraded = normalized.is_degraded(),
            "verification finished"
        );

        Ok(Verification {
            degraded: normalized.is_degraded(),
            result: normalized.into_result(),
            model_used: model.identifier().to_string(),
        })
    }

    /// Best effort: a failure here only loses diagnostics.
    async fn available_models(&self) -> Option<String> {
        match self.catalog.generation_models().await {
            Ok(models) if !models.is_empty() => Some(
                models
                    .into_iter()
                    .take(DIAGNOSTIC_MODEL_COUNT)
                    .map(|m| m.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "could not list models for diagnostics");
                None
            }
        }
    }
}
