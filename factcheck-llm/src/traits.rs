use async_trait::async_trait;
use factcheck_common::Result;
use serde::{Deserialize, Serialize};

/// Generation method a model must advertise to be usable for verification.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Prompt sent by [`LlmClient::probe`].
pub const PROBE_PROMPT: &str = "test";
/// Output cap for [`LlmClient::probe`]; the reply itself is discarded.
pub const PROBE_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

/// Sampling knobs forwarded to the provider. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl GenerationParams {
    pub fn max_tokens(max_output_tokens: u32) -> Self {
        Self {
            max_output_tokens: Some(max_output_tokens),
            ..Self::default()
        }
    }
}

/// One entry of the provider's model listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub input_token_limit: Option<u32>,
    pub output_token_limit: Option<u32>,
    #[serde(skip_serializing)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// A client bound to one remote model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<LlmResponse>;

    /// Model identifier this client talks to.
    fn model_name(&self) -> &str;

    /// Cheapest call that proves the model is reachable with our credentials.
    async fn probe(&self) -> Result<()> {
        self.generate(PROBE_PROMPT, GenerationParams::max_tokens(PROBE_MAX_TOKENS))
            .await
            .map(|_| ())
    }
}

/// Enumerates the models the credentials can see.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Only the models that can serve `generateContent`.
    async fn generation_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self.list_models().await?;
        Ok(models
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .collect())
    }
}
