use crate::traits::{GenerationParams, LlmClient, LlmResponse, ModelCatalog, ModelInfo};
use async_trait::async_trait;
use factcheck_common::{FactcheckError, Result};
use factcheck_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

const LIST_PAGE_SIZE: &str = "50";
const MAX_LIST_PAGES: usize = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

fn generation_config(p: GenerationParams) -> Option<GeminiGenerationConfig> {
    if p == GenerationParams::default() {
        return None;
    }
    Some(GeminiGenerationConfig {
        temperature: p.temperature,
        max_output_tokens: p.max_output_tokens,
        top_p: p.top_p,
        top_k: p.top_k,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    description: String,
    input_token_limit: Option<u32>,
    output_token_limit: Option<u32>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl From<GeminiModel> for ModelInfo {
    fn from(m: GeminiModel) -> Self {
        ModelInfo {
            name: m.name,
            description: m.description,
            input_token_limit: m.input_token_limit,
            output_token_limit: m.output_token_limit,
            supported_generation_methods: m.supported_generation_methods,
        }
    }
}

/// Credentials plus transport for the Gemini REST API.
///
/// Cheap to clone; every [`GeminiClient`] built from it shares the same
/// connection pool.
#[derive(Clone)]
pub struct GeminiApi {
    http: HttpClient,
    api_key: Arc<str>,
}

impl GeminiApi {
    /// `base_url` should end with `/` (e.g. [`GEMINI_BASE_URL`]).
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let http = HttpClient::new(base_url)
            .map_err(|e| FactcheckError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: Arc::from(api_key.into()),
        })
    }

    /// Client bound to one model identifier (`gemini-pro` or `models/gemini-pro`).
    pub fn client(&self, model: impl Into<String>) -> GeminiClient {
        GeminiClient {
            api: self.clone(),
            model: model.into(),
        }
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(&*self.api_key),
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelCatalog for GeminiApi {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("pageSize", Cow::Borrowed(LIST_PAGE_SIZE))];
            if let Some(token) = &page_token {
                query.push(("pageToken", Cow::Owned(token.clone())));
            }
            let opts = RequestOpts {
                query: Some(query),
                ..self.opts()
            };

            let page: ListModelsResponse = self
                .http
                .get_json("models", opts)
                .await
                .map_err(upstream_error)?;
            models.extend(page.models.into_iter().map(ModelInfo::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(models),
            }
        }

        tracing::warn!(
            pages = MAX_LIST_PAGES,
            listed = models.len(),
            "Gemini model listing truncated"
        );
        Ok(models)
    }
}

/// Google Gemini client bound to a single model.
pub struct GeminiClient {
    api: GeminiApi,
    model: String,
}

impl GeminiClient {
    fn generate_path(&self) -> String {
        let id = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("models/{id}:generateContent")
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<LlmResponse> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: generation_config(params),
        };

        let path = self.generate_path();
        tracing::debug!(
            model = %self.model,
            base = %self.api.http.base_url(),
            %path,
            "Sending Gemini request"
        );

        let resp: GeminiResponse = self
            .api
            .http
            .post_json(&path, &request, self.api.opts())
            .await
            .map_err(upstream_error)?;

        let candidate = resp.candidates.first();
        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();
        let finish_reason = candidate
            .and_then(|c| c.finish_reason.clone())
            .or_else(|| resp.prompt_feedback.and_then(|f| f.block_reason));

        Ok(LlmResponse {
            text,
            model: resp.model_version.or_else(|| Some(self.model.clone())),
            tokens_used: resp.usage_metadata.and_then(|u| u.total_token_count),
            finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn upstream_error(e: HttpError) -> FactcheckError {
    let msg = match &e {
        HttpError::Api {
            status, message, ..
        } => match status.as_u16() {
            429 => format!("Rate limit exceeded: {message}"),
            401 => format!("Invalid API key: {message}"),
            403 => format!("API access forbidden: {message}"),
            404 => format!("Model not found: {message}"),
            _ => format!("Gemini API error ({status}): {message}"),
        },
        HttpError::Decode(err, _) => format!("Failed to parse Gemini response: {err}"),
        other => format!("Gemini request failed: {other}"),
    };
    FactcheckError::Upstream(msg)
}
