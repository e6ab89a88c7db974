//! Start-up model selection.
//!
//! Candidates are probed strictly in declared order and the first one that
//! answers becomes the [`ModelHandle`] for the rest of the process. A probe
//! that succeeds is taken as evidence the model will also serve real prompts.

use crate::traits::{GenerationParams, LlmClient, LlmResponse};
use factcheck_common::Result;
use std::fmt;
use std::sync::Arc;

/// Immutable, cheaply clonable reference to a reachable model.
#[derive(Clone)]
pub struct ModelHandle {
    client: Arc<dyn LlmClient>,
    supports_generation: bool,
}

impl ModelHandle {
    fn probed(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            supports_generation: true,
        }
    }

    /// Identifier exactly as it appeared in the candidate list.
    pub fn identifier(&self) -> &str {
        self.client.model_name()
    }

    pub fn supports_generation(&self) -> bool {
        self.supports_generation
    }

    pub async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<LlmResponse> {
        self.client.generate(prompt, params).await
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("identifier", &self.identifier())
            .field("supports_generation", &self.supports_generation)
            .finish()
    }
}

/// Probe `candidates` in order and keep the first that answers.
///
/// `connect` builds a client for one identifier; a construction error counts
/// as a failed attempt. Returns `None` when every candidate fails; callers
/// should treat that as permanent for the life of the process.
pub async fn select_model<I, S, F, C>(candidates: I, mut connect: F) -> Option<ModelHandle>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&str) -> Result<C>,
    C: LlmClient + 'static,
{
    let mut attempted = 0usize;
    for candidate in candidates {
        let id = candidate.as_ref();
        attempted += 1;

        let client = match connect(id) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(model = %id, error = %e, "Failed to initialize model");
                continue;
            }
        };

        match client.probe().await {
            Ok(()) => {
                tracing::info!(model = %id, attempt = attempted, "Successfully initialized model");
                return Some(ModelHandle::probed(Arc::new(client)));
            }
            Err(e) => {
                tracing::warn!(model = %id, error = %e, "Failed to initialize model");
            }
        }
    }

    tracing::error!(
        attempted,
        "No models available. Please check your API key and permissions."
    );
    None
}
