//! Model access and fact verification for factcheck.
//!
//! - [`traits`]: the [`traits::LlmClient`] and [`traits::ModelCatalog`] seams
//! - [`gemini`]: Google Gemini REST implementation of both
//! - [`selector`]: start-up probing that yields a [`selector::ModelHandle`]
//! - [`verifier`]: request validation, prompt, and the verification flow
//! - [`normalize`]: recovery of a result from free-form model output
//!
//! # Examples
//! ```no_run
//! use factcheck_llm::gemini::{GeminiApi, GEMINI_BASE_URL};
//! use factcheck_llm::verifier::{VerificationRequest, Verifier};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> factcheck_common::Result<()> {
//! let api = GeminiApi::new(GEMINI_BASE_URL, "my-key")?;
//! let handle = factcheck_llm::select_gemini_model(&api, &["gemini-1.5-flash"]).await;
//! let verifier = Verifier::new(handle, Arc::new(api));
//! let req = VerificationRequest::new("The Great Wall is visible from the Moon").unwrap();
//! let _ = verifier.verify(&req).await;
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod normalize;
pub mod selector;
pub mod traits;
pub mod verifier;

use gemini::GeminiApi;
use selector::ModelHandle;

/// Probe Gemini `candidates` in order and keep the first reachable model.
pub async fn select_gemini_model<S: AsRef<str>>(
    api: &GeminiApi,
    candidates: &[S],
) -> Option<ModelHandle> {
    selector::select_model(candidates, |id| Ok(api.client(id))).await
}
