use anyhow::{Context, Result};
use factcheck_common::observability::init_logging;
use factcheck_config::{FactcheckConfig, FactcheckConfigLoader};
use factcheck_llm::gemini::GeminiApi;
use factcheck_llm::select_gemini_model;
use factcheck_llm::verifier::Verifier;
use factcheck_server::{AppState, router};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // 1) Config first; a missing key is fatal before anything else starts.
    let cfg: FactcheckConfig = FactcheckConfigLoader::new().with_default_file().load()?;

    let log_path = init_logging(cfg.logging.to_log_config())?;
    tracing::info!(log_file = %log_path.display(), bind = %cfg.server.bind, "factcheck starting");
    tracing::debug!(?cfg, "effective configuration");

    // 2) Pick the model once; `None` leaves /verify answering 500.
    let api = GeminiApi::new(&cfg.gemini.base_url, cfg.gemini.api_key.clone())?;
    let handle = select_gemini_model(&api, &cfg.gemini.models[..]).await;
    if handle.is_none() {
        tracing::error!("no Gemini model could be reached; /verify will report it as unavailable");
    }

    let catalog = Arc::new(api);
    let mut state = AppState::new(Verifier::new(handle, catalog.clone()), catalog);
    if let Some(path) = &cfg.server.index_path {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read index page: {}", path.display()))?;
        state = state.with_index_html(html);
    }

    // 3) Serve.
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
