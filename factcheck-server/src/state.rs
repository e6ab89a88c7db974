use factcheck_llm::traits::ModelCatalog;
use factcheck_llm::verifier::Verifier;
use std::sync::Arc;

/// Page served on `GET /` unless `server.index_path` points elsewhere.
pub const BUILTIN_INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub catalog: Arc<dyn ModelCatalog>,
    pub index_html: Arc<str>,
}

impl AppState {
    pub fn new(verifier: Verifier, catalog: Arc<dyn ModelCatalog>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            catalog,
            index_html: Arc::from(BUILTIN_INDEX_HTML),
        }
    }

    pub fn with_index_html(mut self, html: impl Into<Arc<str>>) -> Self {
        self.index_html = html.into();
        self
    }
}
