//! Application state shared across handlers.

use crate::analysis::AnalysisHandler;
use std::sync::Arc;
use whoisit_core::config::AppConfig;
use whoisit_metadata::MetadataStore;
use whoisit_recognition::Recognizer;
use whoisit_storage::ObjectStore;

/// Shared application state. Every client is built once at startup and injected here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub analysis: Arc<AnalysisHandler>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        let analysis = Arc::new(AnalysisHandler::new(
            recognizer,
            metadata.clone(),
            config.images.region.clone(),
        ));
        Self {
            config: Arc::new(config),
            storage,
            metadata,
            analysis,
        }
    }
}
